//! Error taxonomy shared by every itinerary operation.
//!
//! Every failure reaches the caller as one [`ItineraryError`]. Nothing in the
//! engine retries; callers render [`ItineraryError::user_message`] and branch
//! on [`ItineraryError::status_code`] or the variant itself.

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::persist::StoreError;

/// Why a generation attempt produced no activities.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("provider response is malformed: {reason}")]
    MalformedResponse { reason: String },

    #[error("provider returned an empty activity list")]
    EmptyResponse,

    #[error("activity #{index} has invalid {field}: {value}")]
    InvalidActivityField {
        /// Zero-based index of the offending element.
        index: usize,
        field: &'static str,
        /// The offending value as JSON, or `missing`.
        value: String,
    },

    #[error("expected {expected} activities on day {day_number}, got {actual}")]
    ActivityCountMismatch {
        day_number: i32,
        expected: usize,
        actual: usize,
    },

    #[error("provider rejected the request")]
    RequestRejected,

    #[error("provider did not answer within {0:?}")]
    Timeout(Duration),

    #[error("provider call failed: {0:#}")]
    Provider(anyhow::Error),
}

/// Errors returned by the itinerary engine.
#[derive(Debug, Error)]
pub enum ItineraryError {
    /// Malformed or missing input, caught before any I/O.
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("plan {0} not found")]
    NotFound(Uuid),

    #[error("plan {0} belongs to another user")]
    Forbidden(Uuid),

    /// A write aimed at an activity outside the given plan (or a plan the
    /// caller cannot see) matched no row.
    #[error("activity {activity_id} not found in plan {plan_id}")]
    NotFoundOrForbidden { plan_id: Uuid, activity_id: Uuid },

    #[error("itinerary generation failed: {0}")]
    GenerationFailed(#[from] GenerationError),

    #[error("day {day_number} has more than one activity at position {position}")]
    DuplicatePosition { day_number: i32, position: i32 },

    #[error("no activity updates provided")]
    NoUpdatesProvided,

    /// The plan row was written but the activity batch was not. The plan is
    /// left in place without activities.
    #[error("plan {plan_id} was saved but its activities were not")]
    PersistencePartialFailure {
        plan_id: Uuid,
        #[source]
        source: StoreError,
    },

    /// A sequential batch stopped after some writes had already landed.
    #[error("plan {plan_id} was partially updated ({applied} of {total} writes applied)")]
    PartialUpdate {
        plan_id: Uuid,
        applied: usize,
        total: usize,
        #[source]
        source: Box<ItineraryError>,
    },

    #[error("feedback already submitted for plan {0}")]
    AlreadySubmitted(Uuid),

    /// The store failed cleanly: nothing from this operation was written.
    #[error("storage failure")]
    Store(#[source] StoreError),
}

impl ItineraryError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Map a store failure on `plan_id` to the caller-facing variant.
    pub(crate) fn from_store(plan_id: Uuid, err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NotFound(plan_id),
            StoreError::Forbidden => Self::Forbidden(plan_id),
            other => Self::Store(other),
        }
    }

    /// HTTP-like status class for rendering.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } | Self::DuplicatePosition { .. } | Self::NoUpdatesProvided => {
                400
            }
            Self::Forbidden(_) => 403,
            Self::NotFound(_) | Self::NotFoundOrForbidden { .. } => 404,
            Self::AlreadySubmitted(_) => 409,
            Self::GenerationFailed(GenerationError::RequestRejected) => 422,
            Self::GenerationFailed(GenerationError::Timeout(_)) => 504,
            Self::GenerationFailed(_) => 502,
            Self::PersistencePartialFailure { .. } | Self::PartialUpdate { .. } | Self::Store(_) => {
                500
            }
        }
    }

    /// Short message suitable for showing to the end user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { field, reason } => format!("Please check {field}: {reason}."),
            Self::NotFound(_) | Self::NotFoundOrForbidden { .. } => {
                "That plan could not be found.".to_string()
            }
            Self::Forbidden(_) => "You do not have access to that plan.".to_string(),
            Self::GenerationFailed(GenerationError::RequestRejected) => {
                "The itinerary request was declined. Try rephrasing your notes.".to_string()
            }
            Self::GenerationFailed(_) => {
                "We could not generate an itinerary. Try adjusting your inputs.".to_string()
            }
            Self::DuplicatePosition { .. } => {
                "Two activities share the same slot. Reload the plan and try again.".to_string()
            }
            Self::NoUpdatesProvided => "There are no changes to save.".to_string(),
            Self::PersistencePartialFailure { .. } | Self::PartialUpdate { .. } | Self::Store(_) => {
                "Failed to save the plan. Please try again.".to_string()
            }
            Self::AlreadySubmitted(_) => {
                "You have already left feedback for this plan.".to_string()
            }
        }
    }

    /// Whether durable state may now be inconsistent and needs manual
    /// reconciliation.
    pub fn needs_reconciliation(&self) -> bool {
        matches!(
            self,
            Self::PersistencePartialFailure { .. } | Self::PartialUpdate { .. }
        )
    }
}
