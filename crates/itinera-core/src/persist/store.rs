//! The `PlanStore` trait: the seam between the orchestrator and storage.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use itinera_db::models::{Plan, PlanFeedback};
use itinera_db::queries::plans::NewPlan;

use crate::activity::{Activity, ActivityEdit};

/// Failure reported by a [`PlanStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// No visible plan with that id (missing or archived).
    #[error("plan not found")]
    NotFound,

    /// The plan exists but belongs to another user.
    #[error("plan belongs to another user")]
    Forbidden,

    #[error("uniqueness constraint violated")]
    UniqueViolation,

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// A user's verdict on a plan, before it is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFeedback {
    pub helpful: bool,
    pub comment: Option<String>,
}

/// Storage for plans, their activities, and feedback.
///
/// Every write that names a plan is scoped to `user_id` and to non-archived
/// plans. Writes that match no row return `Ok(false)` rather than an error,
/// so callers can report which item missed.
#[async_trait]
pub trait PlanStore: Send + Sync {
    async fn insert_plan(&self, plan: &NewPlan) -> Result<Plan, StoreError>;

    /// Insert all activities in one statement; nothing is written on error.
    /// Returns the stored activities ordered by day and position.
    async fn insert_activities(
        &self,
        plan_id: Uuid,
        activities: &[Activity],
    ) -> Result<Vec<Activity>, StoreError>;

    /// Fetch a plan visible to `user_id`.
    ///
    /// Archived plans are [`StoreError::NotFound`]; another user's plan is
    /// [`StoreError::Forbidden`].
    async fn fetch_plan(&self, user_id: Uuid, plan_id: Uuid) -> Result<Plan, StoreError>;

    /// Non-archived plans owned by `user_id`, newest first.
    async fn list_plans(&self, user_id: Uuid) -> Result<Vec<Plan>, StoreError>;

    /// Activities of `plan_id` ordered by day and position.
    async fn list_activities(&self, plan_id: Uuid) -> Result<Vec<Activity>, StoreError>;

    async fn update_activity(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        edit: &ActivityEdit,
    ) -> Result<bool, StoreError>;

    async fn delete_activity(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        activity_id: Uuid,
    ) -> Result<bool, StoreError>;

    /// Bump `updated_at`.
    async fn touch_plan(&self, user_id: Uuid, plan_id: Uuid) -> Result<(), StoreError>;

    /// Mark the plan archived. Activities are left as they are.
    async fn archive_plan(&self, user_id: Uuid, plan_id: Uuid) -> Result<(), StoreError>;

    /// A second submission by the same user is [`StoreError::UniqueViolation`].
    async fn insert_feedback(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        feedback: &NewFeedback,
    ) -> Result<PlanFeedback, StoreError>;

    async fn get_feedback(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
    ) -> Result<Option<PlanFeedback>, StoreError>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn PlanStore) {}
};
