//! Plan persistence orchestrator.
//!
//! Sequences the plan and activity writes that make up create, update,
//! archive, and feedback. There is no transaction spanning multiple
//! statements: validation runs first, writes run in order, and a failure
//! after the first write is reported as a partial failure instead of being
//! rolled back.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{error, info};
use uuid::Uuid;

use itinera_db::models::{Plan, PlanFeedback};

use super::draft::Draft;
use super::store::{NewFeedback, PlanStore, StoreError};
use crate::activity::{self, Activity, ActivityEdit};
use crate::error::ItineraryError;
use crate::identity::Identity;
use crate::session::EditSession;

pub const MAX_FEEDBACK_COMMENT_CHARS: usize = 1000;

/// A plan together with its activities, ordered by day and position.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedPlan {
    pub plan: Plan,
    pub activities: Vec<Activity>,
}

impl LoadedPlan {
    /// Open a viewing session over the plan's activities.
    pub fn session(&self) -> EditSession {
        EditSession::for_plan(self.activities.clone())
    }
}

/// One row-level write in a sequential batch.
#[derive(Debug, Clone, Copy)]
enum Write {
    Delete(Uuid),
    Update(ActivityEdit),
}

impl Write {
    fn activity_id(&self) -> Uuid {
        match self {
            Self::Delete(id) => *id,
            Self::Update(edit) => edit.activity_id,
        }
    }
}

#[derive(Clone)]
pub struct PlanOrchestrator {
    store: Arc<dyn PlanStore>,
}

impl std::fmt::Debug for PlanOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanOrchestrator").finish_non_exhaustive()
    }
}

impl PlanOrchestrator {
    pub fn new(store: Arc<dyn PlanStore>) -> Self {
        Self { store }
    }

    // -----------------------------------------------------------------------
    // Create
    // -----------------------------------------------------------------------

    /// Persist a draft as a new active plan.
    ///
    /// The plan row is written first, then all activities in one batch. If
    /// the batch fails the plan row stays behind without activities and the
    /// error is [`ItineraryError::PersistencePartialFailure`].
    pub async fn create(
        &self,
        identity: &Identity,
        draft: &Draft,
    ) -> Result<LoadedPlan, ItineraryError> {
        validate_draft(draft)?;
        let user_id = identity.user_id();

        let plan = self
            .store
            .insert_plan(&draft.request.to_new_plan(user_id))
            .await
            .map_err(ItineraryError::Store)?;

        let activities = match self.store.insert_activities(plan.id, &draft.activities).await {
            Ok(stored) => stored,
            Err(source) => {
                let payload = serde_json::to_string(&draft.activities)
                    .unwrap_or_else(|e| format!("<unserializable: {e}>"));
                error!(
                    %user_id,
                    plan_id = %plan.id,
                    error = %source,
                    payload = %payload,
                    "plan saved without activities; needs reconciliation"
                );
                return Err(ItineraryError::PersistencePartialFailure {
                    plan_id: plan.id,
                    source,
                });
            }
        };

        info!(%user_id, plan_id = %plan.id, activities = activities.len(), "plan created");
        Ok(LoadedPlan { plan, activities })
    }

    // -----------------------------------------------------------------------
    // Update
    // -----------------------------------------------------------------------

    /// Apply a batch of placement edits to a persisted plan.
    ///
    /// The whole batch is validated before the first write. Writes then run
    /// one by one; a failure part-way leaves earlier writes in place.
    pub async fn update(
        &self,
        identity: &Identity,
        plan_id: Uuid,
        edits: &[ActivityEdit],
    ) -> Result<(), ItineraryError> {
        if edits.is_empty() {
            return Err(ItineraryError::NoUpdatesProvided);
        }
        validate_edits(edits)?;
        self.check_against_plan(identity, plan_id, edits).await?;

        let writes: Vec<Write> = edits.iter().copied().map(Write::Update).collect();
        self.apply_writes(identity, plan_id, &writes).await
    }

    /// Persist an edit session: delete removed activities, write every
    /// placement, then reload and commit the result into `session`.
    pub async fn save_session(
        &self,
        identity: &Identity,
        plan_id: Uuid,
        session: &mut EditSession,
    ) -> Result<LoadedPlan, ItineraryError> {
        if !session.is_dirty() {
            return Err(ItineraryError::NoUpdatesProvided);
        }

        let removed = session.removed_ids();
        let edits = session.pending_edits();
        validate_edits(&edits)?;
        self.check_against_plan(identity, plan_id, &edits).await?;

        let writes: Vec<Write> = removed
            .into_iter()
            .map(Write::Delete)
            .chain(edits.into_iter().map(Write::Update))
            .collect();
        self.apply_writes(identity, plan_id, &writes).await?;

        let loaded = self.load(identity, plan_id).await?;
        session.commit(loaded.activities.clone());
        Ok(loaded)
    }

    /// Days must exist in the plan. Reads only.
    async fn check_against_plan(
        &self,
        identity: &Identity,
        plan_id: Uuid,
        edits: &[ActivityEdit],
    ) -> Result<(), ItineraryError> {
        let plan = self
            .store
            .fetch_plan(identity.user_id(), plan_id)
            .await
            .map_err(|e| ItineraryError::from_store(plan_id, e))?;

        if let Some(edit) = edits.iter().find(|e| e.day_number > plan.duration_days) {
            return Err(ItineraryError::validation(
                "day_number",
                format!(
                    "day {} is beyond the plan's {} days",
                    edit.day_number, plan.duration_days
                ),
            ));
        }
        Ok(())
    }

    async fn apply_writes(
        &self,
        identity: &Identity,
        plan_id: Uuid,
        writes: &[Write],
    ) -> Result<(), ItineraryError> {
        let user_id = identity.user_id();
        let total = writes.len();

        for (applied, write) in writes.iter().enumerate() {
            let result = match write {
                Write::Delete(id) => self.store.delete_activity(user_id, plan_id, *id).await,
                Write::Update(edit) => self.store.update_activity(user_id, plan_id, edit).await,
            };
            let err = match result {
                Ok(true) => continue,
                Ok(false) => ItineraryError::NotFoundOrForbidden {
                    plan_id,
                    activity_id: write.activity_id(),
                },
                Err(e) => ItineraryError::from_store(plan_id, e),
            };
            return Err(partial(user_id, plan_id, applied, total, err));
        }

        if let Err(e) = self.store.touch_plan(user_id, plan_id).await {
            let err = ItineraryError::from_store(plan_id, e);
            return Err(partial(user_id, plan_id, total, total, err));
        }

        info!(%user_id, %plan_id, writes = total, "plan updated");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Archive / read
    // -----------------------------------------------------------------------

    /// Soft-delete a plan. Its activities are hidden through the plan.
    pub async fn archive(&self, identity: &Identity, plan_id: Uuid) -> Result<(), ItineraryError> {
        self.store
            .archive_plan(identity.user_id(), plan_id)
            .await
            .map_err(|e| ItineraryError::from_store(plan_id, e))?;
        info!(user_id = %identity.user_id(), %plan_id, "plan archived");
        Ok(())
    }

    pub async fn load(
        &self,
        identity: &Identity,
        plan_id: Uuid,
    ) -> Result<LoadedPlan, ItineraryError> {
        let plan = self
            .store
            .fetch_plan(identity.user_id(), plan_id)
            .await
            .map_err(|e| ItineraryError::from_store(plan_id, e))?;
        let mut activities = self
            .store
            .list_activities(plan_id)
            .await
            .map_err(ItineraryError::Store)?;
        activities.sort_by_key(|a| (a.day_number, a.position));
        Ok(LoadedPlan { plan, activities })
    }

    /// The caller's non-archived plans, newest first.
    pub async fn list(&self, identity: &Identity) -> Result<Vec<Plan>, ItineraryError> {
        self.store
            .list_plans(identity.user_id())
            .await
            .map_err(ItineraryError::Store)
    }

    // -----------------------------------------------------------------------
    // Feedback
    // -----------------------------------------------------------------------

    /// Record the caller's verdict on a plan. One submission per plan.
    pub async fn submit_feedback(
        &self,
        identity: &Identity,
        plan_id: Uuid,
        feedback: &NewFeedback,
    ) -> Result<PlanFeedback, ItineraryError> {
        if let Some(comment) = &feedback.comment {
            let len = comment.chars().count();
            if len > MAX_FEEDBACK_COMMENT_CHARS {
                return Err(ItineraryError::validation(
                    "comment",
                    format!(
                        "must be at most {MAX_FEEDBACK_COMMENT_CHARS} characters, got {len}"
                    ),
                ));
            }
        }

        let user_id = identity.user_id();
        self.store
            .fetch_plan(user_id, plan_id)
            .await
            .map_err(|e| ItineraryError::from_store(plan_id, e))?;

        match self.store.insert_feedback(user_id, plan_id, feedback).await {
            Ok(row) => {
                info!(%user_id, %plan_id, helpful = row.helpful, "feedback recorded");
                Ok(row)
            }
            Err(StoreError::UniqueViolation) => Err(ItineraryError::AlreadySubmitted(plan_id)),
            Err(e) => Err(ItineraryError::from_store(plan_id, e)),
        }
    }

    pub async fn feedback(
        &self,
        identity: &Identity,
        plan_id: Uuid,
    ) -> Result<Option<PlanFeedback>, ItineraryError> {
        self.store
            .get_feedback(identity.user_id(), plan_id)
            .await
            .map_err(|e| ItineraryError::from_store(plan_id, e))
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_draft(draft: &Draft) -> Result<(), ItineraryError> {
    draft.request.validate()?;

    if draft.activities.is_empty() {
        return Err(ItineraryError::validation(
            "activities",
            "a plan needs at least one activity",
        ));
    }
    let duration = draft.request.duration_days;
    if let Some(a) = draft
        .activities
        .iter()
        .find(|a| a.day_number < 1 || a.day_number > duration)
    {
        return Err(ItineraryError::validation(
            "day_number",
            format!("day {} is outside 1..={duration}", a.day_number),
        ));
    }
    if let Some(a) = draft.activities.iter().find(|a| a.name.trim().is_empty()) {
        return Err(ItineraryError::validation(
            "name",
            format!("activity on day {} has no name", a.day_number),
        ));
    }
    if let Some(a) = draft
        .activities
        .iter()
        .find(|a| !a.has_valid_coordinates())
    {
        return Err(ItineraryError::validation(
            "coordinates",
            format!(
                "{} ({}, {}) is outside latitude -90..=90 or longitude -180..=180",
                a.name, a.latitude, a.longitude
            ),
        ));
    }
    if !activity::is_dense(&draft.activities) {
        return Err(ItineraryError::validation(
            "position",
            "positions must run 1..n within each day",
        ));
    }
    Ok(())
}

/// Checks that need no I/O: bounds, repeated ids, repeated slots.
fn validate_edits(edits: &[ActivityEdit]) -> Result<(), ItineraryError> {
    if let Some(e) = edits.iter().find(|e| e.day_number < 1) {
        return Err(ItineraryError::validation(
            "day_number",
            format!("must be at least 1, got {}", e.day_number),
        ));
    }
    if let Some(e) = edits.iter().find(|e| e.position < 1) {
        return Err(ItineraryError::validation(
            "position",
            format!("must be at least 1, got {}", e.position),
        ));
    }

    let mut ids = HashSet::new();
    if let Some(e) = edits.iter().find(|e| !ids.insert(e.activity_id)) {
        return Err(ItineraryError::validation(
            "activity_id",
            format!("activity {} appears more than once", e.activity_id),
        ));
    }

    let mut slots = HashSet::new();
    if let Some(e) = edits.iter().find(|e| !slots.insert((e.day_number, e.position))) {
        return Err(ItineraryError::DuplicatePosition {
            day_number: e.day_number,
            position: e.position,
        });
    }
    Ok(())
}

/// Wrap `err` as a partial update when earlier writes already landed.
fn partial(
    user_id: Uuid,
    plan_id: Uuid,
    applied: usize,
    total: usize,
    err: ItineraryError,
) -> ItineraryError {
    if applied == 0 {
        return err;
    }
    error!(
        %user_id,
        %plan_id,
        applied,
        total,
        error = %err,
        "plan partially updated; needs reconciliation"
    );
    ItineraryError::PartialUpdate {
        plan_id,
        applied,
        total,
        source: Box::new(err),
    }
}
