//! Orchestrator failure-policy tests against an in-memory store.
//!
//! The store records every write and can be told to fail specific calls,
//! which is how partial-failure paths are exercised without a database.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use itinera_core::activity::{self, Activity, ActivityEdit};
use itinera_core::generate::ItineraryRequest;
use itinera_core::persist::{
    Draft, NewFeedback, PlanOrchestrator, PlanStore, StoreError,
};
use itinera_core::{Identity, ItineraryError};
use itinera_db::models::{Plan, PlanFeedback, PlanStatus, TripIntensity};
use itinera_db::queries::plans::NewPlan;

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Default)]
struct State {
    plans: HashMap<Uuid, Plan>,
    activities: Vec<(Uuid, Activity)>,
    feedback: Vec<PlanFeedback>,
    /// Successful row writes (updates, deletes, touches).
    writes: usize,
    update_calls: usize,
}

#[derive(Default)]
struct Faults {
    insert_plan: bool,
    insert_activities: bool,
    /// Fail the n-th (1-based) update call.
    update_call: Option<usize>,
    touch: bool,
}

#[derive(Default)]
struct MemoryStore {
    state: Mutex<State>,
    faults: Mutex<Faults>,
}

impl MemoryStore {
    fn fail(&self, f: impl FnOnce(&mut Faults)) {
        f(&mut self.faults.lock().unwrap());
    }

    fn writes(&self) -> usize {
        self.state.lock().unwrap().writes
    }

    fn plan_count(&self) -> usize {
        self.state.lock().unwrap().plans.len()
    }

    fn activities_of(&self, plan_id: Uuid) -> Vec<Activity> {
        self.state
            .lock()
            .unwrap()
            .activities
            .iter()
            .filter(|(p, _)| *p == plan_id)
            .map(|(_, a)| a.clone())
            .collect()
    }

    fn visible(state: &State, user_id: Uuid, plan_id: Uuid) -> Result<Plan, StoreError> {
        match state.plans.get(&plan_id) {
            None => Err(StoreError::NotFound),
            Some(p) if p.is_archived => Err(StoreError::NotFound),
            Some(p) if p.user_id != user_id => Err(StoreError::Forbidden),
            Some(p) => Ok(p.clone()),
        }
    }
}

fn injected() -> StoreError {
    StoreError::Backend(anyhow::anyhow!("injected failure"))
}

#[async_trait]
impl PlanStore for MemoryStore {
    async fn insert_plan(&self, new: &NewPlan) -> Result<Plan, StoreError> {
        if self.faults.lock().unwrap().insert_plan {
            return Err(injected());
        }
        let mut state = self.state.lock().unwrap();
        // Strictly increasing timestamps so "newest first" is observable.
        let created_at = Utc::now() + Duration::seconds(state.plans.len() as i64);
        let plan = Plan {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            city_id: new.city_id,
            duration_days: new.duration_days,
            trip_intensity: new.trip_intensity,
            notes: new.notes.clone(),
            status: PlanStatus::Active,
            is_archived: false,
            created_at,
            updated_at: created_at,
        };
        state.plans.insert(plan.id, plan.clone());
        Ok(plan)
    }

    async fn insert_activities(
        &self,
        plan_id: Uuid,
        activities: &[Activity],
    ) -> Result<Vec<Activity>, StoreError> {
        if self.faults.lock().unwrap().insert_activities {
            return Err(injected());
        }
        let mut state = self.state.lock().unwrap();
        let mut stored: Vec<Activity> = activities
            .iter()
            .map(|a| Activity {
                id: Some(Uuid::new_v4()),
                ..a.clone()
            })
            .collect();
        for a in &stored {
            state.activities.push((plan_id, a.clone()));
        }
        stored.sort_by_key(|a| (a.day_number, a.position));
        Ok(stored)
    }

    async fn fetch_plan(&self, user_id: Uuid, plan_id: Uuid) -> Result<Plan, StoreError> {
        Self::visible(&self.state.lock().unwrap(), user_id, plan_id)
    }

    async fn list_plans(&self, user_id: Uuid) -> Result<Vec<Plan>, StoreError> {
        let state = self.state.lock().unwrap();
        let mut plans: Vec<Plan> = state
            .plans
            .values()
            .filter(|p| p.user_id == user_id && !p.is_archived)
            .cloned()
            .collect();
        plans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(plans)
    }

    async fn list_activities(&self, plan_id: Uuid) -> Result<Vec<Activity>, StoreError> {
        let mut out = self.activities_of(plan_id);
        out.sort_by_key(|a| (a.day_number, a.position));
        Ok(out)
    }

    async fn update_activity(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        edit: &ActivityEdit,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.update_calls += 1;
        if self.faults.lock().unwrap().update_call == Some(state.update_calls) {
            return Err(injected());
        }
        if Self::visible(&state, user_id, plan_id).is_err() {
            return Ok(false);
        }
        let Some((_, a)) = state
            .activities
            .iter_mut()
            .find(|(p, a)| *p == plan_id && a.id == Some(edit.activity_id))
        else {
            return Ok(false);
        };
        a.day_number = edit.day_number;
        a.position = edit.position;
        state.writes += 1;
        Ok(true)
    }

    async fn delete_activity(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        activity_id: Uuid,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().unwrap();
        if Self::visible(&state, user_id, plan_id).is_err() {
            return Ok(false);
        }
        let before = state.activities.len();
        state
            .activities
            .retain(|(p, a)| !(*p == plan_id && a.id == Some(activity_id)));
        if state.activities.len() == before {
            return Ok(false);
        }
        state.writes += 1;
        Ok(true)
    }

    async fn touch_plan(&self, user_id: Uuid, plan_id: Uuid) -> Result<(), StoreError> {
        if self.faults.lock().unwrap().touch {
            return Err(injected());
        }
        let mut state = self.state.lock().unwrap();
        Self::visible(&state, user_id, plan_id)?;
        if let Some(p) = state.plans.get_mut(&plan_id) {
            p.updated_at = Utc::now();
        }
        state.writes += 1;
        Ok(())
    }

    async fn archive_plan(&self, user_id: Uuid, plan_id: Uuid) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        Self::visible(&state, user_id, plan_id)?;
        if let Some(p) = state.plans.get_mut(&plan_id) {
            p.is_archived = true;
            p.status = PlanStatus::Archived;
        }
        Ok(())
    }

    async fn insert_feedback(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        feedback: &NewFeedback,
    ) -> Result<PlanFeedback, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state
            .feedback
            .iter()
            .any(|f| f.plan_id == plan_id && f.user_id == user_id)
        {
            return Err(StoreError::UniqueViolation);
        }
        let row = PlanFeedback {
            id: Uuid::new_v4(),
            plan_id,
            user_id,
            helpful: feedback.helpful,
            comment: feedback.comment.clone(),
            created_at: Utc::now(),
        };
        state.feedback.push(row.clone());
        Ok(row)
    }

    async fn get_feedback(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
    ) -> Result<Option<PlanFeedback>, StoreError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .feedback
            .iter()
            .find(|f| f.plan_id == plan_id && f.user_id == user_id)
            .cloned())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn setup() -> (Arc<MemoryStore>, PlanOrchestrator, Identity) {
    let store = Arc::new(MemoryStore::default());
    let orchestrator = PlanOrchestrator::new(store.clone());
    (store, orchestrator, Identity::new(Uuid::new_v4()))
}

/// A valid draft: `days` half days, three activities each.
fn draft(days: i32) -> Draft {
    let request = ItineraryRequest {
        city_id: Uuid::new_v4(),
        city_name: "Lisbon".to_string(),
        duration_days: days,
        trip_intensity: TripIntensity::HalfDay,
        user_notes: Some("pastries".to_string()),
    };
    let mut activities = Vec::new();
    for day in 1..=days {
        for position in 1..=3 {
            activities.push(Activity {
                id: None,
                day_number: day,
                position,
                name: format!("d{day}p{position}"),
                latitude: 38.7223,
                longitude: -9.1393,
                description: None,
            });
        }
    }
    Draft::new(request, activities)
}

fn id_of(activities: &[Activity], name: &str) -> Uuid {
    activities
        .iter()
        .find(|a| a.name == name)
        .and_then(|a| a.id)
        .unwrap()
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_persists_plan_and_activities() {
    let (store, orch, me) = setup();

    let loaded = orch.create(&me, &draft(2)).await.unwrap();

    assert_eq!(loaded.plan.user_id, me.user_id());
    assert_eq!(loaded.plan.status, PlanStatus::Active);
    assert_eq!(loaded.plan.notes.as_deref(), Some("pastries"));
    assert_eq!(loaded.activities.len(), 6);
    assert!(loaded.activities.iter().all(|a| a.id.is_some()));
    assert!(activity::is_dense(&loaded.activities));
    assert_eq!(store.activities_of(loaded.plan.id).len(), 6);
}

#[tokio::test]
async fn failed_activity_batch_leaves_plan_without_activities() {
    let (store, orch, me) = setup();
    store.fail(|f| f.insert_activities = true);

    let err = orch.create(&me, &draft(1)).await.unwrap_err();

    let ItineraryError::PersistencePartialFailure { plan_id, .. } = &err else {
        panic!("expected partial failure, got {err:?}");
    };
    assert!(err.needs_reconciliation());
    assert_eq!(err.status_code(), 500);
    // No compensating delete: the plan row stays.
    assert_eq!(store.plan_count(), 1);
    assert!(store.activities_of(*plan_id).is_empty());
}

#[tokio::test]
async fn failed_plan_insert_writes_nothing() {
    let (store, orch, me) = setup();
    store.fail(|f| f.insert_plan = true);

    let err = orch.create(&me, &draft(1)).await.unwrap_err();
    assert!(matches!(err, ItineraryError::Store(_)));
    assert!(!err.needs_reconciliation());
    assert_eq!(store.plan_count(), 0);
}

#[tokio::test]
async fn create_rejects_invalid_draft_before_io() {
    let (store, orch, me) = setup();

    let mut gappy = draft(1);
    gappy.activities[2].position = 7;
    assert!(matches!(
        orch.create(&me, &gappy).await.unwrap_err(),
        ItineraryError::Validation { field: "position", .. }
    ));

    let mut out_of_range = draft(1);
    out_of_range.activities[0].day_number = 2;
    assert!(matches!(
        orch.create(&me, &out_of_range).await.unwrap_err(),
        ItineraryError::Validation { field: "day_number", .. }
    ));

    let mut empty = draft(1);
    empty.activities.clear();
    assert!(matches!(
        orch.create(&me, &empty).await.unwrap_err(),
        ItineraryError::Validation { .. }
    ));

    assert_eq!(store.plan_count(), 0);
}

#[tokio::test]
async fn out_of_range_coordinates_are_rejected_before_io() {
    let (store, orch, me) = setup();

    let mut bad_latitude = draft(1);
    bad_latitude.activities[1].latitude = 200.0;
    assert!(matches!(
        orch.create(&me, &bad_latitude).await.unwrap_err(),
        ItineraryError::Validation { field: "coordinates", .. }
    ));

    let mut bad_longitude = draft(1);
    bad_longitude.activities[2].longitude = -999.0;
    assert!(matches!(
        orch.create(&me, &bad_longitude).await.unwrap_err(),
        ItineraryError::Validation { field: "coordinates", .. }
    ));

    let mut nan = draft(1);
    nan.activities[0].latitude = f64::NAN;
    assert!(matches!(
        orch.create(&me, &nan).await.unwrap_err(),
        ItineraryError::Validation { field: "coordinates", .. }
    ));

    assert_eq!(store.plan_count(), 0);
}

// ---------------------------------------------------------------------------
// Update
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_batch_is_rejected() {
    let (_store, orch, me) = setup();
    let loaded = orch.create(&me, &draft(1)).await.unwrap();

    let err = orch.update(&me, loaded.plan.id, &[]).await.unwrap_err();
    assert!(matches!(err, ItineraryError::NoUpdatesProvided));
    assert_eq!(err.status_code(), 400);
}

#[tokio::test]
async fn duplicate_position_batch_writes_nothing() {
    let (store, orch, me) = setup();
    let loaded = orch.create(&me, &draft(1)).await.unwrap();
    let a = id_of(&loaded.activities, "d1p1");
    let b = id_of(&loaded.activities, "d1p2");

    let edits = [
        ActivityEdit { activity_id: a, day_number: 1, position: 2 },
        ActivityEdit { activity_id: b, day_number: 1, position: 2 },
    ];
    let err = orch.update(&me, loaded.plan.id, &edits).await.unwrap_err();

    assert!(matches!(
        err,
        ItineraryError::DuplicatePosition { day_number: 1, position: 2 }
    ));
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn day_beyond_duration_is_rejected_before_writes() {
    let (store, orch, me) = setup();
    let loaded = orch.create(&me, &draft(2)).await.unwrap();
    let a = id_of(&loaded.activities, "d1p1");

    let edits = [ActivityEdit { activity_id: a, day_number: 3, position: 1 }];
    let err = orch.update(&me, loaded.plan.id, &edits).await.unwrap_err();

    assert!(matches!(err, ItineraryError::Validation { field: "day_number", .. }));
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn update_swaps_positions_and_touches_plan() {
    let (store, orch, me) = setup();
    let loaded = orch.create(&me, &draft(1)).await.unwrap();
    let a = id_of(&loaded.activities, "d1p1");
    let b = id_of(&loaded.activities, "d1p2");

    let edits = [
        ActivityEdit { activity_id: a, day_number: 1, position: 2 },
        ActivityEdit { activity_id: b, day_number: 1, position: 1 },
    ];
    orch.update(&me, loaded.plan.id, &edits).await.unwrap();

    // Two updates plus the touch.
    assert_eq!(store.writes(), 3);
    let reloaded = orch.load(&me, loaded.plan.id).await.unwrap();
    let names: Vec<&str> = reloaded.activities.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["d1p2", "d1p1", "d1p3"]);
}

#[tokio::test]
async fn other_users_plan_is_forbidden_missing_plan_is_not_found() {
    let (_store, orch, me) = setup();
    let loaded = orch.create(&me, &draft(1)).await.unwrap();
    let a = id_of(&loaded.activities, "d1p1");
    let edits = [ActivityEdit { activity_id: a, day_number: 1, position: 1 }];

    let stranger = Identity::new(Uuid::new_v4());
    let err = orch.update(&stranger, loaded.plan.id, &edits).await.unwrap_err();
    assert!(matches!(err, ItineraryError::Forbidden(id) if id == loaded.plan.id));
    assert_eq!(err.status_code(), 403);

    let missing = Uuid::new_v4();
    let err = orch.update(&me, missing, &edits).await.unwrap_err();
    assert!(matches!(err, ItineraryError::NotFound(id) if id == missing));
    assert_eq!(err.status_code(), 404);
}

#[tokio::test]
async fn activity_from_another_plan_is_not_found_or_forbidden() {
    let (store, orch, me) = setup();
    let mine = orch.create(&me, &draft(1)).await.unwrap();
    let other = orch.create(&me, &draft(1)).await.unwrap();
    let foreign = id_of(&other.activities, "d1p1");

    let edits = [ActivityEdit { activity_id: foreign, day_number: 1, position: 1 }];
    let err = orch.update(&me, mine.plan.id, &edits).await.unwrap_err();

    assert!(matches!(
        err,
        ItineraryError::NotFoundOrForbidden { plan_id, activity_id }
            if plan_id == mine.plan.id && activity_id == foreign
    ));
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn mid_batch_failure_is_partial_and_keeps_earlier_writes() {
    let (store, orch, me) = setup();
    let loaded = orch.create(&me, &draft(1)).await.unwrap();
    let a = id_of(&loaded.activities, "d1p1");
    let b = id_of(&loaded.activities, "d1p2");
    let c = id_of(&loaded.activities, "d1p3");
    store.fail(|f| f.update_call = Some(2));

    let edits = [
        ActivityEdit { activity_id: a, day_number: 1, position: 3 },
        ActivityEdit { activity_id: b, day_number: 1, position: 1 },
        ActivityEdit { activity_id: c, day_number: 1, position: 2 },
    ];
    let err = orch.update(&me, loaded.plan.id, &edits).await.unwrap_err();

    match &err {
        ItineraryError::PartialUpdate { applied, total, source, .. } => {
            assert_eq!((*applied, *total), (1, 3));
            assert!(matches!(**source, ItineraryError::Store(_)));
        }
        other => panic!("expected partial update, got {other:?}"),
    }
    assert!(err.needs_reconciliation());

    // No rollback: the first write landed.
    let a_now = store
        .activities_of(loaded.plan.id)
        .into_iter()
        .find(|x| x.id == Some(a))
        .unwrap();
    assert_eq!(a_now.position, 3);
}

#[tokio::test]
async fn touch_failure_after_all_writes_is_partial() {
    let (store, orch, me) = setup();
    let loaded = orch.create(&me, &draft(1)).await.unwrap();
    let a = id_of(&loaded.activities, "d1p1");
    store.fail(|f| f.touch = true);

    let edits = [ActivityEdit { activity_id: a, day_number: 1, position: 1 }];
    let err = orch.update(&me, loaded.plan.id, &edits).await.unwrap_err();
    assert!(matches!(
        err,
        ItineraryError::PartialUpdate { applied: 1, total: 1, .. }
    ));
}

// ---------------------------------------------------------------------------
// Session save
// ---------------------------------------------------------------------------

#[tokio::test]
async fn save_session_persists_moves_and_deletes() {
    let (store, orch, me) = setup();
    let loaded = orch.create(&me, &draft(2)).await.unwrap();
    let plan_id = loaded.plan.id;

    let mut session = loaded.session();
    session.set_editing(true);
    let moved = id_of(session.activities(), "d2p3");
    let deleted = id_of(session.activities(), "d1p2");
    assert_eq!(session.move_up(moved), Ok(true));
    assert_eq!(session.delete(deleted), Ok(true));

    let saved = orch.save_session(&me, plan_id, &mut session).await.unwrap();

    assert!(!session.is_dirty());
    assert!(session.is_editing());
    assert_eq!(saved.activities.len(), 5);
    assert!(activity::is_dense(&saved.activities));
    assert!(saved.activities.iter().all(|a| a.id != Some(deleted)));

    let stored = store.activities_of(plan_id);
    let day2: Vec<(i32, String)> = {
        let mut d: Vec<_> = stored
            .iter()
            .filter(|a| a.day_number == 2)
            .map(|a| (a.position, a.name.clone()))
            .collect();
        d.sort();
        d
    };
    assert_eq!(
        day2,
        vec![
            (1, "d2p1".to_string()),
            (2, "d2p3".to_string()),
            (3, "d2p2".to_string()),
        ]
    );
}

#[tokio::test]
async fn clean_session_has_nothing_to_save() {
    let (store, orch, me) = setup();
    let loaded = orch.create(&me, &draft(1)).await.unwrap();
    let mut session = loaded.session();

    let err = orch
        .save_session(&me, loaded.plan.id, &mut session)
        .await
        .unwrap_err();
    assert!(matches!(err, ItineraryError::NoUpdatesProvided));
    assert_eq!(store.writes(), 0);
}

// ---------------------------------------------------------------------------
// Archive, list, feedback
// ---------------------------------------------------------------------------

#[tokio::test]
async fn archive_hides_plan_but_keeps_activities() {
    let (store, orch, me) = setup();
    let loaded = orch.create(&me, &draft(1)).await.unwrap();
    let plan_id = loaded.plan.id;

    orch.archive(&me, plan_id).await.unwrap();

    assert!(orch.list(&me).await.unwrap().is_empty());
    assert!(matches!(
        orch.load(&me, plan_id).await.unwrap_err(),
        ItineraryError::NotFound(_)
    ));
    assert_eq!(store.activities_of(plan_id).len(), 3);
}

#[tokio::test]
async fn archive_by_stranger_is_forbidden() {
    let (_store, orch, me) = setup();
    let loaded = orch.create(&me, &draft(1)).await.unwrap();

    let stranger = Identity::new(Uuid::new_v4());
    let err = orch.archive(&stranger, loaded.plan.id).await.unwrap_err();
    assert!(matches!(err, ItineraryError::Forbidden(_)));
    assert_eq!(orch.list(&me).await.unwrap().len(), 1);
}

#[tokio::test]
async fn list_is_newest_first_and_per_user() {
    let (_store, orch, me) = setup();
    let first = orch.create(&me, &draft(1)).await.unwrap();
    let second = orch.create(&me, &draft(2)).await.unwrap();
    orch.create(&Identity::new(Uuid::new_v4()), &draft(1))
        .await
        .unwrap();

    let ids: Vec<Uuid> = orch.list(&me).await.unwrap().iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![second.plan.id, first.plan.id]);
}

#[tokio::test]
async fn second_feedback_is_already_submitted() {
    let (_store, orch, me) = setup();
    let loaded = orch.create(&me, &draft(1)).await.unwrap();
    let verdict = NewFeedback {
        helpful: true,
        comment: Some("Great pacing.".to_string()),
    };

    let row = orch.submit_feedback(&me, loaded.plan.id, &verdict).await.unwrap();
    assert!(row.helpful);

    let err = orch
        .submit_feedback(&me, loaded.plan.id, &verdict)
        .await
        .unwrap_err();
    assert!(matches!(err, ItineraryError::AlreadySubmitted(_)));
    assert_eq!(err.status_code(), 409);

    let stored = orch.feedback(&me, loaded.plan.id).await.unwrap().unwrap();
    assert_eq!(stored.comment.as_deref(), Some("Great pacing."));
}

#[tokio::test]
async fn overlong_feedback_comment_is_rejected() {
    let (_store, orch, me) = setup();
    let loaded = orch.create(&me, &draft(1)).await.unwrap();
    let verdict = NewFeedback {
        helpful: false,
        comment: Some("x".repeat(1001)),
    };

    let err = orch
        .submit_feedback(&me, loaded.plan.id, &verdict)
        .await
        .unwrap_err();
    assert!(matches!(err, ItineraryError::Validation { field: "comment", .. }));
    assert!(orch.feedback(&me, loaded.plan.id).await.unwrap().is_none());
}
