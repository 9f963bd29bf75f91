//! PostgreSQL implementation of [`PlanStore`] over `itinera-db` queries.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use itinera_db::models::{Plan, PlanFeedback};
use itinera_db::queries::activities::{self, NewActivity};
use itinera_db::queries::plans::{self, NewPlan};
use itinera_db::queries::{feedback, is_unique_violation};

use super::store::{NewFeedback, PlanStore, StoreError};
use crate::activity::{Activity, ActivityEdit};

#[derive(Debug, Clone)]
pub struct PgPlanStore {
    pool: PgPool,
}

impl PgPlanStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Explain why a plan-scoped write matched nothing.
    async fn classify_miss(&self, user_id: Uuid, plan_id: Uuid) -> StoreError {
        match self.fetch_plan(user_id, plan_id).await {
            Ok(_) => StoreError::NotFound,
            Err(e) => e,
        }
    }
}

impl From<&Activity> for NewActivity {
    fn from(a: &Activity) -> Self {
        Self {
            day_number: a.day_number,
            position: a.position,
            name: a.name.clone(),
            latitude: a.latitude,
            longitude: a.longitude,
            notes: a.description.clone(),
        }
    }
}

#[async_trait]
impl PlanStore for PgPlanStore {
    async fn insert_plan(&self, plan: &NewPlan) -> Result<Plan, StoreError> {
        Ok(plans::insert_plan(&self.pool, plan).await?)
    }

    async fn insert_activities(
        &self,
        plan_id: Uuid,
        activities: &[Activity],
    ) -> Result<Vec<Activity>, StoreError> {
        let rows: Vec<NewActivity> = activities.iter().map(NewActivity::from).collect();
        let stored = activities::insert_activities(&self.pool, plan_id, &rows).await?;
        Ok(stored.into_iter().map(Activity::from).collect())
    }

    async fn fetch_plan(&self, user_id: Uuid, plan_id: Uuid) -> Result<Plan, StoreError> {
        match plans::get_plan(&self.pool, plan_id).await? {
            None => Err(StoreError::NotFound),
            Some(plan) if plan.is_archived => Err(StoreError::NotFound),
            Some(plan) if plan.user_id != user_id => {
                debug!(%plan_id, %user_id, "plan owned by another user");
                Err(StoreError::Forbidden)
            }
            Some(plan) => Ok(plan),
        }
    }

    async fn list_plans(&self, user_id: Uuid) -> Result<Vec<Plan>, StoreError> {
        Ok(plans::list_plans_for_user(&self.pool, user_id).await?)
    }

    async fn list_activities(&self, plan_id: Uuid) -> Result<Vec<Activity>, StoreError> {
        let rows = activities::list_activities_for_plan(&self.pool, plan_id).await?;
        Ok(rows.into_iter().map(Activity::from).collect())
    }

    async fn update_activity(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        edit: &ActivityEdit,
    ) -> Result<bool, StoreError> {
        let affected = activities::update_activity_position(
            &self.pool,
            user_id,
            plan_id,
            edit.activity_id,
            edit.day_number,
            edit.position,
        )
        .await?;
        Ok(affected > 0)
    }

    async fn delete_activity(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        activity_id: Uuid,
    ) -> Result<bool, StoreError> {
        let affected =
            activities::delete_activity(&self.pool, user_id, plan_id, activity_id).await?;
        Ok(affected > 0)
    }

    async fn touch_plan(&self, user_id: Uuid, plan_id: Uuid) -> Result<(), StoreError> {
        if plans::touch_plan(&self.pool, plan_id, user_id).await? == 0 {
            return Err(self.classify_miss(user_id, plan_id).await);
        }
        Ok(())
    }

    async fn archive_plan(&self, user_id: Uuid, plan_id: Uuid) -> Result<(), StoreError> {
        if plans::archive_plan(&self.pool, plan_id, user_id).await? == 0 {
            return Err(self.classify_miss(user_id, plan_id).await);
        }
        Ok(())
    }

    async fn insert_feedback(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        new: &NewFeedback,
    ) -> Result<PlanFeedback, StoreError> {
        feedback::insert_feedback(
            &self.pool,
            plan_id,
            user_id,
            new.helpful,
            new.comment.as_deref(),
        )
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::UniqueViolation
            } else {
                StoreError::Backend(e)
            }
        })
    }

    async fn get_feedback(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
    ) -> Result<Option<PlanFeedback>, StoreError> {
        Ok(feedback::get_feedback(&self.pool, plan_id, user_id).await?)
    }
}
