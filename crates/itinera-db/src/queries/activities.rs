//! Database query functions for the `plan_activities` table.
//!
//! Every mutating query is scoped through the parent plan's owner and
//! archive flag, so a write aimed at someone else's plan (or at an activity
//! belonging to a different plan) simply affects zero rows.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::PlanActivity;

/// Fields supplied when inserting an activity.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub day_number: i32,
    pub position: i32,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub notes: Option<String>,
}

/// Insert all activities for a plan in a single statement.
///
/// The batch either lands completely or not at all. Rows come back ordered
/// by day and position.
pub async fn insert_activities(
    pool: &PgPool,
    plan_id: Uuid,
    activities: &[NewActivity],
) -> Result<Vec<PlanActivity>> {
    if activities.is_empty() {
        return Ok(Vec::new());
    }

    let days: Vec<i32> = activities.iter().map(|a| a.day_number).collect();
    let positions: Vec<i32> = activities.iter().map(|a| a.position).collect();
    let names: Vec<String> = activities.iter().map(|a| a.name.clone()).collect();
    let latitudes: Vec<f64> = activities.iter().map(|a| a.latitude).collect();
    let longitudes: Vec<f64> = activities.iter().map(|a| a.longitude).collect();
    let notes: Vec<Option<String>> = activities.iter().map(|a| a.notes.clone()).collect();

    let mut rows = sqlx::query_as::<_, PlanActivity>(
        "INSERT INTO plan_activities (plan_id, day_number, position, name, latitude, longitude, notes) \
         SELECT $1, t.day_number, t.position, t.name, t.latitude, t.longitude, t.notes \
         FROM UNNEST($2::int4[], $3::int4[], $4::text[], $5::float8[], $6::float8[], $7::text[]) \
              AS t(day_number, position, name, latitude, longitude, notes) \
         RETURNING *",
    )
    .bind(plan_id)
    .bind(&days)
    .bind(&positions)
    .bind(&names)
    .bind(&latitudes)
    .bind(&longitudes)
    .bind(&notes)
    .fetch_all(pool)
    .await
    .with_context(|| format!("failed to insert {} activities", activities.len()))?;

    rows.sort_by_key(|a| (a.day_number, a.position));
    Ok(rows)
}

/// List a plan's activities ordered by day, then position.
pub async fn list_activities_for_plan(pool: &PgPool, plan_id: Uuid) -> Result<Vec<PlanActivity>> {
    let rows = sqlx::query_as::<_, PlanActivity>(
        "SELECT * FROM plan_activities \
         WHERE plan_id = $1 \
         ORDER BY day_number ASC, position ASC",
    )
    .bind(plan_id)
    .fetch_all(pool)
    .await
    .context("failed to list activities for plan")?;

    Ok(rows)
}

/// Move one activity to `(day_number, position)`.
///
/// Returns the number of rows affected; 0 means the activity is not in
/// `plan_id`, or the plan is archived or not owned by `user_id`.
pub async fn update_activity_position(
    pool: &PgPool,
    user_id: Uuid,
    plan_id: Uuid,
    activity_id: Uuid,
    day_number: i32,
    position: i32,
) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE plan_activities AS a \
         SET day_number = $1, position = $2 \
         FROM plans AS p \
         WHERE a.id = $3 AND a.plan_id = $4 \
           AND p.id = a.plan_id AND p.user_id = $5 AND NOT p.is_archived",
    )
    .bind(day_number)
    .bind(position)
    .bind(activity_id)
    .bind(plan_id)
    .bind(user_id)
    .execute(pool)
    .await
    .with_context(|| format!("failed to update position of activity {activity_id}"))?;

    Ok(result.rows_affected())
}

/// Remove one activity from a plan. Same scoping and return value as
/// [`update_activity_position`].
pub async fn delete_activity(
    pool: &PgPool,
    user_id: Uuid,
    plan_id: Uuid,
    activity_id: Uuid,
) -> Result<u64> {
    let result = sqlx::query(
        "DELETE FROM plan_activities AS a \
         USING plans AS p \
         WHERE a.id = $1 AND a.plan_id = $2 \
           AND p.id = a.plan_id AND p.user_id = $3 AND NOT p.is_archived",
    )
    .bind(activity_id)
    .bind(plan_id)
    .bind(user_id)
    .execute(pool)
    .await
    .with_context(|| format!("failed to delete activity {activity_id}"))?;

    Ok(result.rows_affected())
}
