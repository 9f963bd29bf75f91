//! Database query functions for the `plans` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Plan, TripIntensity};

/// Fields supplied when inserting a plan. Everything else is server-side
/// default (id, status, timestamps).
#[derive(Debug, Clone)]
pub struct NewPlan {
    pub user_id: Uuid,
    pub city_id: Uuid,
    pub duration_days: i32,
    pub trip_intensity: TripIntensity,
    pub notes: Option<String>,
}

/// Insert a new plan row and return it with server-generated defaults.
pub async fn insert_plan(pool: &PgPool, new: &NewPlan) -> Result<Plan> {
    let plan = sqlx::query_as::<_, Plan>(
        "INSERT INTO plans (user_id, city_id, duration_days, trip_intensity, notes) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING *",
    )
    .bind(new.user_id)
    .bind(new.city_id)
    .bind(new.duration_days)
    .bind(new.trip_intensity)
    .bind(&new.notes)
    .fetch_one(pool)
    .await
    .context("failed to insert plan")?;

    Ok(plan)
}

/// Fetch a plan by its ID regardless of owner or archive flag.
///
/// Callers decide visibility; see [`list_plans_for_user`] for the filtered
/// listing.
pub async fn get_plan(pool: &PgPool, id: Uuid) -> Result<Option<Plan>> {
    let plan = sqlx::query_as::<_, Plan>("SELECT * FROM plans WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch plan")?;

    Ok(plan)
}

/// List a user's non-archived plans, newest first.
pub async fn list_plans_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Plan>> {
    let plans = sqlx::query_as::<_, Plan>(
        "SELECT * FROM plans \
         WHERE user_id = $1 AND NOT is_archived \
         ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("failed to list plans")?;

    Ok(plans)
}

/// Bump `updated_at` on a visible plan owned by `user_id`.
///
/// Returns the number of rows affected (0 when the plan is missing,
/// archived, or owned by someone else).
pub async fn touch_plan(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE plans SET updated_at = now() \
         WHERE id = $1 AND user_id = $2 AND NOT is_archived",
    )
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await
    .context("failed to touch plan")?;

    Ok(result.rows_affected())
}

/// Soft-delete a plan: hide it from listings and mark it `archived`.
///
/// Activities are left in place. Returns the number of rows affected.
pub async fn archive_plan(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE plans \
         SET is_archived = true, status = 'archived', updated_at = now() \
         WHERE id = $1 AND user_id = $2 AND NOT is_archived",
    )
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await
    .context("failed to archive plan")?;

    Ok(result.rows_affected())
}
