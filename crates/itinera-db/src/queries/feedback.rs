//! Database query functions for the `plan_feedback` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::PlanFeedback;

/// Record a user's feedback on a plan.
///
/// A second insert for the same `(plan_id, user_id)` fails with a unique
/// violation; detect it with [`super::is_unique_violation`].
pub async fn insert_feedback(
    pool: &PgPool,
    plan_id: Uuid,
    user_id: Uuid,
    helpful: bool,
    comment: Option<&str>,
) -> Result<PlanFeedback> {
    let feedback = sqlx::query_as::<_, PlanFeedback>(
        "INSERT INTO plan_feedback (plan_id, user_id, helpful, comment) \
         VALUES ($1, $2, $3, $4) \
         RETURNING *",
    )
    .bind(plan_id)
    .bind(user_id)
    .bind(helpful)
    .bind(comment)
    .fetch_one(pool)
    .await
    .context("failed to insert plan feedback")?;

    Ok(feedback)
}

/// Fetch the feedback a user left on a plan, if any.
pub async fn get_feedback(
    pool: &PgPool,
    plan_id: Uuid,
    user_id: Uuid,
) -> Result<Option<PlanFeedback>> {
    let feedback = sqlx::query_as::<_, PlanFeedback>(
        "SELECT * FROM plan_feedback WHERE plan_id = $1 AND user_id = $2",
    )
    .bind(plan_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("failed to fetch plan feedback")?;

    Ok(feedback)
}
