//! Query functions, one module per table.

pub mod activities;
pub mod feedback;
pub mod plans;

/// Whether `err` (or anything in its context chain) is a PostgreSQL unique
/// constraint violation.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<sqlx::Error>()
            .and_then(|e| e.as_database_error())
            .is_some_and(|db| db.is_unique_violation())
    })
}
