//! Persistence: the store seam, its PostgreSQL implementation, draft files,
//! and the orchestrator that sequences writes.

pub mod draft;
pub mod orchestrator;
pub mod pg;
pub mod store;

pub use draft::{Draft, DraftStore};
pub use orchestrator::{LoadedPlan, PlanOrchestrator};
pub use pg::PgPlanStore;
pub use store::{NewFeedback, PlanStore, StoreError};
