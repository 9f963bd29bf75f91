//! Itinerary lifecycle engine.
//!
//! - [`activity`]: the per-day ordering model and its density invariant.
//! - [`generate`]: turns a provider's free-form answer into a validated
//!   activity set.
//! - [`session`]: in-memory edit session with dirty tracking and revert.
//! - [`persist`]: store seam, PostgreSQL store, draft storage, and the
//!   orchestrator that sequences plan/activity writes.

pub mod activity;
pub mod error;
pub mod generate;
pub mod identity;
pub mod persist;
pub mod session;

pub use error::{GenerationError, ItineraryError};
pub use identity::Identity;
