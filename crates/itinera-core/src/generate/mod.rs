//! Draft generation adapter.
//!
//! Turns an [`ItineraryRequest`] into a validated, dense activity set:
//!
//! ```text
//! ItineraryRequest --validate--> build_prompt --> GenerationProvider::complete
//!                                                   |  (deadline: timeout)
//!                                                   v
//!                          parse_response: sentinel? -> first [...] -> fields
//!                                                   |
//!                                                   v
//!                                   volume check -> renumber -> Vec<Activity>
//! ```
//!
//! Provider output is free text. Nothing here retries; every failure comes
//! back as one [`crate::GenerationError`] wrapped in
//! [`crate::ItineraryError::GenerationFailed`].

pub mod adapter;
pub mod parser;
pub mod prompt;
pub mod provider;
pub mod request;

pub use adapter::{DEFAULT_TIMEOUT, DraftGenerator};
pub use parser::{REQUEST_REJECTED, extract_json_array, parse_response};
pub use prompt::build_prompt;
pub use provider::{ClaudeCliProvider, GenerationProvider};
pub use request::ItineraryRequest;
