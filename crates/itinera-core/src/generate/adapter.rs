use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::parser::parse_response;
use super::prompt::build_prompt;
use super::provider::GenerationProvider;
use super::request::ItineraryRequest;
use crate::activity::Activity;
use crate::error::{GenerationError, ItineraryError};

/// Deadline for one provider call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Produces validated activity sets from a [`GenerationProvider`].
///
/// One provider call per [`generate`](Self::generate); no retries.
#[derive(Clone)]
pub struct DraftGenerator {
    provider: Arc<dyn GenerationProvider>,
    timeout: Duration,
}

impl std::fmt::Debug for DraftGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftGenerator")
            .field("provider", &self.provider.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl DraftGenerator {
    pub fn new(provider: Arc<dyn GenerationProvider>) -> Self {
        Self {
            provider,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Validate `request`, ask the provider, and parse its answer.
    ///
    /// The result is dense per day and holds exactly
    /// `duration_days * activities_per_day` activities, none with an id.
    pub async fn generate(
        &self,
        request: &ItineraryRequest,
    ) -> Result<Vec<Activity>, ItineraryError> {
        request.validate()?;

        let prompt = build_prompt(request);
        let provider = self.provider.name();
        info!(
            provider,
            city = %request.city_name,
            duration_days = request.duration_days,
            trip_intensity = %request.trip_intensity,
            "requesting itinerary"
        );

        let raw = match tokio::time::timeout(self.timeout, self.provider.complete(&prompt)).await
        {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                warn!(provider, error = %format!("{e:#}"), "provider call failed");
                return Err(GenerationError::Provider(e).into());
            }
            Err(_) => {
                warn!(provider, timeout = ?self.timeout, "provider timed out");
                return Err(GenerationError::Timeout(self.timeout).into());
            }
        };

        match parse_response(&raw, request) {
            Ok(activities) => {
                info!(provider, count = activities.len(), "itinerary generated");
                Ok(activities)
            }
            Err(e) => {
                warn!(provider, error = %e, response_len = raw.len(), "rejected provider answer");
                Err(e.into())
            }
        }
    }
}
