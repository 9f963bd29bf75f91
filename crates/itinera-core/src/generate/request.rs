use serde::{Deserialize, Serialize};
use uuid::Uuid;

use itinera_db::models::TripIntensity;
use itinera_db::queries::plans::NewPlan;

use crate::error::ItineraryError;

pub const MIN_DURATION_DAYS: i32 = 1;
pub const MAX_DURATION_DAYS: i32 = 5;
pub const MAX_NOTES_CHARS: usize = 500;

/// What the user asked for: where, how long, how packed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryRequest {
    pub city_id: Uuid,
    pub city_name: String,
    pub duration_days: i32,
    pub trip_intensity: TripIntensity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_notes: Option<String>,
}

impl ItineraryRequest {
    /// Check the request before any provider or store call.
    pub fn validate(&self) -> Result<(), ItineraryError> {
        if self.city_name.trim().is_empty() {
            return Err(ItineraryError::validation(
                "city_name",
                "must not be empty",
            ));
        }
        if !(MIN_DURATION_DAYS..=MAX_DURATION_DAYS).contains(&self.duration_days) {
            return Err(ItineraryError::validation(
                "duration_days",
                format!(
                    "must be between {MIN_DURATION_DAYS} and {MAX_DURATION_DAYS}, got {}",
                    self.duration_days
                ),
            ));
        }
        if let Some(notes) = &self.user_notes {
            let len = notes.chars().count();
            if len > MAX_NOTES_CHARS {
                return Err(ItineraryError::validation(
                    "user_notes",
                    format!("must be at most {MAX_NOTES_CHARS} characters, got {len}"),
                ));
            }
        }
        Ok(())
    }

    pub fn activities_per_day(&self) -> i32 {
        self.trip_intensity.activities_per_day()
    }

    /// Total number of activities a valid answer contains.
    pub fn expected_total(&self) -> usize {
        (self.duration_days.max(0) * self.activities_per_day()) as usize
    }

    /// Notes with surrounding whitespace removed; blank notes count as none.
    pub fn notes(&self) -> Option<&str> {
        self.user_notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }

    /// Row fields for persisting this request as a plan owned by `user_id`.
    pub(crate) fn to_new_plan(&self, user_id: Uuid) -> NewPlan {
        NewPlan {
            user_id,
            city_id: self.city_id,
            duration_days: self.duration_days,
            trip_intensity: self.trip_intensity,
            notes: self.notes().map(str::to_string),
        }
    }
}
