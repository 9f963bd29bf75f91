use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Lifecycle status of a plan.
///
/// `Draft` exists only in client-side storage; rows written to `plans` start
/// out `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Draft,
    Active,
    Archived,
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Archived => "archived",
        };
        f.write_str(s)
    }
}

impl FromStr for PlanStatus {
    type Err = PlanStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "active" => Ok(Self::Active),
            "archived" => Ok(Self::Archived),
            other => Err(PlanStatusParseError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`PlanStatus`] string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid plan status: {0:?}")]
pub struct PlanStatusParseError(pub String);

// ---------------------------------------------------------------------------

/// How packed each day of the trip is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TripIntensity {
    FullDay,
    HalfDay,
}

impl TripIntensity {
    /// Number of activities scheduled on each day.
    pub fn activities_per_day(self) -> i32 {
        match self {
            Self::FullDay => 5,
            Self::HalfDay => 3,
        }
    }

    /// Human-readable label ("full day" / "half day").
    pub fn label(self) -> &'static str {
        match self {
            Self::FullDay => "full day",
            Self::HalfDay => "half day",
        }
    }
}

impl fmt::Display for TripIntensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::FullDay => "full_day",
            Self::HalfDay => "half_day",
        };
        f.write_str(s)
    }
}

impl FromStr for TripIntensity {
    type Err = TripIntensityParseError;

    /// Accepts the stored form (`full_day`) as well as the spaced and
    /// hyphenated spellings users type (`full day`, `full-day`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "full_day" => Ok(Self::FullDay),
            "half_day" => Ok(Self::HalfDay),
            _ => Err(TripIntensityParseError(s.to_owned())),
        }
    }
}

/// Error returned when parsing an invalid [`TripIntensity`] string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid trip intensity: {0:?} (expected full_day or half_day)")]
pub struct TripIntensityParseError(pub String);

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

/// A persisted itinerary plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Plan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub city_id: Uuid,
    pub duration_days: i32,
    pub trip_intensity: TripIntensity,
    pub notes: Option<String>,
    pub status: PlanStatus,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One scheduled activity row in `plan_activities`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PlanActivity {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub day_number: i32,
    pub position: i32,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub notes: Option<String>,
}

/// A user's verdict on a plan. At most one per `(plan_id, user_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PlanFeedback {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub user_id: Uuid,
    pub helpful: bool,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
