//! Parsing and validation of provider answers.
//!
//! The provider answers in free text that should embed one JSON array of
//! activity objects. Field names vary between answers, so each field is
//! looked up under a fixed list of aliases.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use super::request::ItineraryRequest;
use crate::activity::{self, Activity, MAX_LATITUDE, MAX_LONGITUDE};
use crate::error::GenerationError;

/// Exact answer (after trimming) by which the provider declines a request.
pub const REQUEST_REJECTED: &str = "REQUEST_REJECTED";

const DAY_KEYS: &[&str] = &["dayNumber", "day_number", "day"];
const POSITION_KEYS: &[&str] = &["position", "order"];
const NAME_KEYS: &[&str] = &["name", "title"];
const LATITUDE_KEYS: &[&str] = &["latitude", "lat"];
const LONGITUDE_KEYS: &[&str] = &["longitude", "lng", "lon"];
const DESCRIPTION_KEYS: &[&str] = &["description", "notes"];

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// Return the first balanced `[...]` substring of `text`.
///
/// Brackets inside JSON string literals (including escaped quotes) do not
/// count. Returns `None` if there is no `[` or the first one never closes.
pub fn extract_json_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let bytes = text.as_bytes();

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Parse a raw provider answer into a dense activity set for `request`.
///
/// All-or-nothing: the first invalid element fails the whole answer.
/// Returned activities carry no identifiers yet.
pub fn parse_response(
    raw: &str,
    request: &ItineraryRequest,
) -> Result<Vec<Activity>, GenerationError> {
    if raw.trim() == REQUEST_REJECTED {
        return Err(GenerationError::RequestRejected);
    }

    let candidate = extract_json_array(raw).ok_or_else(|| GenerationError::MalformedResponse {
        reason: "no JSON array found".to_string(),
    })?;

    let elements: Vec<Value> =
        serde_json::from_str(candidate).map_err(|e| GenerationError::MalformedResponse {
            reason: format!("invalid JSON array: {e}"),
        })?;

    if elements.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }

    let activities = elements
        .iter()
        .enumerate()
        .map(|(index, value)| parse_activity(index, value, request))
        .collect::<Result<Vec<_>, _>>()?;

    check_volume(&activities, request)?;

    Ok(activity::renumber(activities))
}

fn parse_activity(
    index: usize,
    value: &Value,
    request: &ItineraryRequest,
) -> Result<Activity, GenerationError> {
    let obj = value
        .as_object()
        .ok_or_else(|| invalid(index, "activity", Some(value)))?;

    let day_number = int_in_range(obj, index, "day_number", DAY_KEYS, 1, request.duration_days)?;
    let position = int_in_range(
        obj,
        index,
        "position",
        POSITION_KEYS,
        1,
        request.activities_per_day(),
    )?;

    let name = match lookup(obj, NAME_KEYS) {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        other => return Err(invalid(index, "name", other)),
    };

    let latitude = float_in_range(obj, index, "latitude", LATITUDE_KEYS, MAX_LATITUDE)?;
    let longitude = float_in_range(obj, index, "longitude", LONGITUDE_KEYS, MAX_LONGITUDE)?;

    let description = match lookup(obj, DESCRIPTION_KEYS) {
        None => None,
        Some(Value::String(s)) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Some(other) => return Err(invalid(index, "description", Some(other))),
    };

    Ok(Activity {
        id: None,
        day_number,
        position,
        name,
        latitude,
        longitude,
        description,
    })
}

/// Every day of the trip must hold exactly `activities_per_day` entries.
fn check_volume(
    activities: &[Activity],
    request: &ItineraryRequest,
) -> Result<(), GenerationError> {
    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for a in activities {
        *counts.entry(a.day_number).or_default() += 1;
    }

    let expected = request.activities_per_day() as usize;
    for day_number in 1..=request.duration_days {
        let actual = counts.get(&day_number).copied().unwrap_or(0);
        if actual != expected {
            return Err(GenerationError::ActivityCountMismatch {
                day_number,
                expected,
                actual,
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

/// First non-null value stored under any of `keys`.
fn lookup<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

fn invalid(index: usize, field: &'static str, value: Option<&Value>) -> GenerationError {
    GenerationError::InvalidActivityField {
        index,
        field,
        value: value.map_or_else(|| "missing".to_string(), Value::to_string),
    }
}

/// Integral JSON number; `3.0` counts, `3.5` does not.
fn as_integer(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && f.fract() == 0.0)
            .map(|f| f as i64)
    })
}

fn int_in_range(
    obj: &Map<String, Value>,
    index: usize,
    field: &'static str,
    keys: &[&str],
    min: i32,
    max: i32,
) -> Result<i32, GenerationError> {
    let value = lookup(obj, keys);
    value
        .and_then(as_integer)
        .filter(|n| (i64::from(min)..=i64::from(max)).contains(n))
        .map(|n| n as i32)
        .ok_or_else(|| invalid(index, field, value))
}

fn float_in_range(
    obj: &Map<String, Value>,
    index: usize,
    field: &'static str,
    keys: &[&str],
    bound: f64,
) -> Result<f64, GenerationError> {
    let value = lookup(obj, keys);
    value
        .and_then(Value::as_f64)
        .filter(|f| activity::within(*f, bound))
        .ok_or_else(|| invalid(index, field, value))
}
