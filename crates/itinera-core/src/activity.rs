//! Activity ordering model.
//!
//! An activity belongs to exactly one day and holds a 1-based position
//! within that day. Within a day, positions are dense: `1..=n` with no gaps
//! or duplicates. [`renumber`] restores that after a deletion;
//! [`group_by_day`] presents activities day by day in position order.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use itinera_db::models::PlanActivity;

/// Largest absolute latitude, in degrees.
pub const MAX_LATITUDE: f64 = 90.0;
/// Largest absolute longitude, in degrees.
pub const MAX_LONGITUDE: f64 = 180.0;

/// Whether `value` lies in `[-bound, bound]`. NaN never does.
pub fn within(value: f64, bound: f64) -> bool {
    (-bound..=bound).contains(&value)
}

/// One scheduled item within a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// `None` until the activity is persisted or grouped for the first time.
    pub id: Option<Uuid>,
    pub day_number: i32,
    pub position: i32,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub description: Option<String>,
}

impl Activity {
    /// Google Maps search link for the activity's coordinates.
    pub fn maps_url(&self) -> String {
        format!(
            "https://www.google.com/maps/search/?api=1&query={},{}",
            self.latitude, self.longitude
        )
    }

    /// Latitude and longitude both fall inside their valid ranges.
    pub fn has_valid_coordinates(&self) -> bool {
        within(self.latitude, MAX_LATITUDE) && within(self.longitude, MAX_LONGITUDE)
    }

    fn has_id(&self) -> bool {
        self.id.is_some_and(|id| !id.is_nil())
    }
}

impl From<PlanActivity> for Activity {
    fn from(row: PlanActivity) -> Self {
        Self {
            id: Some(row.id),
            day_number: row.day_number,
            position: row.position,
            name: row.name,
            latitude: row.latitude,
            longitude: row.longitude,
            description: row.notes,
        }
    }
}

/// A requested placement for one persisted activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEdit {
    pub activity_id: Uuid,
    pub day_number: i32,
    pub position: i32,
}

/// The activities scheduled on one day, in position order.
#[derive(Debug, Clone, PartialEq)]
pub struct DayGroup {
    pub day_number: i32,
    pub activities: Vec<Activity>,
}

/// Give every activity lacking an identifier (absent or nil) a fresh one.
///
/// Returns how many identifiers were assigned.
pub fn ensure_ids(activities: &mut [Activity]) -> usize {
    let mut assigned = 0;
    for activity in activities.iter_mut().filter(|a| !a.has_id()) {
        activity.id = Some(Uuid::new_v4());
        assigned += 1;
    }
    assigned
}

/// Group activities by day, days ascending, each day sorted by position.
///
/// Input order does not matter. Activities without an identifier are given
/// one in place first, so the caller's copy keeps the same ids across
/// repeated groupings.
pub fn group_by_day(activities: &mut [Activity]) -> Vec<DayGroup> {
    ensure_ids(activities);

    let mut days: BTreeMap<i32, Vec<Activity>> = BTreeMap::new();
    for activity in activities.iter() {
        days.entry(activity.day_number)
            .or_default()
            .push(activity.clone());
    }

    days.into_iter()
        .map(|(day_number, mut activities)| {
            activities.sort_by_key(|a| a.position);
            DayGroup {
                day_number,
                activities,
            }
        })
        .collect()
}

/// Reassign positions `1..=n` within every day, keeping the existing
/// relative order (ties keep their input order).
///
/// Array order is left untouched; only `position` values change. Dense input
/// comes back unchanged.
pub fn renumber(mut activities: Vec<Activity>) -> Vec<Activity> {
    renumber_in_place(&mut activities);
    activities
}

pub(crate) fn renumber_in_place(activities: &mut [Activity]) {
    let mut order: Vec<usize> = (0..activities.len()).collect();
    // Stable: equal (day, position) keeps input order.
    order.sort_by_key(|&i| (activities[i].day_number, activities[i].position));

    let mut next: HashMap<i32, i32> = HashMap::new();
    for i in order {
        let slot = next.entry(activities[i].day_number).or_insert(0);
        *slot += 1;
        activities[i].position = *slot;
    }
}

/// Whether every day's positions are exactly `1..=n`.
pub fn is_dense(activities: &[Activity]) -> bool {
    let mut per_day: HashMap<i32, Vec<i32>> = HashMap::new();
    for a in activities {
        per_day.entry(a.day_number).or_default().push(a.position);
    }
    per_day.into_values().all(|mut positions| {
        positions.sort_unstable();
        positions.iter().copied().eq(1..=positions.len() as i32)
    })
}
