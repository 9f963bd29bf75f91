//! In-memory edit session over one plan's activities.
//!
//! The session keeps two copies: the baseline (last loaded or saved state)
//! and the working copy that edits apply to. Dirtiness is recomputed from
//! both on every read, so there is no flag to fall out of sync.
//!
//! ```text
//!            set_editing(true)
//!   Viewing ------------------> Editing
//!      ^                           |
//!      +------- cancel() ----------+
//!      +---- set_editing(false) ---+
//! ```

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

use crate::activity::{self, Activity, ActivityEdit, DayGroup};

/// Whether the session accepts mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    Viewing,
    Editing,
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Viewing => f.write_str("viewing"),
            Self::Editing => f.write_str("editing"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("session is not in editing mode")]
    NotEditing,
}

/// Edit session for one plan or draft. Single writer; not shared.
#[derive(Debug, Clone)]
pub struct EditSession {
    baseline: Vec<Activity>,
    current: Vec<Activity>,
    mode: SessionMode,
}

impl EditSession {
    /// Session over freshly generated activities; starts in `Editing`.
    pub fn for_draft(activities: Vec<Activity>) -> Self {
        Self::new(activities, SessionMode::Editing)
    }

    /// Session over a persisted plan; starts in `Viewing`.
    pub fn for_plan(activities: Vec<Activity>) -> Self {
        Self::new(activities, SessionMode::Viewing)
    }

    fn new(activities: Vec<Activity>, mode: SessionMode) -> Self {
        let normalized = normalize(activities);
        Self {
            baseline: normalized.clone(),
            current: normalized,
            mode,
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn is_editing(&self) -> bool {
        self.mode == SessionMode::Editing
    }

    pub fn set_editing(&mut self, editing: bool) {
        self.mode = if editing {
            SessionMode::Editing
        } else {
            SessionMode::Viewing
        };
    }

    /// Working copy, in no particular order.
    pub fn activities(&self) -> &[Activity] {
        &self.current
    }

    pub fn baseline(&self) -> &[Activity] {
        &self.baseline
    }

    /// Working copy grouped by day for display.
    pub fn days(&self) -> Vec<DayGroup> {
        activity::group_by_day(&mut self.current.clone())
    }

    /// Whether the working copy differs from the baseline in membership or
    /// placement. Payload fields (name, coordinates, description) are not
    /// compared.
    pub fn is_dirty(&self) -> bool {
        self.current.len() != self.baseline.len()
            || placements(&self.current) != placements(&self.baseline)
    }

    // -- mutations ----------------------------------------------------------

    /// Swap `id` with the activity just above it in the same day.
    ///
    /// Returns `Ok(false)` if `id` is unknown or already first in its day.
    pub fn move_up(&mut self, id: Uuid) -> Result<bool, SessionError> {
        self.ensure_editing()?;
        Ok(self.swap_with_neighbour(id, Direction::Up))
    }

    /// Swap `id` with the activity just below it in the same day.
    ///
    /// Returns `Ok(false)` if `id` is unknown or already last in its day.
    pub fn move_down(&mut self, id: Uuid) -> Result<bool, SessionError> {
        self.ensure_editing()?;
        Ok(self.swap_with_neighbour(id, Direction::Down))
    }

    /// Remove `id` and close the gap it leaves. Unknown ids are a no-op.
    pub fn delete(&mut self, id: Uuid) -> Result<bool, SessionError> {
        self.ensure_editing()?;
        let Some(idx) = self.index_of(id) else {
            return Ok(false);
        };
        self.current.remove(idx);
        activity::renumber_in_place(&mut self.current);
        Ok(true)
    }

    /// Throw away every edit and leave editing mode.
    pub fn cancel(&mut self) {
        self.current = self.baseline.clone();
        self.mode = SessionMode::Viewing;
    }

    /// Adopt `new_baseline` (normally the reloaded plan) as both baseline and
    /// working copy. The editing mode is left as is.
    pub fn commit(&mut self, new_baseline: Vec<Activity>) {
        let normalized = normalize(new_baseline);
        self.baseline = normalized.clone();
        self.current = normalized;
    }

    // -- save support -------------------------------------------------------

    /// Placement of every activity in the working copy.
    pub fn pending_edits(&self) -> Vec<ActivityEdit> {
        self.current
            .iter()
            .filter_map(|a| {
                a.id.map(|activity_id| ActivityEdit {
                    activity_id,
                    day_number: a.day_number,
                    position: a.position,
                })
            })
            .collect()
    }

    /// Baseline activities no longer present in the working copy.
    pub fn removed_ids(&self) -> Vec<Uuid> {
        self.baseline
            .iter()
            .filter_map(|a| a.id)
            .filter(|id| self.index_of(*id).is_none())
            .collect()
    }

    // -- internals ----------------------------------------------------------

    fn ensure_editing(&self) -> Result<(), SessionError> {
        if self.is_editing() {
            Ok(())
        } else {
            Err(SessionError::NotEditing)
        }
    }

    fn index_of(&self, id: Uuid) -> Option<usize> {
        self.current.iter().position(|a| a.id == Some(id))
    }

    fn swap_with_neighbour(&mut self, id: Uuid, direction: Direction) -> bool {
        let Some(idx) = self.index_of(id) else {
            return false;
        };
        let (day, pos) = (self.current[idx].day_number, self.current[idx].position);

        let same_day = self
            .current
            .iter()
            .enumerate()
            .filter(|(i, a)| *i != idx && a.day_number == day);
        let neighbour = match direction {
            Direction::Up => same_day
                .filter(|(_, a)| a.position < pos)
                .max_by_key(|(_, a)| a.position),
            Direction::Down => same_day
                .filter(|(_, a)| a.position > pos)
                .min_by_key(|(_, a)| a.position),
        }
        .map(|(i, _)| i);

        let Some(other) = neighbour else {
            return false;
        };
        self.current[idx].position = self.current[other].position;
        self.current[other].position = pos;
        true
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Up,
    Down,
}

fn normalize(mut activities: Vec<Activity>) -> Vec<Activity> {
    activity::ensure_ids(&mut activities);
    activity::renumber(activities)
}

/// `(id, day, position)` triples sorted by id.
fn placements(activities: &[Activity]) -> Vec<(Option<Uuid>, i32, i32)> {
    let mut out: Vec<_> = activities
        .iter()
        .map(|a| (a.id, a.day_number, a.position))
        .collect();
    out.sort_unstable();
    out
}
