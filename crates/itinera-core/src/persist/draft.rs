//! Session-scoped draft storage.
//!
//! A draft is a generated itinerary that has not been saved as a plan yet.
//! It lives as one JSON file per user under the draft directory and is
//! removed once the plan is persisted or the user discards it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::activity::Activity;
use crate::generate::ItineraryRequest;
use crate::session::EditSession;

/// A generated, not yet persisted itinerary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    pub request: ItineraryRequest,
    pub activities: Vec<Activity>,
    pub created_at: DateTime<Utc>,
}

impl Draft {
    pub fn new(request: ItineraryRequest, activities: Vec<Activity>) -> Self {
        Self {
            request,
            activities,
            created_at: Utc::now(),
        }
    }

    /// Open an editing session over the draft's activities.
    pub fn session(&self) -> EditSession {
        EditSession::for_draft(self.activities.clone())
    }

    /// Replace the activities with the session's working copy.
    pub fn apply(&mut self, session: &EditSession) {
        self.activities = session.activities().to_vec();
    }
}

/// One draft per user, stored as `<dir>/<user_id>.json`.
#[derive(Debug, Clone)]
pub struct DraftStore {
    dir: PathBuf,
}

impl DraftStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, user_id: Uuid) -> PathBuf {
        self.dir.join(format!("{user_id}.json"))
    }

    /// Write `draft`, replacing any previous one for `user_id`.
    pub fn save(&self, user_id: Uuid, draft: &Draft) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create draft directory {}", self.dir.display()))?;

        let path = self.path_for(user_id);
        let tmp = path.with_extension("json.tmp");
        let contents = serde_json::to_string_pretty(draft).context("failed to serialize draft")?;
        std::fs::write(&tmp, contents)
            .with_context(|| format!("failed to write draft to {}", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("failed to move draft into {}", path.display()))?;

        debug!(%user_id, path = %path.display(), "draft saved");
        Ok(path)
    }

    /// Load the user's draft, or `None` if there is none.
    pub fn load(&self, user_id: Uuid) -> Result<Option<Draft>> {
        let path = self.path_for(user_id);
        let contents = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read draft at {}", path.display()));
            }
        };
        let draft = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse draft at {}", path.display()))?;
        Ok(Some(draft))
    }

    /// Remove the user's draft. Returns whether one existed.
    pub fn discard(&self, user_id: Uuid) -> Result<bool> {
        let path = self.path_for(user_id);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(%user_id, "draft discarded");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => {
                Err(e).with_context(|| format!("failed to remove draft at {}", path.display()))
            }
        }
    }
}
