use std::env;

use thiserror::Error;

/// Longest identifier PostgreSQL keeps without truncation.
pub const MAX_DATABASE_NAME_LEN: usize = 63;

/// Why a database name cannot be used in `CREATE DATABASE`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DatabaseNameError {
    #[error("database URL has no database name")]
    Missing,
    #[error("database name {0:?} must be 1-63 ASCII letters, digits, or underscores and not start with a digit")]
    Invalid(String),
}

/// Database configuration.
///
/// Reads from the `ITINERA_DATABASE_URL` environment variable, falling back
/// to `postgresql://localhost:5432/itinera` when unset.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Full PostgreSQL connection URL.
    pub database_url: String,
}

impl DbConfig {
    /// The default connection URL used when no environment variable is set.
    pub const DEFAULT_URL: &str = "postgresql://localhost:5432/itinera";

    /// Environment variable consulted by [`DbConfig::from_env`].
    pub const ENV_VAR: &str = "ITINERA_DATABASE_URL";

    /// Build a config from the environment.
    pub fn from_env() -> Self {
        let database_url =
            env::var(Self::ENV_VAR).unwrap_or_else(|_| Self::DEFAULT_URL.to_owned());
        Self { database_url }
    }

    /// Build a config from an explicit URL (tests and CLI flags).
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    /// Extract the database name from the URL, ignoring any query string.
    ///
    /// Returns `None` if the URL has no path component.
    pub fn database_name(&self) -> Option<&str> {
        let url = self.database_url.as_str();
        let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
        let rest = rest.split_once('?').map_or(rest, |(head, _)| head);
        rest.split_once('/')
            .map(|(_, name)| name)
            .filter(|s| !s.is_empty())
    }

    /// The database name, if it can be spliced into `CREATE DATABASE`
    /// unquoted. That statement takes no bind parameters.
    pub fn creatable_database_name(&self) -> Result<&str, DatabaseNameError> {
        let name = self.database_name().ok_or(DatabaseNameError::Missing)?;
        let valid = name.len() <= MAX_DATABASE_NAME_LEN
            && !name.starts_with(|c: char| c.is_ascii_digit())
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if valid {
            Ok(name)
        } else {
            Err(DatabaseNameError::Invalid(name.to_owned()))
        }
    }

    /// URL of the `postgres` maintenance database on the same server, used
    /// to issue `CREATE DATABASE` when the target does not exist yet.
    pub fn maintenance_url(&self) -> String {
        match self.database_url.rfind('/') {
            Some(pos) => {
                let mut url = self.database_url[..pos].to_owned();
                url.push_str("/postgres");
                url
            }
            None => self.database_url.clone(),
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
