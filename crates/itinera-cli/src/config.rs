//! Configuration file management for itinera.
//!
//! Provides a TOML-based config file at `~/.config/itinera/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use itinera_core::generate::DEFAULT_TIMEOUT;
use itinera_db::config::DbConfig;

/// Environment variable that overrides the configured user id.
pub const USER_ENV_VAR: &str = "ITINERA_USER_ID";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    pub user: UserSection,
    #[serde(default)]
    pub generation: GenerationSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserSection {
    pub id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationSection {
    #[serde(default = "default_claude_binary")]
    pub claude_binary: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

fn default_claude_binary() -> String {
    "claude".to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

impl Default for GenerationSection {
    fn default() -> Self {
        Self {
            claude_binary: default_claude_binary(),
            timeout_secs: default_timeout_secs(),
            model: None,
        }
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the itinera config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/itinera` or `~/.config/itinera`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("itinera");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("itinera")
}

/// Return the path to the itinera config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Directory holding per-user draft files:
/// `$XDG_DATA_HOME/itinera/drafts` or `~/.local/share/itinera/drafts`.
pub fn draft_dir() -> PathBuf {
    let base = match std::env::var("XDG_DATA_HOME") {
        Ok(xdg) => PathBuf::from(xdg),
        Err(_) => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".local")
            .join("share"),
    };
    base.join("itinera").join("drafts")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    // Owner read/write only.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct ItineraConfig {
    pub db_config: DbConfig,
    pub user_id: Uuid,
    pub claude_binary: String,
    pub model: Option<String>,
    pub generation_timeout: Duration,
    pub draft_dir: PathBuf,
}

impl ItineraConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `ITINERA_DATABASE_URL` env > `database.url` > `DbConfig::DEFAULT_URL`
    /// - User: `cli_user` > `ITINERA_USER_ID` env > `user.id` > error
    /// - Generation settings come from the `[generation]` section or defaults.
    pub fn resolve(cli_db_url: Option<&str>, cli_user: Option<&str>) -> Result<Self> {
        let file_config = load_config().ok();

        let db_url = if let Some(url) = cli_db_url {
            url.to_string()
        } else if let Ok(url) = std::env::var(DbConfig::ENV_VAR) {
            url
        } else if let Some(ref cfg) = file_config {
            cfg.database.url.clone()
        } else {
            DbConfig::DEFAULT_URL.to_string()
        };

        let user_id = if let Some(raw) = cli_user {
            parse_user_id(raw).context("invalid --user")?
        } else if let Ok(raw) = std::env::var(USER_ENV_VAR) {
            parse_user_id(&raw).with_context(|| format!("invalid {USER_ENV_VAR}"))?
        } else if let Some(ref cfg) = file_config {
            cfg.user.id
        } else {
            bail!(
                "user identity not found; set {USER_ENV_VAR} or run `itinera init` to create a config file"
            );
        };

        let generation = file_config
            .map(|cfg| cfg.generation)
            .unwrap_or_default();

        Ok(Self {
            db_config: DbConfig::new(db_url),
            user_id,
            claude_binary: generation.claude_binary,
            model: generation.model,
            generation_timeout: Duration::from_secs(generation.timeout_secs),
            draft_dir: draft_dir(),
        })
    }
}

fn parse_user_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw.trim()).with_context(|| format!("{raw:?} is not a UUID"))
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------
