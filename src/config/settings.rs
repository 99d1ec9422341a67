use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{EnvxError, Result};

/// Project-level configuration, loaded from `.envx.toml`.
///
/// Every field has a sensible default so envx works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// TTL used by `envelope create` when `--ttl` is not given.
    #[serde(default = "default_ttl")]
    pub default_ttl: String,

    /// Dotenv file (relative to the workspace) that supplies secrets.
    #[serde(default = "default_env_file")]
    pub env_file: String,

    /// Whether commands record entries in the audit log.
    #[serde(default = "default_audit")]
    pub audit: bool,

    /// Identity file used when `ENVX_PRIVATE_KEY` is unset.
    /// Relative paths are resolved against the workspace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<String>,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_ttl() -> String {
    "1h".to_string()
}

fn default_env_file() -> String {
    ".env".to_string()
}

fn default_audit() -> bool {
    true
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_ttl: default_ttl(),
            env_file: default_env_file(),
            audit: default_audit(),
            identity_file: None,
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the workspace root.
    pub const FILE_NAME: &'static str = ".envx.toml";

    /// Load settings from `<workdir>/.envx.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(workdir: &Path) -> Result<Self> {
        let config_path = workdir.join(Self::FILE_NAME);

        if !config_path.exists() {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            EnvxError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    /// Full path to the dotenv file.
    ///
    /// Example: `workdir/.env`
    pub fn env_file_path(&self, workdir: &Path) -> PathBuf {
        workdir.join(&self.env_file)
    }

    /// Full path to the configured identity file, if any.
    pub fn identity_path(&self, workdir: &Path) -> Option<PathBuf> {
        self.identity_file.as_ref().map(|p| workdir.join(p))
    }
}

// ── Tests ────────────────────────────────────────────────────────────
