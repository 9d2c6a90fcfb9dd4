//! User-wide configuration.
//!
//! The file lives at `~/.depwatch/config.toml` (`%LOCALAPPDATA%\depwatch\config.toml`
//! on Windows) unless `--config` or `DEPWATCH_CONFIG` points elsewhere. Every
//! field is optional; a missing file yields the defaults.
//!
//! ```toml
//! recent_days = 365
//! warn_on_archived = true
//! github_token = "ghp_xxxxxxxxxxxx"
//! max_parallel = 16
//! cache_path = "~/.cache/depwatch/http-cache.bin"
//! exclude = ["third_party/**", "**/testdata/**"]
//!
//! [endpoints]
//! github = "https://github.example.com/api/v3"
//! ```

use crate::constants::{DEFAULT_MAX_PARALLEL, DEFAULT_RECENT_DAYS, HTTP_CACHE_FILE_NAME};
use crate::core::DepwatchError;
use crate::registry::Endpoints;
use crate::utils::fs::atomic_write;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Global configuration loaded from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GlobalConfig {
    /// Days of inactivity after which a dependency is reported as stale.
    pub recent_days: i64,

    /// Report archived repositories and end-of-life runtimes as warnings.
    pub warn_on_archived: bool,

    /// GitHub API token. `GITHUB_TOKEN` and `--token` take precedence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,

    /// Maximum number of enrichment tasks in flight.
    pub max_parallel: usize,

    /// Override for the HTTP cache file. `~` and environment variables are
    /// expanded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<String>,

    /// Glob patterns excluded from discovery, relative to the scan root.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,

    /// Registry base URLs.
    pub endpoints: Endpoints,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            recent_days: DEFAULT_RECENT_DAYS,
            warn_on_archived: true,
            github_token: None,
            max_parallel: DEFAULT_MAX_PARALLEL,
            cache_path: None,
            exclude: Vec::new(),
            endpoints: Endpoints::default(),
        }
    }
}

impl GlobalConfig {
    /// Load from the default location, or return defaults if the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the default path cannot be determined, or the file
    /// exists but cannot be read, parsed, or validated.
    pub async fn load() -> Result<Self> {
        Self::load_with_optional(None).await
    }

    /// Load from `path` when given, else from the default location.
    ///
    /// A missing file yields the defaults either way.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed, or
    /// validated.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        if path.exists() {
            Self::load_from(&path).await
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// holds out-of-range values.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read global config from {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse global config from {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Write the configuration to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize global config")?;
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || atomic_write(&path, content.as_bytes()))
            .await
            .context("Config write task panicked")?
    }

    /// Reject values the scan cannot run with.
    pub fn validate(&self) -> Result<(), DepwatchError> {
        if self.max_parallel == 0 {
            return Err(DepwatchError::ConfigError {
                message: "max_parallel must be at least 1".to_string(),
            });
        }
        if self.recent_days < 0 {
            return Err(DepwatchError::ConfigError {
                message: format!("recent_days must not be negative (got {})", self.recent_days),
            });
        }
        Ok(())
    }

    /// Default config file location.
    ///
    /// # Errors
    ///
    /// Returns an error if the home (or local data) directory is unknown.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("depwatch")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".depwatch")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// Location of the persisted HTTP cache.
    ///
    /// Uses `cache_path` when set, else `<data_local_dir>/depwatch/http-cache.bin`.
    ///
    /// # Errors
    ///
    /// Returns an error if `cache_path` cannot be expanded or no data directory
    /// exists.
    pub fn http_cache_path(&self) -> Result<PathBuf> {
        if let Some(custom) = &self.cache_path {
            let expanded = shellexpand::full(custom)
                .with_context(|| format!("Failed to expand cache_path '{custom}'"))?;
            return Ok(PathBuf::from(expanded.as_ref()));
        }
        default_cache_path()
    }
}

/// Default HTTP cache file under the per-user data directory.
///
/// # Errors
///
/// Returns an error if the platform has no local data directory.
pub fn default_cache_path() -> Result<PathBuf> {
    let data_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?;
    Ok(data_dir.join("depwatch").join(HTTP_CACHE_FILE_NAME))
}
