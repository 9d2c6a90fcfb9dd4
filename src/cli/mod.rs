//! Command-line interface for depwatch.
//!
//! # Commands
//!
//! - `scan [PATH]` - find manifests below `PATH` and report stale, archived
//!   or end-of-life dependencies
//! - `cache info` - show where the HTTP cache lives and how big it is
//! - `cache clean` - delete the HTTP cache file
//!
//! # Global Options
//!
//! - `--verbose` - debug logging
//! - `--quiet` - errors only
//! - `--config` - alternative `config.toml` (also `DEPWATCH_CONFIG`)
//!
//! # Settings precedence
//!
//! Command-line flags win over environment variables, which win over the
//! config file, which wins over built-in defaults.
//!
//! ```bash
//! depwatch scan .
//! depwatch scan services --recent-days 365 --exclude 'third_party/**'
//! GITHUB_TOKEN=ghp_xxx depwatch --verbose scan --max-parallel 4
//! depwatch cache clean
//! ```

mod cache;
mod scan;

pub use cache::CacheCommand;
pub use scan::{ScanCommand, ScanSettings, run_scan, run_scan_with};

use crate::config::GlobalConfig;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Runtime configuration derived from the global flags.
///
/// Passed down to the commands instead of being written to the process
/// environment, so tests can build one directly.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter directive; `None` keeps `RUST_LOG` (or `warn`).
    pub log_level: Option<String>,

    /// Alternative global config file.
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the global config this run should use.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but is unreadable or invalid.
    pub async fn load_global_config(&self) -> Result<GlobalConfig> {
        GlobalConfig::load_with_optional(self.config_path.clone()).await
    }
}

/// Report dependencies that have gone stale, been archived, or reached end
/// of life.
#[derive(Parser)]
#[command(name = "depwatch", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to an alternative config.toml
    #[arg(long, global = true, env = "DEPWATCH_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a directory tree for outdated dependencies
    Scan(ScanCommand),

    /// Inspect or delete the HTTP response cache
    Cache(CacheCommand),
}

impl Cli {
    /// Run the selected command.
    ///
    /// # Errors
    ///
    /// Returns an error for anything that stops the command as a whole, such
    /// as a missing scan root or an invalid config file. Per-dependency lookup
    /// failures are reported, not returned.
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        init_logging(config.log_level.as_deref());
        self.execute_with_config(config).await
    }

    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("depwatch=debug".to_string())
        } else if self.quiet {
            Some("error".to_string())
        } else {
            None
        };

        CliConfig {
            log_level,
            config_path: self.config.clone(),
        }
    }

    /// Run the selected command with an explicit [`CliConfig`].
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        match self.command {
            Commands::Scan(cmd) => cmd.execute(&config).await,
            Commands::Cache(cmd) => cmd.execute(&config).await,
        }
    }
}

/// Install the global tracing subscriber on stderr.
///
/// `directive` overrides `RUST_LOG`; with neither, only warnings and errors
/// are shown. Calling this twice is harmless.
pub fn init_logging(directive: Option<&str>) {
    let filter = match directive {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
