//! `depwatch scan`: walk a directory tree and report on every dependency.

use super::CliConfig;
use crate::cache::{CachingTransport, HttpCache};
use crate::config::GlobalConfig;
use crate::core::DepwatchError;
use crate::enrich::{Enricher, WarnPolicy};
use crate::http::{HttpClient, ReqwestTransport, Transport};
use crate::orchestrator::{Scan, ScanSummary, scan_directory};
use crate::registry::{Endpoints, Registries};
use crate::report::{ConsoleReporter, Reporter};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;

/// Scan a directory tree for outdated dependencies.
#[derive(Args, Debug, Clone, Default)]
pub struct ScanCommand {
    /// Root directory to scan
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Days without activity after which a dependency is reported
    #[arg(long, value_parser = clap::value_parser!(i64).range(0..))]
    recent_days: Option<i64>,

    /// GitHub API token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Do not warn about archived repositories or end-of-life runtimes
    #[arg(long)]
    no_archived_warning: bool,

    /// Glob (relative to the root) to leave out; may be repeated
    #[arg(long, value_name = "GLOB")]
    exclude: Vec<String>,

    /// Maximum number of lookups in flight
    #[arg(long, value_name = "N")]
    max_parallel: Option<usize>,

    /// Neither read nor write the persistent HTTP cache
    #[arg(long)]
    no_cache: bool,

    /// Also print dependencies that passed
    #[arg(long)]
    show_pass: bool,
}

/// Everything one scan needs, after merging flags, environment and config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSettings {
    pub root: PathBuf,
    pub policy: WarnPolicy,
    pub github_token: Option<String>,
    pub max_parallel: usize,
    /// Config-file excludes followed by command-line excludes
    pub excludes: Vec<String>,
    /// HTTP cache file; `None` keeps the cache in memory only
    pub cache_path: Option<PathBuf>,
    pub show_pass: bool,
    pub endpoints: Endpoints,
}

impl ScanSettings {
    /// Merge `command` over `config`.
    ///
    /// `--token` already carries `GITHUB_TOKEN` when the flag is absent, so
    /// the order is flag, then environment, then config file, then default.
    ///
    /// # Errors
    ///
    /// Returns [`DepwatchError::ConfigError`] for `--max-parallel 0`, and an
    /// error if the cache location cannot be determined.
    pub fn merge(command: ScanCommand, config: &GlobalConfig) -> Result<Self> {
        let max_parallel = command.max_parallel.unwrap_or(config.max_parallel);
        if max_parallel == 0 {
            return Err(DepwatchError::ConfigError {
                message: "--max-parallel must be at least 1".to_string(),
            }
            .into());
        }

        let github_token = command
            .token
            .filter(|t| !t.is_empty())
            .or_else(|| config.github_token.clone().filter(|t| !t.is_empty()));

        let cache_path = if command.no_cache {
            None
        } else {
            Some(config.http_cache_path()?)
        };

        let mut excludes = config.exclude.clone();
        excludes.extend(command.exclude);

        Ok(Self {
            root: command.path,
            policy: WarnPolicy {
                warn_on_archived: config.warn_on_archived && !command.no_archived_warning,
                recent_days: command.recent_days.unwrap_or(config.recent_days),
            },
            github_token,
            max_parallel,
            excludes,
            cache_path,
            show_pass: command.show_pass,
            endpoints: config.endpoints.clone(),
        })
    }
}

impl ScanCommand {
    /// Run the scan and print a summary.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the root does not exist.
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let global = config.load_global_config().await?;
        let settings = ScanSettings::merge(self, &global)?;
        let reporter = Arc::new(ConsoleReporter::new(settings.show_pass));

        let summary = run_scan(&settings, reporter).await?;
        print_summary(&settings, &summary);
        Ok(())
    }
}

/// Scan with the production network stack.
///
/// The HTTP cache is loaded before the first request and saved once after
/// every dispatched lookup has finished.
///
/// # Errors
///
/// Returns an error if the root does not exist, an exclude glob is malformed,
/// or the HTTP client cannot be built.
pub async fn run_scan(settings: &ScanSettings, reporter: Arc<dyn Reporter>) -> Result<ScanSummary> {
    run_scan_with(settings, ReqwestTransport::new()?, reporter).await
}

/// Scan over `transport`, layering the HTTP cache on top of it.
///
/// # Errors
///
/// See [`run_scan`].
pub async fn run_scan_with<T>(
    settings: &ScanSettings,
    transport: T,
    reporter: Arc<dyn Reporter>,
) -> Result<ScanSummary>
where
    T: Transport + 'static,
{
    if !settings.root.exists() {
        return Err(DepwatchError::PathNotFound {
            path: settings.root.display().to_string(),
        }
        .into());
    }

    let cache = Arc::new(match &settings.cache_path {
        Some(path) => HttpCache::load(path.clone()).await,
        None => HttpCache::in_memory(),
    });
    let client = HttpClient::new(Arc::new(CachingTransport::new(transport, Arc::clone(&cache))));
    let registries =
        Registries::new(client, settings.endpoints.clone(), settings.github_token.clone());

    let mut scan =
        Scan::new(Enricher::new(registries), settings.policy, reporter, settings.max_parallel);
    let outcome = scan_directory(&settings.root, &settings.excludes, &mut scan);
    // Tasks dispatched before a failure still run to completion
    let summary = scan.finish().await;
    outcome?;

    cache.save().await;
    Ok(summary)
}

fn print_summary(settings: &ScanSettings, summary: &ScanSummary) {
    if summary.manifests == 0 && summary.manifest_errors == 0 {
        println!("No manifests found under {}", settings.root.display());
        return;
    }

    let errors = format!("{} errors", summary.errors);
    let warnings = format!("{} warnings", summary.warnings);
    println!(
        "\nScanned {} manifests: {}, {}, {} passed",
        summary.manifests + summary.manifest_errors,
        if summary.errors > 0 { errors.red().to_string() } else { errors },
        if summary.warnings > 0 { warnings.yellow().to_string() } else { warnings },
        summary.passes,
    );
    tracing::debug!(
        cache_hits = summary.cache_hits,
        enriched = summary.enriched,
        "Scan finished"
    );
}
