//! `depwatch cache`: inspect or delete the persistent HTTP cache.

use super::CliConfig;
use crate::cache::HttpCache;
use crate::core::DepwatchError;
use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::Path;

/// Manage the HTTP response cache.
#[derive(Args, Debug)]
pub struct CacheCommand {
    #[command(subcommand)]
    command: CacheSubcommand,
}

#[derive(Subcommand, Debug)]
enum CacheSubcommand {
    /// Show location, entry count and size of the cache
    Info,

    /// Delete the cache file
    Clean,
}

impl CacheCommand {
    /// Run the cache subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the cache file exists but
    /// cannot be removed.
    pub async fn execute(self, config: &CliConfig) -> Result<()> {
        let global = config.load_global_config().await?;
        let path = global.http_cache_path()?;
        match self.command {
            CacheSubcommand::Info => show_info(&path).await,
            CacheSubcommand::Clean => clean(&path).await,
        }
    }
}

async fn show_info(path: &Path) -> Result<()> {
    println!("{} {}", "Cache file:".bold(), path.display());
    if !path.exists() {
        println!("{} none (no scan has been cached yet)", "Entries:".bold());
        return Ok(());
    }

    let cache = HttpCache::load(path).await;
    let size = cache.file_size().await.unwrap_or(0);
    println!("{} {}", "Entries:".bold(), cache.len().await);
    println!("{} {}", "Size:".bold(), format_size(size));
    Ok(())
}

async fn clean(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            println!("{} {}", "Removed".green(), path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            println!("Cache is already empty");
            Ok(())
        }
        Err(_) => Err(DepwatchError::FileSystemError {
            operation: "remove cache file".to_string(),
            path: path.display().to_string(),
        }
        .into()),
    }
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 { format!("{bytes} B") } else { format!("{size:.1} {}", UNITS[unit]) }
}
