//! Rendering of scan results.
//!
//! The orchestrator talks to a [`Reporter`]; [`ConsoleReporter`] prints the
//! familiar tree-style lines to stdout:
//!
//! ```text
//! services/api/go.mod
//! ├ WARN: github.com/pkg/errors is archived (services/api/go.mod)
//! ├ ERROR: left-pad unexpected status 404 from https://registry.npmjs.org/left-pad/latest (web/package.json)
//! ```
//!
//! Findings of concurrently enriched dependencies arrive in completion order,
//! so each line names its manifest.

use crate::core::DepwatchError;
use crate::enrich::{Severity, Verdict};
use colored::Colorize;
use std::path::Path;

/// Sink for scan output. Called from many tasks at once.
pub trait Reporter: Send + Sync {
    /// A manifest was parsed and its dependencies are being dispatched.
    fn manifest(&self, path: &Path);

    /// A manifest could not be parsed; it is skipped.
    fn manifest_error(&self, path: &Path, error: &DepwatchError);

    /// One dependency of `manifest` was classified.
    fn finding(&self, manifest: &Path, verdict: &Verdict);
}

/// Colored terminal output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter {
    show_pass: bool,
}

impl ConsoleReporter {
    /// `show_pass` also prints an `INFO: pass` line for clean dependencies.
    pub fn new(show_pass: bool) -> Self {
        Self {
            show_pass,
        }
    }
}

impl Reporter for ConsoleReporter {
    fn manifest(&self, path: &Path) {
        println!("{}", path.display().to_string().bold());
    }

    fn manifest_error(&self, path: &Path, error: &DepwatchError) {
        println!("{}", format_manifest_error(path, error, true));
    }

    fn finding(&self, manifest: &Path, verdict: &Verdict) {
        if verdict.is_pass() && !self.show_pass {
            return;
        }
        println!("{}", format_line(manifest, verdict, true));
    }
}

/// Report line for a manifest that could not be parsed.
pub fn format_manifest_error(manifest: &Path, error: &DepwatchError, color: bool) -> String {
    let detail = match error {
        DepwatchError::ManifestParseError {
            reason,
            ..
        } => format!("{error}: {reason}"),
        other => other.to_string(),
    };
    let location = format!("({})", manifest.display());
    if color {
        format!("{} {detail} {}", "├ ERROR:".red().bold(), location.dimmed())
    } else {
        format!("├ ERROR: {detail} {location}")
    }
}

/// One report line, optionally colored.
pub fn format_line(manifest: &Path, verdict: &Verdict, color: bool) -> String {
    let label = format!("├ {}:", verdict.severity());
    let label = if color {
        match verdict.severity() {
            Severity::Error => label.red().bold().to_string(),
            Severity::Warn => label.yellow().bold().to_string(),
            Severity::Info => label.green().to_string(),
        }
    } else {
        label
    };
    let location = format!("({})", manifest.display());
    let location = if color {
        location.dimmed().to_string()
    } else {
        location
    };
    format!("{label} {verdict} {location}")
}
