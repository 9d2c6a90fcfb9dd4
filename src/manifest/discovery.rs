//! Manifest discovery below a scan root.

use super::ManifestKind;
use crate::constants::SKIPPED_DIRECTORIES;
use crate::core::DepwatchError;
use glob::Pattern;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// User-supplied exclusion globs, matched against paths relative to the root.
#[derive(Debug, Clone, Default)]
pub struct ExcludeSet {
    patterns: Vec<Pattern>,
}

impl ExcludeSet {
    /// Compile `patterns`.
    ///
    /// # Errors
    ///
    /// Returns [`DepwatchError::InvalidPattern`] for the first malformed glob.
    pub fn new(patterns: &[String]) -> Result<Self, DepwatchError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| DepwatchError::InvalidPattern {
                    pattern: p.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            patterns,
        })
    }

    /// Whether `relative` (using `/` separators) is excluded.
    pub fn matches(&self, relative: &Path) -> bool {
        let relative = relative.to_string_lossy().replace('\\', "/");
        self.patterns.iter().any(|p| p.matches(&relative))
    }
}

/// All manifests below `root`, in file-name order.
///
/// Hidden directories and dependency/build output directories are not
/// descended into. Unreadable entries are logged and skipped.
///
/// # Errors
///
/// Returns [`DepwatchError::PathNotFound`] if `root` does not exist and
/// [`DepwatchError::InvalidPattern`] if an exclude glob is malformed.
pub fn discover_manifests(root: &Path, excludes: &[String]) -> Result<Vec<PathBuf>, DepwatchError> {
    if !root.exists() {
        return Err(DepwatchError::PathNotFound {
            path: root.display().to_string(),
        });
    }
    let excludes = ExcludeSet::new(excludes)?;

    let mut manifests = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_pruned(entry, root, &excludes));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable path: {e}");
                continue;
            }
        };
        if entry.file_type().is_file() && ManifestKind::detect(entry.path()).is_some() {
            manifests.push(entry.into_path());
        }
    }
    Ok(manifests)
}

fn is_pruned(entry: &DirEntry, root: &Path, excludes: &ExcludeSet) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    if entry.file_type().is_dir() {
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('.') || SKIPPED_DIRECTORIES.contains(&name.as_ref()) {
            return true;
        }
    }
    entry.path().strip_prefix(root).is_ok_and(|relative| excludes.matches(relative))
}
