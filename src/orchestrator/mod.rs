//! Bounded fan-out of enrichment work across a whole scan.
//!
//! # Flow per dependency
//!
//! 1. Check the [`EntityCaches`]. A hit is classified and reported right away,
//!    no task is spawned.
//! 2. On a miss, spawn a task that first waits for a permit from the scan-wide
//!    semaphore. Once admitted it checks the memo again (another task may have
//!    finished the same dependency meanwhile), enriches on a second miss,
//!    stores the finding, then classifies and reports it.
//! 3. [`Scan::finish`] joins every spawned task.
//!
//! The semaphore is shared by all manifests, so at most `max_parallel`
//! enrichments run at once no matter how many files are scanned. Two tasks
//! for the same dependency that both miss before either stores will both hit
//! the network; the memo is best-effort deduplication.

use crate::cache::EntityCaches;
use crate::core::DepwatchError;
use crate::enrich::{Enricher, Severity, WarnPolicy};
use crate::manifest::{discover_manifests, parse_manifest};
use crate::models::{Dependency, Finding};
use crate::report::Reporter;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Totals for one completed scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub manifests: usize,
    pub manifest_errors: usize,
    pub errors: usize,
    pub warnings: usize,
    pub passes: usize,
    /// Findings served from the memo instead of being enriched
    pub cache_hits: usize,
    /// Enrichment pipelines actually run
    pub enriched: usize,
}

#[derive(Debug, Default)]
struct ScanStats {
    manifests: AtomicUsize,
    manifest_errors: AtomicUsize,
    errors: AtomicUsize,
    warnings: AtomicUsize,
    passes: AtomicUsize,
    cache_hits: AtomicUsize,
    enriched: AtomicUsize,
}

impl ScanStats {
    fn summary(&self) -> ScanSummary {
        ScanSummary {
            manifests: self.manifests.load(Ordering::Relaxed),
            manifest_errors: self.manifest_errors.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            passes: self.passes.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            enriched: self.enriched.load(Ordering::Relaxed),
        }
    }
}

/// State shared by every task of one scan.
struct ScanContext {
    caches: EntityCaches,
    enricher: Enricher,
    policy: WarnPolicy,
    reporter: Arc<dyn Reporter>,
    stats: ScanStats,
}

impl ScanContext {
    fn report(&self, manifest: &Path, finding: &Finding) {
        let verdict = self.policy.classify(finding, Utc::now());
        let counter = match verdict.severity() {
            Severity::Error => &self.stats.errors,
            Severity::Warn => &self.stats.warnings,
            Severity::Info => &self.stats.passes,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        self.reporter.finding(manifest, &verdict);
    }

    fn memo_hit(&self, dependency: &Dependency) -> Option<Finding> {
        let finding = self.caches.load(dependency)?;
        self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
        tracing::debug!("Memo hit for {}", dependency.identity());
        Some(finding)
    }
}

/// One directory scan: admission control, memoization and the join barrier.
pub struct Scan {
    semaphore: Arc<Semaphore>,
    tasks: JoinSet<()>,
    context: Arc<ScanContext>,
}

impl Scan {
    /// Create a scan admitting at most `max_parallel` (minimum 1) concurrent
    /// enrichments.
    pub fn new(
        enricher: Enricher,
        policy: WarnPolicy,
        reporter: Arc<dyn Reporter>,
        max_parallel: usize,
    ) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_parallel.max(1))),
            tasks: JoinSet::new(),
            context: Arc::new(ScanContext {
                caches: EntityCaches::new(),
                enricher,
                policy,
                reporter,
                stats: ScanStats::default(),
            }),
        }
    }

    /// Memoized findings so far.
    pub fn caches(&self) -> &EntityCaches {
        &self.context.caches
    }

    /// Report `manifest` and dispatch its dependencies.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn dispatch(&mut self, manifest: &Path, dependencies: Vec<Dependency>) {
        self.context.stats.manifests.fetch_add(1, Ordering::Relaxed);
        self.context.reporter.manifest(manifest);

        let manifest: Arc<Path> = Arc::from(manifest);
        for dependency in dependencies {
            if let Some(finding) = self.context.memo_hit(&dependency) {
                self.context.report(&manifest, &finding);
                continue;
            }

            let semaphore = Arc::clone(&self.semaphore);
            let context = Arc::clone(&self.context);
            let manifest = Arc::clone(&manifest);
            self.tasks.spawn(async move {
                let finding = {
                    let Ok(_permit) = semaphore.acquire_owned().await else {
                        return;
                    };
                    match context.memo_hit(&dependency) {
                        Some(finding) => finding,
                        None => {
                            let finding = context.enricher.enrich(dependency).await;
                            context.stats.enriched.fetch_add(1, Ordering::Relaxed);
                            context.caches.store(&finding);
                            finding
                        }
                    }
                };
                context.report(&manifest, &finding);
            });
        }
    }

    /// Record a manifest that could not be parsed.
    pub fn manifest_failed(&self, manifest: &Path, error: &DepwatchError) {
        self.context.stats.manifest_errors.fetch_add(1, Ordering::Relaxed);
        self.context.reporter.manifest_error(manifest, error);
    }

    /// Wait for every dispatched task and return the totals.
    pub async fn finish(mut self) -> ScanSummary {
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                tracing::warn!("Enrichment task failed: {e}");
            }
        }
        self.context.stats.summary()
    }
}

/// Discover, parse and dispatch every manifest below `root`.
///
/// Manifests are reported relative to `root`. A manifest that fails to parse
/// is reported and skipped. Call [`Scan::finish`] afterwards to wait for the
/// results.
///
/// # Errors
///
/// Returns [`DepwatchError::PathNotFound`] if `root` does not exist and
/// [`DepwatchError::InvalidPattern`] for a malformed exclude glob.
pub fn scan_directory(root: &Path, excludes: &[String], scan: &mut Scan) -> Result<(), DepwatchError> {
    let manifests = discover_manifests(root, excludes)?;
    tracing::debug!("Found {} manifests under {}", manifests.len(), root.display());

    for path in manifests {
        let shown: PathBuf = path.strip_prefix(root).map(Path::to_path_buf).unwrap_or_else(|_| path.clone());
        match parse_manifest(&path) {
            Ok(dependencies) => scan.dispatch(&shown, dependencies),
            Err(e) => scan.manifest_failed(&shown, &e),
        }
    }
    Ok(())
}
