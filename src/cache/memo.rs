use crate::models::{Dependency, DependencyKind, Finding};
use dashmap::DashMap;

/// Concurrent last-write-wins map from identity to snapshot.
///
/// `load` followed by `store` is not atomic: two tasks that both miss will
/// both enrich, and the later `store` wins.
#[derive(Debug)]
pub struct MemoCache<V> {
    entries: DashMap<String, V>,
}

impl<V> Default for MemoCache<V> {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl<V: Clone> MemoCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot stored under `key`, if any.
    pub fn load(&self, key: &str) -> Option<V> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    /// Store `value` under `key`, replacing any earlier snapshot.
    pub fn store(&self, key: String, value: V) {
        self.entries.insert(key, value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-kind memoization of enrichment results for one scan.
#[derive(Debug, Default)]
pub struct EntityCaches {
    modules: MemoCache<Finding>,
    languages: MemoCache<Finding>,
    images: MemoCache<Finding>,
}

impl EntityCaches {
    pub fn new() -> Self {
        Self::default()
    }

    fn for_kind(&self, kind: DependencyKind) -> &MemoCache<Finding> {
        match kind {
            DependencyKind::Module => &self.modules,
            DependencyKind::Language => &self.languages,
            DependencyKind::Image => &self.images,
        }
    }

    /// Previously stored finding for the same identity, error slot included.
    pub fn load(&self, dependency: &Dependency) -> Option<Finding> {
        self.for_kind(dependency.kind()).load(&dependency.identity())
    }

    /// Remember `finding` under its dependency's identity.
    pub fn store(&self, finding: &Finding) {
        let dependency = &finding.dependency;
        self.for_kind(dependency.kind()).store(dependency.identity(), finding.clone());
    }

    /// Total snapshots across all kinds.
    pub fn len(&self) -> usize {
        self.modules.len() + self.languages.len() + self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
