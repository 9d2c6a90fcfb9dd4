//! Caching for outbound lookups.
//!
//! Two independent caches live here:
//!
//! - [`HttpCache`] + [`CachingTransport`]: a persistent, conditionally
//!   revalidating HTTP response cache placed in front of every registry call.
//!   It outlives the process through a single file in the user's data
//!   directory.
//! - [`EntityCaches`]: scan-scoped memoization of enrichment results, so a
//!   dependency referenced from many manifests is normally looked up once.
//!
//! # HTTP cache semantics
//!
//! Entries are keyed by the exact request URL. A fresh entry (`expire` in the
//! future) is served without touching the network. A stale entry contributes
//! `If-None-Match` / `If-Modified-Since`; a `304` then reuses the stored body
//! and recomputes `expire` from the `304`'s own `Cache-Control` and `Age`.
//! A `301` stores a pointer entry so later lookups resolve through the
//! redirect target.
//!
//! # On-disk format
//!
//! ```text
//! ┌──────────────┬──────────────────┬──────────────────────────────────┐
//! │ b"DEPWATCH"  │ version: u32 LE  │ bincode(HashMap<String, Entry>)  │
//! └──────────────┴──────────────────┴──────────────────────────────────┘
//! ```
//!
//! A file with an unknown magic or version is ignored (with a warning) and
//! overwritten on the next save. Load and save failures never abort a scan.

mod entry;
mod memo;
mod transport;

pub use entry::{CacheEntry, age, expiry, freshness_lifetime, gunzip, is_gzip, max_age};
pub use memo::{EntityCaches, MemoCache};
pub use transport::CachingTransport;

use crate::constants::MAX_CACHE_REDIRECT_HOPS;
use crate::utils::fs::atomic_write;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;

const MAGIC: &[u8; 8] = b"DEPWATCH";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = MAGIC.len() + 4;

/// Failure to load or persist the HTTP cache file.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Reading or inspecting the cache file failed.
    #[error("failed to access cache file {path}")]
    Io {
        /// Cache file path
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The entry map could not be encoded or decoded.
    #[error("cache encoding error: {0}")]
    Codec(#[from] bincode::Error),

    /// The file was not written by this version of depwatch.
    #[error("unsupported cache file format: {reason}")]
    UnsupportedFormat {
        /// What did not match
        reason: String,
    },

    /// Writing the file into place failed.
    #[error("failed to save cache to {path}: {reason}")]
    Persist {
        /// Cache file path
        path: String,
        /// Underlying failure
        reason: String,
    },
}

/// Result of a cache lookup after redirect resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheHit {
    /// Key that actually holds `entry` (the redirect target, if any).
    pub key: String,
    /// The resolved entry.
    pub entry: CacheEntry,
}

/// URL-keyed response cache shared by all concurrent lookups.
///
/// Reads take a shared lock, inserts and removals an exclusive one. No lock is
/// held across network I/O.
#[derive(Debug, Default)]
pub struct HttpCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    path: Option<PathBuf>,
}

impl HttpCache {
    /// A cache that is never read from or written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the cache backed by `path`.
    ///
    /// A missing file yields an empty cache. Any other failure is logged as a
    /// warning and also yields an empty cache; the file is replaced on the
    /// next [`save`](Self::save).
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match read_entries(&path).await {
            Ok(entries) => {
                tracing::debug!("Loaded {} cached responses from {}", entries.len(), path.display());
                entries
            }
            Err(e) => {
                tracing::warn!("Ignoring HTTP cache at {}: {e}", path.display());
                HashMap::new()
            }
        };
        Self {
            entries: RwLock::new(entries),
            path: Some(path),
        }
    }

    /// Backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Look up `url`, following redirect pointers.
    ///
    /// At most [`MAX_CACHE_REDIRECT_HOPS`] pointers are followed; a longer or
    /// cyclic chain is a miss.
    pub async fn lookup(&self, url: &str) -> Option<CacheHit> {
        let entries = self.entries.read().await;
        let mut key = url;
        for _ in 0..=MAX_CACHE_REDIRECT_HOPS {
            let entry = entries.get(key)?;
            match &entry.redirect_target {
                Some(target) => key = target,
                None => {
                    return Some(CacheHit {
                        key: key.to_string(),
                        entry: entry.clone(),
                    });
                }
            }
        }
        tracing::debug!(url, "Redirect chain in cache is too long, treating as miss");
        None
    }

    /// Raw entry stored under `key`, without redirect resolution.
    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        self.entries.read().await.get(key).cloned()
    }

    /// Store `entry` under `key`, replacing any previous entry.
    pub async fn insert(&self, key: impl Into<String>, entry: CacheEntry) {
        self.entries.write().await.insert(key.into(), entry);
    }

    /// Remove and return the entry under `key`.
    pub async fn remove(&self, key: &str) -> Option<CacheEntry> {
        self.entries.write().await.remove(key)
    }

    /// Number of stored entries, redirect pointers included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drop every entry from memory. The file is untouched until the next save.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Copy of the whole map.
    pub async fn snapshot(&self) -> HashMap<String, CacheEntry> {
        self.entries.read().await.clone()
    }

    /// Size of the backing file in bytes, if it exists.
    pub async fn file_size(&self) -> Option<u64> {
        let path = self.path.as_ref()?;
        tokio::fs::metadata(path).await.ok().map(|m| m.len())
    }

    /// Persist to the backing file, logging (not returning) failures.
    pub async fn save(&self) {
        if let Err(e) = self.try_save().await {
            tracing::warn!("{e}");
        }
    }

    /// Persist to the backing file.
    ///
    /// The map is encoded under the read lock, then written to a fresh
    /// temporary file that is renamed over the target. In-memory caches are a
    /// no-op.
    pub async fn try_save(&self) -> Result<(), CacheError> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };

        let bytes = {
            let entries = self.entries.read().await;
            encode(&entries)?
        };

        let shown = path.display().to_string();
        let count = bytes.len();
        tokio::task::spawn_blocking(move || atomic_write(&path, &bytes))
            .await
            .map_err(|e| CacheError::Persist {
                path: shown.clone(),
                reason: e.to_string(),
            })?
            .map_err(|e| CacheError::Persist {
                path: shown.clone(),
                reason: format!("{e:#}"),
            })?;

        tracing::debug!("Saved HTTP cache ({count} bytes) to {shown}");
        Ok(())
    }
}

async fn read_entries(path: &Path) -> Result<HashMap<String, CacheEntry>, CacheError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => decode(&bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
        Err(source) => Err(CacheError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}

fn encode(entries: &HashMap<String, CacheEntry>) -> Result<Vec<u8>, CacheError> {
    let mut bytes = Vec::with_capacity(HEADER_LEN);
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bincode::serialize_into(&mut bytes, entries)?;
    Ok(bytes)
}

fn decode(bytes: &[u8]) -> Result<HashMap<String, CacheEntry>, CacheError> {
    if bytes.len() < HEADER_LEN || &bytes[..MAGIC.len()] != MAGIC {
        return Err(CacheError::UnsupportedFormat {
            reason: "missing depwatch header".to_string(),
        });
    }

    let mut version = [0u8; 4];
    version.copy_from_slice(&bytes[MAGIC.len()..HEADER_LEN]);
    let version = u32::from_le_bytes(version);
    if version != FORMAT_VERSION {
        return Err(CacheError::UnsupportedFormat {
            reason: format!("version {version}, expected {FORMAT_VERSION}"),
        });
    }

    Ok(bincode::deserialize(&bytes[HEADER_LEN..])?)
}
