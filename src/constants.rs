//! Global constants used throughout depwatch.
//!
//! Numeric limits and defaults that are shared between modules live here so
//! the magic numbers stay discoverable.

/// Default number of enrichment tasks allowed in flight at once.
///
/// The limit is shared by the whole directory scan, not per manifest.
pub const DEFAULT_MAX_PARALLEL: usize = 10;

/// Default recency window in days.
///
/// A dependency whose last activity is older than this is reported as stale.
pub const DEFAULT_RECENT_DAYS: i64 = 180;

/// Maximum number of `RedirectTarget` hops followed by a cache lookup.
///
/// Longer (or cyclic) chains are treated as a miss.
pub const MAX_CACHE_REDIRECT_HOPS: usize = 5;

/// Maximum number of HTTP redirects followed for a single request.
pub const MAX_HTTP_REDIRECTS: usize = 10;

/// `User-Agent` sent with every outbound request.
///
/// The GitHub API rejects requests without one.
pub const USER_AGENT: &str = concat!("depwatch/", env!("CARGO_PKG_VERSION"));

/// File name of the persisted HTTP cache inside the data directory.
pub const HTTP_CACHE_FILE_NAME: &str = "http-cache.bin";

/// Directory names that are never descended into during discovery.
pub const SKIPPED_DIRECTORIES: &[&str] = &["node_modules", "vendor", "target"];
