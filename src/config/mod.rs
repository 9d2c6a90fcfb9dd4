//! Configuration for depwatch.
//!
//! Settings come from three places, highest precedence first:
//!
//! 1. Command-line flags (`--recent-days`, `--token`, ...)
//! 2. Environment (`GITHUB_TOKEN`, `DEPWATCH_CONFIG`)
//! 3. The global config file (see [`global`])
//!
//! Anything not set falls back to a built-in default.

pub mod global;

pub use global::{GlobalConfig, default_cache_path};
