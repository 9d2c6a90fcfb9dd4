//! depwatch - report stale, archived and end-of-life dependencies
//!
//! depwatch walks a directory tree, parses every dependency manifest it finds
//! (`go.mod`, `package.json`, `Gemfile`, `requirements.txt`, `Dockerfile`) and
//! asks the upstream registries about each dependency:
//!
//! - is the package's GitHub repository archived, or has it gone quiet?
//! - has the declared Go, Node.js or Ruby release reached end of life?
//! - when was the container base image tag last pushed?
//!
//! # Architecture Overview
//!
//! ```text
//! manifest ─► Scan::dispatch ─► EntityCaches ──hit──► report
//!                  │                 │miss
//!                  │           Semaphore permit
//!                  │                 ▼
//!                  │            Enricher ─► Registries ─► HttpClient ─► CachingTransport ─► network
//!                  ▼
//!             Scan::finish (join barrier) ─► HttpCache::save
//! ```
//!
//! Two caches keep repeated work down. The persistent [`cache::HttpCache`]
//! survives between runs and revalidates with `ETag`/`Last-Modified`; the
//! per-scan [`cache::EntityCaches`] memoize whole enrichment results so a
//! dependency shared by many manifests is looked up once.
//!
//! # Modules
//!
//! - [`cache`] - persistent HTTP cache, caching transport, entity memo
//! - [`cli`] - `scan` and `cache` commands
//! - [`config`] - global `~/.depwatch/config.toml`
//! - [`core`] - error types and user-facing error rendering
//! - [`enrich`] - per-kind enrichment pipelines and classification
//! - [`http`] - request/response types, transport trait, redirect-following client
//! - [`manifest`] - manifest discovery and parsers
//! - [`models`] - dependency records
//! - [`orchestrator`] - bounded concurrent dispatch and the join barrier
//! - [`registry`] - GitHub, npm, PyPI, RubyGems, Go, endoflife.date, Docker Hub and gcr.io clients
//! - [`report`] - console output
//! - [`utils`] - file system helpers

pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod enrich;
pub mod http;
pub mod manifest;
pub mod models;
pub mod orchestrator;
pub mod registry;
pub mod report;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
