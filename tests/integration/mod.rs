//! Integration test suite for depwatch
//!
//! End-to-end tests against a local wiremock server and the compiled binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **cli**: The `depwatch` binary: exit codes, config errors, `cache` subcommands
//! - **http_cache**: Persistent HTTP cache revalidation, redirects, gzip and reload
//! - **scan**: Concurrent enrichment, memoization and whole-tree scans

mod cli;
mod http_cache;
mod scan;
