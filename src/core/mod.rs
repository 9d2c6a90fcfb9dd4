//! Core types shared across depwatch.
//!
//! - [`DepwatchError`] / [`ErrorContext`] / [`user_friendly_error`] for fatal
//!   and file-level failures shown to the user
//! - [`LookupError`] for per-dependency enrichment failures, which are
//!   captured on findings instead of aborting the scan

pub mod error;

pub use error::{DepwatchError, ErrorContext, LookupError, create_error_context, user_friendly_error};
