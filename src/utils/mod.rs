//! Small utilities shared across modules.
//!
//! - [`fs`] - directory creation and atomic file writes

pub mod fs;

pub use fs::{atomic_write, ensure_dir};
