//! Error handling for depwatch
//!
//! The error system follows two principles:
//! 1. **Strongly-typed errors** for precise handling inside the library
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`DepwatchError`] - fatal and file-level failures (missing root path,
//!   unreadable manifests, broken configuration)
//! - [`LookupError`] - per-dependency enrichment failures; these are captured
//!   on the dependency's finding and never abort a scan
//! - [`ErrorContext`] - wrapper that adds details and a suggestion for display
//!
//! Cache persistence failures have their own type in
//! [`crate::cache::CacheError`]; they are only ever logged.
//!
//! # Examples
//!
//! ```rust,no_run
//! use depwatch::core::{DepwatchError, ErrorContext, user_friendly_error};
//!
//! let error = DepwatchError::PathNotFound {
//!     path: "./missing".to_string(),
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for depwatch operations.
///
/// # Error Categories
///
/// - **Paths**: [`PathNotFound`](DepwatchError::PathNotFound)
/// - **Manifests**: [`ManifestParseError`](DepwatchError::ManifestParseError),
///   [`UnsupportedManifest`](DepwatchError::UnsupportedManifest)
/// - **Configuration**: [`ConfigError`](DepwatchError::ConfigError),
///   [`InvalidPattern`](DepwatchError::InvalidPattern)
/// - **File system**: [`FileSystemError`](DepwatchError::FileSystemError),
///   [`IoError`](DepwatchError::IoError)
#[derive(Error, Debug)]
pub enum DepwatchError {
    /// The root path handed to a scan does not exist.
    ///
    /// This is the only error that stops a scan outright.
    #[error("Path does not exist: {path}")]
    PathNotFound {
        /// The path that was requested
        path: String,
    },

    /// A manifest could not be parsed.
    ///
    /// Only the offending file is skipped; the rest of the scan continues.
    #[error("Invalid manifest syntax in {file}")]
    ManifestParseError {
        /// Path to the manifest that failed to parse
        file: String,
        /// Specific reason for the parsing failure
        reason: String,
    },

    /// The file name does not map to any supported manifest format.
    #[error("Unsupported manifest: {file}")]
    UnsupportedManifest {
        /// Path to the file
        file: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// An exclusion glob could not be compiled.
    #[error("Invalid exclude pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The pattern as given by the user
        pattern: String,
        /// Why the pattern was rejected
        reason: String,
    },

    /// File system error
    #[error("File system error: {operation}")]
    FileSystemError {
        /// The file system operation that failed
        operation: String,
        /// Path where the file system error occurred
        path: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

/// Failure of a single enrichment step.
///
/// A `LookupError` is recorded on the dependency it belongs to and rendered as
/// an `ERROR` line. It is `Clone` because memoized findings are shared between
/// every manifest that references the same dependency.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The request never produced a response.
    #[error("request to {url} failed: {reason}")]
    Transport {
        /// Requested URL
        url: String,
        /// Underlying transport failure
        reason: String,
    },

    /// The registry answered with something other than 200.
    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus {
        /// Requested URL
        url: String,
        /// HTTP status code
        status: u16,
    },

    /// The registry body did not have the expected shape.
    #[error("unexpected response from {url}: {reason}")]
    Decode {
        /// Requested URL
        url: String,
        /// Deserialization failure
        reason: String,
    },

    /// Source repository coordinates could not be derived.
    #[error("source repository not found for {name}: {reason}")]
    RepositoryNotFound {
        /// Dependency name
        name: String,
        /// What was missing
        reason: String,
    },

    /// Container image hosted on a registry we cannot query.
    #[error("unsupported registry: {registry}")]
    UnsupportedRegistry {
        /// Registry host
        registry: String,
    },

    /// The image reference could not be parsed.
    #[error("unsupported image reference: {reference}")]
    InvalidReference {
        /// Raw reference
        reference: String,
    },

    /// The registry knows the repository but not the tag.
    #[error("tag {tag} not found")]
    TagNotFound {
        /// Requested tag
        tag: String,
    },

    /// A language version could not be mapped to a release cycle.
    #[error("invalid version '{version}' for {name}")]
    InvalidVersion {
        /// Language name
        name: String,
        /// Version as written in the manifest
        version: String,
    },
}

/// Error context wrapper that provides user-friendly error information.
///
/// When displayed, errors show:
/// 1. **Error**: the main error message in red
/// 2. **Details**: additional context in yellow (optional)
/// 3. **Suggestion**: actionable steps in green (optional)
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: DepwatchError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context with no suggestion or details.
    #[must_use]
    pub const fn new(error: DepwatchError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into a user-friendly format with contextual suggestions.
///
/// The error chain is searched for a [`DepwatchError`] first (errors wrapped
/// with `anyhow::Context` keep theirs further down the chain), then for a raw
/// [`std::io::Error`]. Anything else becomes [`DepwatchError::Other`].
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    for cause in error.chain() {
        if let Some(depwatch_error) = cause.downcast_ref::<DepwatchError>() {
            return create_error_context(depwatch_error);
        }
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        return match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => ErrorContext::new(DepwatchError::FileSystemError {
                operation: "file access".to_string(),
                path: "unknown path".to_string(),
            })
            .with_suggestion("Check file permissions and try running with appropriate privileges")
            .with_details(format!("IO error: {io_error}")),
            _ => ErrorContext::new(DepwatchError::FileSystemError {
                operation: "file operation".to_string(),
                path: "unknown path".to_string(),
            })
            .with_suggestion("Check that the path exists and you have the necessary permissions")
            .with_details(format!("IO error: {io_error}")),
        };
    }

    let message = error.chain().map(ToString::to_string).collect::<Vec<_>>().join(": ");
    ErrorContext::new(DepwatchError::Other {
        message,
    })
    .with_suggestion("Re-run with --verbose for more details")
}

/// Create a user-friendly error context from a [`DepwatchError`].
pub fn create_error_context(error: &DepwatchError) -> ErrorContext {
    match error {
        DepwatchError::PathNotFound {
            path,
        } => ErrorContext::new(DepwatchError::PathNotFound {
            path: path.clone(),
        })
        .with_suggestion("Pass an existing directory, e.g. 'depwatch scan .'"),
        DepwatchError::ManifestParseError {
            file,
            reason,
        } => ErrorContext::new(DepwatchError::ManifestParseError {
            file: file.clone(),
            reason: reason.clone(),
        })
        .with_suggestion(format!("Check the syntax of '{file}'"))
        .with_details(reason.clone()),
        DepwatchError::ConfigError {
            message,
        } => ErrorContext::new(DepwatchError::ConfigError {
            message: message.clone(),
        })
        .with_suggestion("Check ~/.depwatch/config.toml or the file given with --config"),
        DepwatchError::InvalidPattern {
            pattern,
            reason,
        } => ErrorContext::new(DepwatchError::InvalidPattern {
            pattern: pattern.clone(),
            reason: reason.clone(),
        })
        .with_suggestion("Exclude patterns use glob syntax, e.g. '**/testdata/**'"),
        DepwatchError::FileSystemError {
            operation,
            path,
        } => ErrorContext::new(DepwatchError::FileSystemError {
            operation: operation.clone(),
            path: path.clone(),
        })
        .with_suggestion("Check that the path exists and you have the necessary permissions")
        .with_details(format!("Failed to {operation} at path: {path}")),
        other => ErrorContext::new(DepwatchError::Other {
            message: other.to_string(),
        })
        .with_suggestion("Re-run with --verbose for more details"),
    }
}
