//! Manifest detection and parsing.
//!
//! A manifest is recognized by file name alone:
//!
//! | File | Produces |
//! |---|---|
//! | `go.mod` | `go` runtime, Go modules |
//! | `package.json` | `nodejs` runtime (from `engines.node`), npm packages |
//! | `Gemfile` | `ruby` runtime, gems |
//! | `requirements*.txt` | PyPI packages |
//! | `Dockerfile`, `Dockerfile.*`, `*.dockerfile` | base images |
//!
//! Parsers are pure functions over the file content; [`parse_manifest`] reads
//! the file and attaches the path to any failure.

mod discovery;
mod dockerfile;
mod gemfile;
mod gomod;
mod package_json;
mod requirements;

pub use discovery::{ExcludeSet, discover_manifests};

use crate::core::DepwatchError;
use crate::models::Dependency;
use std::path::Path;

/// Supported manifest formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestKind {
    GoMod,
    PackageJson,
    Gemfile,
    Requirements,
    Dockerfile,
}

impl ManifestKind {
    /// Format of the file at `path`, judged by its name.
    pub fn detect(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let lower = name.to_ascii_lowercase();
        match name {
            "go.mod" => Some(Self::GoMod),
            "package.json" => Some(Self::PackageJson),
            "Gemfile" => Some(Self::Gemfile),
            _ if lower.starts_with("requirements") && lower.ends_with(".txt") => {
                Some(Self::Requirements)
            }
            _ if lower == "dockerfile"
                || lower.starts_with("dockerfile.")
                || lower.ends_with(".dockerfile") =>
            {
                Some(Self::Dockerfile)
            }
            _ => None,
        }
    }

    /// Extract dependencies from `content`.
    ///
    /// On failure the error is a human-readable reason.
    pub fn parse(self, content: &str) -> Result<Vec<Dependency>, String> {
        match self {
            Self::GoMod => gomod::parse(content),
            Self::PackageJson => package_json::parse(content),
            Self::Gemfile => gemfile::parse(content),
            Self::Requirements => requirements::parse(content),
            Self::Dockerfile => dockerfile::parse(content),
        }
    }
}

/// Read and parse the manifest at `path`.
///
/// # Errors
///
/// - [`DepwatchError::UnsupportedManifest`] if the file name is not recognized
/// - [`DepwatchError::FileSystemError`] if the file cannot be read
/// - [`DepwatchError::ManifestParseError`] if the content is malformed
pub fn parse_manifest(path: &Path) -> Result<Vec<Dependency>, DepwatchError> {
    let file = path.display().to_string();
    let kind = ManifestKind::detect(path).ok_or_else(|| DepwatchError::UnsupportedManifest {
        file: file.clone(),
    })?;

    let content = std::fs::read_to_string(path).map_err(|e| DepwatchError::FileSystemError {
        operation: format!("read manifest ({e})"),
        path: file.clone(),
    })?;

    kind.parse(&content).map_err(|reason| DepwatchError::ManifestParseError {
        file,
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_detect() {
        let cases = [
            ("go.mod", Some(ManifestKind::GoMod)),
            ("web/package.json", Some(ManifestKind::PackageJson)),
            ("Gemfile", Some(ManifestKind::Gemfile)),
            ("Gemfile.lock", None),
            ("requirements.txt", Some(ManifestKind::Requirements)),
            ("requirements-dev.txt", Some(ManifestKind::Requirements)),
            ("Dockerfile", Some(ManifestKind::Dockerfile)),
            ("Dockerfile.prod", Some(ManifestKind::Dockerfile)),
            ("build.dockerfile", Some(ManifestKind::Dockerfile)),
            ("go.sum", None),
            ("package-lock.json", None),
        ];
        for (name, expected) in cases {
            assert_eq!(ManifestKind::detect(Path::new(name)), expected, "{name}");
        }
    }

    #[test]
    fn test_parse_manifest_reports_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("package.json");
        std::fs::write(&path, "{ not json").unwrap();

        match parse_manifest(&path) {
            Err(DepwatchError::ManifestParseError {
                file,
                ..
            }) => assert!(file.ends_with("package.json")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_parse_manifest_unsupported() {
        let err = parse_manifest(Path::new("Cargo.toml")).unwrap_err();
        assert!(matches!(err, DepwatchError::UnsupportedManifest { .. }));
    }
}
