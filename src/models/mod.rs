//! Dependency records and enrichment results.
//!
//! A manifest parser produces [`Dependency`] values. Each is enriched once by
//! the [`Enricher`](crate::enrich::Enricher), which fills in the fields below
//! and wraps the record into a [`Finding`] together with its error slot.

mod image;

pub use image::{Image, ImageReference};

use crate::core::LookupError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Package ecosystem a [`Module`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    /// Go modules (`go.mod`)
    Go,
    /// npm packages (`package.json`)
    Npm,
    /// Python packages (`requirements.txt`)
    #[serde(rename = "pypi")]
    PyPI,
    /// Ruby gems (`Gemfile`)
    #[serde(rename = "rubygems")]
    RubyGems,
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Go => "go",
            Self::Npm => "npm",
            Self::PyPI => "pypi",
            Self::RubyGems => "rubygems",
        };
        f.write_str(name)
    }
}

/// `owner/repo` on GitHub.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoCoordinates {
    /// User or organization
    pub owner: String,
    /// Repository name
    pub repo: String,
}

impl RepoCoordinates {
    /// Create coordinates, dropping a trailing `.git`.
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        let repo = repo.into();
        let repo = repo.strip_suffix(".git").map(str::to_owned).unwrap_or(repo);
        Self {
            owner: owner.into(),
            repo,
        }
    }
}

impl fmt::Display for RepoCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// A third-party package whose source repository is checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    /// Package name as written in the manifest
    pub name: String,
    /// Registry the name belongs to
    pub ecosystem: Ecosystem,
    /// Resolved source repository
    pub repository: Option<RepoCoordinates>,
    /// Whether the source repository is archived
    pub archived: bool,
    /// Last push to the source repository
    pub last_push: Option<DateTime<Utc>>,
}

impl Module {
    pub fn new(ecosystem: Ecosystem, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ecosystem,
            repository: None,
            archived: false,
            last_push: None,
        }
    }

    /// `ecosystem:name`
    pub fn identity(&self) -> String {
        format!("{}:{}", self.ecosystem, self.name)
    }
}

/// A language runtime version checked against endoflife.date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    /// endoflife.date product name (`go`, `nodejs`, `ruby`, ...)
    pub name: String,
    /// Version as declared in the manifest
    pub version: String,
    /// Cycle is flagged end-of-life without a date
    pub eol: bool,
    /// Date the cycle reaches (or reached) end of life
    pub eol_date: Option<NaiveDate>,
}

impl Language {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            eol: false,
            eol_date: None,
        }
    }

    /// `name@version`
    pub fn identity(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }

    /// Release cycle used by endoflife.date.
    ///
    /// Node.js cycles are the major version; every other product uses
    /// `major.minor`.
    pub fn cycle(&self) -> Result<String, LookupError> {
        let invalid = || LookupError::InvalidVersion {
            name: self.name.clone(),
            version: self.version.clone(),
        };
        let version = self.version.trim().trim_start_matches('v');
        let mut parts = version.split('.');
        let major = parts.next().filter(|p| is_number(p)).ok_or_else(invalid)?;
        if self.name == "nodejs" {
            return Ok(major.to_string());
        }
        let minor = parts.next().filter(|p| is_number(p)).ok_or_else(invalid)?;
        Ok(format!("{major}.{minor}"))
    }
}

fn is_number(part: &str) -> bool {
    !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit())
}

/// Which of the three record kinds a [`Dependency`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyKind {
    Module,
    Language,
    Image,
}

/// One unit of work extracted from a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dependency {
    Module(Module),
    Language(Language),
    Image(Image),
}

impl Dependency {
    pub fn kind(&self) -> DependencyKind {
        match self {
            Self::Module(_) => DependencyKind::Module,
            Self::Language(_) => DependencyKind::Language,
            Self::Image(_) => DependencyKind::Image,
        }
    }

    /// Memoization key, unique within a kind.
    pub fn identity(&self) -> String {
        match self {
            Self::Module(m) => m.identity(),
            Self::Language(l) => l.identity(),
            Self::Image(i) => i.identity(),
        }
    }

    /// Name shown in report lines.
    pub fn display_name(&self) -> String {
        match self {
            Self::Module(m) => m.name.clone(),
            Self::Language(l) => format!("{}{}", short_language_name(&l.name), l.version),
            Self::Image(i) => i.raw.clone(),
        }
    }
}

fn short_language_name(name: &str) -> &str {
    match name {
        "nodejs" => "node",
        other => other,
    }
}

impl From<Module> for Dependency {
    fn from(module: Module) -> Self {
        Self::Module(module)
    }
}

impl From<Language> for Dependency {
    fn from(language: Language) -> Self {
        Self::Language(language)
    }
}

impl From<Image> for Dependency {
    fn from(image: Image) -> Self {
        Self::Image(image)
    }
}

/// An enriched dependency plus its error slot.
///
/// Fields filled before a failing step are kept alongside the error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub dependency: Dependency,
    pub error: Option<LookupError>,
}

impl Finding {
    pub fn new(dependency: Dependency, error: Option<LookupError>) -> Self {
        Self {
            dependency,
            error,
        }
    }
}
