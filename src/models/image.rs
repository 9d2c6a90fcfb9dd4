use crate::core::LookupError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

const DEFAULT_REGISTRY: &str = "docker.io";
const DEFAULT_NAMESPACE: &str = "library";
const DEFAULT_TAG: &str = "latest";

/// A container base image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    /// Reference exactly as written in the Dockerfile
    pub raw: String,
    /// Parsed reference, filled by the first enrichment step
    pub reference: Option<ImageReference>,
    /// When the tag was last pushed
    pub last_update: Option<DateTime<Utc>>,
}

impl Image {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            reference: None,
            last_update: None,
        }
    }

    pub fn identity(&self) -> String {
        self.raw.clone()
    }
}

/// Normalized `registry/namespace/repository:tag`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageReference {
    pub registry: String,
    pub namespace: String,
    pub repository: String,
    pub tag: String,
}

impl ImageReference {
    /// Parse a reference such as `node:18`, `bitnami/redis` or
    /// `gcr.io/distroless/static:nonroot`.
    ///
    /// A digest suffix is dropped. References with more than three path
    /// segments are rejected.
    pub fn parse(raw: &str) -> Result<Self, LookupError> {
        let invalid = || LookupError::InvalidReference {
            reference: raw.to_string(),
        };

        let without_digest = raw.trim().split('@').next().unwrap_or_default();
        // A ':' before the last '/' belongs to a registry port, not a tag
        let (path, tag) = match without_digest.rfind(':') {
            Some(i) if !without_digest[i..].contains('/') => {
                (&without_digest[..i], &without_digest[i + 1..])
            }
            _ => (without_digest, DEFAULT_TAG),
        };
        if path.is_empty() || tag.is_empty() {
            return Err(invalid());
        }

        let segments: Vec<&str> = path.split('/').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(invalid());
        }
        let (registry, namespace, repository) = match segments.as_slice() {
            [repository] => (DEFAULT_REGISTRY, DEFAULT_NAMESPACE, *repository),
            [namespace, repository] => (DEFAULT_REGISTRY, *namespace, *repository),
            [registry, namespace, repository] => (*registry, *namespace, *repository),
            _ => return Err(invalid()),
        };

        Ok(Self {
            registry: registry.to_string(),
            namespace: namespace.to_string(),
            repository: repository.to_string(),
            tag: tag.to_string(),
        })
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}:{}", self.registry, self.namespace, self.repository, self.tag)
    }
}
