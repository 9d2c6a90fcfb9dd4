//! `package.json` parsing.
//!
//! Only runtime `dependencies` are checked; `devDependencies` are ignored.

use crate::models::{Dependency, Ecosystem, Language, Module};
use semver::VersionReq;
use serde::Deserialize;
use std::collections::BTreeMap;

/// Version specs that do not name a registry package.
const NON_REGISTRY_PREFIXES: &[&str] =
    &["file:", "link:", "workspace:", "git:", "git+", "github:", "http:", "https:"];

#[derive(Debug, Deserialize)]
struct PackageJson {
    #[serde(default)]
    dependencies: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    engines: Engines,
}

#[derive(Debug, Default, Deserialize)]
struct Engines {
    node: Option<String>,
}

pub(super) fn parse(content: &str) -> Result<Vec<Dependency>, String> {
    let package: PackageJson = serde_json::from_str(content).map_err(|e| e.to_string())?;
    let mut dependencies = Vec::new();

    if let Some(version) = package.engines.node.as_deref().and_then(node_version) {
        dependencies.push(Language::new("nodejs", version).into());
    }

    for (name, spec) in package.dependencies {
        let spec = spec.as_str().unwrap_or_default();
        if NON_REGISTRY_PREFIXES.iter().any(|p| spec.starts_with(p)) {
            tracing::debug!("Skipping non-registry dependency {name} ({spec})");
            continue;
        }
        dependencies.push(Module::new(Ecosystem::Npm, name).into());
    }
    Ok(dependencies)
}

/// Lowest version named by an `engines.node` range, e.g. `>=18.12` → `18.12`.
fn node_version(range: &str) -> Option<String> {
    let first = range.split("||").next()?.trim();
    let req = match VersionReq::parse(first) {
        Ok(req) => req,
        Err(e) => {
            tracing::debug!("Ignoring engines.node '{range}': {e}");
            return None;
        }
    };
    let comparator = req.comparators.first()?;
    Some(match comparator.minor {
        Some(minor) => format!("{}.{minor}", comparator.major),
        None => comparator.major.to_string(),
    })
}
