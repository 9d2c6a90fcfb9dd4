//! Clients for the registries and APIs consulted during enrichment.
//!
//! Every call goes through one shared [`HttpClient`], so all of them benefit
//! from the persistent HTTP cache. Base URLs come from [`Endpoints`] and can be
//! pointed at mirrors (or test servers) from the config file.
//!
//! | Lookup | Endpoint |
//! |---|---|
//! | GitHub repository status | `{github}/repos/{owner}/{repo}` |
//! | Go vanity import | `{go_import_prefix}{module}?go-get=1` |
//! | npm latest version | `{npm}/{name}/latest` |
//! | PyPI project | `{pypi}/{name}/json` |
//! | RubyGems gem | `{rubygems}/{name}.json` |
//! | End-of-life cycle | `{eol}/{product}/{cycle}.json` |
//! | Docker Hub tag | `{dockerhub}/namespaces/{ns}/repositories/{repo}/tags/{tag}` |
//! | gcr.io tag list | `{gcr}/{ns}/{repo}/tags/list` |

mod dockerhub;
mod eol;
mod gcr;
mod github;
mod gopkg;
mod npm;
mod pypi;
mod rubygems;

pub use eol::CycleStatus;
pub use github::RepositoryStatus;

use crate::http::HttpClient;
use crate::models::RepoCoordinates;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Base URLs of every external service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub github: String,
    pub npm: String,
    pub pypi: String,
    pub rubygems: String,
    /// Prefix prepended to a Go module path to fetch its `go-get` page.
    pub go_import_prefix: String,
    pub eol: String,
    pub dockerhub: String,
    pub gcr: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            github: "https://api.github.com".to_string(),
            npm: "https://registry.npmjs.org".to_string(),
            pypi: "https://pypi.org/pypi".to_string(),
            rubygems: "https://rubygems.org/api/v1/gems".to_string(),
            go_import_prefix: "https://".to_string(),
            eol: "https://endoflife.date/api".to_string(),
            dockerhub: "https://hub.docker.com/v2".to_string(),
            gcr: "https://gcr.io/v2".to_string(),
        }
    }
}

impl Endpoints {
    /// Point every endpoint at `base`, using the default paths below it.
    ///
    /// Handy for routing all lookups to a single mock server.
    pub fn all_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            github: format!("{base}/github"),
            npm: format!("{base}/npm"),
            pypi: format!("{base}/pypi"),
            rubygems: format!("{base}/rubygems"),
            go_import_prefix: format!("{base}/go/"),
            eol: format!("{base}/eol"),
            dockerhub: format!("{base}/dockerhub"),
            gcr: format!("{base}/gcr"),
        }
    }
}

/// Registry lookups sharing one HTTP client.
#[derive(Debug, Clone)]
pub struct Registries {
    client: HttpClient,
    endpoints: Endpoints,
    github_token: Option<String>,
}

impl Registries {
    pub fn new(client: HttpClient, endpoints: Endpoints, github_token: Option<String>) -> Self {
        Self {
            client,
            endpoints,
            github_token,
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }
}

fn github_url_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://github\.com/([\w.-]+)/([\w.-]+)").ok()).as_ref()
}

/// First `https://github.com/owner/repo` URL appearing anywhere in `text`.
pub fn find_github_repository(text: &str) -> Option<RepoCoordinates> {
    github_url_regex()?.captures_iter(text).find_map(|caps| {
        let owner = caps.get(1)?.as_str();
        let repo = caps.get(2)?.as_str().trim_end_matches('.');
        if repo.is_empty() || repo == ".git" {
            return None;
        }
        Some(RepoCoordinates::new(owner, repo))
    })
}

/// Coordinates from a single repository URL.
///
/// Accepts the spellings found in package metadata: `git+https://…`,
/// `git://…`, `git@github.com:owner/repo.git`, `github:owner/repo` and bare
/// `owner/repo` shorthand. Anything not hosted on GitHub yields `None`.
pub fn parse_github_url(url: &str) -> Option<RepoCoordinates> {
    let url = url.trim();
    let url = url.split('#').next().unwrap_or(url);

    let path = if let Some(rest) = url.strip_prefix("github:") {
        rest
    } else if let Some(rest) = url.strip_prefix("git@github.com:") {
        rest
    } else if let Some(index) = url.find("github.com/") {
        &url[index + "github.com/".len()..]
    } else if !url.contains(':') && url.matches('/').count() == 1 {
        url
    } else {
        return None;
    };

    let mut segments = path.split('/').filter(|s| !s.is_empty());
    let owner = segments.next()?;
    let repo = segments.next()?;
    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    if repo.is_empty() {
        return None;
    }
    Some(RepoCoordinates::new(owner, repo))
}
