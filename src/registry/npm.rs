use super::{Registries, parse_github_url};
use crate::core::LookupError;
use crate::models::RepoCoordinates;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct LatestVersion {
    repository: Option<Repository>,
}

/// `repository` is either `{ "type": "git", "url": "…" }` or a bare string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Repository {
    Detailed {
        #[serde(default)]
        url: String,
    },
    Shorthand(String),
}

impl Registries {
    /// Source repository of the latest published version of `name`.
    pub async fn npm_repository(&self, name: &str) -> Result<RepoCoordinates, LookupError> {
        let url = format!("{}/{name}/latest", self.endpoints.npm.trim_end_matches('/'));
        let latest: LatestVersion = self.client.get_json(&url, None).await?;

        let not_found = |reason: String| LookupError::RepositoryNotFound {
            name: name.to_string(),
            reason,
        };
        let repository = match latest.repository {
            Some(Repository::Detailed {
                url,
            })
            | Some(Repository::Shorthand(url)) => url,
            None => return Err(not_found("package has no repository field".to_string())),
        };
        parse_github_url(&repository)
            .ok_or_else(|| not_found(format!("unsupported repository {repository}")))
    }
}
