use super::{Registries, parse_github_url};
use crate::core::LookupError;
use crate::models::RepoCoordinates;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Gem {
    source_code_uri: Option<String>,
    documentation_uri: Option<String>,
    homepage_uri: Option<String>,
}

impl Registries {
    /// Source repository of gem `name`.
    pub async fn rubygems_repository(&self, name: &str) -> Result<RepoCoordinates, LookupError> {
        let url = format!("{}/{name}.json", self.endpoints.rubygems.trim_end_matches('/'));
        let gem: Gem = self.client.get_json(&url, None).await?;

        [gem.source_code_uri, gem.documentation_uri, gem.homepage_uri]
            .into_iter()
            .flatten()
            .filter(|uri| uri.contains("github.com"))
            .find_map(|uri| parse_github_url(&uri))
            .ok_or_else(|| LookupError::RepositoryNotFound {
                name: name.to_string(),
                reason: "no GitHub source, documentation or homepage URI".to_string(),
            })
    }
}
