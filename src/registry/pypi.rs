use super::{Registries, find_github_repository};
use crate::core::LookupError;
use crate::models::RepoCoordinates;

impl Registries {
    /// First GitHub repository mentioned in the PyPI metadata of `name`.
    ///
    /// PyPI has no dedicated source field, so the whole document (project
    /// URLs, home page, long description) is searched.
    pub async fn pypi_repository(&self, name: &str) -> Result<RepoCoordinates, LookupError> {
        let url = format!("{}/{name}/json", self.endpoints.pypi.trim_end_matches('/'));
        let body = self.client.get_text(&url).await?;

        if let Err(e) = serde_json::from_str::<serde_json::Value>(&body) {
            return Err(LookupError::Decode {
                url,
                reason: e.to_string(),
            });
        }
        find_github_repository(&body).ok_or_else(|| LookupError::RepositoryNotFound {
            name: name.to_string(),
            reason: "no GitHub URL in package metadata".to_string(),
        })
    }
}
