use super::Registries;
use crate::core::LookupError;
use crate::models::RepoCoordinates;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// The fields of a GitHub repository that matter for staleness.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepositoryStatus {
    #[serde(default)]
    pub archived: bool,
    pub pushed_at: Option<DateTime<Utc>>,
}

impl Registries {
    /// Archive flag and last push of `coordinates`.
    pub async fn repository_status(
        &self,
        coordinates: &RepoCoordinates,
    ) -> Result<RepositoryStatus, LookupError> {
        let url = format!(
            "{}/repos/{}/{}",
            self.endpoints.github.trim_end_matches('/'),
            coordinates.owner,
            coordinates.repo
        );
        self.client.get_json(&url, self.github_token.as_deref()).await
    }
}
