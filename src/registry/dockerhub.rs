use super::Registries;
use crate::core::LookupError;
use crate::models::ImageReference;
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Tag {
    last_updated: Option<DateTime<Utc>>,
    tag_last_pushed: Option<DateTime<Utc>>,
}

impl Registries {
    /// When the Docker Hub tag was last updated.
    pub(super) async fn dockerhub_last_update(
        &self,
        reference: &ImageReference,
    ) -> Result<DateTime<Utc>, LookupError> {
        let url = format!(
            "{}/namespaces/{}/repositories/{}/tags/{}",
            self.endpoints.dockerhub.trim_end_matches('/'),
            reference.namespace,
            reference.repository,
            reference.tag
        );
        let tag: Tag = self.client.get_json(&url, None).await?;
        tag.last_updated.or(tag.tag_last_pushed).ok_or(LookupError::Decode {
            url,
            reason: "tag has no last_updated timestamp".to_string(),
        })
    }
}
