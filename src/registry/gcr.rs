use super::Registries;
use crate::core::LookupError;
use crate::models::ImageReference;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct TagList {
    #[serde(default)]
    manifest: HashMap<String, Manifest>,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    tag: Vec<String>,
    #[serde(rename = "timeUploadedMs")]
    time_uploaded_ms: String,
}

impl Registries {
    /// Upload time of the gcr.io manifest carrying the reference's tag.
    pub(super) async fn gcr_last_update(
        &self,
        reference: &ImageReference,
    ) -> Result<DateTime<Utc>, LookupError> {
        let url = format!(
            "{}/{}/{}/tags/list",
            self.endpoints.gcr.trim_end_matches('/'),
            reference.namespace,
            reference.repository
        );
        let list: TagList = self.client.get_json(&url, None).await?;
        uploaded_at(&list, &reference.tag).map_err(|reason| match reason {
            Some(reason) => LookupError::Decode {
                url,
                reason,
            },
            None => LookupError::TagNotFound {
                tag: reference.tag.clone(),
            },
        })
    }

    /// Last update of an image tag, dispatched on its registry.
    pub async fn image_last_update(
        &self,
        reference: &ImageReference,
    ) -> Result<DateTime<Utc>, LookupError> {
        match reference.registry.as_str() {
            "docker.io" => self.dockerhub_last_update(reference).await,
            "gcr.io" => self.gcr_last_update(reference).await,
            other => Err(LookupError::UnsupportedRegistry {
                registry: other.to_string(),
            }),
        }
    }
}

/// `Err(None)` when no manifest carries `tag`, `Err(Some(_))` on a bad timestamp.
fn uploaded_at(list: &TagList, tag: &str) -> Result<DateTime<Utc>, Option<String>> {
    let manifest =
        list.manifest.values().find(|m| m.tag.iter().any(|t| t == tag)).ok_or(None)?;
    let millis: i64 = manifest
        .time_uploaded_ms
        .parse()
        .map_err(|_| Some(format!("invalid timeUploadedMs '{}'", manifest.time_uploaded_ms)))?;
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| Some(format!("timeUploadedMs {millis} out of range")))
}
