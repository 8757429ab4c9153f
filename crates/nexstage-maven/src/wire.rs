//! JSON shapes of the staging REST API.
//!
//! Most resources wrap their payload in a `data` envelope; a few (single
//! repository lookups) return the object bare, so responses are decoded
//! through [`Envelope`] which accepts both.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use nexstage_core::staging::{RepositoryState, StagingProfile, StagingRepositoryInfo};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::Wrapped { data } => data,
            Self::Bare(inner) => inner,
        }
    }
}

/// Request body wrapper: `{"data": ...}`.
#[derive(Debug, Serialize)]
pub struct DataRequest<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusDto {
    pub version: String,
    #[serde(default)]
    pub edition_short: Option<String>,
    #[serde(default)]
    pub app_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProfileDto {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl From<ProfileDto> for StagingProfile {
    fn from(dto: ProfileDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest<'a> {
    pub description: &'a str,
    #[serde(skip_serializing_if = "no_tags")]
    pub tags: &'a BTreeMap<String, String>,
}

fn no_tags(tags: &&BTreeMap<String, String>) -> bool {
    tags.is_empty()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub staged_repository_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRequest<'a> {
    pub staged_repository_ids: &'a [String],
    pub description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_drop_after_release: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging_profile_group: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryDto {
    pub repository_id: String,
    #[serde(default)]
    pub profile_id: String,
    #[serde(default)]
    pub profile_name: String,
    #[serde(rename = "type", default)]
    pub state: String,
    #[serde(default)]
    pub transitioning: bool,
    #[serde(rename = "repositoryURI", default)]
    pub repository_uri: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl RepositoryDto {
    /// Convert, using `fallback_url` when the server omitted the content URI.
    pub fn into_info(self, fallback_url: String) -> StagingRepositoryInfo {
        StagingRepositoryInfo {
            state: RepositoryState::from_server(&self.state),
            url: self.repository_uri.unwrap_or(fallback_url),
            repository_id: self.repository_id,
            profile_id: self.profile_id,
            profile_name: self.profile_name,
            transitioning: self.transitioning,
            description: self.description,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ActivityDto {
    pub name: String,
    #[serde(default)]
    pub events: Vec<ActivityEventDto>,
}

#[derive(Debug, Deserialize)]
pub struct ActivityEventDto {
    pub name: String,
    #[serde(default)]
    pub properties: Vec<PropertyDto>,
}

#[derive(Debug, Deserialize)]
pub struct PropertyDto {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_accepts_wrapped_and_bare() {
        let wrapped: Envelope<ProfileDto> =
            serde_json::from_str(r#"{"data":{"id":"p1","name":"Example"}}"#).unwrap();
        assert_eq!(wrapped.into_inner().id, "p1");
        let bare: Envelope<ProfileDto> =
            serde_json::from_str(r#"{"id":"p2","name":"Other"}"#).unwrap();
        assert_eq!(bare.into_inner().name, "Other");
    }

    #[test]
    fn bulk_request_omits_unset_fields() {
        let ids = vec!["r1".to_string()];
        let body = DataRequest {
            data: BulkRequest {
                staged_repository_ids: &ids,
                description: "close",
                auto_drop_after_release: None,
                staging_profile_group: None,
            },
        };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(
            json,
            r#"{"data":{"stagedRepositoryIds":["r1"],"description":"close"}}"#
        );
    }

    #[test]
    fn repository_dto_maps_state() {
        let dto: RepositoryDto = serde_json::from_str(
            r#"{"repositoryId":"r1","profileId":"p1","profileName":"Ex","type":"closed","transitioning":true}"#,
        )
        .unwrap();
        let info = dto.into_info("http://fallback/r1".to_string());
        assert_eq!(info.state, RepositoryState::Closed);
        assert!(info.transitioning);
        assert_eq!(info.url, "http://fallback/r1");
    }
}
