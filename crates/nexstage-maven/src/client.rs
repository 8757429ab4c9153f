//! Blocking client for the Nexus 2 staging REST API.

use std::collections::BTreeMap;
use std::path::Path;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;

use nexstage_core::config::ServerCredentials;
use nexstage_core::coordinate::Coordinates;
use nexstage_core::staging::{RepositoryState, StagingProfile, StagingRepositoryInfo};
use nexstage_util::errors::{NexstageError, NexstageResult};

use crate::activity;
use crate::auth;
use crate::connection::ServerStatus;
use crate::error_body;
use crate::repository::{join_url, NexusLayout};
use crate::service::{Capabilities, StagingService};
use crate::upload;
use crate::wait::{wait_until_settled, WaitPolicy};
use crate::wire::{
    ActivityDto, BulkRequest, DataRequest, Envelope, ProfileDto, RepositoryDto, StartRequest,
    StartResponse,
};

/// A connected staging session. Obtain one through
/// [`crate::connection::connect`].
#[derive(Debug, Clone)]
pub struct NexusClient {
    http: Client,
    layout: NexusLayout,
    credentials: Option<ServerCredentials>,
    status: ServerStatus,
    capabilities: Capabilities,
    wait: WaitPolicy,
}

impl NexusClient {
    pub fn new(
        http: Client,
        layout: NexusLayout,
        credentials: Option<ServerCredentials>,
        status: ServerStatus,
        capabilities: Capabilities,
        wait: WaitPolicy,
    ) -> Self {
        Self {
            http,
            layout,
            credentials,
            status,
            capabilities,
            wait,
        }
    }

    pub fn status(&self) -> &ServerStatus {
        &self.status
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn credentials(&self) -> Option<&ServerCredentials> {
        self.credentials.as_ref()
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        auth::apply_auth(
            builder.header("Accept", "application/json"),
            self.credentials.as_ref(),
        )
    }

    fn get_json<T: DeserializeOwned>(&self, resource: &str) -> NexstageResult<T> {
        let url = self.layout.service(resource);
        let body = self.send(self.request(self.http.get(&url)), &url)?;
        decode(&body, &url)
    }

    fn post_json<B: Serialize>(&self, resource: &str, body: &B) -> NexstageResult<String> {
        let url = self.layout.service(resource);
        self.send(self.request(self.http.post(&url)).json(body), &url)
    }

    fn send(&self, req: RequestBuilder, url: &str) -> NexstageResult<String> {
        tracing::debug!("Nexus request: {url}");
        let resp = req
            .send()
            .map_err(|e| NexstageError::remote(None, format!("Request to {url} failed: {e}")))?;
        let status = resp.status();
        let body = resp.text().map_err(|e| {
            NexstageError::remote(
                Some(status.as_u16()),
                format!("Failed to read response from {url}: {e}"),
            )
        })?;
        if status.is_success() {
            return Ok(body);
        }
        let detail = error_body::summarize(&body);
        let message = match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                format!("Access denied to {url}: {detail}")
            }
            StatusCode::NOT_FOUND => format!("Not found: {url}: {detail}"),
            _ => format!("{url}: {detail}"),
        };
        Err(NexstageError::remote(Some(status.as_u16()), message))
    }

    fn bulk(&self, action: &str, request: BulkRequest<'_>) -> NexstageResult<()> {
        self.post_json(&format!("staging/bulk/{action}"), &DataRequest { data: request })?;
        Ok(())
    }

    fn settle(&self, repository_ids: &[String]) -> NexstageResult<Vec<StagingRepositoryInfo>> {
        wait_until_settled(repository_ids, self.wait, |id| self.get_repository(id))
    }

    /// Fail unless every repository in `settled` reached `expected`. Rule
    /// failures recorded by the `activity_name` activity take precedence
    /// over a plain state mismatch.
    fn check_transition(
        &self,
        settled: &[StagingRepositoryInfo],
        expected: RepositoryState,
        activity_name: &str,
    ) -> NexstageResult<()> {
        let mut failures = Vec::new();
        let mut stuck = Vec::new();
        for info in settled.iter().filter(|i| i.state != expected) {
            let activities = self.activities(&info.repository_id)?;
            match activity::rule_failures(activity_name, &info.repository_id, &activities) {
                Some(f) => failures.push(f),
                None => stuck.push(format!("{} is {}", info.repository_id, info.state)),
            }
        }
        if !failures.is_empty() {
            return Err(NexstageError::RuleFailure(failures));
        }
        if !stuck.is_empty() {
            return Err(NexstageError::remote(
                None,
                format!("{activity_name} did not complete: {}", stuck.join(", ")),
            ));
        }
        Ok(())
    }

    fn activities(&self, repository_id: &str) -> NexstageResult<Vec<ActivityDto>> {
        self.get_json::<Envelope<Vec<ActivityDto>>>(&format!(
            "staging/repository/{repository_id}/activity"
        ))
        .map(Envelope::into_inner)
    }
}

fn decode<T: DeserializeOwned>(body: &str, url: &str) -> NexstageResult<T> {
    serde_json::from_str(body)
        .map_err(|e| NexstageError::remote(None, format!("Malformed response from {url}: {e}")))
}

impl StagingService for NexusClient {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn list_profiles(&self) -> NexstageResult<Vec<StagingProfile>> {
        let profiles: Envelope<Vec<ProfileDto>> = self.get_json("staging/profiles")?;
        Ok(profiles.into_inner().into_iter().map(Into::into).collect())
    }

    fn select_profile(&self, profile_id: &str) -> NexstageResult<StagingProfile> {
        let profile: Envelope<ProfileDto> = self
            .get_json(&format!("staging/profiles/{profile_id}"))
            .map_err(|e| match e {
                NexstageError::RemoteProtocol {
                    status: Some(404), ..
                } => NexstageError::configuration(format!(
                    "Staging profile '{profile_id}' does not exist or is not accessible"
                )),
                other => other,
            })?;
        Ok(profile.into_inner().into())
    }

    fn match_profile(&self, coordinates: &Coordinates) -> NexstageResult<StagingProfile> {
        let url = self.layout.service("staging/profile_evaluate");
        let req = self.request(self.http.get(&url)).query(&[
            ("t", "maven2"),
            ("g", coordinates.group_id.as_str()),
            ("a", coordinates.artifact_id.as_str()),
            ("v", coordinates.version.as_str()),
        ]);
        let matched: Envelope<Vec<ProfileDto>> = decode(&self.send(req, &url)?, &url)?;
        matched
            .into_inner()
            .into_iter()
            .next()
            .map(Into::into)
            .ok_or_else(|| {
                NexstageError::configuration(format!(
                    "No staging profile matches {}; set profile-id explicitly",
                    coordinates.gav()
                ))
            })
    }

    fn start_staging(
        &self,
        profile: &StagingProfile,
        description: &str,
        tags: &BTreeMap<String, String>,
    ) -> NexstageResult<String> {
        let resource = format!("staging/profiles/{}/start", profile.id);
        let body = self.post_json(
            &resource,
            &DataRequest {
                data: StartRequest { description, tags },
            },
        )?;
        let started: Envelope<StartResponse> = decode(&body, &self.layout.service(&resource))?;
        Ok(started.into_inner().staged_repository_id)
    }

    fn repository_url(&self, repository_id: &str) -> String {
        self.layout.repository_content(repository_id)
    }

    fn deploy_file(&self, repository_id: &str, path: &str, file: &Path) -> NexstageResult<()> {
        let url = join_url(&self.layout.deploy_by_repository_id(repository_id), path);
        upload::put_file(&self.http, self.credentials.as_ref(), &url, file)
    }

    fn finish_staging(&self, repository_ids: &[String], description: &str) -> NexstageResult<()> {
        self.bulk(
            "close",
            BulkRequest {
                staged_repository_ids: repository_ids,
                description,
                auto_drop_after_release: None,
                staging_profile_group: None,
            },
        )?;

        let settled = self.settle(repository_ids)?;
        self.check_transition(&settled, RepositoryState::Closed, activity::CLOSE_ACTIVITY)
    }

    fn drop_staging(&self, repository_ids: &[String], description: &str) -> NexstageResult<()> {
        self.bulk(
            "drop",
            BulkRequest {
                staged_repository_ids: repository_ids,
                description,
                auto_drop_after_release: None,
                staging_profile_group: None,
            },
        )
    }

    fn release_staging(
        &self,
        repository_ids: &[String],
        description: &str,
        auto_drop: bool,
    ) -> NexstageResult<()> {
        let auto_drop_after_release = if self.capabilities.extended_release {
            Some(auto_drop)
        } else {
            if auto_drop {
                tracing::warn!(
                    "Nexus {} cannot drop after release; repositories stay until dropped",
                    self.status.raw_version
                );
            }
            None
        };
        self.bulk(
            "promote",
            BulkRequest {
                staged_repository_ids: repository_ids,
                description,
                auto_drop_after_release,
                staging_profile_group: None,
            },
        )?;
        if auto_drop_after_release == Some(true) {
            // Repositories vanish once released; there is nothing left to poll.
            return Ok(());
        }
        let settled = self.settle(repository_ids)?;
        self.check_transition(&settled, RepositoryState::Released, activity::RELEASE_ACTIVITY)
    }

    fn promote_staging(
        &self,
        repository_ids: &[String],
        group_profile_id: &str,
        description: &str,
    ) -> NexstageResult<()> {
        self.bulk(
            "promote",
            BulkRequest {
                staged_repository_ids: repository_ids,
                description,
                auto_drop_after_release: None,
                staging_profile_group: Some(group_profile_id),
            },
        )
    }

    fn list_repositories(
        &self,
        profile_id: Option<&str>,
    ) -> NexstageResult<Vec<StagingRepositoryInfo>> {
        let resource = match profile_id {
            Some(id) => format!("staging/profile_repositories/{id}"),
            None => "staging/profile_repositories".to_string(),
        };
        let repos: Envelope<Vec<RepositoryDto>> = self.get_json(&resource)?;
        Ok(repos
            .into_inner()
            .into_iter()
            .map(|dto| {
                let fallback = self.repository_url(&dto.repository_id);
                dto.into_info(fallback)
            })
            .collect())
    }

    fn get_repository(&self, repository_id: &str) -> NexstageResult<StagingRepositoryInfo> {
        let dto: Envelope<RepositoryDto> =
            self.get_json(&format!("staging/repository/{repository_id}"))?;
        Ok(dto
            .into_inner()
            .into_info(self.repository_url(repository_id)))
    }
}
