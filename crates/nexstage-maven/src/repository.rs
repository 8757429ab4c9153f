//! Repository manager URL layout.

use nexstage_core::coordinate::Coordinates;

/// Path prefix of the Nexus 2 REST API.
pub const SERVICE_PATH: &str = "service/local";

/// Path prefix under which repository content is served.
pub const CONTENT_PATH: &str = "content/repositories";

/// URL builder for one repository manager instance.
#[derive(Debug, Clone)]
pub struct NexusLayout {
    base: String,
}

impl NexusLayout {
    pub fn new(base_url: &str) -> Self {
        Self {
            base: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// URL of a REST resource, e.g. `service("staging/profiles")`.
    pub fn service(&self, resource: &str) -> String {
        format!("{}/{SERVICE_PATH}/{}", self.base, resource.trim_start_matches('/'))
    }

    /// Upload base for a started staging repository.
    pub fn deploy_by_repository_id(&self, repository_id: &str) -> String {
        self.service(&format!("staging/deployByRepositoryId/{repository_id}"))
    }

    /// Public content URL of a staging repository, stored in records.
    pub fn repository_content(&self, repository_id: &str) -> String {
        format!("{}/{CONTENT_PATH}/{repository_id}", self.base)
    }
}

/// Full URL of `coordinates` within a plain Maven repository at `base_url`.
pub fn artifact_url(base_url: &str, coordinates: &Coordinates) -> String {
    join_url(base_url, &coordinates.repository_path())
}

/// Join a base URL and a `/` separated relative path.
pub fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
