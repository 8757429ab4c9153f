//! The remote operations staging depends on.
//!
//! [`crate::client::NexusClient`] implements these against a live server;
//! lifecycle code only sees the traits so it can run against any backend.

use std::collections::BTreeMap;
use std::path::Path;

use nexstage_core::coordinate::Coordinates;
use nexstage_core::staging::{StagingProfile, StagingRepositoryInfo};
use nexstage_util::errors::NexstageResult;

/// What the connected server supports, resolved once at connect time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Release accepts a per-action `autoDropAfterRelease` flag.
    pub extended_release: bool,
}

/// Server-side staging operations.
pub trait StagingService: Send + Sync {
    fn capabilities(&self) -> Capabilities;

    fn list_profiles(&self) -> NexstageResult<Vec<StagingProfile>>;

    /// Look up a profile by its ID.
    fn select_profile(&self, profile_id: &str) -> NexstageResult<StagingProfile>;

    /// Ask the server which profile `coordinates` belong to.
    fn match_profile(&self, coordinates: &Coordinates) -> NexstageResult<StagingProfile>;

    /// Open a new staging repository and return the server-assigned ID.
    fn start_staging(
        &self,
        profile: &StagingProfile,
        description: &str,
        tags: &BTreeMap<String, String>,
    ) -> NexstageResult<String>;

    /// Content URL of a staging repository.
    fn repository_url(&self, repository_id: &str) -> String;

    /// Upload one file to `path` (repository layout, `/` separated) of an
    /// open staging repository.
    fn deploy_file(&self, repository_id: &str, path: &str, file: &Path) -> NexstageResult<()>;

    /// Close the repositories and wait for the transition to settle. Fails
    /// with `RuleFailure` when staging rules rejected any of them.
    fn finish_staging(&self, repository_ids: &[String], description: &str) -> NexstageResult<()>;

    fn drop_staging(&self, repository_ids: &[String], description: &str) -> NexstageResult<()>;

    /// Release closed repositories. `auto_drop` is only honoured when
    /// [`Capabilities::extended_release`] is set.
    fn release_staging(
        &self,
        repository_ids: &[String],
        description: &str,
        auto_drop: bool,
    ) -> NexstageResult<()>;

    /// Promote closed repositories into a build promotion profile group.
    fn promote_staging(
        &self,
        repository_ids: &[String],
        group_profile_id: &str,
        description: &str,
    ) -> NexstageResult<()>;

    fn list_repositories(&self, profile_id: Option<&str>)
        -> NexstageResult<Vec<StagingRepositoryInfo>>;

    fn get_repository(&self, repository_id: &str) -> NexstageResult<StagingRepositoryInfo>;
}

/// Plain uploads into a Maven layout at a fixed base URL, for the deferred
/// and direct strategies.
pub trait ArtifactUploader: Send + Sync {
    fn upload(&self, base_url: &str, path: &str, file: &Path) -> NexstageResult<()>;
}
