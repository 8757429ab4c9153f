//! The read-only configuration bag handed to every staging component.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use nexstage_util::errors::{NexstageError, NexstageResult};

use crate::config::ServerCredentials;
use crate::manifest::{DeployMode, StagingConfig};

/// Default local staging area, relative to the project root.
pub const DEFAULT_STAGING_DIR: &str = "target/nexus-staging";

const DEFAULT_PROGRESS_TIMEOUT_MINUTES: u64 = 5;
const DEFAULT_PROGRESS_PAUSE_SECONDS: u64 = 3;
const DEFAULT_REACTOR_TIMEOUT_SECONDS: u64 = 600;

/// Staging parameters with every default applied. Built once per goal
/// invocation and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Parameters {
    pub nexus_url: Option<String>,
    pub server_id: Option<String>,
    pub credentials: Option<ServerCredentials>,
    pub profile_id: Option<String>,
    pub repository_id: Option<String>,
    pub description: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub mode: DeployMode,
    pub snapshot_url: Option<String>,
    pub deferred_url: Option<String>,
    pub release_url: Option<String>,
    pub staging_dir: PathBuf,
    pub keep_on_failure: bool,
    pub keep_on_rule_failure: bool,
    pub skip_close: bool,
    pub skip_remote: bool,
    pub auto_release: bool,
    pub auto_drop_after_release: bool,
    pub detect_build_failures: bool,
    pub require_tls: bool,
    pub ssl_insecure: bool,
    pub ssl_allow_all: bool,
    pub extra_checksums: bool,
    pub progress_timeout: Duration,
    pub progress_pause: Duration,
    pub reactor_timeout: Duration,
    /// Identity sent as `User-Agent` and used in default descriptions.
    pub agent: String,
}

impl Parameters {
    /// Apply defaults to `config`. Relative `staging-dir` values are
    /// resolved against `project_root`.
    pub fn from_config(config: &StagingConfig, project_root: &Path) -> Self {
        let staging_dir = config
            .staging_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STAGING_DIR));
        let staging_dir = if staging_dir.is_absolute() {
            staging_dir
        } else {
            project_root.join(staging_dir)
        };

        Self {
            nexus_url: config.nexus_url.as_deref().map(trim_url),
            server_id: config.server_id.clone(),
            credentials: None,
            profile_id: non_empty(&config.profile_id),
            repository_id: non_empty(&config.repository_id),
            description: config.description.clone(),
            tags: config.tags.clone(),
            mode: config.mode.unwrap_or_default(),
            snapshot_url: config.snapshot_url.as_deref().map(trim_url),
            deferred_url: config.deferred_url.as_deref().map(trim_url),
            release_url: config.release_url.as_deref().map(trim_url),
            staging_dir,
            keep_on_failure: config.keep_on_failure.unwrap_or(false),
            keep_on_rule_failure: config.keep_on_rule_failure.unwrap_or(false),
            skip_close: config.skip_close.unwrap_or(false),
            skip_remote: config.skip_remote.unwrap_or(false),
            auto_release: config.auto_release.unwrap_or(false),
            auto_drop_after_release: config.auto_drop_after_release.unwrap_or(true),
            detect_build_failures: config.detect_build_failures.unwrap_or(true),
            require_tls: config.require_tls.unwrap_or(false),
            ssl_insecure: config.ssl_insecure.unwrap_or(false),
            ssl_allow_all: config.ssl_allow_all.unwrap_or(false),
            extra_checksums: config.extra_checksums.unwrap_or(false),
            progress_timeout: Duration::from_secs(
                60 * config
                    .progress_timeout_minutes
                    .unwrap_or(DEFAULT_PROGRESS_TIMEOUT_MINUTES),
            ),
            progress_pause: Duration::from_secs(
                config
                    .progress_pause_seconds
                    .unwrap_or(DEFAULT_PROGRESS_PAUSE_SECONDS),
            ),
            reactor_timeout: Duration::from_secs(
                config
                    .reactor_timeout_seconds
                    .unwrap_or(DEFAULT_REACTOR_TIMEOUT_SECONDS),
            ),
            agent: default_agent(),
        }
    }

    pub fn with_credentials(mut self, credentials: Option<ServerCredentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = agent.into();
        self
    }

    /// The repository manager URL, required by every remote staging goal.
    pub fn require_nexus_url(&self) -> NexstageResult<&str> {
        self.nexus_url
            .as_deref()
            .ok_or_else(|| NexstageError::configuration("No nexus-url configured"))
    }

    /// Local area holding one directory (and one record) per staged profile.
    pub fn staging_root(&self) -> PathBuf {
        self.staging_dir.join("staging")
    }

    /// Local area for the deferred strategy.
    pub fn deferred_root(&self) -> PathBuf {
        self.staging_dir.join("deferred")
    }

    /// Description for server-side actions, falling back to `fallback`.
    pub fn description_or(&self, fallback: &str) -> String {
        match &self.description {
            Some(d) if !d.trim().is_empty() => d.clone(),
            _ => fallback.to_string(),
        }
    }
}

fn default_agent() -> String {
    format!("nexstage/{}", env!("CARGO_PKG_VERSION"))
}

fn trim_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
