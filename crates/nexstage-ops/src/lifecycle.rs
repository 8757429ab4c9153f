//! Server-side staging repository lifecycle.
//!
//! For each locally staged profile directory: open (or adopt) a staging
//! repository, upload the directory, record it. Then close every managed
//! repository in one bulk action and optionally release them. Upload and
//! close failures drop every managed repository opened by this run.

use std::path::PathBuf;

use nexstage_core::parameters::Parameters;
use nexstage_core::registry::StagingRepositoryRegistry;
use nexstage_core::staging::{RepositoryState, StagingProfile, StagingRepository};
use nexstage_maven::service::StagingService;
use nexstage_util::errors::{NexstageError, NexstageResult};
use nexstage_util::progress::{status, status_error, status_info, status_warn};

use crate::local_stage;

/// How the profile of a staged directory is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileSource {
    /// Resolved earlier in this run.
    Known(StagingProfile),
    /// Only the ID is known; it is looked up before anything is opened.
    ById(String),
}

/// One local directory to stage as one repository.
#[derive(Debug, Clone)]
pub struct StagedDirectory {
    /// Record key, normally the profile ID.
    pub key: String,
    pub directory: PathBuf,
    pub profile: ProfileSource,
}

/// What a finalize run did.
#[derive(Debug, Clone, Default)]
pub struct FinalizeReport {
    pub repositories: Vec<StagingRepository>,
    pub uploaded: usize,
    pub closed: bool,
    pub released: bool,
}

enum Target {
    Start(StagingProfile),
    Adopt(StagingRepository),
}

/// Drives staging repositories of one build through their lifecycle.
pub struct StagingCoordinator<'a> {
    service: &'a dyn StagingService,
    params: &'a Parameters,
    registry: StagingRepositoryRegistry,
}

impl<'a> StagingCoordinator<'a> {
    pub fn new(service: &'a dyn StagingService, params: &'a Parameters) -> Self {
        Self {
            service,
            params,
            registry: StagingRepositoryRegistry::new(params.staging_root()),
        }
    }

    pub fn registry(&self) -> &StagingRepositoryRegistry {
        &self.registry
    }

    /// Stage `directories` in order, then close and optionally release.
    pub fn finalize(&self, directories: Vec<StagedDirectory>) -> NexstageResult<FinalizeReport> {
        let mut report = FinalizeReport::default();
        if directories.is_empty() {
            status_warn("Skipping", "nothing was staged locally");
            return Ok(report);
        }

        // Every profile is resolved before the first repository opens.
        let targets = directories
            .into_iter()
            .map(|dir| self.resolve_target(&dir).map(|target| (dir, target)))
            .collect::<NexstageResult<Vec<_>>>()?;

        let mut opened: Vec<(String, StagingRepository)> = Vec::new();
        for (dir, target) in targets {
            let repo = match self.open(target) {
                Ok(repo) => repo,
                Err(e) => return Err(self.compensate(&opened, e)),
            };
            opened.push((dir.key.clone(), repo.clone()));

            match self.upload(&repo, &dir) {
                Ok(count) => report.uploaded += count,
                Err(e) => return Err(self.compensate(&opened, e)),
            }
            if let Err(e) = self.registry.record_created(&dir.key, &repo) {
                return Err(self.compensate(&opened, e));
            }
        }
        report.repositories = opened.iter().map(|(_, r)| r.clone()).collect();

        let managed: Vec<String> = opened
            .iter()
            .filter(|(_, r)| r.managed)
            .map(|(_, r)| r.repository_id.clone())
            .collect();
        if managed.is_empty() {
            tracing::info!("No repositories opened by this run; nothing to close");
            return Ok(report);
        }
        if self.params.skip_close {
            status_info("Skipping", &format!("close of {}", managed.join(", ")));
            return Ok(report);
        }

        status("Closing", &managed.join(", "));
        if let Err(e) = self
            .service
            .finish_staging(&managed, &self.describe("Closed"))
        {
            return Err(self.compensate(&opened, e));
        }
        report.closed = true;
        status("Closed", &managed.join(", "));

        if self.params.auto_release {
            self.release(&managed)?;
            report.released = true;
        }
        Ok(report)
    }

    fn resolve_target(&self, dir: &StagedDirectory) -> NexstageResult<Target> {
        if let Some(id) = &self.params.repository_id {
            return self.adopt(id).map(Target::Adopt);
        }
        let profile = match &dir.profile {
            ProfileSource::Known(profile) => profile.clone(),
            ProfileSource::ById(id) => self.service.select_profile(id)?,
        };
        Ok(Target::Start(profile))
    }

    fn adopt(&self, repository_id: &str) -> NexstageResult<StagingRepository> {
        let info = self.service.get_repository(repository_id).map_err(|e| match e {
            NexstageError::RemoteProtocol {
                status: Some(404), ..
            } => NexstageError::configuration(format!(
                "Staging repository '{repository_id}' does not exist"
            )),
            other => other,
        })?;
        if info.state != RepositoryState::Open {
            return Err(NexstageError::configuration(format!(
                "Staging repository '{repository_id}' is {}, not open",
                info.state
            )));
        }
        Ok(StagingRepository::unmanaged(
            &info.profile_id,
            &info.repository_id,
            &info.url,
        ))
    }

    fn open(&self, target: Target) -> NexstageResult<StagingRepository> {
        match target {
            Target::Adopt(repo) => {
                status_info(
                    "Reusing",
                    &format!("{} (not managed by this build)", repo.repository_id),
                );
                Ok(repo)
            }
            Target::Start(profile) => {
                let id = self.service.start_staging(
                    &profile,
                    &self.describe("Started"),
                    &self.params.tags,
                )?;
                status("Opened", &format!("{id} for profile {}", profile.name));
                Ok(StagingRepository::managed(
                    &profile.id,
                    &id,
                    &self.service.repository_url(&id),
                ))
            }
        }
    }

    fn upload(&self, repo: &StagingRepository, dir: &StagedDirectory) -> NexstageResult<usize> {
        let count = local_stage::upload_area(&dir.directory, "Uploading", |staged| {
            self.service
                .deploy_file(&repo.repository_id, &staged.path, &staged.file)
        })?;
        status(
            "Uploaded",
            &format!("{count} file(s) to {}", repo.repository_id),
        );
        Ok(count)
    }

    fn release(&self, ids: &[String]) -> NexstageResult<()> {
        status("Releasing", &ids.join(", "));
        let auto_drop = self.params.auto_drop_after_release;
        if let Err(e) = self
            .service
            .release_staging(ids, &self.describe("Released"), auto_drop)
        {
            log_rule_failures(&e);
            status_error("Release", &format!("failed; {} stay closed", ids.join(", ")));
            return Err(e);
        }
        status("Released", &ids.join(", "));
        Ok(())
    }

    /// Drop the managed repositories opened so far, unless a keep policy
    /// applies, and hand back `error` unchanged.
    fn compensate(
        &self,
        opened: &[(String, StagingRepository)],
        error: NexstageError,
    ) -> NexstageError {
        log_rule_failures(&error);
        if !error.requires_compensation() {
            return error;
        }

        let managed: Vec<&(String, StagingRepository)> =
            opened.iter().filter(|(_, r)| r.managed).collect();
        if managed.is_empty() {
            return error;
        }
        let ids: Vec<String> = managed
            .iter()
            .map(|(_, r)| r.repository_id.clone())
            .collect();

        let keep = if error.is_rule_failure() {
            self.params.keep_on_rule_failure
        } else {
            self.params.keep_on_failure
        };
        if keep {
            status_warn("Keeping", &format!("{} for inspection", ids.join(", ")));
            return error;
        }

        status_warn("Dropping", &ids.join(", "));
        match self.service.drop_staging(&ids, &self.describe("Dropped")) {
            Ok(()) => {
                for (key, _) in &managed {
                    if let Err(e) = self.registry.remove(key) {
                        tracing::warn!("Failed to remove staging record '{key}': {e}");
                    }
                }
            }
            Err(drop_err) => {
                tracing::error!(
                    "Failed to drop staging repositories {}: {drop_err}",
                    ids.join(", ")
                );
            }
        }
        error
    }

    fn describe(&self, action: &str) -> String {
        self.params
            .description_or(&format!("{action} by {}", self.params.agent))
    }
}

fn log_rule_failures(error: &NexstageError) {
    if let Some(report) = error.rule_failure_report() {
        for line in report.lines() {
            tracing::error!("{line}");
        }
        eprint!("{report}");
    }
}

/// Directories of a staging root as lifecycle input, keyed and looked up by
/// directory name.
pub fn recorded_directories(
    params: &Parameters,
    known: &[StagingProfile],
) -> NexstageResult<Vec<StagedDirectory>> {
    Ok(local_stage::profile_directories(&params.staging_root())?
        .into_iter()
        .map(|(key, directory)| {
            let profile = known
                .iter()
                .find(|p| p.id == key)
                .cloned()
                .map(ProfileSource::Known)
                .unwrap_or_else(|| ProfileSource::ById(key.clone()));
            StagedDirectory {
                key,
                directory,
                profile,
            }
        })
        .collect())
}
