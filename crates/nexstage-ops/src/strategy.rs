//! Deploy strategies.
//!
//! A strategy has a per-module step, run by every module of the reactor,
//! and a finalize step, run once by the last module.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use nexstage_core::coordinate::{is_snapshot_version, DeployableArtifact};
use nexstage_core::manifest::DeployMode;
use nexstage_core::parameters::Parameters;
use nexstage_core::staging::StagingProfile;
use nexstage_maven::checksum;
use nexstage_maven::service::{ArtifactUploader, StagingService};
use nexstage_util::errors::{NexstageError, NexstageResult};
use nexstage_util::hash::{file_digest, ChecksumAlgorithm};
use nexstage_util::progress::{status, status_info};

use crate::lifecycle::{self, FinalizeReport, ProfileSource, StagedDirectory, StagingCoordinator};
use crate::local_stage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployStrategy {
    /// Upload every artifact straight to a release repository.
    Direct { url: String },
    /// Collect locally, then upload everything to a plain repository.
    Deferred { url: String },
    /// Collect locally per profile, then stage through the repository
    /// manager.
    Staging,
    /// Stage a directory someone else prepared.
    Image { directory: PathBuf },
}

/// Remote handles and per-build state shared by all modules of a run.
pub struct DeployContext<'a> {
    params: &'a Parameters,
    service: Option<&'a dyn StagingService>,
    uploader: Option<&'a dyn ArtifactUploader>,
    profiles: Mutex<BTreeMap<String, StagingProfile>>,
}

impl<'a> DeployContext<'a> {
    pub fn new(params: &'a Parameters) -> Self {
        Self {
            params,
            service: None,
            uploader: None,
            profiles: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn with_service(mut self, service: &'a dyn StagingService) -> Self {
        self.service = Some(service);
        self
    }

    pub fn with_uploader(mut self, uploader: &'a dyn ArtifactUploader) -> Self {
        self.uploader = Some(uploader);
        self
    }

    pub fn params(&self) -> &Parameters {
        self.params
    }

    fn service(&self) -> NexstageResult<&'a dyn StagingService> {
        self.service.ok_or_else(|| NexstageError::Generic {
            message: "No repository manager session for this deploy".to_string(),
        })
    }

    fn uploader(&self) -> NexstageResult<&'a dyn ArtifactUploader> {
        self.uploader.ok_or_else(|| NexstageError::Generic {
            message: "No uploader configured for this deploy".to_string(),
        })
    }

    /// Profiles matched so far, keyed by group ID. The first match for a
    /// group holds for the rest of the build.
    fn matched_profiles(&self) -> NexstageResult<Vec<StagingProfile>> {
        let profiles = self.profiles.lock().map_err(|_| NexstageError::Generic {
            message: "staging profile cache poisoned".to_string(),
        })?;
        Ok(profiles.values().cloned().collect())
    }

    fn match_profile(&self, artifact: &DeployableArtifact) -> NexstageResult<StagingProfile> {
        let group = &artifact.coordinates.group_id;
        let mut profiles = self.profiles.lock().map_err(|_| NexstageError::Generic {
            message: "staging profile cache poisoned".to_string(),
        })?;
        if let Some(profile) = profiles.get(group) {
            return Ok(profile.clone());
        }
        let profile = self.service()?.match_profile(&artifact.coordinates)?;
        status_info(
            "Matched",
            &format!("{} to staging profile {}", artifact.coordinates.gav(), profile.name),
        );
        profiles.insert(group.clone(), profile.clone());
        Ok(profile)
    }
}

impl DeployStrategy {
    /// Strategy for the `deploy` goal. Snapshot builds (judged by the first
    /// module's version) always go to the snapshot repository.
    pub fn for_deploy(params: &Parameters, first_version: &str) -> NexstageResult<Self> {
        if is_snapshot_version(first_version) {
            let url = params.snapshot_url.clone().ok_or_else(|| {
                NexstageError::configuration(format!(
                    "Version {first_version} is a snapshot but no snapshot-url is configured"
                ))
            })?;
            return Ok(Self::Deferred { url });
        }
        match params.mode {
            DeployMode::Staging => Ok(Self::Staging),
            DeployMode::Deferred => params
                .deferred_url
                .clone()
                .map(|url| Self::Deferred { url })
                .ok_or_else(|| {
                    NexstageError::configuration("mode = \"deferred\" requires deferred-url")
                }),
            DeployMode::Direct => params
                .release_url
                .clone()
                .map(|url| Self::Direct { url })
                .ok_or_else(|| {
                    NexstageError::configuration("mode = \"direct\" requires release-url")
                }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Direct { .. } => "direct",
            Self::Deferred { .. } => "deferred",
            Self::Staging => "staging",
            Self::Image { .. } => "image",
        }
    }

    /// Whether this strategy talks to the staging API (and so needs a
    /// connected session) rather than plain repository uploads.
    pub fn needs_staging_service(&self) -> bool {
        matches!(self, Self::Staging | Self::Image { .. })
    }

    /// The step every module runs with its own artifacts.
    pub fn deploy_per_module(
        &self,
        ctx: &DeployContext<'_>,
        artifacts: &[DeployableArtifact],
    ) -> NexstageResult<()> {
        let params = ctx.params;
        match self {
            Self::Direct { url } => {
                let uploader = ctx.uploader()?;
                for artifact in artifacts {
                    upload_direct(uploader, url, artifact, params.extra_checksums)?;
                }
                Ok(())
            }
            Self::Deferred { .. } => {
                local_stage::stage_artifacts(
                    &params.deferred_root(),
                    artifacts,
                    params.extra_checksums,
                )?;
                Ok(())
            }
            Self::Staging => {
                let Some(first) = artifacts.first() else {
                    tracing::warn!("Module has no artifacts to stage");
                    return Ok(());
                };
                let key = staging_key(ctx, first)?;
                local_stage::stage_artifacts(
                    &params.staging_root().join(&key),
                    artifacts,
                    params.extra_checksums,
                )?;
                Ok(())
            }
            Self::Image { .. } => Ok(()),
        }
    }

    /// The step the last module runs once every module has staged.
    pub fn finalize_deploy(&self, ctx: &DeployContext<'_>) -> NexstageResult<FinalizeReport> {
        let params = ctx.params;
        match self {
            Self::Direct { .. } => Ok(FinalizeReport::default()),
            Self::Deferred { url } => {
                let uploader = ctx.uploader()?;
                let root = params.deferred_root();
                let uploaded = local_stage::upload_area(&root, "Uploading", |staged| {
                    uploader.upload(url, &staged.path, &staged.file)
                })?;
                status("Deployed", &format!("{uploaded} file(s) to {url}"));
                Ok(FinalizeReport {
                    uploaded,
                    ..FinalizeReport::default()
                })
            }
            Self::Staging => {
                let service = ctx.service()?;
                let directories =
                    lifecycle::recorded_directories(params, &ctx.matched_profiles()?)?;
                StagingCoordinator::new(service, params).finalize(directories)
            }
            Self::Image { directory } => {
                let service = ctx.service()?;
                if local_stage::area_files(directory)?.is_empty() {
                    return Err(NexstageError::configuration(format!(
                        "Nothing to deploy: {} is missing or empty",
                        directory.display()
                    )));
                }
                let (key, profile) = image_profile(service, params, directory)?;
                StagingCoordinator::new(service, params).finalize(vec![StagedDirectory {
                    key,
                    directory: directory.clone(),
                    profile,
                }])
            }
        }
    }
}

/// Name of the local directory a module stages into.
fn staging_key(ctx: &DeployContext<'_>, first: &DeployableArtifact) -> NexstageResult<String> {
    let params = ctx.params;
    if let Some(repository_id) = &params.repository_id {
        return Ok(params
            .profile_id
            .clone()
            .unwrap_or_else(|| repository_id.clone()));
    }
    if let Some(profile_id) = &params.profile_id {
        return Ok(profile_id.clone());
    }
    ctx.match_profile(first).map(|p| p.id)
}

fn image_profile(
    service: &dyn StagingService,
    params: &Parameters,
    directory: &std::path::Path,
) -> NexstageResult<(String, ProfileSource)> {
    if let Some(profile_id) = &params.profile_id {
        return Ok((profile_id.clone(), ProfileSource::ById(profile_id.clone())));
    }
    if let Some(repository_id) = &params.repository_id {
        return Ok((repository_id.clone(), ProfileSource::ById(repository_id.clone())));
    }
    let coordinates = local_stage::first_coordinates(directory)?;
    let profile = service.match_profile(&coordinates)?;
    Ok((profile.id.clone(), ProfileSource::Known(profile)))
}

fn upload_direct(
    uploader: &dyn ArtifactUploader,
    url: &str,
    artifact: &DeployableArtifact,
    strong: bool,
) -> NexstageResult<()> {
    let path = artifact.coordinates.repository_path();
    uploader.upload(url, &path, &artifact.file)?;
    status("Deployed", &format!("{} to {url}", artifact.coordinates));
    if ChecksumAlgorithm::is_sidecar(&artifact.file) {
        return Ok(());
    }

    let scratch = tempfile::TempDir::new()?;
    for algo in checksum::algorithms(strong) {
        let sidecar = scratch.path().join(algo.extension());
        std::fs::write(&sidecar, file_digest(&artifact.file, algo)?)?;
        uploader.upload(url, &format!("{path}.{}", algo.extension()), &sidecar)?;
    }
    Ok(())
}
