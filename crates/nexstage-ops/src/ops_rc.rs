//! Operations on staging repositories named explicitly by ID: open, close,
//! drop, release, promote, and the profile and repository listings.
//!
//! These act on whatever IDs they are given. Whether this tool created a
//! repository does not matter here; the managed/unmanaged distinction only
//! binds the automatic lifecycle.

use nexstage_core::parameters::Parameters;
use nexstage_core::staging::{StagingProfile, StagingRepository, StagingRepositoryInfo};
use nexstage_maven::service::StagingService;
use nexstage_util::errors::{NexstageError, NexstageResult};
use nexstage_util::progress::status;

fn require_ids(ids: &[String], action: &str) -> NexstageResult<()> {
    if ids.is_empty() {
        return Err(NexstageError::configuration(format!(
            "No staging repository ID given to {action}"
        )));
    }
    Ok(())
}

fn description(params: &Parameters, action: &str) -> String {
    params.description_or(&format!("{action} by {}", params.agent))
}

/// Open a new staging repository for the configured profile.
pub fn open(service: &dyn StagingService, params: &Parameters) -> NexstageResult<StagingRepository> {
    let profile_id = params
        .profile_id
        .as_deref()
        .ok_or_else(|| NexstageError::configuration("Opening a repository requires profile-id"))?;
    let profile = service.select_profile(profile_id)?;
    let id = service.start_staging(&profile, &description(params, "Started"), &params.tags)?;
    status("Opened", &format!("{id} for profile {}", profile.name));
    Ok(StagingRepository::managed(
        &profile.id,
        &id,
        &service.repository_url(&id),
    ))
}

pub fn close(
    service: &dyn StagingService,
    params: &Parameters,
    ids: &[String],
) -> NexstageResult<()> {
    require_ids(ids, "close")?;
    status("Closing", &ids.join(", "));
    service
        .finish_staging(ids, &description(params, "Closed"))
        .inspect_err(|e| {
            if let Some(report) = e.rule_failure_report() {
                eprint!("{report}");
            }
        })?;
    status("Closed", &ids.join(", "));
    Ok(())
}

pub fn drop(service: &dyn StagingService, params: &Parameters, ids: &[String]) -> NexstageResult<()> {
    require_ids(ids, "drop")?;
    service.drop_staging(ids, &description(params, "Dropped"))?;
    status("Dropped", &ids.join(", "));
    Ok(())
}

pub fn release(
    service: &dyn StagingService,
    params: &Parameters,
    ids: &[String],
) -> NexstageResult<()> {
    require_ids(ids, "release")?;
    status("Releasing", &ids.join(", "));
    service.release_staging(
        ids,
        &description(params, "Released"),
        params.auto_drop_after_release,
    )?;
    status("Released", &ids.join(", "));
    Ok(())
}

/// Promote closed repositories into the build promotion profile `group`.
pub fn promote(
    service: &dyn StagingService,
    params: &Parameters,
    ids: &[String],
    group: &str,
) -> NexstageResult<()> {
    require_ids(ids, "promote")?;
    if group.trim().is_empty() {
        return Err(NexstageError::configuration(
            "Promotion requires a build promotion profile ID",
        ));
    }
    service.promote_staging(ids, group, &description(params, "Promoted"))?;
    status("Promoted", &format!("{} to {group}", ids.join(", ")));
    Ok(())
}

pub fn list_profiles(service: &dyn StagingService) -> NexstageResult<Vec<StagingProfile>> {
    let mut profiles = service.list_profiles()?;
    profiles.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(profiles)
}

pub fn list_repositories(
    service: &dyn StagingService,
    profile_id: Option<&str>,
) -> NexstageResult<Vec<StagingRepositoryInfo>> {
    service.list_repositories(profile_id)
}
