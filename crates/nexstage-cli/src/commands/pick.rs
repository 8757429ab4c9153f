//! Interactive choice of staging repositories when none were named.

use dialoguer::MultiSelect;
use miette::Result;

use nexstage_core::parameters::Parameters;
use nexstage_core::staging::RepositoryState;
use nexstage_maven::service::StagingService;
use nexstage_util::errors::NexstageError;

/// Whether prompting is possible at all.
pub fn interactive() -> bool {
    atty::is(atty::Stream::Stdin) && atty::is(atty::Stream::Stderr)
}

/// `ids` as given, or the user's pick among repositories in one of
/// `states`. An empty pick yields an empty list.
pub fn repository_ids(
    service: &dyn StagingService,
    params: &Parameters,
    ids: &[String],
    states: &[RepositoryState],
    action: &str,
) -> Result<Vec<String>> {
    if !ids.is_empty() {
        return Ok(ids.to_vec());
    }
    let candidates: Vec<_> = service
        .list_repositories(params.profile_id.as_deref())?
        .into_iter()
        .filter(|r| states.contains(&r.state) && !r.transitioning)
        .collect();
    if candidates.is_empty() {
        return Err(
            NexstageError::configuration(format!("No staging repositories to {action}")).into(),
        );
    }

    let labels: Vec<String> = candidates
        .iter()
        .map(|r| {
            format!(
                "{} ({}, {}) {}",
                r.repository_id,
                r.profile_name,
                r.state,
                r.description.as_deref().unwrap_or("")
            )
        })
        .collect();
    let chosen = MultiSelect::new()
        .with_prompt(format!("Repositories to {action}"))
        .items(&labels)
        .interact()
        .map_err(|e| NexstageError::Generic {
            message: format!("Prompt failed: {e}"),
        })?;
    Ok(chosen
        .into_iter()
        .map(|i| candidates[i].repository_id.clone())
        .collect())
}
