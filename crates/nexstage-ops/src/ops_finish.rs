//! Operation: finish the staging repositories recorded by an earlier deploy.
//!
//! Reads the records under the staging root, closes what is still open and
//! then releases or drops the lot. Only repositories this tool created are
//! touched; adopted ones are reported and left alone.

use nexstage_core::parameters::Parameters;
use nexstage_core::registry::StagingRepositoryRegistry;
use nexstage_core::staging::RepositoryState;
use nexstage_maven::service::StagingService;
use nexstage_util::errors::{NexstageError, NexstageResult};
use nexstage_util::progress::{status, status_info};

/// What to do with the recorded repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishAction {
    Release,
    Drop,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinishReport {
    pub closed: Vec<String>,
    pub released: Vec<String>,
    pub dropped: Vec<String>,
    /// Recorded but not created by this tool.
    pub untouched: Vec<String>,
}

pub fn finish(
    service: &dyn StagingService,
    params: &Parameters,
    action: FinishAction,
) -> NexstageResult<FinishReport> {
    let registry = StagingRepositoryRegistry::new(params.staging_root());
    let entries: Vec<_> = registry.entries().collect();
    if entries.is_empty() {
        return Err(NexstageError::configuration(format!(
            "No staging repository records under {}",
            registry.root().display()
        )));
    }

    let mut report = FinishReport::default();
    let mut managed = Vec::new();
    for (key, repo) in entries {
        if repo.managed {
            managed.push((key, repo.repository_id));
        } else {
            status_info(
                "Skipping",
                &format!("{} (not managed by this build)", repo.repository_id),
            );
            report.untouched.push(repo.repository_id);
        }
    }
    if managed.is_empty() {
        return Ok(report);
    }
    let ids: Vec<String> = managed.iter().map(|(_, id)| id.clone()).collect();

    match action {
        FinishAction::Drop => {
            service.drop_staging(&ids, &describe(params, "Dropped"))?;
            status("Dropped", &ids.join(", "));
            report.dropped = ids;
        }
        FinishAction::Release => {
            let mut open = Vec::new();
            for id in &ids {
                if service.get_repository(id)?.state == RepositoryState::Open {
                    open.push(id.clone());
                }
            }
            if !open.is_empty() {
                status("Closing", &open.join(", "));
                service
                    .finish_staging(&open, &describe(params, "Closed"))
                    .inspect_err(|e| {
                        if let Some(report) = e.rule_failure_report() {
                            eprint!("{report}");
                        }
                    })?;
                report.closed = open;
            }
            status("Releasing", &ids.join(", "));
            service.release_staging(
                &ids,
                &describe(params, "Released"),
                params.auto_drop_after_release,
            )?;
            status("Released", &ids.join(", "));
            report.released = ids;
        }
    }

    for (key, _) in &managed {
        if let Err(e) = registry.remove(key) {
            tracing::warn!("Failed to remove staging record '{key}': {e}");
        }
    }
    Ok(report)
}

fn describe(params: &Parameters, action: &str) -> String {
    params.description_or(&format!("{action} by {}", params.agent))
}
