//! Operation: finish a deploy that an earlier `deploy --skip-remote` run
//! staged locally.

use nexstage_core::parameters::Parameters;
use nexstage_maven::connection::validate_url;
use nexstage_util::errors::{GoalResult, NexstageError, NexstageResult};

use crate::lifecycle::FinalizeReport;
use crate::session;
use crate::strategy::{DeployContext, DeployStrategy};

/// The strategy matching what is waiting in the local staging area.
pub fn staged_strategy(params: &Parameters) -> NexstageResult<DeployStrategy> {
    if params.staging_root().is_dir() {
        return Ok(DeployStrategy::Staging);
    }
    if params.deferred_root().is_dir() {
        let url = params
            .deferred_url
            .clone()
            .or_else(|| params.snapshot_url.clone())
            .ok_or_else(|| {
                NexstageError::configuration(
                    "Deferred artifacts are staged but neither deferred-url nor snapshot-url is set",
                )
            })?;
        return Ok(DeployStrategy::Deferred { url });
    }
    Err(NexstageError::configuration(format!(
        "Nothing staged under {}; run `nexstage deploy --skip-remote` first",
        params.staging_dir.display()
    )))
}

/// Upload and finish whatever was staged locally.
pub fn deploy_staged(params: &Parameters) -> GoalResult<FinalizeReport> {
    let strategy = staged_strategy(params)?;
    let report = match &strategy {
        DeployStrategy::Deferred { url } => {
            if !url.starts_with("file:") {
                validate_url(url, params.require_tls)?;
            }
            let uploader = session::uploader(params)?;
            strategy.finalize_deploy(&DeployContext::new(params).with_uploader(&uploader))?
        }
        _ => {
            let client = session::connect(params)?;
            strategy.finalize_deploy(&DeployContext::new(params).with_service(&client))?
        }
    };
    Ok(report)
}
