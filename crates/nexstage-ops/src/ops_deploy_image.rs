//! Operation: stage a repository directory prepared outside this tool.

use std::path::Path;

use nexstage_core::parameters::Parameters;
use nexstage_util::errors::GoalResult;

use crate::lifecycle::FinalizeReport;
use crate::session;
use crate::strategy::{DeployContext, DeployStrategy};

/// Upload `directory`, a Maven repository layout, through a staging
/// repository and close it.
pub fn deploy_image(params: &Parameters, directory: &Path) -> GoalResult<FinalizeReport> {
    let strategy = DeployStrategy::Image {
        directory: directory.to_path_buf(),
    };
    let client = session::connect(params)?;
    let report = strategy.finalize_deploy(&DeployContext::new(params).with_service(&client))?;
    Ok(report)
}
