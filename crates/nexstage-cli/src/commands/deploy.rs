//! Handlers for `nexstage deploy`, `deploy-staged` and
//! `deploy-staged-repository`.

use std::path::Path;

use miette::Result;

use nexstage_ops::lifecycle::FinalizeReport;
use nexstage_ops::ops_deploy::{self, DeployOptions};
use nexstage_ops::{ops_deploy_image, ops_deploy_staged};
use nexstage_util::progress::status;

use crate::cli::Cli;

pub fn exec(cli: &Cli, parallel: bool) -> Result<()> {
    let (project, params) = super::load(cli, true)?;
    let report = ops_deploy::deploy(&project, &params, &DeployOptions { parallel })?;
    match &report.finalized {
        Some(finalized) => summarize(finalized),
        None => status(
            "Finished",
            &format!("{} module(s) staged locally", report.outcomes.len()),
        ),
    }
    Ok(())
}

pub fn exec_staged(cli: &Cli) -> Result<()> {
    let (_, params) = super::load(cli, false)?;
    let report = ops_deploy_staged::deploy_staged(&params)?;
    summarize(&report);
    Ok(())
}

pub fn exec_image(cli: &Cli, directory: &Path) -> Result<()> {
    let (_, params) = super::load(cli, false)?;
    let report = ops_deploy_image::deploy_image(&params, directory)?;
    summarize(&report);
    Ok(())
}

fn summarize(report: &FinalizeReport) {
    if report.repositories.is_empty() {
        status("Finished", &format!("{} file(s) deployed", report.uploaded));
        return;
    }
    for repo in &report.repositories {
        let state = if report.released {
            "released"
        } else if report.closed && repo.managed {
            "closed"
        } else {
            "open"
        };
        status("Finished", &format!("{} ({state}) {}", repo.repository_id, repo.url));
    }
}
