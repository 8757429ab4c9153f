//! Operation: deploy the artifacts of every module in the reactor.

use std::path::Path;

use nexstage_core::manifest::{Manifest, ModuleEntry};
use nexstage_core::parameters::Parameters;
use nexstage_core::reactor::{GateVerdict, ModuleOutcome, ReactorGate};
use nexstage_maven::connection::validate_url;
use nexstage_util::errors::{GoalResult, NexstageError, NexstageResult};
use nexstage_util::progress::{status, status_error, status_info, status_warn};

use crate::lifecycle::FinalizeReport;
use crate::session::{self, Project};
use crate::strategy::{DeployContext, DeployStrategy};

/// Options for `nexstage deploy`.
#[derive(Debug, Default, Clone)]
pub struct DeployOptions {
    /// Run every module on its own thread.
    pub parallel: bool,
}

/// What a reactor run did.
#[derive(Debug, Clone)]
pub struct DeployReport {
    pub strategy: &'static str,
    pub outcomes: Vec<(String, ModuleOutcome)>,
    /// Set when the last module finalized the deploy.
    pub finalized: Option<FinalizeReport>,
}

/// Deploy the project's modules with the strategy its configuration selects.
pub fn deploy(project: &Project, params: &Parameters, opts: &DeployOptions) -> GoalResult<DeployReport> {
    let first = project
        .manifest
        .deploying_modules()
        .next()
        .ok_or_else(|| NexstageError::Manifest {
            message: "No [[module]] entries to deploy".to_string(),
        })?;
    let strategy = DeployStrategy::for_deploy(params, &first.version)?;
    status_info("Strategy", strategy.name());

    let client = if strategy.needs_staging_service() && needs_session(params) {
        Some(session::connect(params)?)
    } else {
        None
    };
    let uploader = match &strategy {
        DeployStrategy::Direct { url } | DeployStrategy::Deferred { url } => {
            if !url.starts_with("file:") {
                validate_url(url, params.require_tls)?;
            }
            Some(session::uploader(params)?)
        }
        _ => None,
    };

    let mut ctx = DeployContext::new(params);
    if let Some(client) = &client {
        ctx = ctx.with_service(client);
    }
    if let Some(uploader) = &uploader {
        ctx = ctx.with_uploader(uploader);
    }

    let report = run_reactor(
        &project.root,
        &project.manifest,
        &strategy,
        &ctx,
        opts.parallel,
    )?;
    Ok(report)
}

/// A staging session is needed to match profiles and, unless remote
/// staging is skipped, to drive the lifecycle.
fn needs_session(params: &Parameters) -> bool {
    let matches_profiles = params.profile_id.is_none() && params.repository_id.is_none();
    !params.skip_remote || matches_profiles
}

/// Run the per-module step for every module, then let the last module
/// finalize once its siblings have reported.
pub fn run_reactor(
    project_root: &Path,
    manifest: &Manifest,
    strategy: &DeployStrategy,
    ctx: &DeployContext<'_>,
    parallel: bool,
) -> NexstageResult<DeployReport> {
    let gate = ReactorGate::with_participants(
        manifest.module_names(),
        manifest.deploying_module_names(),
    )
    .detect_build_failures(ctx.params().detect_build_failures);
    // Modules that do not deploy have nothing to wait for; report them before
    // any finalizer starts waiting, so a sequential run never blocks on them.
    for module in manifest.modules.iter().filter(|m| !m.deploy) {
        gate.record(&module.name, ModuleOutcome::Success)?;
    }

    let results: Vec<(String, NexstageResult<Option<FinalizeReport>>)> = if parallel {
        std::thread::scope(|scope| {
            let handles: Vec<_> = manifest
                .modules
                .iter()
                .map(|module| {
                    let gate = &gate;
                    let handle = scope.spawn(move || {
                        run_module(project_root, module, strategy, ctx, gate)
                    });
                    (module.name.clone(), handle)
                })
                .collect();
            handles
                .into_iter()
                .map(|(name, handle)| {
                    let result = handle.join().unwrap_or_else(|_| {
                        Err(NexstageError::Reactor {
                            message: format!("Module '{name}' panicked"),
                        })
                    });
                    (name, result)
                })
                .collect()
        })
    } else {
        manifest
            .modules
            .iter()
            .map(|module| {
                (
                    module.name.clone(),
                    run_module(project_root, module, strategy, ctx, &gate),
                )
            })
            .collect()
    };

    let mut report = DeployReport {
        strategy: strategy.name(),
        outcomes: Vec::with_capacity(results.len()),
        finalized: None,
    };
    let mut first_error = None;
    for (name, result) in results {
        match result {
            Ok(finalized) => {
                report.outcomes.push((name, ModuleOutcome::Success));
                if finalized.is_some() {
                    report.finalized = finalized;
                }
            }
            Err(e) => {
                report.outcomes.push((name, ModuleOutcome::Failure));
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(report),
    }
}

fn run_module(
    project_root: &Path,
    module: &ModuleEntry,
    strategy: &DeployStrategy,
    ctx: &DeployContext<'_>,
    gate: &ReactorGate,
) -> NexstageResult<Option<FinalizeReport>> {
    if !module.deploy {
        status_info("Skipping", &format!("{} (deploy = false)", module.name));
        return Ok(None);
    }
    status("Deploying", &format!("{} ({})", module.name, module.version));
    let staged = module
        .artifacts(project_root)
        .and_then(|artifacts| strategy.deploy_per_module(ctx, &artifacts));
    let outcome = match &staged {
        Ok(()) => ModuleOutcome::Success,
        Err(e) => {
            status_error("Failed", &format!("{}: {e}", module.name));
            ModuleOutcome::Failure
        }
    };
    gate.record(&module.name, outcome)?;
    staged?;

    if !gate.is_last(&module.name) {
        return Ok(None);
    }
    let params = ctx.params();
    if params.skip_remote {
        status_info(
            "Skipping",
            &format!(
                "remote deploy; staged locally under {}",
                params.staging_dir.display()
            ),
        );
        return Ok(None);
    }
    match gate.await_others(&module.name, params.reactor_timeout)? {
        GateVerdict::Proceed => strategy.finalize_deploy(ctx).map(Some),
        GateVerdict::EarlierFailures(failed) => {
            status_warn(
                "Skipping",
                &format!("remote deploy because modules failed: {}", failed.join(", ")),
            );
            Ok(None)
        }
    }
}
