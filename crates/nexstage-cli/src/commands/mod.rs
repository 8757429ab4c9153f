//! Command dispatch and handler modules.

mod deploy;
mod finish;
mod list;
mod pick;
mod repository;

use miette::Result;

use nexstage_core::parameters::Parameters;
use nexstage_ops::session::{self, Project};
use nexstage_util::errors::NexstageError;

use crate::cli::{Cli, Command, StagingArgs};

/// Route a parsed CLI invocation to the appropriate command handler.
pub fn dispatch(cli: Cli) -> Result<()> {
    match &cli.command {
        Command::Deploy { parallel } => deploy::exec(&cli, *parallel),
        Command::DeployStaged => deploy::exec_staged(&cli),
        Command::DeployStagedRepository { directory } => deploy::exec_image(&cli, directory),
        Command::Open => repository::open(&cli),
        Command::Close { ids } => repository::close(&cli, ids),
        Command::Drop { ids } => repository::drop(&cli, ids),
        Command::Release { ids } => repository::release(&cli, ids),
        Command::Promote { group, ids } => repository::promote(&cli, group, ids),
        Command::Finish { drop } => finish::exec(&cli, *drop),
        Command::ListProfiles => list::profiles(&cli),
        Command::ListRepositories { all } => list::repositories(&cli, *all),
    }
}

/// Load the project and its parameters with command-line overrides and
/// credentials applied. Goals that only talk to the server work without a
/// `Nexstage.toml`.
pub(crate) fn load(cli: &Cli, require_manifest: bool) -> Result<(Project, Parameters)> {
    let cwd = std::env::current_dir().map_err(NexstageError::Io)?;
    let project = match &cli.manifest_path {
        Some(path) => Project::load(path)?,
        None if require_manifest => Project::discover(&cwd)?,
        None => Project::discover_or_standalone(&cwd)?,
    };
    let params = apply_overrides(&cli.staging, &project, project.parameters());
    let params = session::attach_credentials(params, &project.root)?;
    tracing::debug!("Parameters: {params:?}");
    Ok((project, params))
}

fn apply_overrides(args: &StagingArgs, project: &Project, mut params: Parameters) -> Parameters {
    let trimmed = |url: &String| url.trim().trim_end_matches('/').to_string();

    if let Some(url) = &args.nexus_url {
        params.nexus_url = Some(trimmed(url));
    }
    if let Some(id) = &args.server_id {
        params.server_id = Some(id.clone());
    }
    if let Some(id) = &args.profile_id {
        params.profile_id = Some(id.clone());
    }
    if let Some(id) = &args.repository_id {
        params.repository_id = Some(id.clone());
    }
    if let Some(description) = &args.description {
        params.description = Some(description.clone());
    }
    if let Some(dir) = &args.staging_dir {
        params.staging_dir = if dir.is_absolute() {
            dir.clone()
        } else {
            project.root.join(dir)
        };
    }
    for (key, value) in &args.tags {
        params.tags.insert(key.clone(), value.clone());
    }

    params.skip_remote |= args.skip_remote;
    params.skip_close |= args.skip_close;
    params.auto_release |= args.auto_release;
    params.keep_on_failure |= args.keep_on_failure;
    params.keep_on_rule_failure |= args.keep_on_rule_failure;
    params.require_tls |= args.require_tls;
    params.ssl_insecure |= args.ssl_insecure;
    params.extra_checksums |= args.extra_checksums;
    if args.no_auto_drop {
        params.auto_drop_after_release = false;
    }
    if args.fail_at_end {
        params.detect_build_failures = false;
    }
    params
}
