//! Handlers for `nexstage open`, `close`, `drop`, `release` and `promote`.

use miette::Result;

use nexstage_core::parameters::Parameters;
use nexstage_core::staging::RepositoryState;
use nexstage_maven::client::NexusClient;
use nexstage_ops::{ops_rc, session};
use nexstage_util::errors::NexstageError;

use super::pick;
use crate::cli::Cli;

pub fn open(cli: &Cli) -> Result<()> {
    let (_, params) = super::load(cli, false)?;
    let client = session::connect(&params)?;
    let repo = ops_rc::open(&client, &params)?;
    println!("{}", repo.repository_id);
    println!("  {}", repo.url);
    Ok(())
}

pub fn close(cli: &Cli, ids: &[String]) -> Result<()> {
    let (params, client, ids) = prepare(cli, ids, &[RepositoryState::Open], "close")?;
    Ok(ops_rc::close(&client, &params, &ids)?)
}

pub fn drop(cli: &Cli, ids: &[String]) -> Result<()> {
    let states = [RepositoryState::Open, RepositoryState::Closed];
    let (params, client, ids) = prepare(cli, ids, &states, "drop")?;
    Ok(ops_rc::drop(&client, &params, &ids)?)
}

pub fn release(cli: &Cli, ids: &[String]) -> Result<()> {
    let (params, client, ids) = prepare(cli, ids, &[RepositoryState::Closed], "release")?;
    Ok(ops_rc::release(&client, &params, &ids)?)
}

pub fn promote(cli: &Cli, group: &str, ids: &[String]) -> Result<()> {
    let (_, params) = super::load(cli, false)?;
    let client = session::connect(&params)?;
    Ok(ops_rc::promote(&client, &params, ids, group)?)
}

/// Load parameters, connect, and settle which repositories to act on.
/// Without IDs and without a terminal to ask on, nothing is contacted.
fn prepare(
    cli: &Cli,
    ids: &[String],
    states: &[RepositoryState],
    action: &str,
) -> Result<(Parameters, NexusClient, Vec<String>)> {
    if ids.is_empty() && !pick::interactive() {
        return Err(NexstageError::configuration(format!(
            "No staging repository ID given to {action}"
        ))
        .into());
    }
    let (_, params) = super::load(cli, false)?;
    let client = session::connect(&params)?;
    let ids = pick::repository_ids(&client, &params, ids, states, action)?;
    Ok((params, client, ids))
}
