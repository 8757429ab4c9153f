//! Handlers for `nexstage list-profiles` and `list-repositories`.

use console::style;
use miette::Result;

use nexstage_core::staging::RepositoryState;
use nexstage_ops::{ops_rc, session};

use crate::cli::Cli;

pub fn profiles(cli: &Cli) -> Result<()> {
    let (_, params) = super::load(cli, false)?;
    let client = session::connect(&params)?;
    let profiles = ops_rc::list_profiles(&client)?;
    if profiles.is_empty() {
        println!("No staging profiles visible.");
        return Ok(());
    }
    for profile in profiles {
        println!("{:<20} {}", profile.id, profile.name);
    }
    Ok(())
}

pub fn repositories(cli: &Cli, all: bool) -> Result<()> {
    let (_, params) = super::load(cli, false)?;
    let client = session::connect(&params)?;
    let filter = if all { None } else { params.profile_id.as_deref() };
    let repos = ops_rc::list_repositories(&client, filter)?;
    if repos.is_empty() {
        println!("No staging repositories.");
        return Ok(());
    }
    for repo in repos {
        let state = match repo.state {
            RepositoryState::Open => style(repo.state.to_string()).green(),
            RepositoryState::Closed => style(repo.state.to_string()).cyan(),
            _ => style(repo.state.to_string()).dim(),
        };
        let busy = if repo.transitioning { " (transitioning)" } else { "" };
        println!(
            "{:<28} {:<8} {:<20} {}{busy}",
            repo.repository_id,
            state,
            repo.profile_name,
            repo.description.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}
