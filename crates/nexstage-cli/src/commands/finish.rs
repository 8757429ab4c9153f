//! Handler for `nexstage finish`.

use miette::Result;

use nexstage_ops::ops_finish::{self, FinishAction};
use nexstage_ops::session;
use nexstage_util::progress::status_info;

use crate::cli::Cli;

pub fn exec(cli: &Cli, drop: bool) -> Result<()> {
    let (_, params) = super::load(cli, false)?;
    let client = session::connect(&params)?;
    let action = if drop {
        FinishAction::Drop
    } else {
        FinishAction::Release
    };
    let report = ops_finish::finish(&client, &params, action)?;
    if !report.untouched.is_empty() {
        status_info(
            "Untouched",
            &format!("{} (not created by nexstage)", report.untouched.join(", ")),
        );
    }
    Ok(())
}
