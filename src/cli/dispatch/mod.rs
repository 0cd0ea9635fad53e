//! Map parsed arguments to the action to run.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{database, oidc, session, ARG_PORT};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    Ok(Action::Server(Args {
        port,
        database: database::Options::parse(matches)?,
        session: session::Options::parse(matches)?,
        oidc: oidc::Options::parse(matches),
    }))
}
