//! Map validated CLI arguments to the action to run.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::access::{
    ARG_COOKIE_MAX_AGE, ARG_COOKIE_SECURE, ARG_JWT_SECRET, ARG_TOKEN_TTL,
};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let jwt_secret = matches
        .get_one::<String>(ARG_JWT_SECRET)
        .map(|secret| SecretString::from(secret.as_str()));

    Ok(Action::Server(Args {
        port,
        dsn,
        jwt_secret,
        token_ttl_seconds: matches
            .get_one::<u64>(ARG_TOKEN_TTL)
            .copied()
            .unwrap_or(60),
        cookie_max_age_seconds: matches
            .get_one::<u64>(ARG_COOKIE_MAX_AGE)
            .copied()
            .unwrap_or(1800),
        cookie_secure: matches.get_flag(ARG_COOKIE_SECURE),
    }))
}
