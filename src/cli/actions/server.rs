use crate::{
    api::{self, AccessConfig},
    cli::{globals::GlobalArgs, telemetry},
};
use anyhow::Result;
use secrecy::SecretString;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub jwt_secret: Option<SecretString>,
    pub token_ttl_seconds: u64,
    pub cookie_max_age_seconds: u64,
    pub cookie_secure: bool,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the database is unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!("args: {:?}", args);

    let globals = GlobalArgs::new(args.jwt_secret);

    let config = AccessConfig::new()
        .with_token_ttl_seconds(args.token_ttl_seconds)
        .with_cookie_max_age_seconds(args.cookie_max_age_seconds)
        .with_cookie_secure(args.cookie_secure);

    let result = api::new(args.port, args.dsn, &globals, config).await;

    telemetry::shutdown_tracer();

    result
}
