use clap::{Arg, ArgAction, Command};

pub const ARG_JWT_SECRET: &str = "jwt-secret";
pub const ARG_TOKEN_TTL: &str = "token-ttl";
pub const ARG_COOKIE_MAX_AGE: &str = "cookie-max-age";
pub const ARG_COOKIE_SECURE: &str = "cookie-secure";

/// Token and cookie settings for the unlock endpoints.
#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_JWT_SECRET)
                .long(ARG_JWT_SECRET)
                .help("Secret used to sign access tokens")
                .long_help(
                    "Secret used to sign access tokens. When unset the secret is read from the `jwt_secret` row of the `option` table on every use.",
                )
                .env("LECTERN_JWT_SECRET")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_TOKEN_TTL)
                .long(ARG_TOKEN_TTL)
                .help("Access token lifetime in seconds")
                .env("LECTERN_TOKEN_TTL")
                .default_value("60")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_COOKIE_MAX_AGE)
                .long(ARG_COOKIE_MAX_AGE)
                .help("Max-Age of the authentication cookie in seconds")
                .env("LECTERN_COOKIE_MAX_AGE")
                .default_value("1800")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_COOKIE_SECURE)
                .long(ARG_COOKIE_SECURE)
                .help("Mark the authentication cookie Secure (HTTPS only)")
                .env("LECTERN_COOKIE_SECURE")
                .action(ArgAction::SetTrue),
        )
}
