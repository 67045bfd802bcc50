//! # Lectern
//!
//! Password-gated access to blog content. Categories and posts may carry a
//! password; a category without one is protected by its nearest protected
//! ancestor, and a post without one by the categories it is filed under.
//!
//! Visitors unlock content by submitting a password. Each successful unlock is
//! remembered in a short-lived HMAC-SHA256 signed token kept in the
//! `authentication` cookie, and later unlocks extend that token so a single
//! cookie accumulates everything the visitor has opened.
//!
//! - [`access`]: the unlock flows and the token codec.
//! - [`store`]: storage traits with `PostgreSQL` and in-memory backends.
//! - [`api`]: the `axum` routes exposing the flows over HTTP.
//! - [`cli`]: argument parsing, telemetry and server startup.

pub mod access;
pub mod api;
pub mod cli;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
