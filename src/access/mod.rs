//! Password-gated access to categories and posts.
//!
//! Categories and posts may carry a password. A category without one inherits
//! protection from the nearest protected ancestor, and a post without one is
//! guarded by its assigned categories and their ancestors.
//!
//! A successful unlock is remembered in a signed token (see [`token`]) that
//! the HTTP layer keeps in the `authentication` cookie. Each new unlock extends
//! the token presented by the client instead of replacing it, so one cookie
//! accumulates every category and post the visitor has opened.
//!
//! Nothing here keeps state between calls: each operation reads the entities
//! it needs through the store traits, verifies or signs a token with the
//! current signing secret, and returns.

use secrecy::SecretString;
use std::time::Duration;

mod category;
mod error;
mod post;
pub mod token;
mod tree;

pub use category::CategoryAuthentication;
pub use error::Error;
pub use post::PostAuthentication;
pub use token::{Grants, TokenCodec, TokenError, DEFAULT_TOKEN_TTL};
pub use tree::{CategoryTree, ChainMatch};

use crate::store::SecretProvider;

/// Build a codec from the current signing secret.
///
/// An empty secret is a configuration error, never an authorization failure.
pub(crate) async fn load_codec(
    secrets: &dyn SecretProvider,
    ttl: Duration,
) -> Result<TokenCodec, Error> {
    let secret: SecretString = secrets.signing_secret().await?;
    TokenCodec::new(secret, ttl).ok_or(Error::MissingSecret)
}
