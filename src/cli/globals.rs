use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

use crate::store::{SecretProvider, StaticSecret};

/// Process-wide values resolved once at startup.
#[derive(Debug, Clone, Default)]
pub struct GlobalArgs {
    pub jwt_secret: Option<SecretString>,
}

impl GlobalArgs {
    /// An empty secret counts as unset.
    #[must_use]
    pub fn new(jwt_secret: Option<SecretString>) -> Self {
        Self {
            jwt_secret: jwt_secret.filter(|secret| !secret.expose_secret().is_empty()),
        }
    }

    /// The configured secret if any, otherwise `fallback` (the `option` table).
    #[must_use]
    pub fn secret_provider(&self, fallback: Arc<dyn SecretProvider>) -> Arc<dyn SecretProvider> {
        match &self.jwt_secret {
            Some(secret) => Arc::new(StaticSecret::new(secret.clone())),
            None => fallback,
        }
    }
}
