//! Shared handler state and the token/cookie configuration.

use std::{sync::Arc, time::Duration};

use crate::access::{CategoryAuthentication, PostAuthentication, DEFAULT_TOKEN_TTL};
use crate::store::{CategoryStore, PostCategoryStore, PostStore, SecretProvider};

const DEFAULT_COOKIE_MAX_AGE_SECONDS: u64 = 30 * 60;

#[derive(Clone, Debug)]
pub struct AccessConfig {
    token_ttl_seconds: u64,
    cookie_max_age_seconds: u64,
    cookie_secure: bool,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            token_ttl_seconds: DEFAULT_TOKEN_TTL.as_secs(),
            cookie_max_age_seconds: DEFAULT_COOKIE_MAX_AGE_SECONDS,
            cookie_secure: false,
        }
    }

    #[must_use]
    pub fn with_token_ttl_seconds(mut self, seconds: u64) -> Self {
        self.token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_cookie_max_age_seconds(mut self, seconds: u64) -> Self {
        self.cookie_max_age_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_seconds)
    }

    #[must_use]
    pub fn cookie_max_age_seconds(&self) -> u64 {
        self.cookie_max_age_seconds
    }

    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }
}

/// Everything the content handlers need, shared through an `Extension`.
#[derive(Clone)]
pub struct AccessState {
    config: AccessConfig,
    categories: Arc<dyn CategoryStore>,
    posts: Arc<dyn PostStore>,
    category_auth: CategoryAuthentication,
    post_auth: PostAuthentication,
}

impl AccessState {
    /// Wire both unlock flows to one backing store.
    #[must_use]
    pub fn new<S>(config: AccessConfig, store: Arc<S>, secrets: Arc<dyn SecretProvider>) -> Self
    where
        S: CategoryStore + PostStore + PostCategoryStore + 'static,
    {
        let categories: Arc<dyn CategoryStore> = store.clone();
        let posts: Arc<dyn PostStore> = store.clone();
        let post_categories: Arc<dyn PostCategoryStore> = store;

        let category_auth = CategoryAuthentication::new(categories.clone(), secrets.clone())
            .with_token_ttl(config.token_ttl());
        let post_auth =
            PostAuthentication::new(posts.clone(), post_categories, categories.clone(), secrets)
                .with_token_ttl(config.token_ttl());

        Self {
            config,
            categories,
            posts,
            category_auth,
            post_auth,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    pub(crate) fn categories(&self) -> &dyn CategoryStore {
        self.categories.as_ref()
    }

    pub(crate) fn posts(&self) -> &dyn PostStore {
        self.posts.as_ref()
    }

    pub(crate) fn category_auth(&self) -> &CategoryAuthentication {
        &self.category_auth
    }

    pub(crate) fn post_auth(&self) -> &PostAuthentication {
        &self.post_auth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AccessConfig::default();
        assert_eq!(config.token_ttl(), Duration::from_secs(60));
        assert_eq!(config.cookie_max_age_seconds(), 1800);
        assert!(!config.cookie_secure());
    }

    #[test]
    fn builders_override_defaults() {
        let config = AccessConfig::new()
            .with_token_ttl_seconds(300)
            .with_cookie_max_age_seconds(60)
            .with_cookie_secure(true);
        assert_eq!(config.token_ttl(), Duration::from_secs(300));
        assert_eq!(config.cookie_max_age_seconds(), 60);
        assert!(config.cookie_secure());
    }
}
