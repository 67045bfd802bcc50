//! Unlocking categories, directly or through a protected ancestor.

use std::{sync::Arc, time::Duration};
use tracing::{debug, instrument};

use super::{load_codec, tree::ChainMatch, CategoryTree, Error, DEFAULT_TOKEN_TTL};
use crate::store::{CategoryId, CategoryStore, SecretProvider};

#[derive(Clone)]
pub struct CategoryAuthentication {
    categories: Arc<dyn CategoryStore>,
    secrets: Arc<dyn SecretProvider>,
    token_ttl: Duration,
}

impl CategoryAuthentication {
    #[must_use]
    pub fn new(categories: Arc<dyn CategoryStore>, secrets: Arc<dyn SecretProvider>) -> Self {
        Self {
            categories,
            secrets,
            token_ttl: DEFAULT_TOKEN_TTL,
        }
    }

    #[must_use]
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    /// Whether `token` grants the category itself.
    ///
    /// A missing cookie (`""`) answers `false` without touching the secret;
    /// an invalid or expired token answers `false` as well.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingSecret`] when no signing secret is configured
    /// and [`Error::Store`] when the secret lookup fails.
    #[instrument(skip(self, token))]
    pub async fn is_authenticated(&self, token: &str, id: CategoryId) -> Result<bool, Error> {
        if token.is_empty() {
            return Ok(false);
        }
        let codec = load_codec(self.secrets.as_ref(), self.token_ttl).await?;

        Ok(codec
            .decode(token)
            .is_some_and(|grants| grants.has_category(id)))
    }

    /// Check `password` against the category (or the ancestor it inherits
    /// protection from) and return the extended token.
    ///
    /// `Ok(None)` means there is nothing to remember: the category is not
    /// protected at all, or its parent chain leads out of the known set.
    ///
    /// For an inherited unlock the token records the ancestors passed on the
    /// way up plus the matching ancestor. The requested category itself is not
    /// recorded.
    ///
    /// # Errors
    ///
    /// - [`Error::CategoryNotFound`] if the category does not exist,
    /// - [`Error::Unauthorized`] if the password does not match,
    /// - [`Error::MissingSecret`] / [`Error::Token`] if a token cannot be issued,
    /// - [`Error::Store`] if a lookup fails.
    #[instrument(skip(self, token, password))]
    pub async fn authenticate(
        &self,
        token: &str,
        id: CategoryId,
        password: &str,
    ) -> Result<Option<String>, Error> {
        let category = self
            .categories
            .get_by_id(id)
            .await?
            .ok_or(Error::CategoryNotFound(id))?;

        if category.has_password() {
            if category.password == password {
                return self.grant(token, &[id]).await.map(Some);
            }
            return Err(Error::Unauthorized);
        }

        if category.is_root() {
            debug!("Category is not protected");
            return Ok(None);
        }

        let tree = CategoryTree::load(self.categories.as_ref()).await?;
        match tree.walk_ancestors(category.parent_id, password) {
            ChainMatch::Matched {
                ancestor,
                mut recorded,
            } => {
                if !recorded.contains(&ancestor) {
                    recorded.push(ancestor);
                }
                debug!(ancestor, "Unlocked through ancestor");
                self.grant(token, &recorded).await.map(Some)
            }
            ChainMatch::Mismatch { .. } => Err(Error::Unauthorized),
            ChainMatch::DeadLink { missing } => {
                debug!(missing, "Parent chain has no protected ancestor");
                Ok(None)
            }
        }
    }

    async fn grant(&self, token: &str, ids: &[CategoryId]) -> Result<String, Error> {
        let codec = load_codec(self.secrets.as_ref(), self.token_ttl).await?;
        Ok(codec.extend(token, ids, &[])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{Grants, TokenCodec};
    use crate::store::{Category, MemoryStore, StaticSecret, StoreError};
    use secrecy::SecretString;

    const SECRET: &str = "category-secret";

    fn store() -> MemoryStore {
        // 1 open root; 2 protected root; 10 <- 11 <- 12 chain protected at 10;
        // 20 protected leaf under 10 with its own password; 30 dangling parent.
        MemoryStore::new()
            .with_category(Category::new(1, "open"))
            .with_category(Category::new(2, "locked").with_password("abc"))
            .with_category(Category::new(10, "family").with_password("secret"))
            .with_category(Category::new(11, "holidays").with_parent(10))
            .with_category(Category::new(12, "summer").with_parent(11))
            .with_category(
                Category::new(20, "private")
                    .with_parent(10)
                    .with_password("own"),
            )
            .with_category(Category::new(30, "lost").with_parent(999))
            .with_secret(SECRET)
    }

    fn auth(store: MemoryStore) -> CategoryAuthentication {
        let store = Arc::new(store);
        CategoryAuthentication::new(store.clone(), store)
    }

    fn decode(token: &str) -> Grants {
        TokenCodec::new(SecretString::from(SECRET), DEFAULT_TOKEN_TTL)
            .and_then(|codec| codec.decode(token))
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn unprotected_root_needs_no_token() -> Result<(), Error> {
        let auth = auth(store());
        assert_eq!(auth.authenticate("", 1, "anything").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn own_password_grants_the_category() -> Result<(), Error> {
        let auth = auth(store());
        let token = auth.authenticate("", 2, "abc").await?.unwrap_or_default();
        assert_eq!(decode(&token), Grants::categories(&[2]));
        assert!(auth.is_authenticated(&token, 2).await?);
        assert!(!auth.is_authenticated(&token, 1).await?);
        Ok(())
    }

    #[tokio::test]
    async fn wrong_own_password_is_unauthorized() {
        let auth = auth(store());
        assert!(matches!(
            auth.authenticate("", 2, "xyz").await,
            Err(Error::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn own_password_wins_over_ancestor() {
        let auth = auth(store());
        assert!(matches!(
            auth.authenticate("", 20, "secret").await,
            Err(Error::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn inherited_unlock_grants_the_ancestor() -> Result<(), Error> {
        let auth = auth(store());
        let token = auth
            .authenticate("", 11, "secret")
            .await?
            .unwrap_or_default();
        assert_eq!(decode(&token), Grants::categories(&[10]));
        assert!(auth.is_authenticated(&token, 10).await?);
        Ok(())
    }

    // Known discrepancy: the requested category is never recorded for an
    // inherited unlock, so a direct check on it stays false.
    #[tokio::test]
    async fn inherited_unlock_does_not_record_requested_category() -> Result<(), Error> {
        let auth = auth(store());
        let token = auth
            .authenticate("", 11, "secret")
            .await?
            .unwrap_or_default();
        assert!(!auth.is_authenticated(&token, 11).await?);
        Ok(())
    }

    // Two levels down: the first parent (11) is passed over, its parent
    // pointer (10) is recorded.
    #[tokio::test]
    async fn deep_inherited_unlock() -> Result<(), Error> {
        let auth = auth(store());
        let token = auth
            .authenticate("", 12, "secret")
            .await?
            .unwrap_or_default();
        assert_eq!(decode(&token), Grants::categories(&[10]));
        assert!(!auth.is_authenticated(&token, 11).await?);
        assert!(!auth.is_authenticated(&token, 12).await?);
        Ok(())
    }

    #[tokio::test]
    async fn inherited_mismatch_aborts() {
        let auth = auth(store());
        assert!(matches!(
            auth.authenticate("", 12, "wrong").await,
            Err(Error::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn dangling_parent_is_a_silent_no_op() -> Result<(), Error> {
        let auth = auth(store());
        assert_eq!(auth.authenticate("", 30, "anything").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn missing_category_is_not_found() {
        let auth = auth(store());
        assert!(matches!(
            auth.authenticate("", 404, "abc").await,
            Err(Error::CategoryNotFound(404))
        ));
    }

    #[tokio::test]
    async fn unlocks_accumulate_in_one_token() -> Result<(), Error> {
        let auth = auth(store());
        let first = auth.authenticate("", 2, "abc").await?.unwrap_or_default();
        let second = auth
            .authenticate(&first, 11, "secret")
            .await?
            .unwrap_or_default();
        assert_eq!(decode(&second), Grants::categories(&[2, 10]));
        assert!(auth.is_authenticated(&second, 2).await?);
        assert!(auth.is_authenticated(&second, 10).await?);
        Ok(())
    }

    #[tokio::test]
    async fn empty_token_is_never_authenticated() -> Result<(), Error> {
        // No secret configured: an empty token must still short-circuit.
        let auth = auth(store().with_secret(""));
        assert!(!auth.is_authenticated("", 2).await?);
        Ok(())
    }

    #[tokio::test]
    async fn garbage_token_is_not_authenticated() -> Result<(), Error> {
        let auth = auth(store());
        assert!(!auth.is_authenticated("not.a.token", 2).await?);
        Ok(())
    }

    #[tokio::test]
    async fn missing_secret_is_a_configuration_error() {
        let auth = auth(store().with_secret(""));
        assert!(matches!(
            auth.authenticate("", 2, "abc").await,
            Err(Error::MissingSecret)
        ));
        assert!(matches!(
            auth.is_authenticated("a.b.c", 2).await,
            Err(Error::MissingSecret)
        ));
    }

    #[tokio::test]
    async fn static_secret_provider_is_used() -> Result<(), Error> {
        let store = Arc::new(store().with_secret(""));
        let auth = CategoryAuthentication::new(
            store,
            Arc::new(StaticSecret::new(SecretString::from(SECRET))),
        );
        let token = auth.authenticate("", 2, "abc").await?.unwrap_or_default();
        assert_eq!(decode(&token), Grants::categories(&[2]));
        Ok(())
    }

    #[tokio::test]
    async fn storage_errors_propagate() {
        let auth = auth(store().with_outage("db down"));
        assert!(matches!(
            auth.authenticate("", 2, "abc").await,
            Err(Error::Store(StoreError::Unavailable(_)))
        ));
    }

    #[tokio::test]
    async fn token_ttl_is_configurable() -> Result<(), Error> {
        let store = Arc::new(store());
        let auth = CategoryAuthentication::new(store.clone(), store)
            .with_token_ttl(Duration::from_secs(600));
        let token = auth.authenticate("", 2, "abc").await?.unwrap_or_default();
        let codec = TokenCodec::new(SecretString::from(SECRET), DEFAULT_TOKEN_TTL)
            .ok_or(Error::MissingSecret)?;
        let claims = codec.verify_at(&token, crate::access::token::unix_now())?;
        assert_eq!(claims.exp - claims.iat, 600);
        Ok(())
    }
}
