//! Unlocking posts by their own password or through their categories.

use std::{sync::Arc, time::Duration};
use tracing::{debug, instrument};

use super::{load_codec, tree::ChainMatch, CategoryTree, Error, DEFAULT_TOKEN_TTL};
use crate::store::{
    CategoryKind, CategoryStore, PostCategoryStore, PostId, PostStore, SecretProvider,
};

#[derive(Clone)]
pub struct PostAuthentication {
    posts: Arc<dyn PostStore>,
    post_categories: Arc<dyn PostCategoryStore>,
    categories: Arc<dyn CategoryStore>,
    secrets: Arc<dyn SecretProvider>,
    token_ttl: Duration,
}

impl PostAuthentication {
    #[must_use]
    pub fn new(
        posts: Arc<dyn PostStore>,
        post_categories: Arc<dyn PostCategoryStore>,
        categories: Arc<dyn CategoryStore>,
        secrets: Arc<dyn SecretProvider>,
    ) -> Self {
        Self {
            posts,
            post_categories,
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

    /// Whether `token` opens the post.
    ///
    /// A direct post grant always does. Without one, a post that has no
    /// password of its own is also open when the token grants one of its
    /// intimate categories; normal categories never open a post this way.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingSecret`] when no signing secret is configured,
    /// - [`Error::PostNotFound`] if the post does not exist,
    /// - [`Error::Store`] if a lookup fails.
    #[instrument(skip(self, token))]
    pub async fn is_authenticated(&self, token: &str, id: PostId) -> Result<bool, Error> {
        if token.is_empty() {
            return Ok(false);
        }
        let codec = load_codec(self.secrets.as_ref(), self.token_ttl).await?;
        let post = self
            .posts
            .get_by_id(id)
            .await?
            .ok_or(Error::PostNotFound(id))?;

        let Some(grants) = codec.decode(token) else {
            return Ok(false);
        };
        if grants.has_post(id) {
            return Ok(true);
        }
        if post.has_password() {
            return Ok(false);
        }

        let categories = self.post_categories.list_categories_for_post(id).await?;
        Ok(categories
            .iter()
            .filter(|c| c.kind != CategoryKind::Normal)
            .any(|c| grants.has_category(c.id)))
    }

    /// Check `password` against the post, its categories, or their ancestors,
    /// and return a token that additionally grants the post.
    ///
    /// A post with its own password only accepts that password. Otherwise an
    /// assigned category's own password is tried first, then each category's
    /// chain of ancestors; a mismatch on one chain moves on to the next
    /// category.
    ///
    /// # Errors
    ///
    /// - [`Error::PostNotFound`] if the post does not exist,
    /// - [`Error::Unauthorized`] if nothing matches,
    /// - [`Error::MissingSecret`] / [`Error::Token`] if a token cannot be issued,
    /// - [`Error::Store`] if a lookup fails.
    #[instrument(skip(self, token, password))]
    pub async fn authenticate(
        &self,
        token: &str,
        id: PostId,
        password: &str,
    ) -> Result<Option<String>, Error> {
        let post = self
            .posts
            .get_by_id(id)
            .await?
            .ok_or(Error::PostNotFound(id))?;

        if post.has_password() {
            if post.password == password {
                return self.grant(token, id).await.map(Some);
            }
            return Err(Error::Unauthorized);
        }

        let categories = self.post_categories.list_categories_for_post(id).await?;
        // Open categories never match, not even an empty password.
        if categories
            .iter()
            .any(|c| c.has_password() && c.password == password)
        {
            debug!("Unlocked through assigned category");
            return self.grant(token, id).await.map(Some);
        }

        if categories.is_empty() {
            return Err(Error::Unauthorized);
        }

        let tree = CategoryTree::load(self.categories.as_ref()).await?;
        for category in &categories {
            match tree.walk_ancestors(category.parent_id, password) {
                ChainMatch::Matched { ancestor, .. } => {
                    debug!(category = category.id, ancestor, "Unlocked through ancestor");
                    return self.grant(token, id).await.map(Some);
                }
                ChainMatch::Mismatch { .. } | ChainMatch::DeadLink { .. } => {}
            }
        }

        Err(Error::Unauthorized)
    }

    async fn grant(&self, token: &str, id: PostId) -> Result<String, Error> {
        let codec = load_codec(self.secrets.as_ref(), self.token_ttl).await?;
        Ok(codec.extend(token, &[], &[id])?)
    }
}
