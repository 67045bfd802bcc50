//! In-memory store, filled once and then read-only.

use async_trait::async_trait;
use secrecy::SecretString;
use std::collections::HashMap;

use super::{
    Category, CategoryId, CategoryStore, Post, PostCategoryStore, PostId, PostStore,
    SecretProvider, StoreError,
};

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    categories: HashMap<CategoryId, Category>,
    posts: HashMap<PostId, Post>,
    assignments: HashMap<PostId, Vec<CategoryId>>,
    secret: String,
    outage: Option<String>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_category(mut self, category: Category) -> Self {
        self.categories.insert(category.id, category);
        self
    }

    #[must_use]
    pub fn with_post(mut self, post: Post, category_ids: &[CategoryId]) -> Self {
        self.assignments.insert(post.id, category_ids.to_vec());
        self.posts.insert(post.id, post);
        self
    }

    /// Value served as the `jwt_secret` option.
    #[must_use]
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = secret.into();
        self
    }

    /// Make every lookup fail, to exercise storage error propagation.
    #[must_use]
    pub fn with_outage(mut self, reason: impl Into<String>) -> Self {
        self.outage = Some(reason.into());
        self
    }

    fn check(&self) -> Result<(), StoreError> {
        match &self.outage {
            Some(reason) => Err(StoreError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn get_by_id(&self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        self.check()?;
        Ok(self.categories.get(&id).cloned())
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>, StoreError> {
        self.check()?;
        Ok(self.categories.values().find(|c| c.slug == slug).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Category>, StoreError> {
        self.check()?;
        let mut categories: Vec<Category> = self.categories.values().cloned().collect();
        categories.sort_by_key(|c| c.id);
        Ok(categories)
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn get_by_id(&self, id: PostId) -> Result<Option<Post>, StoreError> {
        self.check()?;
        Ok(self.posts.get(&id).cloned())
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>, StoreError> {
        self.check()?;
        Ok(self.posts.values().find(|p| p.slug == slug).cloned())
    }
}

#[async_trait]
impl PostCategoryStore for MemoryStore {
    async fn list_categories_for_post(&self, post_id: PostId) -> Result<Vec<Category>, StoreError> {
        self.check()?;
        // Dangling assignments are skipped, like an inner join would.
        Ok(self
            .assignments
            .get(&post_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.categories.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl SecretProvider for MemoryStore {
    async fn signing_secret(&self) -> Result<SecretString, StoreError> {
        self.check()?;
        Ok(SecretString::from(self.secret.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::CategoryKind;

    fn store() -> MemoryStore {
        MemoryStore::new()
            .with_category(Category::new(1, "travel"))
            .with_category(
                Category::new(2, "diary")
                    .with_parent(1)
                    .with_kind(CategoryKind::Intimate),
            )
            .with_post(Post::new(10, "day-one"), &[2, 99])
    }

    #[tokio::test]
    async fn lookups_by_id_and_slug() -> Result<(), StoreError> {
        let store = store();
        assert_eq!(
            CategoryStore::get_by_slug(&store, "diary").await?.map(|c| c.id),
            Some(2)
        );
        assert!(CategoryStore::get_by_id(&store, 3).await?.is_none());
        assert_eq!(
            PostStore::get_by_slug(&store, "day-one").await?.map(|p| p.id),
            Some(10)
        );
        let ids: Vec<_> = store.list_all().await?.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2]);
        Ok(())
    }

    #[tokio::test]
    async fn post_categories_skip_missing_rows() -> Result<(), StoreError> {
        let categories = store().list_categories_for_post(10).await?;
        assert_eq!(categories.len(), 1);
        assert_eq!(categories[0].id, 2);
        assert!(store().list_categories_for_post(11).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn outage_fails_every_lookup() {
        let store = store().with_outage("disk on fire");
        assert!(matches!(
            store.list_all().await,
            Err(StoreError::Unavailable(reason)) if reason == "disk on fire"
        ));
        assert!(PostStore::get_by_id(&store, 10).await.is_err());
        assert!(store.signing_secret().await.is_err());
    }
}
