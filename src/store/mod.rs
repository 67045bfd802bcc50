//! Content entities and the lookups the access-control layer needs from them.
//!
//! The access-control code never talks to a database directly. It goes
//! through the traits below so the same logic runs against Postgres in the
//! server and against [`MemoryStore`] in tests.

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type CategoryId = i32;
pub type PostId = i32;

/// Parent id used by categories sitting at the top of the tree.
pub const ROOT_PARENT_ID: CategoryId = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryKind {
    #[default]
    Normal,
    Intimate,
}

impl CategoryKind {
    /// Map the `category.type` column (0 normal, 1 intimate).
    #[must_use]
    pub fn from_code(code: i16) -> Self {
        if code == 1 {
            Self::Intimate
        } else {
            Self::Normal
        }
    }

    #[must_use]
    pub fn code(self) -> i16 {
        match self {
            Self::Normal => 0,
            Self::Intimate => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostStatus {
    #[default]
    Published,
    Draft,
    Recycle,
    Intimate,
}

impl PostStatus {
    /// Map the `post.status` column.
    #[must_use]
    pub fn from_code(code: i16) -> Self {
        match code {
            1 => Self::Draft,
            2 => Self::Recycle,
            3 => Self::Intimate,
            _ => Self::Published,
        }
    }

    #[must_use]
    pub fn code(self) -> i16 {
        match self {
            Self::Published => 0,
            Self::Draft => 1,
            Self::Recycle => 2,
            Self::Intimate => 3,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    /// Empty when the category is not protected by itself.
    pub password: String,
    pub parent_id: CategoryId,
    pub kind: CategoryKind,
}

impl Category {
    #[must_use]
    pub fn new(id: CategoryId, slug: impl Into<String>) -> Self {
        let slug = slug.into();
        Self {
            id,
            name: slug.clone(),
            slug,
            password: String::new(),
            parent_id: ROOT_PARENT_ID,
            kind: CategoryKind::Normal,
        }
    }

    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent_id: CategoryId) -> Self {
        self.parent_id = parent_id;
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: CategoryKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_id == ROOT_PARENT_ID
    }
}

// Passwords must never end up in logs.
impl std::fmt::Debug for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Category")
            .field("id", &self.id)
            .field("slug", &self.slug)
            .field("protected", &self.has_password())
            .field("parent_id", &self.parent_id)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub slug: String,
    pub password: String,
    pub status: PostStatus,
}

impl Post {
    #[must_use]
    pub fn new(id: PostId, slug: impl Into<String>) -> Self {
        let slug = slug.into();
        Self {
            id,
            title: slug.clone(),
            slug,
            password: String::new(),
            status: PostStatus::Intimate,
        }
    }

    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: PostStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }
}

impl std::fmt::Debug for Post {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Post")
            .field("id", &self.id)
            .field("slug", &self.slug)
            .field("protected", &self.has_password())
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error")]
    Database(#[from] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn get_by_id(&self, id: CategoryId) -> Result<Option<Category>, StoreError>;
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>, StoreError>;
    async fn list_all(&self) -> Result<Vec<Category>, StoreError>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn get_by_id(&self, id: PostId) -> Result<Option<Post>, StoreError>;
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>, StoreError>;
}

#[async_trait]
pub trait PostCategoryStore: Send + Sync {
    async fn list_categories_for_post(&self, post_id: PostId) -> Result<Vec<Category>, StoreError>;
}

/// Source of the token signing secret. An empty secret means "not configured".
#[async_trait]
pub trait SecretProvider: Send + Sync {
    async fn signing_secret(&self) -> Result<SecretString, StoreError>;
}

/// Secret fixed at startup, e.g. from `--jwt-secret`.
#[derive(Debug, Clone)]
pub struct StaticSecret(SecretString);

impl StaticSecret {
    #[must_use]
    pub fn new(secret: SecretString) -> Self {
        Self(secret)
    }
}

#[async_trait]
impl SecretProvider for StaticSecret {
    async fn signing_secret(&self) -> Result<SecretString, StoreError> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn category_kind_codes() {
        assert_eq!(CategoryKind::from_code(0), CategoryKind::Normal);
        assert_eq!(CategoryKind::from_code(1), CategoryKind::Intimate);
        assert_eq!(CategoryKind::from_code(7), CategoryKind::Normal);
        assert_eq!(CategoryKind::Intimate.code(), 1);
    }

    #[test]
    fn post_status_codes() {
        for status in [
            PostStatus::Published,
            PostStatus::Draft,
            PostStatus::Recycle,
            PostStatus::Intimate,
        ] {
            assert_eq!(PostStatus::from_code(status.code()), status);
        }
    }

    #[test]
    fn debug_output_hides_passwords() {
        let category = Category::new(1, "notes").with_password("hunter2");
        let post = Post::new(2, "diary").with_password("hunter3");
        let rendered = format!("{category:?} {post:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("hunter3"));
        assert!(rendered.contains("protected: true"));
    }

    #[tokio::test]
    async fn static_secret_returns_configured_value() -> Result<(), StoreError> {
        let provider = StaticSecret::new(SecretString::from("s3cr3t"));
        assert_eq!(provider.signing_secret().await?.expose_secret(), "s3cr3t");
        Ok(())
    }
}
