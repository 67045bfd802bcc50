//! Postgres-backed store.

use async_trait::async_trait;
use secrecy::SecretString;
use sqlx::{postgres::PgRow, PgPool, Row};
use tracing::Instrument;

use super::{
    Category, CategoryId, CategoryKind, CategoryStore, Post, PostCategoryStore, PostId, PostStatus,
    PostStore, SecretProvider, StoreError,
};

/// Option key holding the token signing secret.
pub const JWT_SECRET_OPTION: &str = "jwt_secret";

const CATEGORY_COLUMNS: &str = "c.id, c.name, c.slug, c.password, c.parent_id, c.type";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn query_span(operation: &'static str, statement: &str) -> tracing::Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

fn category_from_row(row: &PgRow) -> Result<Category, sqlx::Error> {
    Ok(Category {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        password: row.try_get("password")?,
        parent_id: row.try_get("parent_id")?,
        kind: CategoryKind::from_code(row.try_get("type")?),
    })
}

fn post_from_row(row: &PgRow) -> Result<Post, sqlx::Error> {
    Ok(Post {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        password: row.try_get("password")?,
        status: PostStatus::from_code(row.try_get("status")?),
    })
}

#[async_trait]
impl CategoryStore for PgStore {
    async fn get_by_id(&self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        let query = format!("SELECT {CATEGORY_COLUMNS} FROM category c WHERE c.id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await?;

        Ok(row.as_ref().map(category_from_row).transpose()?)
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>, StoreError> {
        let query = format!("SELECT {CATEGORY_COLUMNS} FROM category c WHERE c.slug = $1");
        let row = sqlx::query(&query)
            .bind(slug)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await?;

        Ok(row.as_ref().map(category_from_row).transpose()?)
    }

    async fn list_all(&self) -> Result<Vec<Category>, StoreError> {
        let query = format!("SELECT {CATEGORY_COLUMNS} FROM category c ORDER BY c.id");
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await?;

        Ok(rows
            .iter()
            .map(category_from_row)
            .collect::<Result<_, _>>()?)
    }
}

#[async_trait]
impl PostStore for PgStore {
    async fn get_by_id(&self, id: PostId) -> Result<Option<Post>, StoreError> {
        let query = "SELECT id, title, slug, password, status FROM post WHERE id = $1";
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await?;

        Ok(row.as_ref().map(post_from_row).transpose()?)
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>, StoreError> {
        let query = "SELECT id, title, slug, password, status FROM post WHERE slug = $1";
        let row = sqlx::query(query)
            .bind(slug)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await?;

        Ok(row.as_ref().map(post_from_row).transpose()?)
    }
}

#[async_trait]
impl PostCategoryStore for PgStore {
    async fn list_categories_for_post(&self, post_id: PostId) -> Result<Vec<Category>, StoreError> {
        let query = format!(
            "SELECT {CATEGORY_COLUMNS} FROM category c \
             JOIN post_category pc ON pc.category_id = c.id \
             WHERE pc.post_id = $1 ORDER BY c.id"
        );
        let rows = sqlx::query(&query)
            .bind(post_id)
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await?;

        Ok(rows
            .iter()
            .map(category_from_row)
            .collect::<Result<_, _>>()?)
    }
}

#[async_trait]
impl SecretProvider for PgStore {
    async fn signing_secret(&self) -> Result<SecretString, StoreError> {
        let query = r#"SELECT option_value FROM "option" WHERE option_key = $1"#;
        let value: Option<String> = sqlx::query_scalar(query)
            .bind(JWT_SECRET_OPTION)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await?;

        // A missing row behaves like an empty option.
        Ok(SecretString::from(value.unwrap_or_default()))
    }
}
