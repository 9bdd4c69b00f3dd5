//! Item catalog lookups and comments

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{Pool, Postgres, Row};

use crate::{
    error::AppResult,
    models::{
        booking::Page,
        item::{Comment, Item},
        user::UserRef,
    },
};

/// Catalog collaborator contract. Items are owned by the catalog service;
/// the booking core reads them for availability and ownership and writes
/// nothing but comments.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ItemCatalog: Send + Sync {
    async fn get(&self, id: i64) -> AppResult<Option<Item>>;

    /// Items of one owner, ordered by id ascending.
    async fn list_by_owner(&self, owner_id: i64, page: Page) -> AppResult<Vec<Item>>;

    /// Comments for a set of items, oldest first.
    async fn comments_for_items(&self, item_ids: &[i64]) -> AppResult<Vec<Comment>>;

    async fn add_comment(
        &self,
        item_id: i64,
        author: &UserRef,
        text: &str,
        created: NaiveDateTime,
    ) -> AppResult<Comment>;
}

#[derive(Clone)]
pub struct PgItemCatalog {
    pool: Pool<Postgres>,
}

impl PgItemCatalog {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ItemCatalog for PgItemCatalog {
    async fn get(&self, id: i64) -> AppResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(
            "SELECT id, name, description, available, owner_id, request_id FROM items WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    async fn list_by_owner(&self, owner_id: i64, page: Page) -> AppResult<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, name, description, available, owner_id, request_id
            FROM items
            WHERE owner_id = $1
            ORDER BY id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(owner_id)
        .bind(page.size)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn comments_for_items(&self, item_ids: &[i64]) -> AppResult<Vec<Comment>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.text, c.item_id, c.created, c.author_id, u.name AS author_name
            FROM comments c
            JOIN users u ON c.author_id = u.id
            WHERE c.item_id = ANY($1)
            ORDER BY c.created
            "#,
        )
        .bind(item_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut comments = Vec::with_capacity(rows.len());
        for row in rows {
            comments.push(Comment {
                id: row.try_get("id")?,
                text: row.try_get("text")?,
                item_id: row.try_get("item_id")?,
                author: UserRef {
                    id: row.try_get("author_id")?,
                    name: row.try_get("author_name")?,
                },
                created: row.try_get("created")?,
            });
        }
        Ok(comments)
    }

    async fn add_comment(
        &self,
        item_id: i64,
        author: &UserRef,
        text: &str,
        created: NaiveDateTime,
    ) -> AppResult<Comment> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO comments (text, item_id, author_id, created)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(text)
        .bind(item_id)
        .bind(author.id)
        .bind(created)
        .fetch_one(&self.pool)
        .await?;

        Ok(Comment {
            id,
            text: text.to_string(),
            item_id,
            author: author.clone(),
            created,
        })
    }
}
