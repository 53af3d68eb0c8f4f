use serde::Serialize;
use sqlx::PgPool;

use crate::catalog::ensure_affected;
use crate::error::{AppError, DatabaseError};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Author {
    pub author_id: i64,
    pub name: String,
}

pub async fn create(pool: &PgPool, name: &str) -> Result<Author, AppError> {
    let author = sqlx::query_as::<_, Author>(
        "INSERT INTO authors (name) VALUES ($1) RETURNING id AS author_id, name",
    )
    .bind(name)
    .fetch_one(pool)
    .await?;

    Ok(author)
}

pub async fn list(pool: &PgPool) -> Result<Vec<Author>, AppError> {
    let authors = sqlx::query_as::<_, Author>("SELECT id AS author_id, name FROM authors ORDER BY id")
        .fetch_all(pool)
        .await?;

    Ok(authors)
}

pub async fn update(pool: &PgPool, author_id: i64, name: &str) -> Result<Author, AppError> {
    sqlx::query_as::<_, Author>(
        "UPDATE authors SET name = $1 WHERE id = $2 RETURNING id AS author_id, name",
    )
    .bind(name)
    .bind(author_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::Database(DatabaseError::NotFound("Author".to_string())))
}

/// Deleting an author cascades to their books and associations
pub async fn delete(pool: &PgPool, author_id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM authors WHERE id = $1")
        .bind(author_id)
        .execute(pool)
        .await?;

    ensure_affected(result.rows_affected(), "Author")
}
