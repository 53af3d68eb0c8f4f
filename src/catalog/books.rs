use serde::Serialize;
use sqlx::PgPool;

use crate::catalog::ensure_affected;
use crate::error::{AppError, DatabaseError};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Book {
    pub book_id: i64,
    pub title: String,
    pub author_id: i64,
}

pub async fn create(pool: &PgPool, title: &str, author_id: i64) -> Result<Book, AppError> {
    let book = sqlx::query_as::<_, Book>(
        r#"
        INSERT INTO books (title, author_id) VALUES ($1, $2)
        RETURNING id AS book_id, title, author_id
        "#,
    )
    .bind(title)
    .bind(author_id)
    .fetch_one(pool)
    .await?;

    Ok(book)
}

pub async fn list(pool: &PgPool) -> Result<Vec<Book>, AppError> {
    let books = sqlx::query_as::<_, Book>(
        "SELECT id AS book_id, title, author_id FROM books ORDER BY id",
    )
    .fetch_all(pool)
    .await?;

    Ok(books)
}

pub async fn update(pool: &PgPool, book_id: i64, title: &str, author_id: i64) -> Result<Book, AppError> {
    sqlx::query_as::<_, Book>(
        r#"
        UPDATE books SET title = $1, author_id = $2
        WHERE id = $3
        RETURNING id AS book_id, title, author_id
        "#,
    )
    .bind(title)
    .bind(author_id)
    .bind(book_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::Database(DatabaseError::NotFound("Book".to_string())))
}

pub async fn delete(pool: &PgPool, book_id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM books WHERE id = $1")
        .bind(book_id)
        .execute(pool)
        .await?;

    ensure_affected(result.rows_affected(), "Book")
}
