/// Book/author associations (co-authorship beyond a book's primary author)

use serde::Serialize;
use sqlx::PgPool;

use crate::catalog::ensure_affected;
use crate::error::{AppError, DatabaseError};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BookAuthor {
    pub collection_id: i64,
    pub book_id: i64,
    pub author_id: i64,
}

pub async fn create(pool: &PgPool, book_id: i64, author_id: i64) -> Result<BookAuthor, AppError> {
    let association = sqlx::query_as::<_, BookAuthor>(
        r#"
        INSERT INTO book_authors (book_id, author_id) VALUES ($1, $2)
        RETURNING collection_id, book_id, author_id
        "#,
    )
    .bind(book_id)
    .bind(author_id)
    .fetch_one(pool)
    .await?;

    Ok(association)
}

pub async fn list(pool: &PgPool) -> Result<Vec<BookAuthor>, AppError> {
    let associations = sqlx::query_as::<_, BookAuthor>(
        "SELECT collection_id, book_id, author_id FROM book_authors ORDER BY collection_id",
    )
    .fetch_all(pool)
    .await?;

    Ok(associations)
}

pub async fn update(
    pool: &PgPool,
    collection_id: i64,
    book_id: i64,
    author_id: i64,
) -> Result<BookAuthor, AppError> {
    sqlx::query_as::<_, BookAuthor>(
        r#"
        UPDATE book_authors SET book_id = $1, author_id = $2
        WHERE collection_id = $3
        RETURNING collection_id, book_id, author_id
        "#,
    )
    .bind(book_id)
    .bind(author_id)
    .bind(collection_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::Database(DatabaseError::NotFound("Book author".to_string())))
}

pub async fn delete(pool: &PgPool, collection_id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM book_authors WHERE collection_id = $1")
        .bind(collection_id)
        .execute(pool)
        .await?;

    ensure_affected(result.rows_affected(), "Book author")
}
