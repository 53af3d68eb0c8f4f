use serde::Serialize;
use sqlx::PgPool;

use crate::catalog::ensure_affected;
use crate::error::{AppError, DatabaseError};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub user_id: i64,
    pub username: String,
}

/// Login lookup row. Never serialized.
#[derive(sqlx::FromRow)]
pub struct Credentials {
    pub user_id: i64,
    pub password_hash: String,
}

pub async fn create(pool: &PgPool, username: &str, password_hash: &str) -> Result<i64, AppError> {
    let (user_id,) = sqlx::query_as::<_, (i64,)>(
        "INSERT INTO users (username, password_hash) VALUES ($1, $2) RETURNING id",
    )
    .bind(username)
    .bind(password_hash)
    .fetch_one(pool)
    .await?;

    Ok(user_id)
}

pub async fn find_credentials(pool: &PgPool, username: &str) -> Result<Option<Credentials>, AppError> {
    let credentials = sqlx::query_as::<_, Credentials>(
        "SELECT id AS user_id, password_hash FROM users WHERE username = $1",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    Ok(credentials)
}

pub async fn list(pool: &PgPool) -> Result<Vec<User>, AppError> {
    let users = sqlx::query_as::<_, User>("SELECT id AS user_id, username FROM users ORDER BY id")
        .fetch_all(pool)
        .await?;

    Ok(users)
}

pub async fn update(
    pool: &PgPool,
    user_id: i64,
    username: &str,
    password_hash: &str,
) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET username = $1, password_hash = $2
        WHERE id = $3
        RETURNING id AS user_id, username
        "#,
    )
    .bind(username)
    .bind(password_hash)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::Database(DatabaseError::NotFound("User".to_string())))
}

pub async fn delete(pool: &PgPool, user_id: i64) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;

    ensure_affected(result.rows_affected(), "User")
}
