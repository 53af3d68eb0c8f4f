use actix_web::{web, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;

use crate::auth::{Access, RotationCoordinator};
use crate::catalog::books;
use crate::error::AppError;
use crate::middleware::BearerToken;
use crate::routes::{audit_mutation, rotated_response};
use crate::validators::{is_positive_id, is_valid_label};

#[derive(Deserialize)]
pub struct RegisterBookRequest {
    pub title: String,
    pub author_id: i64,
}

#[derive(Deserialize)]
pub struct UpdateBookRequest {
    pub book_id: i64,
    pub title: String,
    pub author_id: i64,
}

#[derive(Deserialize)]
pub struct DeleteBookRequest {
    pub book_id: i64,
}

/// POST /book/register
///
/// # Errors
/// - 400: invalid title, or `author_id` names no author
/// - 409: the author already has a book with this title
pub async fn register_book(
    token: BearerToken,
    body: web::Json<RegisterBookRequest>,
    pool: web::Data<PgPool>,
    coordinator: web::Data<RotationCoordinator>,
) -> Result<HttpResponse, AppError> {
    let title = is_valid_label("title", &body.title)?;
    let author_id = is_positive_id("author_id", body.author_id)?;

    let outcome = coordinator
        .rotate(
            token.as_str(),
            Access::Authenticated,
            books::create(pool.get_ref(), &title, author_id),
        )
        .await;
    let book_id = outcome.as_ref().ok().map(|r| r.data.book_id);
    audit_mutation("CREATE", "book", book_id, &outcome);

    Ok(rotated_response(outcome?))
}

/// GET /book/show
pub async fn list_books(
    token: BearerToken,
    pool: web::Data<PgPool>,
    coordinator: web::Data<RotationCoordinator>,
) -> Result<HttpResponse, AppError> {
    let rotated = coordinator
        .rotate(token.as_str(), Access::Authenticated, books::list(pool.get_ref()))
        .await?;

    Ok(rotated_response(rotated))
}

/// PUT /book/update
pub async fn update_book(
    token: BearerToken,
    body: web::Json<UpdateBookRequest>,
    pool: web::Data<PgPool>,
    coordinator: web::Data<RotationCoordinator>,
) -> Result<HttpResponse, AppError> {
    let book_id = is_positive_id("book_id", body.book_id)?;
    let title = is_valid_label("title", &body.title)?;
    let author_id = is_positive_id("author_id", body.author_id)?;

    let outcome = coordinator
        .rotate(
            token.as_str(),
            Access::Authenticated,
            books::update(pool.get_ref(), book_id, &title, author_id),
        )
        .await;
    audit_mutation("UPDATE", "book", Some(book_id), &outcome);

    Ok(rotated_response(outcome?))
}

/// DELETE /book/delete
pub async fn delete_book(
    token: BearerToken,
    body: web::Json<DeleteBookRequest>,
    pool: web::Data<PgPool>,
    coordinator: web::Data<RotationCoordinator>,
) -> Result<HttpResponse, AppError> {
    let book_id = is_positive_id("book_id", body.book_id)?;

    let outcome = coordinator
        .rotate(
            token.as_str(),
            Access::Authenticated,
            books::delete(pool.get_ref(), book_id),
        )
        .await;
    audit_mutation("DELETE", "book", Some(book_id), &outcome);

    Ok(rotated_response(outcome?))
}
