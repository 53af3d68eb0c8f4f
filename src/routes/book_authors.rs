use actix_web::{web, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;

use crate::auth::{Access, RotationCoordinator};
use crate::catalog::book_authors;
use crate::error::AppError;
use crate::middleware::BearerToken;
use crate::routes::{audit_mutation, rotated_response};
use crate::validators::is_positive_id;

#[derive(Deserialize)]
pub struct RegisterBookAuthorRequest {
    pub book_id: i64,
    pub author_id: i64,
}

#[derive(Deserialize)]
pub struct UpdateBookAuthorRequest {
    pub collection_id: i64,
    pub book_id: i64,
    pub author_id: i64,
}

#[derive(Deserialize)]
pub struct DeleteBookAuthorRequest {
    pub collection_id: i64,
}

/// POST /book_author/register
pub async fn register_book_author(
    token: BearerToken,
    body: web::Json<RegisterBookAuthorRequest>,
    pool: web::Data<PgPool>,
    coordinator: web::Data<RotationCoordinator>,
) -> Result<HttpResponse, AppError> {
    let book_id = is_positive_id("book_id", body.book_id)?;
    let author_id = is_positive_id("author_id", body.author_id)?;

    let outcome = coordinator
        .rotate(
            token.as_str(),
            Access::Authenticated,
            book_authors::create(pool.get_ref(), book_id, author_id),
        )
        .await;
    let collection_id = outcome.as_ref().ok().map(|r| r.data.collection_id);
    audit_mutation("CREATE", "book_author", collection_id, &outcome);

    Ok(rotated_response(outcome?))
}

/// GET /book_author/show
pub async fn list_book_authors(
    token: BearerToken,
    pool: web::Data<PgPool>,
    coordinator: web::Data<RotationCoordinator>,
) -> Result<HttpResponse, AppError> {
    let rotated = coordinator
        .rotate(token.as_str(), Access::Authenticated, book_authors::list(pool.get_ref()))
        .await?;

    Ok(rotated_response(rotated))
}

/// PUT /book_author/update
pub async fn update_book_author(
    token: BearerToken,
    body: web::Json<UpdateBookAuthorRequest>,
    pool: web::Data<PgPool>,
    coordinator: web::Data<RotationCoordinator>,
) -> Result<HttpResponse, AppError> {
    let collection_id = is_positive_id("collection_id", body.collection_id)?;
    let book_id = is_positive_id("book_id", body.book_id)?;
    let author_id = is_positive_id("author_id", body.author_id)?;

    let outcome = coordinator
        .rotate(
            token.as_str(),
            Access::Authenticated,
            book_authors::update(pool.get_ref(), collection_id, book_id, author_id),
        )
        .await;
    audit_mutation("UPDATE", "book_author", Some(collection_id), &outcome);

    Ok(rotated_response(outcome?))
}

/// DELETE /book_author/delete
pub async fn delete_book_author(
    token: BearerToken,
    body: web::Json<DeleteBookAuthorRequest>,
    pool: web::Data<PgPool>,
    coordinator: web::Data<RotationCoordinator>,
) -> Result<HttpResponse, AppError> {
    let collection_id = is_positive_id("collection_id", body.collection_id)?;

    let outcome = coordinator
        .rotate(
            token.as_str(),
            Access::Authenticated,
            book_authors::delete(pool.get_ref(), collection_id),
        )
        .await;
    audit_mutation("DELETE", "book_author", Some(collection_id), &outcome);

    Ok(rotated_response(outcome?))
}
