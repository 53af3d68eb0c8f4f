use actix_web::{web, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;

use crate::auth::{Access, RotationCoordinator};
use crate::catalog::authors;
use crate::error::AppError;
use crate::middleware::BearerToken;
use crate::routes::{audit_mutation, rotated_response};
use crate::validators::{is_positive_id, is_valid_label};

#[derive(Deserialize)]
pub struct RegisterAuthorRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct UpdateAuthorRequest {
    pub author_id: i64,
    pub name: String,
}

#[derive(Deserialize)]
pub struct DeleteAuthorRequest {
    pub author_id: i64,
}

/// POST /author/register
pub async fn register_author(
    token: BearerToken,
    body: web::Json<RegisterAuthorRequest>,
    pool: web::Data<PgPool>,
    coordinator: web::Data<RotationCoordinator>,
) -> Result<HttpResponse, AppError> {
    let name = is_valid_label("name", &body.name)?;

    let outcome = coordinator
        .rotate(token.as_str(), Access::Authenticated, authors::create(pool.get_ref(), &name))
        .await;
    let author_id = outcome.as_ref().ok().map(|r| r.data.author_id);
    audit_mutation("CREATE", "author", author_id, &outcome);

    Ok(rotated_response(outcome?))
}

/// GET /author/show
pub async fn list_authors(
    token: BearerToken,
    pool: web::Data<PgPool>,
    coordinator: web::Data<RotationCoordinator>,
) -> Result<HttpResponse, AppError> {
    let rotated = coordinator
        .rotate(token.as_str(), Access::Authenticated, authors::list(pool.get_ref()))
        .await?;

    Ok(rotated_response(rotated))
}

/// PUT /author/update
pub async fn update_author(
    token: BearerToken,
    body: web::Json<UpdateAuthorRequest>,
    pool: web::Data<PgPool>,
    coordinator: web::Data<RotationCoordinator>,
) -> Result<HttpResponse, AppError> {
    let author_id = is_positive_id("author_id", body.author_id)?;
    let name = is_valid_label("name", &body.name)?;

    let outcome = coordinator
        .rotate(
            token.as_str(),
            Access::Authenticated,
            authors::update(pool.get_ref(), author_id, &name),
        )
        .await;
    audit_mutation("UPDATE", "author", Some(author_id), &outcome);

    Ok(rotated_response(outcome?))
}

/// DELETE /author/delete
pub async fn delete_author(
    token: BearerToken,
    body: web::Json<DeleteAuthorRequest>,
    pool: web::Data<PgPool>,
    coordinator: web::Data<RotationCoordinator>,
) -> Result<HttpResponse, AppError> {
    let author_id = is_positive_id("author_id", body.author_id)?;

    let outcome = coordinator
        .rotate(
            token.as_str(),
            Access::Authenticated,
            authors::delete(pool.get_ref(), author_id),
        )
        .await;
    audit_mutation("DELETE", "author", Some(author_id), &outcome);

    Ok(rotated_response(outcome?))
}
