/// User Routes
///
/// Registration and login are public. Everything else requires a bearer
/// token and rotates it; update and delete additionally require that the
/// token belongs to the targeted user.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::audit::{AuditLog, AuditStatus};
use crate::auth::{hash_password, verify_password, Access, OwnerId, RotationCoordinator};
use crate::catalog::users;
use crate::error::{AppError, AuthError, ErrorContext};
use crate::middleware::BearerToken;
use crate::routes::{audit_mutation, rotated_response};
use crate::validators::{is_positive_id, is_valid_username};

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub user_id: i64,
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct DeleteUserRequest {
    pub user_id: i64,
}

#[derive(Serialize)]
pub struct UserIdData {
    pub user_id: i64,
}

#[derive(Serialize)]
struct RegisteredResponse {
    status: &'static str,
    data: UserIdData,
}

#[derive(Serialize)]
struct LoginResponse {
    status: &'static str,
    token: String,
    data: UserIdData,
}

/// POST /user/register
///
/// # Errors
/// - 400: invalid username or password length
/// - 409: username already taken
pub async fn register_user(
    body: web::Json<CredentialsRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_registration");

    let username = is_valid_username(&body.username)?;
    let password_hash = hash_password(&body.password)?;

    let outcome = users::create(pool.get_ref(), &username, &password_hash).await;
    audit_mutation("CREATE", "user", outcome.as_ref().ok().copied(), &outcome);
    let user_id = outcome.map_err(|e| {
        context.log_error(&e);
        e
    })?;

    tracing::info!(request_id = %context.request_id, user_id, "User registered successfully");

    Ok(HttpResponse::Created().json(RegisteredResponse {
        status: "success",
        data: UserIdData { user_id },
    }))
}

/// POST /user/auth
///
/// Unknown usernames and wrong passwords are indistinguishable, in both
/// response and timing.
pub async fn login(
    body: web::Json<CredentialsRequest>,
    pool: web::Data<PgPool>,
    coordinator: web::Data<RotationCoordinator>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");

    let credentials = users::find_credentials(pool.get_ref(), body.username.trim()).await?;
    let password_valid = verify_password(
        &body.password,
        credentials.as_ref().map(|c| c.password_hash.as_str()),
    )?;

    let user_id = match credentials {
        Some(credentials) if password_valid => credentials.user_id,
        _ => {
            AuditLog::new("ISSUE", "token", AuditStatus::Failure, "Invalid credentials").log();
            return Err(AuthError::InvalidCredentials.into());
        }
    };

    let token = coordinator.issuer().issue(&OwnerId::from(user_id)).await?;

    AuditLog::new("ISSUE", "token", AuditStatus::Success, "User logged in")
        .with_user_id(user_id)
        .log();
    tracing::info!(request_id = %context.request_id, user_id, "User logged in successfully");

    Ok(HttpResponse::Ok().json(LoginResponse {
        status: "success",
        token,
        data: UserIdData { user_id },
    }))
}

/// GET /user/show
pub async fn list_users(
    token: BearerToken,
    pool: web::Data<PgPool>,
    coordinator: web::Data<RotationCoordinator>,
) -> Result<HttpResponse, AppError> {
    let rotated = coordinator
        .rotate(token.as_str(), Access::Authenticated, users::list(pool.get_ref()))
        .await?;

    Ok(rotated_response(rotated))
}

/// PUT /user/update
pub async fn update_user(
    token: BearerToken,
    body: web::Json<UpdateUserRequest>,
    pool: web::Data<PgPool>,
    coordinator: web::Data<RotationCoordinator>,
) -> Result<HttpResponse, AppError> {
    let user_id = is_positive_id("user_id", body.user_id)?;
    let username = is_valid_username(&body.username)?;
    let password_hash = hash_password(&body.password)?;

    let target = OwnerId::from(user_id);
    let outcome = coordinator
        .rotate(
            token.as_str(),
            Access::Owner(&target),
            users::update(pool.get_ref(), user_id, &username, &password_hash),
        )
        .await;
    audit_mutation("UPDATE", "user", Some(user_id), &outcome);

    Ok(rotated_response(outcome?))
}

/// DELETE /user/delete
pub async fn delete_user(
    token: BearerToken,
    body: web::Json<DeleteUserRequest>,
    pool: web::Data<PgPool>,
    coordinator: web::Data<RotationCoordinator>,
) -> Result<HttpResponse, AppError> {
    let user_id = is_positive_id("user_id", body.user_id)?;

    let target = OwnerId::from(user_id);
    let outcome = coordinator
        .rotate(
            token.as_str(),
            Access::Owner(&target),
            users::delete(pool.get_ref(), user_id),
        )
        .await;
    audit_mutation("DELETE", "user", Some(user_id), &outcome);

    Ok(rotated_response(outcome?))
}
