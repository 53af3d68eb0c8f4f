/// Unified Error Handling
///
/// Every failure a handler can produce maps to one `AppError`. Each variant
/// carries a stable code and a human-readable title for the client; the
/// underlying driver or signing message is logged and never returned.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use thiserror::Error;

use crate::auth::{StoreError, TokenError};

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// Validation errors for input data
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("{0} is empty")]
    EmptyField(String),
    #[error("{0} is too short (minimum {1} characters)")]
    TooShort(String, usize),
    #[error("{0} is too long (maximum {1} characters)")]
    TooLong(String, usize),
    #[error("{0} has invalid format")]
    InvalidFormat(String),
    #[error("{0} contains suspicious content")]
    SuspiciousContent(String),
    #[error("input contains potentially dangerous SQL patterns")]
    PossibleSQLInjection,
    #[error("request body is malformed: {0}")]
    MalformedBody(String),
}

/// Catalog database errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Duplicate entry: {0}")]
    UniqueConstraintViolation(String),
    #[error("Referenced record does not exist: {0}")]
    InvalidReference(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Database connection error: {0}")]
    ConnectionPool(String),
    #[error("Database error: {0}")]
    UnexpectedError(String),
}

/// Credential errors raised outside the token lifecycle
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
}

/// Configuration errors detected at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required config: {0}")]
    MissingRequired(String),
    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Token(TokenError::Persistence(err))
    }
}

/// Postgres SQLSTATE codes the catalog distinguishes
const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        let database_error = match &err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db) => match db.code().as_deref() {
                Some(UNIQUE_VIOLATION) => {
                    DatabaseError::UniqueConstraintViolation(db.message().to_string())
                }
                Some(FOREIGN_KEY_VIOLATION) => {
                    DatabaseError::InvalidReference(db.message().to_string())
                }
                _ => DatabaseError::UnexpectedError(err.to_string()),
            },
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => DatabaseError::ConnectionPool(err.to_string()),
            _ => DatabaseError::UnexpectedError(err.to_string()),
        };
        AppError::Database(database_error)
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error body returned to clients
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Correlates the response with the server-side log entry
    pub error_id: String,
    /// Stable category for client-side handling
    pub code: String,
    /// Human-readable summary, free of internal detail
    pub title: String,
    pub status: u16,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_id: String, code: String, title: String, status: u16) -> Self {
        Self {
            error_id,
            code,
            title,
            status,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Trait for converting errors to HTTP responses with proper logging
pub trait ErrorHandler {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);
}

impl AppError {
    fn classify(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Validation(e) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string()),

            AppError::Database(e) => match e {
                DatabaseError::UniqueConstraintViolation(_) => (
                    StatusCode::CONFLICT,
                    "DUPLICATE_ENTRY",
                    "Record already exists".to_string(),
                ),
                DatabaseError::InvalidReference(_) => (
                    StatusCode::BAD_REQUEST,
                    "INVALID_REFERENCE",
                    "Referenced record does not exist".to_string(),
                ),
                DatabaseError::NotFound(what) => {
                    (StatusCode::NOT_FOUND, "NOT_FOUND", format!("{} not found", what))
                }
                DatabaseError::ConnectionPool(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Database service temporarily unavailable".to_string(),
                ),
                DatabaseError::UnexpectedError(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database error occurred".to_string(),
                ),
            },

            AppError::Auth(AuthError::InvalidCredentials) => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                "Authentication failed".to_string(),
            ),

            AppError::Token(e) => match e {
                TokenError::MissingAuth => (
                    StatusCode::UNAUTHORIZED,
                    "MISSING_TOKEN",
                    "Missing authentication token".to_string(),
                ),
                TokenError::Invalid => (
                    StatusCode::UNAUTHORIZED,
                    "TOKEN_INVALID",
                    "Invalid or expired token".to_string(),
                ),
                TokenError::Forbidden => (
                    StatusCode::FORBIDDEN,
                    "FORBIDDEN",
                    "You don't have access to this resource".to_string(),
                ),
                TokenError::Persistence(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "TOKEN_STORE_UNAVAILABLE",
                    "Token service temporarily unavailable".to_string(),
                ),
                TokenError::PartialFailure(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "ROTATION_INCOMPLETE",
                    "The operation completed but no replacement token could be issued; \
                     please authenticate again"
                        .to_string(),
                ),
                TokenError::Signing(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                ),
            },

            AppError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR",
                "Server configuration error".to_string(),
            ),

            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        }
    }
}

impl ErrorHandler for AppError {
    fn error_response(&self, request_id: &str) -> (StatusCode, ErrorResponse) {
        let (status, code, title) = self.classify();
        let body = ErrorResponse::new(request_id.to_string(), code.to_string(), title, status.as_u16());
        (status, body)
    }

    fn log_error(&self, request_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Validation error");
            }
            AppError::Database(DatabaseError::UniqueConstraintViolation(_))
            | AppError::Database(DatabaseError::InvalidReference(_))
            | AppError::Database(DatabaseError::NotFound(_)) => {
                tracing::warn!(request_id = request_id, error = %self, "Rejected catalog write");
            }
            AppError::Database(e) => {
                tracing::error!(request_id = request_id, error = %e, "Database error");
            }
            AppError::Auth(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Invalid credentials attempt");
            }
            AppError::Token(TokenError::PartialFailure(e)) => {
                tracing::error!(
                    request_id = request_id,
                    error = %e,
                    "Business effect committed but token rotation failed"
                );
            }
            AppError::Token(TokenError::Persistence(e)) => {
                tracing::error!(request_id = request_id, error = %e, "Token store error");
            }
            AppError::Token(TokenError::Signing(e)) => {
                tracing::error!(request_id = request_id, error = %e, "Token signing error");
            }
            AppError::Token(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Authentication error");
            }
            AppError::Config(e) => {
                tracing::error!(request_id = request_id, error = %e, "Configuration error");
            }
            AppError::Internal(msg) => {
                tracing::error!(request_id = request_id, error = %msg, "Internal error");
            }
        }
    }
}

/// Implement ResponseError for Actix-web integration
impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&request_id);

        let (status, error_response) = <Self as ErrorHandler>::error_response(self, &request_id);

        HttpResponse::build(status).json(error_response)
    }

    fn status_code(&self) -> StatusCode {
        self.classify().0
    }
}

// ============================================================================
// 4. ERROR CONTEXT ENRICHMENT
// ============================================================================

/// Per-operation context attached to log lines
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub user_id: Option<String>,
    pub operation: String,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            user_id: None,
            operation: operation.into(),
        }
    }

    pub fn with_user_id(mut self, user_id: String) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn log_error(&self, error: &AppError) {
        tracing::warn!(
            request_id = %self.request_id,
            operation = %self.operation,
            user_id = ?self.user_id,
            error = %error,
            "Operation failed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::EmptyField("name".to_string());
        assert_eq!(err.to_string(), "name is empty");
    }

    #[test]
    fn test_app_error_conversion() {
        let val_err = ValidationError::InvalidFormat("test".to_string());
        let app_err: AppError = val_err.into();
        match app_err {
            AppError::Validation(_) => (),
            _ => panic!("Expected Validation error"),
        }
    }

    #[test]
    fn test_token_errors_map_to_distinct_codes() {
        let cases = vec![
            (AppError::Token(TokenError::MissingAuth), 401, "MISSING_TOKEN"),
            (AppError::Token(TokenError::Invalid), 401, "TOKEN_INVALID"),
            (AppError::Token(TokenError::Forbidden), 403, "FORBIDDEN"),
            (
                AppError::Token(TokenError::Persistence(StoreError::Unavailable("down".into()))),
                503,
                "TOKEN_STORE_UNAVAILABLE",
            ),
            (
                AppError::Token(TokenError::PartialFailure(StoreError::Conflict)),
                500,
                "ROTATION_INCOMPLETE",
            ),
        ];

        for (error, status, code) in cases {
            let (status_code, body) = <AppError as ErrorHandler>::error_response(&error, "req-1");
            assert_eq!(status_code.as_u16(), status);
            assert_eq!(body.code, code);
            assert_eq!(body.status, status);
        }
    }

    #[test]
    fn test_internal_detail_is_not_exposed() {
        let error = AppError::Database(DatabaseError::UnexpectedError(
            "relation \"books\" does not exist".to_string(),
        ));
        let (_, body) = <AppError as ErrorHandler>::error_response(&error, "req-2");
        assert_eq!(body.title, "Database error occurred");
        assert!(!body.title.contains("relation"));
    }

    #[test]
    fn test_store_error_converts_to_persistence() {
        let app_err: AppError = StoreError::Duplicate.into();
        assert!(matches!(
            app_err,
            AppError::Token(TokenError::Persistence(StoreError::Duplicate))
        ));
    }

    #[test]
    fn test_error_context_creation() {
        let ctx = ErrorContext::new("author_register");
        assert_eq!(ctx.operation, "author_register");
        assert!(ctx.user_id.is_none());

        let ctx_with_user = ctx.with_user_id("7".to_string());
        assert_eq!(ctx_with_user.user_id, Some("7".to_string()));
    }
}
