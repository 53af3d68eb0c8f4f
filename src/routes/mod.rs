mod authors;
mod book_authors;
mod books;
mod health_check;
mod users;

use actix_web::{error::JsonPayloadError, HttpRequest, HttpResponse};
use serde::Serialize;

use crate::audit::{AuditLog, AuditStatus};
use crate::auth::Rotated;
use crate::error::{AppError, ValidationError};

pub use authors::{delete_author, list_authors, register_author, update_author};
pub use book_authors::{delete_book_author, list_book_authors, register_book_author, update_book_author};
pub use books::{delete_book, list_books, register_book, update_book};
pub use health_check::health_check;
pub use users::{delete_user, list_users, login, register_user, update_user};

/// Body of every successful authenticated response. `token` replaces the
/// one the caller presented.
#[derive(Serialize)]
pub struct SuccessResponse<T> {
    pub status: &'static str,
    pub token: String,
    pub data: T,
}

pub(crate) fn rotated_response<T: Serialize>(rotated: Rotated<T>) -> HttpResponse {
    HttpResponse::Ok().json(SuccessResponse {
        status: "success",
        token: rotated.token,
        data: rotated.data,
    })
}

/// Audit one catalog mutation once its outcome is known
pub(crate) fn audit_mutation<T>(
    action: &str,
    resource_type: &str,
    resource_id: Option<i64>,
    outcome: &Result<T, AppError>,
) {
    let (status, message) = match outcome {
        Ok(_) => (AuditStatus::Success, format!("{} {} succeeded", action, resource_type)),
        Err(e) => (AuditStatus::Failure, e.to_string()),
    };

    let mut entry = AuditLog::new(action, resource_type, status, message);
    if let Some(id) = resource_id {
        entry = entry.with_resource_id(id);
    }
    entry.log();
}

/// Malformed or incomplete JSON bodies are validation errors
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::Validation(ValidationError::MalformedBody(err.to_string())).into()
}
