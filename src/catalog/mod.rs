/// Catalog data access
///
/// Typed queries over the shared `PgPool`, one module per resource. Handlers
/// never build SQL themselves.

pub mod authors;
pub mod book_authors;
pub mod books;
pub mod users;

use crate::error::{AppError, DatabaseError};

/// Turn a zero-row UPDATE/DELETE into `NotFound` for `what`
pub(crate) fn ensure_affected(rows_affected: u64, what: &str) -> Result<(), AppError> {
    if rows_affected == 0 {
        return Err(AppError::Database(DatabaseError::NotFound(what.to_string())));
    }
    Ok(())
}
