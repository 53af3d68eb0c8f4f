/// Audit trail
///
/// One structured `tracing` event per security-relevant action: token
/// issuance, token rotation and catalog mutations. Token strings are never
/// part of an entry.

use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditStatus {
    Success,
    Failure,
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditStatus::Success => f.write_str("SUCCESS"),
            AuditStatus::Failure => f.write_str("FAILURE"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuditLog {
    pub log_id: String,
    pub timestamp: DateTime<Utc>,
    /// CREATE, READ, UPDATE, DELETE, ISSUE, ROTATE
    pub action: String,
    /// user, author, book, book_author, token
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub user_id: Option<String>,
    pub status: AuditStatus,
    pub message: String,
}

impl AuditLog {
    pub fn new(
        action: impl Into<String>,
        resource_type: impl Into<String>,
        status: AuditStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            log_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            action: action.into(),
            resource_type: resource_type.into(),
            resource_id: None,
            user_id: None,
            status,
            message: message.into(),
        }
    }

    pub fn with_resource_id(mut self, id: impl ToString) -> Self {
        self.resource_id = Some(id.to_string());
        self
    }

    pub fn with_user_id(mut self, user_id: impl ToString) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    pub fn log(&self) {
        match self.status {
            AuditStatus::Failure => tracing::warn!(
                log_id = %self.log_id,
                timestamp = %self.timestamp.to_rfc3339(),
                action = %self.action,
                resource_type = %self.resource_type,
                resource_id = ?self.resource_id,
                user_id = ?self.user_id,
                status = %self.status,
                message = %self.message,
                "Audit log entry"
            ),
            AuditStatus::Success => tracing::info!(
                log_id = %self.log_id,
                timestamp = %self.timestamp.to_rfc3339(),
                action = %self.action,
                resource_type = %self.resource_type,
                resource_id = ?self.resource_id,
                user_id = ?self.user_id,
                status = %self.status,
                message = %self.message,
                "Audit log entry"
            ),
        }
    }
}
