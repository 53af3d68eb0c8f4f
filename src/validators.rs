/// Input validators for catalog requests
///
/// Every name, title and id is checked before a request touches the token
/// store, so malformed input never consumes a token.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MIN_USERNAME_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 64;
const MAX_LABEL_LENGTH: usize = 256;

lazy_static! {
    static ref USERNAME_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_.-]+$").unwrap();

    static ref SQL_INJECTION_PATTERNS: [Regex; 5] = [
        // Union-based SQL injection
        Regex::new(r"(?i)\s+UNION\s+(ALL\s+)?SELECT\b").unwrap(),
        // Comment-based injection
        Regex::new(r"(--|/\*|\*/)").unwrap(),
        // Stacked queries
        Regex::new(r"(?i);\s*(INSERT|UPDATE|DELETE|DROP|CREATE|ALTER|TRUNCATE)\b").unwrap(),
        // Time-based blind injection
        Regex::new(r"(?i)\b(SLEEP|WAITFOR|BENCHMARK|PG_SLEEP)\s*\(").unwrap(),
        // Boolean-based injection
        Regex::new(r#"(?i)['"]\s*(\bOR\b|\bAND\b)\s*['"]?[0-9a-z]*['"]?\s*=\s*['"]?[0-9a-z]*"#).unwrap(),
    ];
}

/// Validates a username
/// - 3..=64 characters
/// - letters, digits, `_`, `.` and `-` only
pub fn is_valid_username(username: &str) -> Result<String, ValidationError> {
    let trimmed = username.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("username".to_string()));
    }

    let length = trimmed.chars().count();
    if length < MIN_USERNAME_LENGTH {
        return Err(ValidationError::TooShort("username".to_string(), MIN_USERNAME_LENGTH));
    }
    if length > MAX_USERNAME_LENGTH {
        return Err(ValidationError::TooLong("username".to_string(), MAX_USERNAME_LENGTH));
    }

    if !USERNAME_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("username".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Validates a free-text label such as an author name or a book title
/// - 1..=256 characters after trimming
/// - no control characters
/// - no SQL injection patterns
pub fn is_valid_label(field: &str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field.to_string()));
    }

    if trimmed.chars().count() > MAX_LABEL_LENGTH {
        return Err(ValidationError::TooLong(field.to_string(), MAX_LABEL_LENGTH));
    }

    if trimmed.chars().any(|c| c.is_control()) {
        return Err(ValidationError::SuspiciousContent(field.to_string()));
    }

    if contains_sql_injection_patterns(trimmed) {
        return Err(ValidationError::PossibleSQLInjection);
    }

    Ok(trimmed.to_string())
}

pub fn is_positive_id(field: &str, id: i64) -> Result<i64, ValidationError> {
    if id <= 0 {
        return Err(ValidationError::InvalidFormat(field.to_string()));
    }
    Ok(id)
}

fn contains_sql_injection_patterns(input: &str) -> bool {
    SQL_INJECTION_PATTERNS.iter().any(|pattern| pattern.is_match(input))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_username() {
        assert_eq!(is_valid_username("  ada.l_99-x ").unwrap(), "ada.l_99-x");
    }

    #[test]
    fn test_invalid_username() {
        assert!(is_valid_username("").is_err());
        assert!(is_valid_username("ab").is_err());
        assert!(is_valid_username(&"a".repeat(65)).is_err());
        assert!(is_valid_username("has space").is_err());
        assert!(is_valid_username("semi;colon").is_err());
    }

    #[test]
    fn test_valid_labels() {
        assert!(is_valid_label("title", "The Rust Programming Language").is_ok());
        assert!(is_valid_label("title", "Concatenation: A Study").is_ok());
        assert!(is_valid_label("name", "O'Brien").is_ok());
        assert!(is_valid_label("name", "Jean-Pierre").is_ok());
        assert_eq!(is_valid_label("name", "  Ursula  ").unwrap(), "Ursula");
    }

    #[test]
    fn test_label_length_limits() {
        assert!(is_valid_label("title", "   ").is_err());
        assert!(is_valid_label("title", &"a".repeat(256)).is_ok());
        assert!(is_valid_label("title", &"a".repeat(257)).is_err());
    }

    #[test]
    fn test_sql_injection_in_label() {
        assert!(is_valid_label("name", "x'; DROP TABLE books--").is_err());
        assert!(is_valid_label("name", "x UNION SELECT password_hash").is_err());
        assert!(is_valid_label("name", "' OR '1'='1").is_err());
    }

    #[test]
    fn test_control_characters() {
        assert!(is_valid_label("name", "Name\0with\0null").is_err());
        assert!(is_valid_label("name", "line\nbreak").is_err());
    }

    #[test]
    fn test_positive_ids() {
        assert_eq!(is_positive_id("book_id", 3).unwrap(), 3);
        assert!(is_positive_id("book_id", 0).is_err());
        assert!(is_positive_id("book_id", -1).is_err());
    }
}
