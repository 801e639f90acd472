//! Error types for PLEER.

use thiserror::Error;

/// Common error type for PLEER.
#[derive(Error, Debug)]
pub enum PleerError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Permission denied error.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Resource already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for PleerError {
    fn from(e: sqlx::Error) -> Self {
        PleerError::Database(e.to_string())
    }
}

/// Result type alias for PLEER operations.
pub type Result<T> = std::result::Result<T, PleerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_display() {
        let err = PleerError::Auth("invalid password".to_string());
        assert_eq!(err.to_string(), "authentication error: invalid password");
    }

    #[test]
    fn test_validation_error_display() {
        let err = PleerError::Validation("directory name is required".to_string());
        assert_eq!(
            err.to_string(),
            "validation error: directory name is required"
        );
    }

    #[test]
    fn test_not_found_error_display() {
        let err = PleerError::NotFound("File".to_string());
        assert_eq!(err.to_string(), "File not found");
    }

    #[test]
    fn test_conflict_error_display() {
        let err = PleerError::Conflict("facts/1.mp3 already exists".to_string());
        assert_eq!(err.to_string(), "conflict: facts/1.mp3 already exists");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PleerError = io_err.into();
        assert!(matches!(err, PleerError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_result_alias() {
        fn sample_ok() -> Result<i32> {
            Ok(42)
        }

        fn sample_err() -> Result<i32> {
            Err(PleerError::Permission("test".to_string()))
        }

        assert_eq!(sample_ok().unwrap(), 42);
        assert!(sample_err().is_err());
    }
}
