//! Common error types used throughout cinedex.
//!
//! This module provides a unified error type that covers common failure cases
//! such as not found, database errors, invalid input, and I/O failures.

/// Common error type for cinedex.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A database operation failed.
    #[error("Database error: {0}")]
    Database(String),

    /// An I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input was provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new NotFound error.
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new Database error.
    pub fn database<S: Into<String>>(msg: S) -> Self {
        Self::Database(msg.into())
    }

    /// Create a new InvalidInput error.
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create a new Io error from a message (for external API errors, etc).
    pub fn io<S: Into<String>>(msg: S) -> Self {
        Self::Io(std::io::Error::other(msg.into()))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("serialization failed: {err}"))
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::not_found("movie 603");
        assert_eq!(err.to_string(), "Not found: movie 603");

        let err = Error::database("connection failed");
        assert_eq!(err.to_string(), "Database error: connection failed");

        let err = Error::invalid_input("bad format");
        assert_eq!(err.to_string(), "Invalid input: bad format");

        let err = Error::internal("unexpected state");
        assert_eq!(err.to_string(), "Internal error: unexpected state");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<u32>("not a number").unwrap_err();
        let err = Error::from(json_err);
        assert!(matches!(err, Error::Internal(_)));
    }
}
