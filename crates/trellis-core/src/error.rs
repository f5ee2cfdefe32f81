//! Error types for trellisdb
//!
//! One error hierarchy shared by the compiler and the engine.

use thiserror::Error;

/// The main error type for trellisdb operations
#[derive(Error, Debug)]
pub enum Error {
    // ========== Compiler Errors ==========
    #[error("Query parse error: {0}")]
    Parse(String),

    // ========== Engine Errors ==========
    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    // ========== Internal Errors ==========
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for trellisdb operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns true if the caller can fix the request and retry
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            Error::Parse(_)
                | Error::MissingParameter(_)
                | Error::UnsupportedOperation(_)
                | Error::NodeNotFound(_)
        )
    }

    /// Returns true if this error came out of the parser
    pub fn is_parse(&self) -> bool {
        matches!(self, Error::Parse(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NodeNotFound("user:1".to_string());
        assert_eq!(err.to_string(), "Node not found: user:1");

        let err = Error::UnsupportedOperation("INSERT".to_string());
        assert_eq!(err.to_string(), "Unsupported operation: INSERT");
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::Parse("bad".to_string()).is_parse());
        assert!(Error::Parse("bad".to_string()).is_request_error());
        assert!(Error::MissingParameter("start".to_string()).is_request_error());
        assert!(!Error::Internal("oops".to_string()).is_request_error());
    }
}
