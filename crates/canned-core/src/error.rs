//! Error types for canned-core

use thiserror::Error;

/// Result type alias for canned operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the canned stub server
///
/// Startup variants are fatal. Request variants are contained to a single
/// request and never reach the wire: the dispatcher flattens all of them into
/// the same `400 invalid request` response.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration document could not be parsed
    #[error("Invalid configuration: {0}")]
    Config(#[source] serde_json::Error),

    /// Configured status code is not a valid HTTP status
    #[error("Invalid status {status} for identifier {id:?}")]
    InvalidStatus { id: String, status: u16 },

    /// Listening port could not be parsed
    #[error("Invalid port {0:?}")]
    InvalidPort(String),

    /// Request carried no Content-Length header
    #[error("Missing Content-Length header")]
    MissingContentLength,

    /// Content-Length header is not an unsigned integer
    #[error("Invalid Content-Length header: {0:?}")]
    InvalidContentLength(String),

    /// Body length differs from the declared Content-Length
    #[error("Body length {actual} does not match Content-Length {declared}")]
    BodyLengthMismatch { declared: usize, actual: usize },

    /// Body too large
    #[error("Body too large: {size} bytes exceeds limit of {limit} bytes")]
    BodyTooLarge { size: usize, limit: usize },

    /// Body is not a well-formed JSON document
    #[error("Malformed request body: {0}")]
    MalformedBody(#[source] serde_json::Error),

    /// Body has no string `id` field
    #[error("Request body has no string id field")]
    MissingId,

    /// Identifier is not configured
    #[error("Unknown identifier {0:?}")]
    UnknownId(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Hyper error
    #[error("HTTP error: {0}")]
    Hyper(String),
}

impl Error {
    /// Whether this error belongs to a single request rather than the process
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            Error::MissingContentLength
                | Error::InvalidContentLength(_)
                | Error::BodyLengthMismatch { .. }
                | Error::BodyTooLarge { .. }
                | Error::MalformedBody(_)
                | Error::MissingId
                | Error::UnknownId(_)
                | Error::Hyper(_)
        )
    }
}

impl From<hyper::Error> for Error {
    fn from(err: hyper::Error) -> Self {
        Error::Hyper(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_errors_are_classified() {
        assert!(Error::MissingContentLength.is_request_error());
        assert!(Error::UnknownId("x".to_string()).is_request_error());
        assert!(Error::BodyTooLarge { size: 2, limit: 1 }.is_request_error());
        assert!(!Error::InvalidPort("abc".to_string()).is_request_error());
        assert!(!Error::InvalidStatus { id: "x".to_string(), status: 42 }.is_request_error());
    }

    #[test]
    fn test_error_display() {
        let err = Error::BodyLengthMismatch { declared: 10, actual: 4 };
        assert_eq!(err.to_string(), "Body length 4 does not match Content-Length 10");
    }
}
