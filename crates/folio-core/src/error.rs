//! Error types for folio.

use serde_json::Value as JsonValue;
use thiserror::Error;

/// Result type alias using folio's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Non-2xx response from the backend API.
///
/// `message` is the envelope's `message` field, or `HTTP {status}` when the
/// body carried none.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ApiError {
    /// HTTP status code.
    pub status: u16,
    /// Human readable message.
    pub message: String,
    /// Correlation ID of the failed request.
    pub correlation_id: Option<String>,
    /// Optional structured detail from the envelope.
    pub detail: Option<JsonValue>,
}

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            correlation_id: None,
            detail: None,
        }
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn with_detail(mut self, detail: JsonValue) -> Self {
        self.detail = Some(detail);
        self
    }

    /// 4xx status.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// 5xx status.
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

/// Core error type for folio operations.
///
/// The type is `Clone` so that the outcome of one shared in-flight fetch can
/// be handed to every caller awaiting it.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Backend returned a non-success status
    #[error(transparent)]
    Api(#[from] ApiError),

    /// HTTP/network request failed before a response was received
    #[error("Request error: {0}")]
    Request(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Key-value storage failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(String),
}

impl Error {
    /// HTTP status carried by the error, if it came from the backend.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api(api) => Some(api.status),
            _ => None,
        }
    }

    /// Correlation ID carried by the error, if any.
    pub fn correlation_id(&self) -> Option<&str> {
        match self {
            Error::Api(api) => api.correlation_id.as_deref(),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display_is_message() {
        let err = ApiError::new(404, "Collection not found");
        assert_eq!(err.to_string(), "Collection not found");
    }

    #[test]
    fn test_error_api_is_transparent() {
        let err: Error = ApiError::new(500, "HTTP 500").into();
        assert_eq!(err.to_string(), "HTTP 500");
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn test_api_error_status_classes() {
        assert!(ApiError::new(422, "x").is_client_error());
        assert!(!ApiError::new(422, "x").is_server_error());
        assert!(ApiError::new(503, "x").is_server_error());
    }

    #[test]
    fn test_correlation_id_accessor() {
        let err: Error = ApiError::new(400, "bad")
            .with_correlation_id("cid-1")
            .into();
        assert_eq!(err.correlation_id(), Some("cid-1"));
        assert_eq!(Error::Internal("x".into()).correlation_id(), None);
    }

    #[test]
    fn test_error_display_storage() {
        let err = Error::Storage("disk full".to_string());
        assert_eq!(err.to_string(), "Storage error: disk full");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("access denied"));
    }

    #[test]
    fn test_error_is_send_sync_clone() {
        fn assert_traits<T: Send + Sync + Clone>() {}
        assert_traits::<Error>();
    }
}
