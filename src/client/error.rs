//! Client Error Types
//!
//! Caller-facing errors of a Bee connection.

use thiserror::Error;

use crate::bee::{BeeError, ServerError};

// ============================================================================
// ClientError
// ============================================================================

/// Client error.
///
/// Errors are `Clone` so a failure stored on a statement can be handed to
/// every later call on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Connection refused, timed out or reset
    #[error("Connection error: {0}")]
    Connection(String),

    /// Operation on, or pending across, a closed connection
    #[error("Connection closed")]
    ConnectionClosed,

    /// Malformed payload for a matched request
    #[error("Decode error: {0}")]
    Decode(String),

    /// Failure reported by the server
    #[error("Application error: {code} - {message}")]
    Application {
        /// Server error code
        code: i32,
        /// Server error message
        message: String,
    },

    /// A wait exceeded its deadline
    #[error("Timeout: {0}")]
    Timeout(String),

    /// `next()` called with no buffered row
    #[error("No row available")]
    EmptyResult,

    /// Column name not present in the header
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    /// Value could not be converted to the requested type
    #[error("Type conversion error: {0}")]
    TypeConversion(String),
}

impl ClientError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create an application error.
    pub fn application(code: i32, message: impl Into<String>) -> Self {
        Self::Application {
            code,
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create a type conversion error.
    pub fn type_conversion(msg: impl Into<String>) -> Self {
        Self::TypeConversion(msg.into())
    }

    /// Server error code, if the server reported this error.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Application { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Check if this is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Whether retrying on a new connection or a new wait may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::ConnectionClosed | Self::Timeout(_)
        )
    }
}

impl From<ServerError> for ClientError {
    fn from(err: ServerError) -> Self {
        Self::Application {
            code: err.code,
            message: err.message,
        }
    }
}

impl From<BeeError> for ClientError {
    fn from(err: BeeError) -> Self {
        match err {
            BeeError::Io(e) => Self::Connection(e.to_string()),
            other => Self::Decode(other.to_string()),
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Connection(err.to_string())
    }
}

// ============================================================================
// Result Type
// ============================================================================

/// Client result type.
pub type ClientResult<T> = Result<T, ClientError>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bee::ValueError;

    #[test]
    fn test_client_error_display() {
        let err = ClientError::connection("Connection refused");
        assert_eq!(err.to_string(), "Connection error: Connection refused");

        let err = ClientError::application(60937, "auth failed");
        assert_eq!(err.to_string(), "Application error: 60937 - auth failed");
    }

    #[test]
    fn test_client_error_code() {
        assert_eq!(ClientError::application(60937, "auth failed").code(), Some(60937));
        assert_eq!(ClientError::EmptyResult.code(), None);
    }

    #[test]
    fn test_client_error_retryable() {
        assert!(ClientError::connection("reset").is_retryable());
        assert!(ClientError::ConnectionClosed.is_retryable());
        assert!(ClientError::timeout("columns").is_retryable());
        assert!(ClientError::timeout("columns").is_timeout());
        assert!(!ClientError::application(1, "bad").is_retryable());
        assert!(!ClientError::decode("bad").is_retryable());
    }

    #[test]
    fn test_from_bee_error() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(matches!(ClientError::from(BeeError::Io(io)), ClientError::Connection(_)));

        let err = ClientError::from(BeeError::Value(ValueError::UnexpectedEof));
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[test]
    fn test_from_server_error() {
        let err: ClientError = ServerError::new(7, "denied").into();
        assert_eq!(err, ClientError::application(7, "denied"));
    }
}
