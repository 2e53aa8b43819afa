//! Bee protocol error types.

use std::fmt;
use std::io;

use super::value::ValueError;

/// Result type for Bee protocol operations.
pub type BeeResult<T> = Result<T, BeeError>;

/// Bee protocol errors.
#[derive(Debug)]
pub enum BeeError {
    /// I/O error
    Io(io::Error),

    /// Value encoding or decoding error
    Value(ValueError),

    /// Protocol error (invalid message format, unknown state, etc.)
    Protocol(String),

    /// Frame payload larger than the wire length field or the configured maximum
    FrameTooLarge { size: usize, max: usize },
}

impl fmt::Display for BeeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BeeError::Io(e) => write!(f, "I/O error: {}", e),
            BeeError::Value(e) => write!(f, "Value error: {}", e),
            BeeError::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            BeeError::FrameTooLarge { size, max } => {
                write!(f, "Frame too large: {} bytes (max: {})", size, max)
            }
        }
    }
}

impl std::error::Error for BeeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BeeError::Io(e) => Some(e),
            BeeError::Value(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for BeeError {
    fn from(err: io::Error) -> Self {
        BeeError::Io(err)
    }
}

impl From<ValueError> for BeeError {
    fn from(err: ValueError) -> Self {
        BeeError::Value(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bee_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionReset, "reset");
        let err: BeeError = io_err.into();
        assert!(matches!(err, BeeError::Io(_)));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_bee_error_from_value() {
        let err: BeeError = ValueError::UnexpectedEof.into();
        assert!(matches!(err, BeeError::Value(ValueError::UnexpectedEof)));
        assert!(err.to_string().starts_with("Value error"));
    }

    #[test]
    fn test_frame_too_large_display() {
        let err = BeeError::FrameTooLarge { size: 200, max: 100 };
        assert_eq!(err.to_string(), "Frame too large: 200 bytes (max: 100)");
    }
}
