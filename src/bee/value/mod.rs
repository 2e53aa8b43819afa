//! Bee value format.
//!
//! Every value inside a Bee payload is written as a one-byte type tag followed
//! by a type-specific body. All multi-byte fields are big-endian.
//!
//! # Supported Types
//!
//! - **Nil** (`0x00`): tag only
//! - **String** (`0x01`): `u32` length + UTF-8 bytes
//! - **Integer** (`0x02`): `i64`
//! - **Number** (`0x03`): IEEE-754 `f64`
//! - **Boolean** (`0x04`): one byte, `0x01` is true
//! - **Bytes** (`0x05`): `u32` length + raw bytes, exposed as a [`Blob`]

pub mod decoder;
pub mod encoder;
pub mod types;

pub use decoder::{decode, ValueDecoder};
pub use encoder::{encode, ValueEncoder};
pub use types::{Blob, DataType, Value};

use std::fmt;

/// Value codec errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// Unexpected end of input
    UnexpectedEof,
    /// Unknown type tag
    UnknownType(u8),
    /// Invalid UTF-8 in string
    InvalidUtf8(String),
    /// Value too large to encode
    ValueTooLarge(&'static str, usize),
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueError::UnexpectedEof => write!(f, "Unexpected end of value data"),
            ValueError::UnknownType(t) => write!(f, "Unknown value type tag: 0x{:02X}", t),
            ValueError::InvalidUtf8(e) => write!(f, "Invalid UTF-8 in string: {}", e),
            ValueError::ValueTooLarge(t, s) => write!(f, "{} too large: {} bytes", t, s),
        }
    }
}

impl std::error::Error for ValueError {}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn test_error_display() {
        assert!(ValueError::UnknownType(0x1F).to_string().contains("0x1F"));
        assert!(ValueError::ValueTooLarge("Bytes", 10).to_string().contains("Bytes"));
    }

    #[test]
    fn test_mixed_row_roundtrip() {
        let row = vec![
            Value::Integer(1),
            Value::from("x"),
            Value::Nil,
            Value::Number(0.25),
            Value::Boolean(true),
            Value::from(vec![9u8; 300]),
        ];

        let mut buffer = BytesMut::new();
        let mut encoder = ValueEncoder::new(&mut buffer);
        for value in &row {
            encoder.encode(value).unwrap();
        }

        let mut decoder = ValueDecoder::new(buffer.freeze());
        let decoded: Vec<Value> = (0..row.len()).map(|_| decoder.decode().unwrap()).collect();
        assert_eq!(decoded, row);
        assert!(decoder.is_empty());
    }
}
