//! Bee value types.

use std::fmt;
use std::io::Cursor;

use bytes::Bytes;

use super::ValueError;

/// Wire type tag of a value or a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// No value (0x00)
    Nil,
    /// UTF-8 string (0x01)
    String,
    /// 64-bit signed integer (0x02)
    Integer,
    /// 64-bit IEEE-754 float (0x03)
    Number,
    /// Boolean (0x04)
    Boolean,
    /// Raw bytes (0x05)
    Bytes,
}

impl DataType {
    /// Wire tag of this type.
    pub fn tag(self) -> u8 {
        match self {
            DataType::Nil => 0x00,
            DataType::String => 0x01,
            DataType::Integer => 0x02,
            DataType::Number => 0x03,
            DataType::Boolean => 0x04,
            DataType::Bytes => 0x05,
        }
    }

    /// Parse a wire tag.
    pub fn from_tag(tag: u8) -> Result<Self, ValueError> {
        match tag {
            0x00 => Ok(DataType::Nil),
            0x01 => Ok(DataType::String),
            0x02 => Ok(DataType::Integer),
            0x03 => Ok(DataType::Number),
            0x04 => Ok(DataType::Boolean),
            0x05 => Ok(DataType::Bytes),
            other => Err(ValueError::UnknownType(other)),
        }
    }

    /// Human readable type name.
    pub fn name(self) -> &'static str {
        match self {
            DataType::Nil => "Null",
            DataType::String => "String",
            DataType::Integer => "Integer",
            DataType::Number => "Number",
            DataType::Boolean => "Boolean",
            DataType::Bytes => "Bytes",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Binary large object carried by a [`Value::Bytes`].
///
/// A blob shares the receive buffer of the frame it arrived in, so decoding a
/// row never copies its byte columns. Use [`Blob::reader`] to stream or seek
/// through the content.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Blob {
    data: Bytes,
}

impl Blob {
    /// Wrap existing bytes.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the blob holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// A seekable reader positioned at the first byte.
    pub fn reader(&self) -> Cursor<Bytes> {
        Cursor::new(self.data.clone())
    }

    /// Borrow the content.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// The underlying shared buffer.
    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    /// Copy the content out.
    pub fn to_vec(&self) -> Vec<u8> {
        self.data.to_vec()
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blob({} bytes)", self.data.len())
    }
}

/// A single value as carried in statement rows and requests.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null value
    Nil,
    /// UTF-8 string
    String(String),
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit floating point
    Number(f64),
    /// Boolean value
    Boolean(bool),
    /// Byte blob
    Bytes(Blob),
}

impl Value {
    /// Wire type of this value.
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Nil => DataType::Nil,
            Value::String(_) => DataType::String,
            Value::Integer(_) => DataType::Integer,
            Value::Number(_) => DataType::Number,
            Value::Boolean(_) => DataType::Boolean,
            Value::Bytes(_) => DataType::Bytes,
        }
    }

    /// Check if this value is nil.
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Try to get as string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as float. Integers widen.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get as boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as blob reference.
    pub fn as_blob(&self) -> Option<&Blob> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "null"),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Number(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(Blob::new(v))
    }
}

impl From<Blob> for Value {
    fn from(v: Blob) -> Self {
        Value::Bytes(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Nil)
    }
}
