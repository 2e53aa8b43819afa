//! Bee value decoder.

use bytes::{Buf, Bytes};

use super::types::{Blob, DataType, Value};
use super::ValueError;

/// Decoder that reads tagged values and raw fields from a payload.
///
/// The decoder owns a cheap clone of the payload, so byte values are handed
/// out as slices of the same buffer instead of copies. A failed read leaves
/// the position where it was.
#[derive(Debug, Clone)]
pub struct ValueDecoder {
    data: Bytes,
    pos: usize,
}

impl ValueDecoder {
    /// Create a new decoder for the given payload.
    pub fn new(data: Bytes) -> Self {
        Self { data, pos: 0 }
    }

    /// Get the current position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Get remaining bytes count.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Check if all data has been consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Decode the next tagged value.
    pub fn decode(&mut self) -> Result<Value, ValueError> {
        let start = self.pos;
        let result = self.decode_inner();
        if result.is_err() {
            self.pos = start;
        }
        result
    }

    fn decode_inner(&mut self) -> Result<Value, ValueError> {
        match DataType::from_tag(self.read_u8()?)? {
            DataType::Nil => Ok(Value::Nil),
            DataType::String => {
                let len = self.read_u32()? as usize;
                let bytes = self.read_bytes(len)?;
                let s = std::str::from_utf8(&bytes)
                    .map_err(|e| ValueError::InvalidUtf8(e.to_string()))?;
                Ok(Value::String(s.to_string()))
            }
            DataType::Integer => Ok(Value::Integer(self.read_i64()?)),
            DataType::Number => Ok(Value::Number(self.read_f64()?)),
            DataType::Boolean => Ok(Value::Boolean(self.read_u8()? == 0x01)),
            DataType::Bytes => {
                let len = self.read_u32()? as usize;
                Ok(Value::Bytes(Blob::new(self.read_bytes(len)?)))
            }
        }
    }

    /// Read a string prefixed by a single length byte.
    pub fn read_short_string(&mut self) -> Result<String, ValueError> {
        let start = self.pos;
        let result = self.read_u8().and_then(|len| {
            let bytes = self.read_bytes(len as usize)?;
            String::from_utf8(bytes.to_vec()).map_err(|e| ValueError::InvalidUtf8(e.to_string()))
        });
        if result.is_err() {
            self.pos = start;
        }
        result
    }

    // Low-level read methods

    /// Read one byte.
    pub fn read_u8(&mut self) -> Result<u8, ValueError> {
        if self.remaining() < 1 {
            return Err(ValueError::UnexpectedEof);
        }
        let value = self.data[self.pos];
        self.pos += 1;
        Ok(value)
    }

    /// Read a big-endian `u32`.
    pub fn read_u32(&mut self) -> Result<u32, ValueError> {
        if self.remaining() < 4 {
            return Err(ValueError::UnexpectedEof);
        }
        let value = (&self.data[self.pos..]).get_u32();
        self.pos += 4;
        Ok(value)
    }

    /// Read a big-endian `i32`.
    pub fn read_i32(&mut self) -> Result<i32, ValueError> {
        if self.remaining() < 4 {
            return Err(ValueError::UnexpectedEof);
        }
        let value = (&self.data[self.pos..]).get_i32();
        self.pos += 4;
        Ok(value)
    }

    fn read_i64(&mut self) -> Result<i64, ValueError> {
        if self.remaining() < 8 {
            return Err(ValueError::UnexpectedEof);
        }
        let value = (&self.data[self.pos..]).get_i64();
        self.pos += 8;
        Ok(value)
    }

    fn read_f64(&mut self) -> Result<f64, ValueError> {
        if self.remaining() < 8 {
            return Err(ValueError::UnexpectedEof);
        }
        let value = (&self.data[self.pos..]).get_f64();
        self.pos += 8;
        Ok(value)
    }

    fn read_bytes(&mut self, len: usize) -> Result<Bytes, ValueError> {
        if self.remaining() < len {
            return Err(ValueError::UnexpectedEof);
        }
        let bytes = self.data.slice(self.pos..self.pos + len);
        self.pos += len;
        Ok(bytes)
    }
}

/// Convenience function to decode a single value from bytes.
pub fn decode(data: impl Into<Bytes>) -> Result<Value, ValueError> {
    ValueDecoder::new(data.into()).decode()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bee::value::encode;

    #[test]
    fn test_roundtrip_each_variant() {
        let values = [
            Value::Nil,
            Value::String("héllo".to_string()),
            Value::String(String::new()),
            Value::Integer(i64::MIN),
            Value::Integer(-1),
            Value::Number(3.5),
            Value::Number(f64::MAX),
            Value::Boolean(true),
            Value::Boolean(false),
            Value::from(vec![0u8, 1, 2, 255]),
            Value::from(Vec::<u8>::new()),
        ];
        for value in values {
            let bytes = encode(&value).unwrap().freeze();
            assert_eq!(decode(bytes).unwrap(), value);
        }
    }

    #[test]
    fn test_decode_sequence() {
        let mut decoder = ValueDecoder::new(Bytes::from_static(
            b"\x02\0\0\0\0\0\0\0\x01\x01\0\0\0\x02ok\0",
        ));
        assert_eq!(decoder.decode().unwrap(), Value::Integer(1));
        assert_eq!(decoder.decode().unwrap(), Value::from("ok"));
        assert_eq!(decoder.decode().unwrap(), Value::Nil);
        assert!(decoder.is_empty());
    }

    #[test]
    fn test_truncated_value_leaves_position() {
        let mut decoder = ValueDecoder::new(Bytes::from_static(b"\x01\0\0\0\x05abc"));
        assert!(matches!(decoder.decode(), Err(ValueError::UnexpectedEof)));
        assert_eq!(decoder.position(), 0);
        assert_eq!(decoder.remaining(), 8);
    }

    #[test]
    fn test_unknown_tag() {
        assert!(matches!(decode(&b"\x09"[..]), Err(ValueError::UnknownType(0x09))));
    }

    #[test]
    fn test_invalid_utf8() {
        let result = decode(&b"\x01\0\0\0\x02\xC3\x28"[..]);
        assert!(matches!(result, Err(ValueError::InvalidUtf8(_))));
    }

    #[test]
    fn test_bytes_share_payload() {
        let payload = Bytes::from_static(b"\x05\0\0\0\x03abc");
        let value = decode(payload.clone()).unwrap();
        let blob = value.as_blob().unwrap();
        assert_eq!(blob.as_slice(), b"abc");
        assert_eq!(blob.as_slice().as_ptr(), payload[5..].as_ptr());
    }

    #[test]
    fn test_short_string() {
        let mut decoder = ValueDecoder::new(Bytes::from_static(b"\x04Name\x09"));
        assert_eq!(decoder.read_short_string().unwrap(), "Name");
        assert!(decoder.read_short_string().is_err());
        assert_eq!(decoder.position(), 5);
    }
}
