//! Bee value encoder.

use bytes::{BufMut, BytesMut};

use super::types::{DataType, Value};
use super::ValueError;

/// Value encoder that writes tagged values to a byte buffer.
pub struct ValueEncoder<'a> {
    buffer: &'a mut BytesMut,
}

impl<'a> ValueEncoder<'a> {
    /// Create an encoder appending to `buffer`.
    pub fn new(buffer: &'a mut BytesMut) -> Self {
        Self { buffer }
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Encode a value.
    pub fn encode(&mut self, value: &Value) -> Result<(), ValueError> {
        match value {
            Value::Nil => {
                self.encode_nil();
                Ok(())
            }
            Value::String(s) => self.encode_string(s),
            Value::Integer(i) => {
                self.encode_int(*i);
                Ok(())
            }
            Value::Number(n) => {
                self.encode_number(*n);
                Ok(())
            }
            Value::Boolean(b) => {
                self.encode_bool(*b);
                Ok(())
            }
            Value::Bytes(b) => self.encode_bytes(b.as_slice()),
        }
    }

    /// Encode nil.
    pub fn encode_nil(&mut self) {
        self.buffer.put_u8(DataType::Nil.tag());
    }

    /// Encode a string with a 4-byte length prefix.
    pub fn encode_string(&mut self, value: &str) -> Result<(), ValueError> {
        let len = checked_len("String", value.len())?;
        self.buffer.put_u8(DataType::String.tag());
        self.buffer.put_u32(len);
        self.buffer.put_slice(value.as_bytes());
        Ok(())
    }

    /// Encode an integer (always 8 bytes).
    pub fn encode_int(&mut self, value: i64) {
        self.buffer.put_u8(DataType::Integer.tag());
        self.buffer.put_i64(value);
    }

    /// Encode a float (always 64-bit).
    pub fn encode_number(&mut self, value: f64) {
        self.buffer.put_u8(DataType::Number.tag());
        self.buffer.put_f64(value);
    }

    /// Encode a boolean.
    pub fn encode_bool(&mut self, value: bool) {
        self.buffer.put_u8(DataType::Boolean.tag());
        self.buffer.put_u8(if value { 0x01 } else { 0x00 });
    }

    /// Encode raw bytes with a 4-byte length prefix.
    pub fn encode_bytes(&mut self, value: &[u8]) -> Result<(), ValueError> {
        let len = checked_len("Bytes", value.len())?;
        self.buffer.put_u8(DataType::Bytes.tag());
        self.buffer.put_u32(len);
        self.buffer.put_slice(value);
        Ok(())
    }
}

fn checked_len(kind: &'static str, len: usize) -> Result<u32, ValueError> {
    u32::try_from(len).map_err(|_| ValueError::ValueTooLarge(kind, len))
}

/// Convenience function to encode a single value.
pub fn encode(value: &Value) -> Result<BytesMut, ValueError> {
    let mut buffer = BytesMut::with_capacity(16);
    ValueEncoder::new(&mut buffer).encode(value)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_nil() {
        assert_eq!(&encode(&Value::Nil).unwrap()[..], &[0x00]);
    }

    #[test]
    fn test_encode_string() {
        let bytes = encode(&Value::from("app1")).unwrap();
        assert_eq!(&bytes[..], b"\x01\0\0\0\x04app1");
    }

    #[test]
    fn test_encode_int() {
        let bytes = encode(&Value::Integer(10)).unwrap();
        assert_eq!(&bytes[..], b"\x02\0\0\0\0\0\0\0\x0A");
    }

    #[test]
    fn test_encode_number() {
        let bytes = encode(&Value::Number(20.0)).unwrap();
        assert_eq!(&bytes[..], b"\x03@4\0\0\0\0\0\0");
    }

    #[test]
    fn test_encode_bool_and_bytes() {
        assert_eq!(&encode(&Value::Boolean(false)).unwrap()[..], b"\x04\0");
        assert_eq!(&encode(&Value::Boolean(true)).unwrap()[..], b"\x04\x01");
        let bytes = encode(&Value::from(vec![0x01u8, 0x02])).unwrap();
        assert_eq!(&bytes[..], b"\x05\0\0\0\x02\x01\x02");
    }

    #[test]
    fn test_encoder_appends() {
        let mut buffer = BytesMut::new();
        let mut encoder = ValueEncoder::new(&mut buffer);
        encoder.encode_int(1);
        encoder.encode_nil();
        assert_eq!(encoder.len(), 10);
    }
}
