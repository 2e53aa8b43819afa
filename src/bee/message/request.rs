//! Bee request messages.
//!
//! Request messages are sent from the client to the server.

use bytes::{BufMut, Bytes, BytesMut};

use super::{frame_type, Message};
use crate::bee::value::{Value, ValueDecoder, ValueEncoder};
use crate::bee::{BeeError, BeeResult};

/// Connect handshake request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    /// Connection URL the client was configured with
    pub url: String,
    /// Application name
    pub application: String,
}

impl ConnectRequest {
    /// Create a connect request.
    pub fn new(url: impl Into<String>, application: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            application: application.into(),
        }
    }
}

impl Message for ConnectRequest {
    const FRAME_TYPE: u8 = frame_type::CONNECT_REQUEST;

    fn encode(&self, dst: &mut BytesMut) -> BeeResult<()> {
        let mut encoder = ValueEncoder::new(dst);
        encoder.encode_string(&self.url)?;
        encoder.encode_string(&self.application)?;
        Ok(())
    }

    fn decode(payload: Bytes) -> BeeResult<Self> {
        let mut decoder = ValueDecoder::new(payload);
        let url = read_string(&mut decoder, "url")?;
        let application = read_string(&mut decoder, "application")?;
        Ok(Self { url, application })
    }
}

/// Statement submit request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementRequest {
    /// Correlation id echoed in every response frame
    pub id: u32,
    /// Script to execute
    pub script: String,
    /// Server-side timeout in seconds
    pub timeout: u32,
}

impl StatementRequest {
    /// Create a statement request.
    pub fn new(id: u32, script: impl Into<String>, timeout: u32) -> Self {
        Self {
            id,
            script: script.into(),
            timeout,
        }
    }
}

impl Message for StatementRequest {
    const FRAME_TYPE: u8 = frame_type::STATEMENT_REQUEST;

    fn encode(&self, dst: &mut BytesMut) -> BeeResult<()> {
        let mut encoder = ValueEncoder::new(dst);
        encoder.encode_int(self.id as i64);
        encoder.encode_string(&self.script)?;
        encoder.encode_int(self.timeout as i64);
        Ok(())
    }

    fn decode(payload: Bytes) -> BeeResult<Self> {
        let mut decoder = ValueDecoder::new(payload);
        let id = read_u32(&mut decoder, "id")?;
        let script = read_string(&mut decoder, "script")?;
        let timeout = read_u32(&mut decoder, "timeout")?;
        Ok(Self { id, script, timeout })
    }
}

/// Keepalive ping. The server sends no reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PingRequest;

impl Message for PingRequest {
    const FRAME_TYPE: u8 = frame_type::PING;

    fn encode(&self, dst: &mut BytesMut) -> BeeResult<()> {
        dst.put_u8(0x00);
        Ok(())
    }

    fn decode(_payload: Bytes) -> BeeResult<Self> {
        Ok(PingRequest)
    }
}

fn read_string(decoder: &mut ValueDecoder, field: &str) -> BeeResult<String> {
    match decoder.decode()? {
        Value::String(s) => Ok(s),
        other => Err(BeeError::Protocol(format!(
            "Expected string for {}, got {}",
            field,
            other.data_type()
        ))),
    }
}

fn read_u32(decoder: &mut ValueDecoder, field: &str) -> BeeResult<u32> {
    match decoder.decode()? {
        Value::Integer(i) => u32::try_from(i)
            .map_err(|_| BeeError::Protocol(format!("{} out of range: {}", field, i))),
        other => Err(BeeError::Protocol(format!(
            "Expected integer for {}, got {}",
            field,
            other.data_type()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_request_bytes() {
        let request = ConnectRequest::new("agent://127.0.0.1:6142", "app1");
        let mut buf = BytesMut::new();
        request.encode(&mut buf).unwrap();
        assert_eq!(
            &buf[..],
            b"\x01\0\0\0\x16agent://127.0.0.1:6142\x01\0\0\0\x04app1"
        );

        let decoded = ConnectRequest::decode(buf.freeze()).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_statement_request_bytes() {
        let request = StatementRequest::new(1, "SELECT *FROM m_test()", 10);
        let mut buf = BytesMut::new();
        request.encode(&mut buf).unwrap();
        assert_eq!(
            &buf[..],
            b"\x02\0\0\0\0\0\0\0\x01\x01\0\0\0\x15SELECT *FROM m_test()\x02\0\0\0\0\0\0\0\x0A"
        );

        let decoded = StatementRequest::decode(buf.freeze()).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_statement_request_wrong_type() {
        let payload = Bytes::from_static(b"\x01\0\0\0\x01x");
        let result = StatementRequest::decode(payload);
        assert!(matches!(result, Err(BeeError::Protocol(_))));
    }

    #[test]
    fn test_truncated_connect_request() {
        let payload = Bytes::from_static(b"\x01\0\0\0\x16agent");
        assert!(matches!(ConnectRequest::decode(payload), Err(BeeError::Value(_))));
    }

    #[test]
    fn test_ping_payload() {
        let mut buf = BytesMut::new();
        PingRequest.encode(&mut buf).unwrap();
        assert_eq!(&buf[..], &[0x00]);
    }
}
