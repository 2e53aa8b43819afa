//! Bee response messages.
//!
//! Response messages are sent from the server to the client. A statement
//! produces a stream of [`StatementResponse`] frames that share one frame
//! type and are told apart by the correlation id leading each payload.

use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::{frame_type, Message};
use crate::bee::value::{DataType, Value, ValueDecoder, ValueEncoder};
use crate::bee::{BeeError, BeeResult};

/// Statement response sub-state tags.
pub mod state {
    /// Column header (0x00)
    pub const COLUMNS: u8 = 0x00;
    /// One result row (0x01)
    pub const ROW: u8 = 0x01;
    /// End of results (0x02)
    pub const ABORT: u8 = 0x02;
    /// Server-reported failure (0x03)
    pub const ERROR: u8 = 0x03;
}

/// Error reported by the server: a numeric code and a short message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerError {
    /// Error code, passed through verbatim
    pub code: i32,
    /// Error message (at most 255 bytes on the wire)
    pub message: String,
}

impl ServerError {
    /// Create a server error.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    fn encode(&self, dst: &mut BytesMut) -> BeeResult<()> {
        dst.put_i32(self.code);
        put_short_string(dst, "error message", &self.message)
    }

    fn decode(decoder: &mut ValueDecoder) -> BeeResult<Self> {
        let code = decoder.read_i32()?;
        let message = decoder.read_short_string()?;
        Ok(Self { code, message })
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// Connect handshake response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectResponse {
    /// Handshake accepted
    Ok,
    /// Handshake rejected
    Error(ServerError),
}

impl ConnectResponse {
    /// Check whether the server accepted the handshake.
    ///
    /// An error status carrying code 0 counts as accepted.
    pub fn is_ok(&self) -> bool {
        match self {
            ConnectResponse::Ok => true,
            ConnectResponse::Error(err) => err.code == 0,
        }
    }
}

impl Message for ConnectResponse {
    const FRAME_TYPE: u8 = frame_type::CONNECT_RESPONSE;

    fn encode(&self, dst: &mut BytesMut) -> BeeResult<()> {
        match self {
            ConnectResponse::Ok => dst.put_u8(0x00),
            ConnectResponse::Error(err) => {
                dst.put_u8(0x01);
                err.encode(dst)?;
            }
        }
        Ok(())
    }

    fn decode(payload: Bytes) -> BeeResult<Self> {
        let mut decoder = ValueDecoder::new(payload);
        match decoder.read_u8()? {
            0x00 => Ok(ConnectResponse::Ok),
            0x01 => Ok(ConnectResponse::Error(ServerError::decode(&mut decoder)?)),
            other => Err(BeeError::Protocol(format!(
                "Invalid connect response status: 0x{:02X}",
                other
            ))),
        }
    }
}

/// Column metadata from a statement header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// Column name
    pub name: String,
    /// Declared value type
    pub data_type: DataType,
}

impl ColumnInfo {
    /// Create column metadata.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// One event in a statement's response stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementEvent {
    /// Column header, sent once before any row
    Columns(Vec<ColumnInfo>),
    /// One row aligned with the header
    Row(Vec<Value>),
    /// End of results
    Abort,
    /// Server failure, terminal
    Error(ServerError),
}

impl StatementEvent {
    /// Sub-state tag of this event.
    pub fn state(&self) -> u8 {
        match self {
            StatementEvent::Columns(_) => state::COLUMNS,
            StatementEvent::Row(_) => state::ROW,
            StatementEvent::Abort => state::ABORT,
            StatementEvent::Error(_) => state::ERROR,
        }
    }

    /// Get event name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            StatementEvent::Columns(_) => "COLUMNS",
            StatementEvent::Row(_) => "ROW",
            StatementEvent::Abort => "ABORT",
            StatementEvent::Error(_) => "ERROR",
        }
    }

    /// Check if this event ends the statement.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StatementEvent::Abort | StatementEvent::Error(_))
    }
}

/// One statement response frame.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementResponse {
    /// Correlation id of the originating request
    pub id: u32,
    /// Response content
    pub event: StatementEvent,
}

impl StatementResponse {
    /// Create a statement response.
    pub fn new(id: u32, event: StatementEvent) -> Self {
        Self { id, event }
    }

    /// Read the correlation id without decoding the rest of the payload.
    pub fn peek_id(payload: &[u8]) -> Option<u32> {
        if payload.len() < 4 {
            return None;
        }
        Some((&payload[..4]).get_u32())
    }
}

impl Message for StatementResponse {
    const FRAME_TYPE: u8 = frame_type::STATEMENT_RESPONSE;

    fn encode(&self, dst: &mut BytesMut) -> BeeResult<()> {
        dst.put_u32(self.id);
        dst.put_u8(self.event.state());
        match &self.event {
            StatementEvent::Columns(columns) => {
                dst.put_u8(checked_count("columns", columns.len())?);
                for column in columns {
                    put_short_string(dst, "column name", &column.name)?;
                    dst.put_u8(column.data_type.tag());
                }
            }
            StatementEvent::Row(values) => {
                dst.put_u8(checked_count("row values", values.len())?);
                let mut encoder = ValueEncoder::new(dst);
                for value in values {
                    encoder.encode(value)?;
                }
            }
            StatementEvent::Abort => {}
            StatementEvent::Error(err) => err.encode(dst)?,
        }
        Ok(())
    }

    fn decode(payload: Bytes) -> BeeResult<Self> {
        let mut decoder = ValueDecoder::new(payload);
        let id = decoder.read_u32()?;
        let event = match decoder.read_u8()? {
            state::COLUMNS => {
                let count = decoder.read_u8()?;
                let mut columns = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    let name = decoder.read_short_string()?;
                    let data_type = DataType::from_tag(decoder.read_u8()?)?;
                    columns.push(ColumnInfo { name, data_type });
                }
                StatementEvent::Columns(columns)
            }
            state::ROW => {
                let count = decoder.read_u8()?;
                let mut values = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    values.push(decoder.decode()?);
                }
                StatementEvent::Row(values)
            }
            state::ABORT => StatementEvent::Abort,
            state::ERROR => StatementEvent::Error(ServerError::decode(&mut decoder)?),
            other => {
                return Err(BeeError::Protocol(format!(
                    "Invalid statement state: 0x{:02X}",
                    other
                )))
            }
        };
        Ok(Self { id, event })
    }
}

fn checked_count(kind: &str, len: usize) -> BeeResult<u8> {
    u8::try_from(len).map_err(|_| BeeError::Protocol(format!("Too many {}: {}", kind, len)))
}

fn put_short_string(dst: &mut BytesMut, kind: &str, value: &str) -> BeeResult<()> {
    let len = u8::try_from(value.len())
        .map_err(|_| BeeError::Protocol(format!("{} longer than 255 bytes", kind)))?;
    dst.put_u8(len);
    dst.put_slice(value.as_bytes());
    Ok(())
}
