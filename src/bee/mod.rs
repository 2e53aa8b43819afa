//! Bee protocol implementation.
//!
//! The socket-free half of the client: frame envelope, value format and
//! message payloads.
//!
//! # Frame Types
//!
//! | Tag | Message |
//! |-----|---------|
//! | 0x00 | connect request |
//! | 0x01 | connect response |
//! | 0x02 | statement request |
//! | 0x03 | statement response (columns, row, abort, error) |
//! | 0x06 | keepalive ping |

pub mod codec;
pub mod error;
pub mod message;
pub mod value;

pub use codec::{Frame, FrameCodec};
pub use error::{BeeError, BeeResult};
pub use message::{
    ColumnInfo, ConnectRequest, ConnectResponse, Message, PingRequest, ServerError,
    StatementEvent, StatementRequest, StatementResponse,
};
pub use value::{Blob, DataType, Value, ValueError};
