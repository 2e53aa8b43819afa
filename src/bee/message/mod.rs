//! Bee protocol message types.
//!
//! Each message is the payload of one frame. Requests travel client to
//! server, responses the other way. Every message can be both encoded and
//! decoded so the same types serve a client and a test server.

pub mod request;
pub mod response;

pub use request::*;
pub use response::*;

use bytes::{Bytes, BytesMut};

use super::codec::Frame;
use super::BeeResult;

/// Bee frame type tags.
pub mod frame_type {
    /// Connect request (0x00)
    pub const CONNECT_REQUEST: u8 = 0x00;
    /// Connect response (0x01)
    pub const CONNECT_RESPONSE: u8 = 0x01;
    /// Statement request (0x02)
    pub const STATEMENT_REQUEST: u8 = 0x02;
    /// Statement response (0x03), shared by columns, rows, abort and error
    pub const STATEMENT_RESPONSE: u8 = 0x03;
    /// Keepalive ping (0x06)
    pub const PING: u8 = 0x06;
}

/// A message that is carried as the payload of one frame type.
pub trait Message: Sized {
    /// Frame type tag this message travels under.
    const FRAME_TYPE: u8;

    /// Append the payload encoding of this message to `dst`.
    fn encode(&self, dst: &mut BytesMut) -> BeeResult<()>;

    /// Decode a message from a complete frame payload.
    fn decode(payload: Bytes) -> BeeResult<Self>;

    /// Encode this message into a frame.
    fn to_frame(&self) -> BeeResult<Frame> {
        let mut payload = BytesMut::new();
        self.encode(&mut payload)?;
        Ok(Frame::new(Self::FRAME_TYPE, payload.freeze()))
    }
}
