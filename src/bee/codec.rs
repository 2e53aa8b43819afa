//! Bee frame codec for tokio_util.
//!
//! Every Bee message travels in a fixed envelope:
//!
//! ```text
//! magic (0xFF 0xFF) | type: u8 | length: u64 | payload | checksum: u64 | trailer (0x0D 0x0A)
//! ```
//!
//! The checksum is always `length + 21`. The decoder is self-resynchronizing:
//! noise before a frame, a corrupted length, a bad checksum or a bad trailer
//! never produce an error. The decoder drops bytes that cannot start a valid
//! frame and keeps scanning until a complete, validated envelope is buffered.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use super::BeeError;

/// Frame start marker.
pub const MAGIC: [u8; 2] = [0xFF, 0xFF];

/// Frame end marker.
pub const TRAILER: [u8; 2] = [0x0D, 0x0A];

/// Bytes before the payload (magic + type + length).
pub const HEADER_LEN: usize = 11;

/// Envelope size around the payload.
pub const FRAME_OVERHEAD: usize = 21;

/// Default maximum payload size (64MB).
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Upper bound for a configured maximum payload size (4GB).
pub const MAX_FRAME_SIZE_LIMIT: usize = u32::MAX as usize;

/// One decoded frame: a type tag and its opaque payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame type tag
    pub frame_type: u8,
    /// Payload bytes
    pub payload: Bytes,
}

impl Frame {
    /// Create a frame.
    pub fn new(frame_type: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            frame_type,
            payload: payload.into(),
        }
    }

    /// Size of this frame on the wire.
    pub fn wire_len(&self) -> usize {
        self.payload.len() + FRAME_OVERHEAD
    }
}

/// Frame codec with resync on corrupt input.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    /// Maximum accepted payload size
    max_frame_size: usize,
}

impl FrameCodec {
    /// Create a new codec with default settings.
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Create a codec with custom max frame size, capped at
    /// [`MAX_FRAME_SIZE_LIMIT`].
    pub fn with_max_size(max_frame_size: usize) -> Self {
        Self {
            max_frame_size: max_frame_size.min(MAX_FRAME_SIZE_LIMIT),
        }
    }

    /// Maximum accepted payload size.
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Drop leading bytes that cannot start a frame.
    ///
    /// A lone `0xFF` at the end of the buffer is kept, since the next read may
    /// complete the magic.
    fn skip_noise(src: &mut BytesMut) {
        if src.len() < MAGIC.len() || src[..2] == MAGIC {
            return;
        }
        let skip = (1..src.len())
            .find(|&i| src[i] == MAGIC[0] && (i + 1 == src.len() || src[i + 1] == MAGIC[1]))
            .unwrap_or(src.len());
        trace!(skipped = skip, "discarding bytes before frame magic");
        src.advance(skip);
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = BeeError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            Self::skip_noise(src);

            if src.len() < FRAME_OVERHEAD {
                return Ok(None);
            }

            let frame_type = src[2];
            let length = (&src[3..HEADER_LEN]).get_u64();

            // A length no valid frame can have means this magic was noise.
            let length = match usize::try_from(length) {
                Ok(len) if len <= self.max_frame_size => len,
                _ => {
                    src.advance(1);
                    continue;
                }
            };

            let total = match length.checked_add(FRAME_OVERHEAD) {
                Some(total) => total,
                None => {
                    src.advance(1);
                    continue;
                }
            };
            if src.len() < total {
                src.reserve(total - src.len());
                return Ok(None);
            }

            let checksum_at = HEADER_LEN + length;
            let checksum = (&src[checksum_at..checksum_at + 8]).get_u64();
            let trailer_ok = src[checksum_at + 8..total] == TRAILER;
            if checksum != total as u64 || !trailer_ok {
                trace!(frame_type, length, "frame envelope mismatch, resyncing");
                src.advance(1);
                continue;
            }

            src.advance(HEADER_LEN);
            let payload = src.split_to(length).freeze();
            src.advance(FRAME_OVERHEAD - HEADER_LEN);

            return Ok(Some(Frame { frame_type, payload }));
        }
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = BeeError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.payload.len() > self.max_frame_size {
            return Err(BeeError::FrameTooLarge {
                size: item.payload.len(),
                max: self.max_frame_size,
            });
        }

        let length = item.payload.len() as u64;
        dst.reserve(item.wire_len());
        dst.put_slice(&MAGIC);
        dst.put_u8(item.frame_type);
        dst.put_u64(length);
        dst.put_slice(&item.payload);
        dst.put_u64(length + FRAME_OVERHEAD as u64);
        dst.put_slice(&TRAILER);
        Ok(())
    }
}
