//! Length-prefixed framing.
//!
//! Bytes arriving from a socket are split into [`Frame`]s by a
//! [`FrameAccumulator`]. The accumulator is generic over a [`FrameCodec`],
//! which describes one on-wire header layout. Two layouts exist:
//!
//! ```text
//! CalibrationCodec (12 bytes, little-endian)
//! ┌────────────┬──────────────┬────────────────┐
//! │ identifier │ payload type │ payload length │ payload ...
//! │    u32     │     i32      │      i32       │
//! └────────────┴──────────────┴────────────────┘
//!
//! CaptureCodec (16 bytes, little-endian)
//! ┌────────────┬───────────────────────┬──────────────┬────────────────┐
//! │ identifier │ length excl. identif. │ payload type │ payload length │ payload ...
//! │    u32     │          u32          │     u32      │      u32       │
//! └────────────┴───────────────────────┴──────────────┴────────────────┘
//! ```
//!
//! The redundant length of the capture layout must equal the frame size minus
//! the 4 identifier bytes.

mod accumulator;
mod codec;

pub use accumulator::{AccumulatorStats, FrameAccumulator};
pub use codec::{CalibrationCodec, CaptureCodec};

use thiserror::Error;

/// One transport-level unit: a payload tag plus its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Tag selecting the message schema.
    pub payload_type: u32,
    /// Exactly `payload_length` bytes of body.
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(payload_type: u32, data: Vec<u8>) -> Self {
        Self { payload_type, data }
    }

    /// Serialize this frame with the header layout of `C`.
    pub fn encode<C: FrameCodec>(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(C::HEADER_SIZE + self.data.len());
        C::encode_header(self.payload_type, self.data.len() as u32, &mut out);
        out.extend_from_slice(&self.data);
        out
    }

    /// Total size of this frame on the wire for codec `C`.
    pub fn wire_len<C: FrameCodec>(&self) -> usize {
        C::HEADER_SIZE + self.data.len()
    }
}

/// Header fields common to both layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub identifier: u32,
    /// Redundant frame length excluding the identifier (capture layout only).
    pub declared_length: Option<u32>,
    pub payload_type: u32,
    pub payload_length: u32,
}

/// Why the bytes at the head of the buffer cannot start a frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderFault {
    #[error("protocol identifier mismatch: expected {expected:#010x}, found {found:#010x}")]
    IdentifierMismatch { expected: u32, found: u32 },

    #[error("inconsistent frame length: declared {declared} bytes, payload {payload_length} bytes")]
    LengthMismatch { declared: u32, payload_length: u32 },

    #[error("negative payload length {0}")]
    NegativeLength(i32),
}

/// One on-wire header layout.
///
/// Implementations only describe the header; extraction, validation order and
/// buffering live in [`FrameAccumulator`].
pub trait FrameCodec: Send + Sync + 'static {
    /// Human readable layout name for diagnostics.
    const NAME: &'static str;
    /// Magic value opening every frame.
    const PROTOCOL_IDENTIFIER: u32;
    /// Header size in bytes.
    const HEADER_SIZE: usize;

    /// Decode a header from the first [`Self::HEADER_SIZE`] bytes of `bytes`.
    ///
    /// Returns `None` when fewer than [`Self::HEADER_SIZE`] bytes are given.
    fn decode_header(bytes: &[u8]) -> Option<FrameHeader>;

    /// Verify internal length consistency. Identifier checks happen elsewhere.
    fn check_consistency(header: &FrameHeader) -> Result<(), HeaderFault>;

    /// Append a header for a payload of `payload_length` bytes.
    fn encode_header(payload_type: u32, payload_length: u32, out: &mut Vec<u8>);
}

pub(crate) fn read_u32_le(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]])
}
