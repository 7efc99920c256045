//! Wire protocol layer for mixed reality capture sessions.
//!
//! A headset streams two kinds of TCP traffic to a phone:
//!
//! - **Calibration channel**: head and controller poses as text, button
//!   presses and calibration XML ([`CalibrationCodec`], 12-byte headers)
//! - **Capture channel**: H.264 video and float PCM audio
//!   ([`CaptureCodec`], 16-byte headers)
//!
//! Bytes flow through three layers:
//!
//! 1. [`FrameAccumulator`] reassembles length-delimited frames from arbitrary chunks
//! 2. [`Message::decode`] turns each frame into a typed message
//! 3. [`NalDemuxer`] splits video payloads into NAL units for a [`VideoDecoder`]
//!
//! [`SessionDispatcher`] ties 1 and 2 together synchronously; the
//! [`connection`] module drives it from a tokio task.
//!
//! # Example
//!
//! ```rust
//! use mrc_wire::{CalibrationCodec, Frame, Message, SessionDispatcher, WireConfig};
//!
//! let mut session = SessionDispatcher::<CalibrationCodec, _>::new(Vec::new(), &WireConfig::default());
//! let bytes = Frame::new(34, 2i32.to_le_bytes().to_vec()).encode::<CalibrationCodec>();
//!
//! // Chunks can split frames anywhere.
//! session.ingest(&bytes[..7])?;
//! session.ingest(&bytes[7..])?;
//! assert_eq!(session.sink(), &vec![Message::PrimaryButtonPressed(2)]);
//! # Ok::<(), mrc_wire::WireError>(())
//! ```

// Core types and error handling
pub mod config;
mod error;
pub mod logging;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;

// Protocol layers
pub mod framing;
pub mod pose;
pub mod protocol;
pub mod session;
pub mod video;

// Async transport
pub mod connection;
pub mod stream;

pub use config::{OverflowPolicy, ResyncPolicy, WireConfig};
pub use connection::{CalibrationConnection, CaptureConnection, Connection};
pub use error::*;
pub use framing::{CalibrationCodec, CaptureCodec, Frame, FrameAccumulator, FrameCodec};
pub use pose::{Pose, PoseUpdate, Quaternion, Vector3};
pub use protocol::{AudioPacket, CameraUpdate, Message, Outbound, PayloadError, PayloadKind};
pub use session::{DispatchStats, MessageSink, SessionDispatcher};
pub use stream::UpdateRate;
pub use video::{ChannelDecoder, DecodeRequest, NalDemuxer, VideoDecoder};
