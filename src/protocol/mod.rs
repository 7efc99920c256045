//! Typed messages carried in frame payloads.
//!
//! Dispatch is a total switch over [`PayloadKind`]. Fixed-size bodies are
//! little-endian and must match their size exactly; anything else is a
//! [`PayloadError`] and the message is dropped by the caller.
//!
//! | tag | kind | body |
//! |-----|------|------|
//! | 10 | video dimension | `i32 width, i32 height` |
//! | 11 | video data | Annex-B elementary stream |
//! | 12 | audio sample rate | `u32` |
//! | 13 | audio data | [`AudioPacket`] |
//! | 14 | camera update | outbound only, see [`CameraUpdate`] |
//! | 31 | user id | UTF-8 |
//! | 32 | data version | `i32` |
//! | 33 | pose update | UTF-8 text, see [`PoseUpdate`] |
//! | 34 / 35 | primary / secondary button | `i32` press count |
//! | 36 | calibration data | UTF-8 XML, both directions |
//! | 37 | clear calibration | outbound only, empty |
//! | 38 / 39 / 40 | operation complete / pause / adjust key | empty |

mod audio;
mod camera;

pub use audio::{AUDIO_HEADER_SIZE, AudioPacket};
pub use camera::{CameraIntrinsics, CameraUpdate};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::framing::Frame;
use crate::pose::{ParseError, PoseUpdate};

/// Payload tags known to this implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayloadKind {
    VideoDimension,
    VideoData,
    AudioSampleRate,
    AudioData,
    CameraUpdate,
    UserId,
    DataVersion,
    PoseUpdate,
    PrimaryButtonPressed,
    SecondaryButtonPressed,
    CalibrationData,
    ClearCalibration,
    OperationComplete,
    Pause,
    AdjustKey,
}

impl PayloadKind {
    pub fn from_tag(tag: u32) -> Option<Self> {
        let kind = match tag {
            10 => Self::VideoDimension,
            11 => Self::VideoData,
            12 => Self::AudioSampleRate,
            13 => Self::AudioData,
            14 => Self::CameraUpdate,
            31 => Self::UserId,
            32 => Self::DataVersion,
            33 => Self::PoseUpdate,
            34 => Self::PrimaryButtonPressed,
            35 => Self::SecondaryButtonPressed,
            36 => Self::CalibrationData,
            37 => Self::ClearCalibration,
            38 => Self::OperationComplete,
            39 => Self::Pause,
            40 => Self::AdjustKey,
            _ => return None,
        };
        Some(kind)
    }

    pub fn tag(&self) -> u32 {
        match self {
            Self::VideoDimension => 10,
            Self::VideoData => 11,
            Self::AudioSampleRate => 12,
            Self::AudioData => 13,
            Self::CameraUpdate => 14,
            Self::UserId => 31,
            Self::DataVersion => 32,
            Self::PoseUpdate => 33,
            Self::PrimaryButtonPressed => 34,
            Self::SecondaryButtonPressed => 35,
            Self::CalibrationData => 36,
            Self::ClearCalibration => 37,
            Self::OperationComplete => 38,
            Self::Pause => 39,
            Self::AdjustKey => 40,
        }
    }

    /// Kinds that only ever travel from the phone to the headset.
    pub fn is_outbound_only(&self) -> bool {
        matches!(self, Self::CameraUpdate | Self::ClearCalibration)
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::VideoDimension => "videoDimension",
            Self::VideoData => "videoData",
            Self::AudioSampleRate => "audioSampleRate",
            Self::AudioData => "audioData",
            Self::CameraUpdate => "cameraUpdate",
            Self::UserId => "userId",
            Self::DataVersion => "dataVersion",
            Self::PoseUpdate => "poseUpdate",
            Self::PrimaryButtonPressed => "primaryButtonPressed",
            Self::SecondaryButtonPressed => "secondaryButtonPressed",
            Self::CalibrationData => "calibrationData",
            Self::ClearCalibration => "clearCalibration",
            Self::OperationComplete => "operationComplete",
            Self::Pause => "pause",
            Self::AdjustKey => "adjustKey",
        };
        f.write_str(name)
    }
}

/// Why a frame did not produce a message.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PayloadError {
    #[error("unknown payload type {0}")]
    UnknownTag(u32),

    #[error("{0} is not accepted from the headset")]
    Unsupported(PayloadKind),

    #[error("{kind} payload must be {expected} bytes, got {found}")]
    LengthMismatch { kind: PayloadKind, expected: usize, found: usize },

    #[error("{kind} payload needs at least {minimum} bytes, got {found}")]
    TooShort { kind: PayloadKind, minimum: usize, found: usize },

    #[error("{0} payload is not valid UTF-8")]
    InvalidUtf8(PayloadKind),

    #[error("pose update rejected: {0}")]
    Pose(#[from] ParseError),

    #[error("audio data length {declared} does not match {available} available bytes")]
    AudioLength { declared: i32, available: usize },

    #[error("invalid audio channel count {0}")]
    ChannelCount(i32),

    #[error("{bytes} audio bytes do not split into {channels} channels of f32 samples")]
    SampleAlignment { bytes: usize, channels: u32 },
}

impl PayloadError {
    /// Unknown and outbound-only tags are expected traffic from newer peers.
    pub fn is_forward_compatible(&self) -> bool {
        matches!(self, PayloadError::UnknownTag(_) | PayloadError::Unsupported(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoDimension {
    pub width: i32,
    pub height: i32,
}

/// A decoded payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    UserId(String),
    DataVersion(i32),
    PoseUpdate(PoseUpdate),
    /// Press count.
    PrimaryButtonPressed(i32),
    SecondaryButtonPressed(i32),
    /// Calibration XML.
    CalibrationData(String),
    OperationComplete,
    Pause,
    AdjustKey,
    VideoDimension(VideoDimension),
    /// Annex-B fragment for the [`NalDemuxer`](crate::video::NalDemuxer).
    VideoData(Vec<u8>),
    AudioSampleRate(u32),
    AudioData(AudioPacket),
}

impl Message {
    /// Decode one frame.
    pub fn decode(frame: &Frame) -> Result<Self, PayloadError> {
        let kind = PayloadKind::from_tag(frame.payload_type)
            .ok_or(PayloadError::UnknownTag(frame.payload_type))?;
        let body = frame.data.as_slice();

        let message = match kind {
            PayloadKind::UserId => Message::UserId(utf8(kind, body)?),
            PayloadKind::DataVersion => Message::DataVersion(i32::from_le_bytes(fixed(kind, body)?)),
            PayloadKind::PoseUpdate => Message::PoseUpdate(PoseUpdate::parse(&utf8(kind, body)?)?),
            PayloadKind::PrimaryButtonPressed => {
                Message::PrimaryButtonPressed(i32::from_le_bytes(fixed(kind, body)?))
            }
            PayloadKind::SecondaryButtonPressed => {
                Message::SecondaryButtonPressed(i32::from_le_bytes(fixed(kind, body)?))
            }
            PayloadKind::CalibrationData => Message::CalibrationData(utf8(kind, body)?),
            PayloadKind::OperationComplete => Message::OperationComplete,
            PayloadKind::Pause => Message::Pause,
            PayloadKind::AdjustKey => Message::AdjustKey,
            PayloadKind::VideoDimension => {
                let bytes: [u8; 8] = fixed(kind, body)?;
                let (width, height) = bytes.split_at(4);
                Message::VideoDimension(VideoDimension {
                    width: i32::from_le_bytes([width[0], width[1], width[2], width[3]]),
                    height: i32::from_le_bytes([height[0], height[1], height[2], height[3]]),
                })
            }
            PayloadKind::VideoData => Message::VideoData(body.to_vec()),
            PayloadKind::AudioSampleRate => {
                Message::AudioSampleRate(u32::from_le_bytes(fixed(kind, body)?))
            }
            PayloadKind::AudioData => Message::AudioData(AudioPacket::decode(body)?),
            PayloadKind::CameraUpdate | PayloadKind::ClearCalibration => {
                return Err(PayloadError::Unsupported(kind));
            }
        };
        Ok(message)
    }

    pub fn kind(&self) -> PayloadKind {
        match self {
            Message::UserId(_) => PayloadKind::UserId,
            Message::DataVersion(_) => PayloadKind::DataVersion,
            Message::PoseUpdate(_) => PayloadKind::PoseUpdate,
            Message::PrimaryButtonPressed(_) => PayloadKind::PrimaryButtonPressed,
            Message::SecondaryButtonPressed(_) => PayloadKind::SecondaryButtonPressed,
            Message::CalibrationData(_) => PayloadKind::CalibrationData,
            Message::OperationComplete => PayloadKind::OperationComplete,
            Message::Pause => PayloadKind::Pause,
            Message::AdjustKey => PayloadKind::AdjustKey,
            Message::VideoDimension(_) => PayloadKind::VideoDimension,
            Message::VideoData(_) => PayloadKind::VideoData,
            Message::AudioSampleRate(_) => PayloadKind::AudioSampleRate,
            Message::AudioData(_) => PayloadKind::AudioData,
        }
    }

    /// Encode as a frame, the way the headset produces it.
    pub fn to_frame(&self) -> Frame {
        let data = match self {
            Message::UserId(s) | Message::CalibrationData(s) => s.as_bytes().to_vec(),
            Message::DataVersion(v)
            | Message::PrimaryButtonPressed(v)
            | Message::SecondaryButtonPressed(v) => v.to_le_bytes().to_vec(),
            Message::PoseUpdate(update) => update.to_string().into_bytes(),
            Message::OperationComplete | Message::Pause | Message::AdjustKey => Vec::new(),
            Message::VideoDimension(d) => {
                let mut out = d.width.to_le_bytes().to_vec();
                out.extend_from_slice(&d.height.to_le_bytes());
                out
            }
            Message::VideoData(data) => data.clone(),
            Message::AudioSampleRate(rate) => rate.to_le_bytes().to_vec(),
            Message::AudioData(packet) => packet.encode(),
        };
        Frame::new(self.kind().tag(), data)
    }
}

/// Frames the phone sends to the headset.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// Calibration XML for the headset to store.
    CalibrationData(String),
    ClearCalibration,
    Camera(CameraUpdate),
}

impl Outbound {
    pub fn to_frame(&self) -> Frame {
        match self {
            Outbound::CalibrationData(xml) => {
                Frame::new(PayloadKind::CalibrationData.tag(), xml.as_bytes().to_vec())
            }
            Outbound::ClearCalibration => Frame::new(PayloadKind::ClearCalibration.tag(), Vec::new()),
            Outbound::Camera(update) => update.to_frame(),
        }
    }
}

fn utf8(kind: PayloadKind, body: &[u8]) -> Result<String, PayloadError> {
    std::str::from_utf8(body).map(str::to_owned).map_err(|_| PayloadError::InvalidUtf8(kind))
}

fn fixed<const N: usize>(kind: PayloadKind, body: &[u8]) -> Result<[u8; N], PayloadError> {
    body.try_into()
        .map_err(|_| PayloadError::LengthMismatch { kind, expected: N, found: body.len() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::CANONICAL_POSE_TEXT;

    #[test]
    fn tags_round_trip() {
        for tag in (10..=14).chain(31..=40) {
            let kind = PayloadKind::from_tag(tag).unwrap();
            assert_eq!(kind.tag(), tag);
        }
        assert_eq!(PayloadKind::from_tag(41), None);
        assert_eq!(PayloadKind::from_tag(0), None);
    }

    #[test]
    fn fixed_size_bodies_decode_little_endian() {
        let frame = Frame::new(32, 1i32.to_le_bytes().to_vec());
        assert_eq!(Message::decode(&frame), Ok(Message::DataVersion(1)));

        let frame = Frame::new(12, 48_000u32.to_le_bytes().to_vec());
        assert_eq!(Message::decode(&frame), Ok(Message::AudioSampleRate(48_000)));

        let mut body = 1920i32.to_le_bytes().to_vec();
        body.extend_from_slice(&1080i32.to_le_bytes());
        assert_eq!(
            Message::decode(&Frame::new(10, body)),
            Ok(Message::VideoDimension(VideoDimension { width: 1920, height: 1080 }))
        );
    }

    #[test]
    fn wrong_fixed_size_is_malformed() {
        let frame = Frame::new(34, vec![1, 0, 0]);
        assert_eq!(
            Message::decode(&frame),
            Err(PayloadError::LengthMismatch {
                kind: PayloadKind::PrimaryButtonPressed,
                expected: 4,
                found: 3
            })
        );
    }

    #[test]
    fn unit_messages_ignore_body() {
        assert_eq!(Message::decode(&Frame::new(38, Vec::new())), Ok(Message::OperationComplete));
        assert_eq!(Message::decode(&Frame::new(39, vec![7])), Ok(Message::Pause));
        assert_eq!(Message::decode(&Frame::new(40, Vec::new())), Ok(Message::AdjustKey));
    }

    #[test]
    fn unknown_and_outbound_tags_are_forward_compatible() {
        let unknown = Message::decode(&Frame::new(99, Vec::new())).unwrap_err();
        assert_eq!(unknown, PayloadError::UnknownTag(99));
        assert!(unknown.is_forward_compatible());

        let outbound = Message::decode(&Frame::new(37, Vec::new())).unwrap_err();
        assert_eq!(outbound, PayloadError::Unsupported(PayloadKind::ClearCalibration));
        assert!(outbound.is_forward_compatible());
    }

    #[test]
    fn text_payloads_require_utf8() {
        let frame = Frame::new(36, vec![0xFF, 0xFE]);
        assert_eq!(
            Message::decode(&frame),
            Err(PayloadError::InvalidUtf8(PayloadKind::CalibrationData))
        );
    }

    #[test]
    fn pose_update_payload_is_parsed() {
        let frame = Frame::new(33, CANONICAL_POSE_TEXT.as_bytes().to_vec());
        match Message::decode(&frame).unwrap() {
            Message::PoseUpdate(update) => assert_eq!(update.frame, 10),
            other => panic!("expected pose update, got {other:?}"),
        }

        let frame = Frame::new(33, b"time 1.5 frame 10".to_vec());
        let err = Message::decode(&frame).unwrap_err();
        assert!(matches!(err, PayloadError::Pose(ParseError::TokenMismatch { .. })));
        assert!(!err.is_forward_compatible());
    }

    #[test]
    fn messages_survive_frame_encoding() {
        let messages = vec![
            Message::UserId("player-one".to_string()),
            Message::SecondaryButtonPressed(3),
            Message::CalibrationData("<calibration/>".to_string()),
            Message::VideoData(vec![0, 0, 0, 1, 0x67, 0x42]),
            Message::AudioData(AudioPacket { timestamp_micros: 5, channels: 1, samples: vec![0.5] }),
            Message::PoseUpdate(PoseUpdate::parse(CANONICAL_POSE_TEXT).unwrap()),
        ];
        for message in messages {
            assert_eq!(Message::decode(&message.to_frame()).as_ref(), Ok(&message));
        }
    }

    #[test]
    fn outbound_frames_carry_expected_tags() {
        assert_eq!(Outbound::ClearCalibration.to_frame(), Frame::new(37, Vec::new()));
        let frame = Outbound::CalibrationData("<x/>".to_string()).to_frame();
        assert_eq!(frame.payload_type, 36);
        assert_eq!(frame.data, b"<x/>");
    }
}
