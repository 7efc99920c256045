//! Builders for wire bytes used by unit tests and benchmarks.

#![cfg(any(test, feature = "benchmark"))]

use crate::framing::{CalibrationCodec, CaptureCodec, Frame};
use crate::video::START_CODE;

/// Pose record with the left hand tracked and the right hand absent.
pub const CANONICAL_POSE_TEXT: &str = "frame 10 time 1.5 head_pos 0,0,0 head_rot 0,0,0,1 left_hand_pos 0,0,0 left_hand_rot 0,0,0,1 right_hand_pos 1,2,3 right_hand_rot 0,0,0,1 raw_pos 0,0,0 raw_rot 0,0,0,1 lht 1 lhv 1 rht 0 rhv 0";

/// Baseline profile SPS body (no start code).
pub const H264_SPS: &[u8] = &[0x67, 0x42, 0xC0, 0x1F, 0xDA, 0x01, 0x40, 0x16, 0xEC, 0x04, 0x40];
/// PPS body.
pub const H264_PPS: &[u8] = &[0x68, 0xCE, 0x3C, 0x80];
/// IDR slice body.
pub const H264_IDR: &[u8] = &[0x65, 0x88, 0x84, 0x00, 0x33, 0xFF, 0xFE, 0xF6, 0xF0, 0xFE];
/// Non-IDR slice body.
pub const H264_SLICE: &[u8] = &[0x41, 0x9A, 0x24, 0x6C, 0x41, 0xFF, 0xFE];

/// Calibration-channel bytes for one frame.
pub fn calibration_frame_bytes(payload_type: u32, data: &[u8]) -> Vec<u8> {
    Frame::new(payload_type, data.to_vec()).encode::<CalibrationCodec>()
}

/// Capture-channel bytes for one frame.
pub fn capture_frame_bytes(payload_type: u32, data: &[u8]) -> Vec<u8> {
    Frame::new(payload_type, data.to_vec()).encode::<CaptureCodec>()
}

/// Concatenate unit bodies into an Annex-B buffer.
pub fn annex_b(units: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    for unit in units {
        out.extend_from_slice(&START_CODE);
        out.extend_from_slice(unit);
    }
    out
}

/// A capture stream of `frames` video messages: the first carries SPS, PPS
/// and a keyframe, the rest a single slice each.
pub fn synthetic_capture_stream(frames: usize) -> Vec<u8> {
    let mut stream = Vec::new();
    for index in 0..frames {
        let payload = if index == 0 {
            annex_b(&[H264_SPS, H264_PPS, H264_IDR])
        } else {
            annex_b(&[H264_SLICE])
        };
        stream.extend(capture_frame_bytes(11, &payload));
    }
    stream
}
