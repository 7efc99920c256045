//! Camera pose records sent from the phone to the headset on the capture channel.
//!
//! Each record is a `cameraUpdate` payload with a 16-byte sub-header
//! (`u32 100 | u32 0 | u32 record type | u32 data length`) followed by
//! little-endian `f32` values.

use super::PayloadKind;
use crate::framing::Frame;
use crate::pose::{Quaternion, Vector3};

const RECORD_MARKER: u32 = 100;

/// Pinhole intrinsics, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraIntrinsics {
    pub focal_x: f32,
    pub focal_y: f32,
    pub principal_x: f32,
    pub principal_y: f32,
}

impl CameraIntrinsics {
    /// Derive intrinsics from a vertical field of view (radians) and image size,
    /// scaled by `scale`.
    pub fn from_vertical_fov(y_fov: f32, width: u32, height: u32, scale: f32) -> Self {
        let half_width = width as f32 * 0.5;
        let half_height = height as f32 * 0.5;
        let focal = half_height / (y_fov / 2.0).tan();

        Self {
            focal_x: focal * scale,
            focal_y: focal * scale,
            principal_x: half_width * scale,
            principal_y: half_height * scale,
        }
    }

    /// 3x3 matrix in the column-major order the headset expects.
    pub fn column_major(&self) -> [f32; 9] {
        [
            self.focal_x,
            0.0,
            self.principal_x,
            0.0,
            self.focal_y,
            self.principal_y,
            0.0,
            0.0,
            1.0,
        ]
    }
}

/// One outbound camera record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraUpdate {
    Intrinsics(CameraIntrinsics),
    Position(Vector3),
    Rotation(Quaternion),
}

impl CameraUpdate {
    /// Record type in the sub-header.
    pub fn record_type(&self) -> u32 {
        match self {
            CameraUpdate::Intrinsics(_) => 0,
            CameraUpdate::Position(_) => 2,
            CameraUpdate::Rotation(_) => 3,
        }
    }

    fn values(&self) -> Vec<f32> {
        match self {
            CameraUpdate::Intrinsics(intrinsics) => intrinsics.column_major().to_vec(),
            CameraUpdate::Position(p) => vec![p.x as f32, p.y as f32, p.z as f32],
            CameraUpdate::Rotation(q) => vec![q.x as f32, q.y as f32, q.z as f32, q.w as f32],
        }
    }

    pub fn encode_payload(&self) -> Vec<u8> {
        let values = self.values();
        let data_length = (values.len() * 4) as u32;

        let mut out = Vec::with_capacity(16 + data_length as usize);
        out.extend_from_slice(&RECORD_MARKER.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&self.record_type().to_le_bytes());
        out.extend_from_slice(&data_length.to_le_bytes());
        for value in values {
            out.extend_from_slice(&value.to_le_bytes());
        }
        out
    }

    pub fn to_frame(&self) -> Frame {
        Frame::new(PayloadKind::CameraUpdate.tag(), self.encode_payload())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::{CaptureCodec, FrameCodec};

    #[test]
    fn record_sizes_match_headset_expectations() {
        // (record, payload length, length excluding identifier)
        let cases = [
            (CameraUpdate::Position(Vector3::new(1.0, 2.0, 3.0)), 0x1c, 0x28),
            (CameraUpdate::Rotation(Quaternion::IDENTITY), 0x20, 0x2c),
            (
                CameraUpdate::Intrinsics(CameraIntrinsics::from_vertical_fov(1.0, 1920, 1080, 1.0)),
                0x34,
                0x40,
            ),
        ];

        for (record, payload_length, declared) in cases {
            let bytes = record.to_frame().encode::<CaptureCodec>();
            let header = CaptureCodec::decode_header(&bytes).unwrap();
            assert_eq!(header.payload_type, 14);
            assert_eq!(header.payload_length, payload_length);
            assert_eq!(header.declared_length, Some(declared));
        }
    }

    #[test]
    fn position_record_layout() {
        let payload = CameraUpdate::Position(Vector3::new(1.0, 2.0, 3.0)).encode_payload();
        assert_eq!(&payload[0..4], &100u32.to_le_bytes());
        assert_eq!(&payload[8..12], &2u32.to_le_bytes());
        assert_eq!(&payload[12..16], &12u32.to_le_bytes());
        assert_eq!(&payload[16..20], &1.0f32.to_le_bytes());
        assert_eq!(&payload[24..28], &3.0f32.to_le_bytes());
    }

    #[test]
    fn intrinsics_from_ninety_degree_fov() {
        let intrinsics =
            CameraIntrinsics::from_vertical_fov(std::f32::consts::FRAC_PI_2, 1280, 720, 0.5);
        assert!((intrinsics.focal_y - 180.0).abs() < 1e-3);
        assert_eq!(intrinsics.principal_x, 320.0);
        assert_eq!(intrinsics.column_major()[8], 1.0);
    }
}
