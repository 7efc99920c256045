//! The two header layouts.

use super::{FrameCodec, FrameHeader, HeaderFault, read_u32_le};

const IDENTIFIER_SIZE: usize = 4;

/// Header layout of the calibration and control channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalibrationCodec;

impl FrameCodec for CalibrationCodec {
    const NAME: &'static str = "calibration";
    const PROTOCOL_IDENTIFIER: u32 = 1_384_359_787;
    const HEADER_SIZE: usize = 12;

    fn decode_header(bytes: &[u8]) -> Option<FrameHeader> {
        if bytes.len() < Self::HEADER_SIZE {
            return None;
        }
        // Type and length are signed on this channel; keep the bit pattern and
        // let the consistency check reject negative lengths.
        Some(FrameHeader {
            identifier: read_u32_le(bytes, 0),
            declared_length: None,
            payload_type: read_u32_le(bytes, 4),
            payload_length: read_u32_le(bytes, 8),
        })
    }

    fn check_consistency(header: &FrameHeader) -> Result<(), HeaderFault> {
        let signed = header.payload_length as i32;
        if signed < 0 {
            return Err(HeaderFault::NegativeLength(signed));
        }
        Ok(())
    }

    fn encode_header(payload_type: u32, payload_length: u32, out: &mut Vec<u8>) {
        out.extend_from_slice(&Self::PROTOCOL_IDENTIFIER.to_le_bytes());
        out.extend_from_slice(&(payload_type as i32).to_le_bytes());
        out.extend_from_slice(&(payload_length as i32).to_le_bytes());
    }
}

/// Header layout of the audio/video capture channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureCodec;

impl FrameCodec for CaptureCodec {
    const NAME: &'static str = "capture";
    const PROTOCOL_IDENTIFIER: u32 = 0x2877_AF94;
    const HEADER_SIZE: usize = 16;

    fn decode_header(bytes: &[u8]) -> Option<FrameHeader> {
        if bytes.len() < Self::HEADER_SIZE {
            return None;
        }
        Some(FrameHeader {
            identifier: read_u32_le(bytes, 0),
            declared_length: Some(read_u32_le(bytes, 4)),
            payload_type: read_u32_le(bytes, 8),
            payload_length: read_u32_le(bytes, 12),
        })
    }

    fn check_consistency(header: &FrameHeader) -> Result<(), HeaderFault> {
        let declared = header.declared_length.unwrap_or_default();
        let total = Self::HEADER_SIZE as u64 + u64::from(header.payload_length);
        if total != IDENTIFIER_SIZE as u64 + u64::from(declared) {
            return Err(HeaderFault::LengthMismatch {
                declared,
                payload_length: header.payload_length,
            });
        }
        Ok(())
    }

    fn encode_header(payload_type: u32, payload_length: u32, out: &mut Vec<u8>) {
        let declared = (Self::HEADER_SIZE - IDENTIFIER_SIZE) as u32 + payload_length;
        out.extend_from_slice(&Self::PROTOCOL_IDENTIFIER.to_le_bytes());
        out.extend_from_slice(&declared.to_le_bytes());
        out.extend_from_slice(&payload_type.to_le_bytes());
        out.extend_from_slice(&payload_length.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::Frame;

    #[test]
    fn calibration_header_layout() {
        let bytes = Frame::new(36, b"<xml/>".to_vec()).encode::<CalibrationCodec>();
        assert_eq!(bytes.len(), 12 + 6);
        assert_eq!(&bytes[0..4], &1_384_359_787u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &36i32.to_le_bytes());
        assert_eq!(&bytes[8..12], &6i32.to_le_bytes());

        let header = CalibrationCodec::decode_header(&bytes).unwrap();
        assert_eq!(header.payload_type, 36);
        assert_eq!(header.payload_length, 6);
        assert_eq!(header.declared_length, None);
        assert!(CalibrationCodec::check_consistency(&header).is_ok());
    }

    #[test]
    fn capture_header_declares_length_excluding_identifier() {
        // Same numbers the headset uses for camera position updates.
        let bytes = Frame::new(14, vec![0; 0x1c]).encode::<CaptureCodec>();
        let header = CaptureCodec::decode_header(&bytes).unwrap();
        assert_eq!(header.identifier, 0x2877_AF94);
        assert_eq!(header.declared_length, Some(0x28));
        assert_eq!(header.payload_length, 0x1c);
        assert!(CaptureCodec::check_consistency(&header).is_ok());
    }

    #[test]
    fn capture_header_with_wrong_declared_length_is_inconsistent() {
        let mut bytes = Frame::new(11, vec![1, 2, 3]).encode::<CaptureCodec>();
        bytes[4..8].copy_from_slice(&99u32.to_le_bytes());
        let header = CaptureCodec::decode_header(&bytes).unwrap();
        assert_eq!(
            CaptureCodec::check_consistency(&header),
            Err(HeaderFault::LengthMismatch { declared: 99, payload_length: 3 })
        );
    }

    #[test]
    fn calibration_negative_length_is_rejected() {
        let mut bytes = Frame::new(31, Vec::new()).encode::<CalibrationCodec>();
        bytes[8..12].copy_from_slice(&(-4i32).to_le_bytes());
        let header = CalibrationCodec::decode_header(&bytes).unwrap();
        assert_eq!(CalibrationCodec::check_consistency(&header), Err(HeaderFault::NegativeLength(-4)));
    }

    #[test]
    fn short_input_has_no_header() {
        let bytes = Frame::new(11, vec![1, 2, 3]).encode::<CaptureCodec>();
        assert!(CaptureCodec::decode_header(&bytes[..15]).is_none());
        assert!(CalibrationCodec::decode_header(&bytes[..11]).is_none());
        assert!(CalibrationCodec::decode_header(&[]).is_none());
        assert!(CaptureCodec::decode_header(&bytes[..16]).is_some());
    }
}
