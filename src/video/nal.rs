//! Annex-B NAL unit splitting.
//!
//! ```text
//! Annex-B:         00 00 00 01 | header | rbsp ...
//! length-prefixed: len (u32 BE) | header | rbsp ...
//! header:          forbidden(1) | ref_idc(2) | type(5)
//! ```

use std::fmt;

/// Four-byte Annex-B start code.
pub const START_CODE: [u8; 4] = [0, 0, 0, 1];

/// H.264 NAL unit type, from the low 5 bits of the unit header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NalUnitType {
    /// Non-IDR picture slice (P/B).
    Slice,
    SliceDataA,
    SliceDataB,
    SliceDataC,
    /// Keyframe.
    SliceIdr,
    Sei,
    Sps,
    Pps,
    AccessUnitDelimiter,
    EndOfSequence,
    EndOfStream,
    Filler,
    Other(u8),
}

impl NalUnitType {
    pub fn from_header(header: u8) -> Self {
        match header & 0x1F {
            1 => Self::Slice,
            2 => Self::SliceDataA,
            3 => Self::SliceDataB,
            4 => Self::SliceDataC,
            5 => Self::SliceIdr,
            6 => Self::Sei,
            7 => Self::Sps,
            8 => Self::Pps,
            9 => Self::AccessUnitDelimiter,
            10 => Self::EndOfSequence,
            11 => Self::EndOfStream,
            12 => Self::Filler,
            other => Self::Other(other),
        }
    }

    pub fn type_id(&self) -> u8 {
        match self {
            Self::Slice => 1,
            Self::SliceDataA => 2,
            Self::SliceDataB => 3,
            Self::SliceDataC => 4,
            Self::SliceIdr => 5,
            Self::Sei => 6,
            Self::Sps => 7,
            Self::Pps => 8,
            Self::AccessUnitDelimiter => 9,
            Self::EndOfSequence => 10,
            Self::EndOfStream => 11,
            Self::Filler => 12,
            Self::Other(id) => *id,
        }
    }

    pub fn is_parameter_set(&self) -> bool {
        matches!(self, Self::Sps | Self::Pps)
    }
}

impl fmt::Display for NalUnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Slice => write!(f, "Slice"),
            Self::SliceDataA => write!(f, "SliceDPA"),
            Self::SliceDataB => write!(f, "SliceDPB"),
            Self::SliceDataC => write!(f, "SliceDPC"),
            Self::SliceIdr => write!(f, "IDR"),
            Self::Sei => write!(f, "SEI"),
            Self::Sps => write!(f, "SPS"),
            Self::Pps => write!(f, "PPS"),
            Self::AccessUnitDelimiter => write!(f, "AUD"),
            Self::EndOfSequence => write!(f, "EndOfSeq"),
            Self::EndOfStream => write!(f, "EndOfStream"),
            Self::Filler => write!(f, "Filler"),
            Self::Other(id) => write!(f, "Other({id})"),
        }
    }
}

/// One NAL unit, still carrying the start code it was split on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NalUnit {
    nal_type: NalUnitType,
    annex_b: Vec<u8>,
}

impl NalUnit {
    /// Wrap a start-code-prefixed unit. Returns `None` when there is nothing
    /// after the start code.
    pub fn from_annex_b(annex_b: Vec<u8>) -> Option<Self> {
        let header = *annex_b.get(START_CODE.len())?;
        if annex_b[..START_CODE.len()] != START_CODE {
            return None;
        }
        Some(Self { nal_type: NalUnitType::from_header(header), annex_b })
    }

    pub fn nal_type(&self) -> NalUnitType {
        self.nal_type
    }

    /// The unit including its start code.
    pub fn annex_b(&self) -> &[u8] {
        &self.annex_b
    }

    /// The unit without its start code.
    pub fn payload(&self) -> &[u8] {
        &self.annex_b[START_CODE.len()..]
    }

    /// Rewrite the start code as a big-endian length prefix, the layout
    /// hardware decoders expect (4-byte NAL length field).
    pub fn into_length_prefixed(mut self) -> Vec<u8> {
        let length = (self.annex_b.len() - START_CODE.len()) as u32;
        self.annex_b[..START_CODE.len()].copy_from_slice(&length.to_be_bytes());
        self.annex_b
    }
}

/// Split an Annex-B buffer on `00 00 00 01`.
///
/// The buffer must hold complete units. Bytes before the first start code
/// and units with nothing after their start code are dropped.
pub fn split_annex_b(stream: &[u8]) -> Vec<NalUnit> {
    let mut units = Vec::new();
    let mut unit_start = None;
    let mut i = 0;

    while i + START_CODE.len() <= stream.len() {
        if stream[i..i + START_CODE.len()] == START_CODE {
            if let Some(start) = unit_start {
                units.extend(NalUnit::from_annex_b(stream[start..i].to_vec()));
            }
            unit_start = Some(i);
            i += START_CODE.len();
        } else {
            i += 1;
        }
    }

    if let Some(start) = unit_start {
        units.extend(NalUnit::from_annex_b(stream[start..].to_vec()));
    }
    units
}
