//! H.264 elementary stream handling for `videoData` payloads.
//!
//! Each payload is assumed to hold complete Annex-B NAL units; units are
//! never reassembled across messages.

mod decoder;
mod demuxer;
mod nal;

pub use decoder::{ChannelDecoder, DecodeRequest, ParameterSets, VideoDecoder};
pub use demuxer::{DemuxReport, NalDemuxer};
pub use nal::{NalUnit, NalUnitType, START_CODE, split_annex_b};
