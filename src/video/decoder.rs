//! Hand-off to the platform video decoder.
//!
//! Decoding happens elsewhere (typically a hardware session on another
//! thread). The demuxer only submits requests; decoded pictures come back
//! on whatever channel the decoder owner chooses.

use tokio::sync::mpsc;
use tracing::trace;

use super::NalUnitType;
use crate::{Result, WireError};

/// SPS and PPS unit bodies (no start code) that configure a decoder session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSets {
    pub sps: Vec<u8>,
    pub pps: Vec<u8>,
}

/// A decoder session the demuxer feeds.
///
/// A retryable error drops only the unit; any other error also discards the
/// session, so nothing more is forwarded until the next keyframe.
pub trait VideoDecoder {
    /// Create or replace the decoding session.
    fn configure(&mut self, parameters: &ParameterSets) -> Result<()>;

    /// Submit one length-prefixed unit.
    fn decode(&mut self, nal_type: NalUnitType, sample: Vec<u8>) -> Result<()>;
}

/// Requests produced by a [`ChannelDecoder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeRequest {
    Configure(ParameterSets),
    Decode { nal_type: NalUnitType, sample: Vec<u8> },
}

/// [`VideoDecoder`] that forwards requests over a bounded channel.
///
/// Never blocks: a full queue drops the unit, and a closed receiver
/// is reported as a lost session.
#[derive(Debug, Clone)]
pub struct ChannelDecoder {
    requests: mpsc::Sender<DecodeRequest>,
    capacity: usize,
}

impl ChannelDecoder {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<DecodeRequest>) {
        let capacity = capacity.max(1);
        let (requests, receiver) = mpsc::channel(capacity);
        (Self { requests, capacity }, receiver)
    }

    fn submit(&self, request: DecodeRequest) -> Result<()> {
        self.requests.try_send(request).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => WireError::DecoderBusy { capacity: self.capacity },
            mpsc::error::TrySendError::Closed(_) => {
                WireError::decoder_unavailable("decode request receiver dropped")
            }
        })
    }
}

impl VideoDecoder for ChannelDecoder {
    fn configure(&mut self, parameters: &ParameterSets) -> Result<()> {
        trace!(sps = parameters.sps.len(), pps = parameters.pps.len(), "configure decoder");
        self.submit(DecodeRequest::Configure(parameters.clone()))
    }

    fn decode(&mut self, nal_type: NalUnitType, sample: Vec<u8>) -> Result<()> {
        self.submit(DecodeRequest::Decode { nal_type, sample })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_queue_is_retryable() {
        let (mut decoder, _rx) = ChannelDecoder::new(1);
        decoder.decode(NalUnitType::Slice, vec![1]).unwrap();

        let err = decoder.decode(NalUnitType::Slice, vec![2]).unwrap_err();
        assert!(matches!(err, WireError::DecoderBusy { capacity: 1 }));
        assert!(err.is_retryable());
    }

    #[test]
    fn dropped_receiver_is_fatal() {
        let (mut decoder, rx) = ChannelDecoder::new(4);
        drop(rx);

        let err = decoder
            .configure(&ParameterSets { sps: vec![0x67], pps: vec![0x68] })
            .unwrap_err();
        assert!(matches!(err, WireError::Decoder { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn requests_arrive_in_order() {
        let (mut decoder, mut rx) = ChannelDecoder::new(4);
        let parameters = ParameterSets { sps: vec![0x67], pps: vec![0x68] };
        decoder.configure(&parameters).unwrap();
        decoder.decode(NalUnitType::SliceIdr, vec![0, 0, 0, 1, 0x65]).unwrap();

        assert_eq!(rx.try_recv().unwrap(), DecodeRequest::Configure(parameters));
        assert!(matches!(
            rx.try_recv().unwrap(),
            DecodeRequest::Decode { nal_type: NalUnitType::SliceIdr, .. }
        ));
        assert!(rx.try_recv().is_err());
    }
}
