//! SPS/PPS gating between `videoData` payloads and a [`VideoDecoder`].

use tracing::{debug, trace, warn};

use super::{NalUnit, NalUnitType, ParameterSets, VideoDecoder, split_annex_b};

/// What one call to [`NalDemuxer::process`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DemuxReport {
    /// Units found in the payload.
    pub units: usize,
    /// Units handed to the decoder.
    pub forwarded: usize,
    /// Units dropped for lack of a session or by the decoder.
    pub dropped: usize,
    /// SPS/PPS units stored.
    pub parameter_sets: usize,
}

/// Feeds `videoData` payloads to a [`VideoDecoder`].
///
/// SPS and PPS are remembered, not forwarded. A keyframe configures the
/// decoder when no session exists or the parameter sets changed since the
/// last configuration. Other slices are forwarded only while a session
/// exists; without one they are dropped until the next usable keyframe.
pub struct NalDemuxer<D: VideoDecoder> {
    decoder: D,
    current_sps: Option<Vec<u8>>,
    current_pps: Option<Vec<u8>>,
    session: Option<ParameterSets>,
}

impl<D: VideoDecoder> NalDemuxer<D> {
    pub fn new(decoder: D) -> Self {
        Self { decoder, current_sps: None, current_pps: None, session: None }
    }

    /// Process one payload of complete Annex-B units.
    pub fn process(&mut self, payload: &[u8]) -> DemuxReport {
        let mut report = DemuxReport::default();

        for unit in split_annex_b(payload) {
            report.units += 1;
            match unit.nal_type() {
                NalUnitType::Sps => {
                    self.current_sps = Some(unit.payload().to_vec());
                    report.parameter_sets += 1;
                }
                NalUnitType::Pps => {
                    self.current_pps = Some(unit.payload().to_vec());
                    report.parameter_sets += 1;
                }
                NalUnitType::SliceIdr => {
                    if self.ensure_session() {
                        self.forward(unit, &mut report);
                    } else {
                        report.dropped += 1;
                    }
                }
                nal_type => {
                    if self.session.is_some() {
                        self.forward(unit, &mut report);
                    } else {
                        trace!(%nal_type, "no decoder session, dropping unit");
                        report.dropped += 1;
                    }
                }
            }
        }

        report
    }

    /// Make sure a session matching the latest parameter sets exists.
    fn ensure_session(&mut self) -> bool {
        let (Some(sps), Some(pps)) = (&self.current_sps, &self.current_pps) else {
            debug!("keyframe before SPS/PPS, dropping");
            return false;
        };

        let wanted = ParameterSets { sps: sps.clone(), pps: pps.clone() };
        if self.session.as_ref() == Some(&wanted) {
            return true;
        }

        match self.decoder.configure(&wanted) {
            Ok(()) => {
                debug!(sps = wanted.sps.len(), pps = wanted.pps.len(), "decoder session configured");
                self.session = Some(wanted);
                true
            }
            Err(e) => {
                warn!("Failed to configure decoder session: {}", e);
                self.session = None;
                false
            }
        }
    }

    fn forward(&mut self, unit: NalUnit, report: &mut DemuxReport) {
        let nal_type = unit.nal_type();
        match self.decoder.decode(nal_type, unit.into_length_prefixed()) {
            Ok(()) => report.forwarded += 1,
            Err(e) if e.is_retryable() => {
                debug!(%nal_type, "decoder busy, dropping unit: {}", e);
                report.dropped += 1;
            }
            Err(e) => {
                warn!(%nal_type, "Decoder rejected unit, discarding session: {}", e);
                self.session = None;
                report.dropped += 1;
            }
        }
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Parameter sets of the active session.
    pub fn session(&self) -> Option<&ParameterSets> {
        self.session.as_ref()
    }

    /// Forget parameter sets and the session, e.g. after reconnecting.
    pub fn reset(&mut self) {
        self.current_sps = None;
        self.current_pps = None;
        self.session = None;
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    pub fn decoder_mut(&mut self) -> &mut D {
        &mut self.decoder
    }

    pub fn into_decoder(self) -> D {
        self.decoder
    }
}
