//! Incremental frame extraction from an arbitrarily chunked byte stream.

use std::collections::VecDeque;
use std::marker::PhantomData;
use tracing::{debug, trace, warn};

use super::{Frame, FrameCodec, HeaderFault};
use crate::config::{OverflowPolicy, ResyncPolicy, WireConfig};
use crate::{Result, WireError};

/// Counters describing what an accumulator has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccumulatorStats {
    pub frames_extracted: u64,
    /// Bytes skipped while searching for the next protocol identifier.
    pub bytes_skipped: u64,
    pub resyncs: u64,
    pub overflows: u64,
}

enum Extraction {
    Frame { frame: Frame, consumed: usize },
    NeedMore,
    Fault(HeaderFault),
}

/// Growing byte buffer plus a FIFO of frames not yet consumed.
///
/// After every [`add`](Self::add) the head of the buffer holds no further
/// complete, valid frame: extraction runs to a fixed point.
///
/// Not designed for concurrent mutation; each session owns its own
/// accumulator.
#[derive(Debug)]
pub struct FrameAccumulator<C: FrameCodec> {
    buffer: Vec<u8>,
    /// Offset of the first unconsumed byte in `buffer`.
    start: usize,
    frames: VecDeque<Frame>,
    resync: ResyncPolicy,
    overflow: OverflowPolicy,
    max_buffered_bytes: usize,
    stalled: bool,
    stats: AccumulatorStats,
    _codec: PhantomData<C>,
}

impl<C: FrameCodec> Default for FrameAccumulator<C> {
    fn default() -> Self {
        Self::new(&WireConfig::default())
    }
}

impl<C: FrameCodec> FrameAccumulator<C> {
    pub fn new(config: &WireConfig) -> Self {
        Self {
            buffer: Vec::new(),
            start: 0,
            frames: VecDeque::new(),
            resync: config.resync,
            overflow: config.overflow,
            max_buffered_bytes: config.max_buffered_bytes,
            stalled: false,
            stats: AccumulatorStats::default(),
            _codec: PhantomData,
        }
    }

    /// Append `bytes` and extract every frame that is now complete.
    ///
    /// Returns the number of frames extracted by this call. Partial data is
    /// not an error. Fails only when the buffered bytes exceed the configured
    /// cap under [`OverflowPolicy::Reject`]; the buffer is cleared either way.
    pub fn add(&mut self, bytes: &[u8]) -> Result<usize> {
        self.buffer.extend_from_slice(bytes);

        let mut extracted = 0;
        loop {
            match self.try_extract_one() {
                Extraction::Frame { frame, consumed } => {
                    trace!(
                        "{} frame extracted: type={}, payload={} bytes",
                        C::NAME,
                        frame.payload_type,
                        frame.data.len()
                    );
                    self.start += consumed;
                    self.frames.push_back(frame);
                    self.stats.frames_extracted += 1;
                    extracted += 1;
                }
                Extraction::NeedMore => break,
                Extraction::Fault(fault) => {
                    if !self.recover(fault) {
                        break;
                    }
                }
            }
        }

        self.compact();
        self.enforce_limit()?;
        Ok(extracted)
    }

    /// Dequeue the oldest pending frame.
    pub fn next(&mut self) -> Option<Frame> {
        self.frames.pop_front()
    }

    /// Number of frames extracted but not yet consumed.
    pub fn pending(&self) -> usize {
        self.frames.len()
    }

    /// Number of bytes held while waiting for a complete frame.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len() - self.start
    }

    /// Whether the buffer head is a bad header under [`ResyncPolicy::Stall`].
    pub fn is_stalled(&self) -> bool {
        self.stalled
    }

    pub fn stats(&self) -> AccumulatorStats {
        self.stats
    }

    /// Drop all buffered bytes and pending frames.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.start = 0;
        self.frames.clear();
        self.stalled = false;
    }

    fn try_extract_one(&self) -> Extraction {
        let available = &self.buffer[self.start..];
        let Some(header) = C::decode_header(available) else {
            return Extraction::NeedMore;
        };
        if header.identifier != C::PROTOCOL_IDENTIFIER {
            return Extraction::Fault(HeaderFault::IdentifierMismatch {
                expected: C::PROTOCOL_IDENTIFIER,
                found: header.identifier,
            });
        }
        if let Err(fault) = C::check_consistency(&header) {
            return Extraction::Fault(fault);
        }

        let payload_length = header.payload_length as usize;
        let total = C::HEADER_SIZE + payload_length;
        if available.len() < total {
            return Extraction::NeedMore;
        }

        let data = available[C::HEADER_SIZE..total].to_vec();
        Extraction::Frame { frame: Frame::new(header.payload_type, data), consumed: total }
    }

    /// Handle a bad header. Returns whether extraction should continue.
    fn recover(&mut self, fault: HeaderFault) -> bool {
        match self.resync {
            ResyncPolicy::Stall => {
                if !self.stalled {
                    warn!("{} stream stalled: {}", C::NAME, fault);
                    self.stalled = true;
                }
                false
            }
            ResyncPolicy::ScanForIdentifier => {
                let magic = C::PROTOCOL_IDENTIFIER.to_le_bytes();
                let search_from = self.start + 1;
                let found = self.buffer[search_from..]
                    .windows(magic.len())
                    .position(|window| window == magic);

                let skipped = match found {
                    Some(offset) => offset + 1,
                    None => {
                        // Keep a tail that could be the start of a split identifier.
                        let keep = (magic.len() - 1).min(self.buffered_len());
                        self.buffered_len() - keep
                    }
                };

                self.start += skipped;
                self.stats.bytes_skipped += skipped as u64;
                self.stats.resyncs += 1;
                warn!("{} stream resynchronizing: {}; skipped {} bytes", C::NAME, fault, skipped);
                found.is_some()
            }
        }
    }

    fn compact(&mut self) {
        if self.start == self.buffer.len() {
            self.buffer.clear();
            self.start = 0;
        } else if self.start > 0 && self.start >= self.buffer.len() / 2 {
            self.buffer.drain(..self.start);
            self.start = 0;
        }
    }

    fn enforce_limit(&mut self) -> Result<()> {
        let buffered = self.buffered_len();
        if buffered <= self.max_buffered_bytes {
            return Ok(());
        }

        self.stats.overflows += 1;
        self.buffer.clear();
        self.start = 0;
        self.stalled = false;

        match self.overflow {
            OverflowPolicy::Reject => Err(WireError::BufferOverflow {
                buffered,
                limit: self.max_buffered_bytes,
            }),
            OverflowPolicy::DiscardBuffered => {
                debug!("{} buffer over limit, discarded {} bytes", C::NAME, buffered);
                Ok(())
            }
        }
    }
}
