//! Bytes in, messages out.
//!
//! A [`SessionDispatcher`] owns one [`FrameAccumulator`] and turns each chunk
//! read from the transport into zero or more [`Message`]s handed to a
//! [`MessageSink`]. It never blocks and never spawns: the caller decides
//! when to call [`ingest`](SessionDispatcher::ingest).

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::config::WireConfig;
use crate::framing::{AccumulatorStats, CalibrationCodec, CaptureCodec, Frame, FrameAccumulator, FrameCodec};
use crate::protocol::Message;
use crate::Result;

/// Receiver of decoded messages.
pub trait MessageSink {
    fn deliver(&mut self, message: Message);
}

impl<F: FnMut(Message)> MessageSink for F {
    fn deliver(&mut self, message: Message) {
        self(message)
    }
}

impl MessageSink for Vec<Message> {
    fn deliver(&mut self, message: Message) {
        self.push(message);
    }
}

impl MessageSink for mpsc::UnboundedSender<Message> {
    fn deliver(&mut self, message: Message) {
        if self.send(message).is_err() {
            trace!("message receiver dropped");
        }
    }
}

/// Per-session delivery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub delivered: u64,
    /// Frames whose payload failed to decode.
    pub malformed: u64,
    /// Frames with an unknown or outbound-only tag.
    pub unknown: u64,
}

/// Synchronous frame-to-message pipeline for one connection.
pub struct SessionDispatcher<C: FrameCodec, S: MessageSink> {
    accumulator: FrameAccumulator<C>,
    sink: S,
    expected_data_version: i32,
    stats: DispatchStats,
}

/// Dispatcher for the calibration channel.
pub type CalibrationSession<S> = SessionDispatcher<CalibrationCodec, S>;

/// Dispatcher for the capture channel.
pub type CaptureSession<S> = SessionDispatcher<CaptureCodec, S>;

impl<C: FrameCodec, S: MessageSink> SessionDispatcher<C, S> {
    pub fn new(sink: S, config: &WireConfig) -> Self {
        Self {
            accumulator: FrameAccumulator::new(config),
            sink,
            expected_data_version: config.expected_data_version,
            stats: DispatchStats::default(),
        }
    }

    /// Feed newly received bytes and deliver every message they complete.
    ///
    /// Returns the number of messages delivered. Frames completed before a
    /// buffer overflow are still delivered before the overflow error is
    /// returned.
    pub fn ingest(&mut self, bytes: &[u8]) -> Result<usize> {
        let added = self.accumulator.add(bytes);

        let mut delivered = 0;
        while let Some(frame) = self.accumulator.next() {
            if self.dispatch(frame) {
                delivered += 1;
            }
        }

        added.map(|_| delivered)
    }

    fn dispatch(&mut self, frame: Frame) -> bool {
        let payload_type = frame.payload_type;
        match Message::decode(&frame) {
            Ok(message) => {
                if let Message::DataVersion(version) = message {
                    if version != self.expected_data_version {
                        warn!(
                            "Headset data version {} differs from expected {}",
                            version, self.expected_data_version
                        );
                    }
                }
                trace!(kind = %message.kind(), "delivering message");
                self.sink.deliver(message);
                self.stats.delivered += 1;
                true
            }
            Err(e) if e.is_forward_compatible() => {
                debug!("Ignoring {} frame: {}", C::NAME, e);
                self.stats.unknown += 1;
                false
            }
            Err(e) => {
                warn!(payload_type, "Dropping malformed {} frame: {}", C::NAME, e);
                self.stats.malformed += 1;
                false
            }
        }
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn accumulator_stats(&self) -> AccumulatorStats {
        self.accumulator.stats()
    }

    /// Bytes waiting for the rest of their frame.
    pub fn buffered_len(&self) -> usize {
        self.accumulator.buffered_len()
    }

    /// Discard partially received data, e.g. after a reconnect.
    pub fn reset(&mut self) {
        self.accumulator.reset();
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OverflowPolicy;
    use crate::test_utils::{calibration_frame_bytes, capture_frame_bytes, CANONICAL_POSE_TEXT};
    use crate::WireError;
    use proptest::prelude::*;

    fn calibration() -> CalibrationSession<Vec<Message>> {
        SessionDispatcher::new(Vec::new(), &WireConfig::default())
    }

    #[test]
    fn frames_are_delivered_in_order() {
        let mut stream = calibration_frame_bytes(31, b"user-7");
        stream.extend(calibration_frame_bytes(34, &1i32.to_le_bytes()));
        stream.extend(calibration_frame_bytes(38, &[]));

        let mut session = calibration();
        assert_eq!(session.ingest(&stream).unwrap(), 3);
        assert_eq!(
            session.into_sink(),
            vec![
                Message::UserId("user-7".to_string()),
                Message::PrimaryButtonPressed(1),
                Message::OperationComplete,
            ]
        );
    }

    #[test]
    fn malformed_and_unknown_frames_are_dropped() {
        let mut stream = calibration_frame_bytes(99, b"future");
        stream.extend(calibration_frame_bytes(32, &[1, 0]));
        stream.extend(calibration_frame_bytes(33, b"time 1 frame 2"));
        stream.extend(calibration_frame_bytes(39, &[]));

        let mut session = calibration();
        assert_eq!(session.ingest(&stream).unwrap(), 1);
        assert_eq!(session.stats(), DispatchStats { delivered: 1, malformed: 2, unknown: 1 });
        assert_eq!(session.sink(), &vec![Message::Pause]);
    }

    #[test]
    fn pose_updates_are_parsed() {
        let mut session = calibration();
        session.ingest(&calibration_frame_bytes(33, CANONICAL_POSE_TEXT.as_bytes())).unwrap();

        match session.sink().first() {
            Some(Message::PoseUpdate(update)) => {
                assert!(update.left_hand.is_some());
                assert!(update.right_hand.is_none());
            }
            other => panic!("expected pose update, got {other:?}"),
        }
    }

    #[test]
    fn unexpected_data_version_is_still_delivered() {
        let mut session = calibration();
        session.ingest(&calibration_frame_bytes(32, &7i32.to_le_bytes())).unwrap();
        assert_eq!(session.sink(), &vec![Message::DataVersion(7)]);
    }

    #[test]
    fn closures_and_channels_are_sinks() {
        let mut count = 0;
        let mut session = SessionDispatcher::<CaptureCodec, _>::new(
            |_message: Message| count += 1,
            &WireConfig::default(),
        );
        session.ingest(&capture_frame_bytes(12, &48_000u32.to_le_bytes())).unwrap();
        drop(session);
        assert_eq!(count, 1);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = CaptureSession::new(tx, &WireConfig::default());
        session.ingest(&capture_frame_bytes(12, &48_000u32.to_le_bytes())).unwrap();
        assert_eq!(rx.try_recv().unwrap(), Message::AudioSampleRate(48_000));
    }

    #[test]
    fn completed_frames_survive_overflow() {
        let config = WireConfig {
            max_buffered_bytes: 32,
            overflow: OverflowPolicy::Reject,
            ..WireConfig::default()
        };
        let mut session = CaptureSession::new(Vec::new(), &config);

        let mut stream = capture_frame_bytes(12, &48_000u32.to_le_bytes());
        stream.extend(&capture_frame_bytes(11, &[0u8; 64])[..48]);

        let err = session.ingest(&stream).unwrap_err();
        assert!(matches!(err, WireError::BufferOverflow { .. }));
        assert_eq!(session.sink(), &vec![Message::AudioSampleRate(48_000)]);
        assert_eq!(session.buffered_len(), 0);
    }

    proptest! {
        #[test]
        fn split_delivery_yields_same_messages(
            versions in prop::collection::vec(any::<i32>(), 1..8),
            cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..10),
        ) {
            let mut stream = Vec::new();
            for version in &versions {
                stream.extend(calibration_frame_bytes(32, &version.to_le_bytes()));
            }

            let mut whole = calibration();
            whole.ingest(&stream).unwrap();

            let mut boundaries: Vec<usize> = cuts.iter().map(|i| i.index(stream.len() + 1)).collect();
            boundaries.extend([0, stream.len()]);
            boundaries.sort_unstable();
            boundaries.dedup();

            let mut chunked = calibration();
            for pair in boundaries.windows(2) {
                chunked.ingest(&stream[pair[0]..pair[1]]).unwrap();
            }

            let expected: Vec<Message> = versions.into_iter().map(Message::DataVersion).collect();
            prop_assert_eq!(whole.sink(), &expected);
            prop_assert_eq!(chunked.into_sink(), expected);
        }
    }
}
