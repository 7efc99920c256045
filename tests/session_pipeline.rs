//! End-to-end tests through the public API: bytes in, messages and decode
//! requests out.

use mrc_wire::framing::{CalibrationCodec, CaptureCodec, Frame};
use mrc_wire::protocol::{AudioPacket, CameraIntrinsics, Outbound, PayloadKind};
use mrc_wire::video::{ChannelDecoder, DecodeRequest, NalDemuxer, NalUnitType, START_CODE};
use mrc_wire::{Message, ResyncPolicy, SessionDispatcher, WireConfig, WireError};

const SPS: &[u8] = &[0x67, 0x42, 0xC0, 0x1F, 0xDA, 0x01];
const PPS: &[u8] = &[0x68, 0xCE, 0x3C, 0x80];
const IDR: &[u8] = &[0x65, 0x88, 0x84, 0x21];
const SLICE: &[u8] = &[0x41, 0x9A, 0x24];

fn annex_b(units: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    for unit in units {
        out.extend_from_slice(&START_CODE);
        out.extend_from_slice(unit);
    }
    out
}

#[test]
fn capture_stream_feeds_decoder() -> anyhow::Result<()> {
    let mut stream = Vec::new();
    let mut dimension = 1280i32.to_le_bytes().to_vec();
    dimension.extend_from_slice(&720i32.to_le_bytes());
    stream.extend(Frame::new(10, dimension).encode::<CaptureCodec>());
    // Keyframe arrives before its parameter sets and must be dropped.
    stream.extend(Frame::new(11, annex_b(&[IDR])).encode::<CaptureCodec>());
    stream.extend(Frame::new(11, annex_b(&[SPS, PPS, IDR])).encode::<CaptureCodec>());
    stream.extend(Frame::new(11, annex_b(&[SLICE])).encode::<CaptureCodec>());

    let mut session = SessionDispatcher::<CaptureCodec, _>::new(Vec::new(), &WireConfig::default());
    for chunk in stream.chunks(5) {
        session.ingest(chunk)?;
    }

    let (decoder, mut requests) = ChannelDecoder::new(16);
    let mut demuxer = NalDemuxer::new(decoder);
    let mut forwarded = 0;
    for message in session.into_sink() {
        match message {
            Message::VideoDimension(d) => assert_eq!((d.width, d.height), (1280, 720)),
            Message::VideoData(payload) => forwarded += demuxer.process(&payload).forwarded,
            other => anyhow::bail!("unexpected message {other:?}"),
        }
    }
    assert_eq!(forwarded, 2);

    match requests.try_recv()? {
        DecodeRequest::Configure(parameters) => {
            assert_eq!(parameters.sps, SPS);
            assert_eq!(parameters.pps, PPS);
        }
        other => anyhow::bail!("expected configure, got {other:?}"),
    }
    match requests.try_recv()? {
        DecodeRequest::Decode { nal_type, sample } => {
            assert_eq!(nal_type, NalUnitType::SliceIdr);
            assert_eq!(sample[..4], (IDR.len() as u32).to_be_bytes());
            assert_eq!(&sample[4..], IDR);
        }
        other => anyhow::bail!("expected decode, got {other:?}"),
    }
    assert!(matches!(
        requests.try_recv()?,
        DecodeRequest::Decode { nal_type: NalUnitType::Slice, .. }
    ));
    Ok(())
}

#[test]
fn audio_with_bad_sub_header_is_dropped() -> anyhow::Result<()> {
    let packet = AudioPacket { timestamp_micros: 42, channels: 2, samples: vec![0.25; 8] };
    let good = packet.encode();
    let mut bad = good.clone();
    bad.truncate(bad.len() - 4);

    let mut stream = Frame::new(13, bad).encode::<CaptureCodec>();
    stream.extend(Frame::new(13, good).encode::<CaptureCodec>());

    let mut session = SessionDispatcher::<CaptureCodec, _>::new(Vec::new(), &WireConfig::default());
    assert_eq!(session.ingest(&stream)?, 1);
    assert_eq!(session.stats().malformed, 1);
    assert_eq!(session.sink(), &vec![Message::AudioData(packet)]);
    Ok(())
}

#[test]
fn garbage_is_skipped_or_stalls_by_policy() -> anyhow::Result<()> {
    let mut stream = vec![0x13, 0x37, 0x00, 0x42, 0x99];
    stream.extend(Frame::new(40, Vec::new()).encode::<CalibrationCodec>());

    let mut scanning = SessionDispatcher::<CalibrationCodec, _>::new(Vec::new(), &WireConfig::default());
    assert_eq!(scanning.ingest(&stream)?, 1);
    assert_eq!(scanning.sink(), &vec![Message::AdjustKey]);
    assert_eq!(scanning.accumulator_stats().bytes_skipped, 5);

    let stall = WireConfig { resync: ResyncPolicy::Stall, ..WireConfig::default() };
    let mut stalled = SessionDispatcher::<CalibrationCodec, _>::new(Vec::new(), &stall);
    assert_eq!(stalled.ingest(&stream)?, 0);
    assert!(stalled.sink().is_empty());
    Ok(())
}

#[test]
fn config_file_drives_limits() -> anyhow::Result<()> {
    let config = WireConfig::from_yaml_str("max_buffered_bytes: 32\noverflow: reject\n")?;
    let mut session = SessionDispatcher::<CaptureCodec, _>::new(Vec::new(), &config);

    let frame = Frame::new(11, vec![0xAB; 100]).encode::<CaptureCodec>();
    let err = session.ingest(&frame[..40]).unwrap_err();
    assert!(matches!(err, WireError::BufferOverflow { buffered: 40, limit: 32 }));

    let err = WireConfig::from_yaml_str("max_buffered_bytes: 32\nunknown_key: 1\n").unwrap_err();
    assert!(matches!(err, WireError::Config { .. }));
    Ok(())
}

#[test]
fn outbound_messages_have_outbound_tags() {
    let frame = Outbound::ClearCalibration.to_frame();
    assert_eq!(PayloadKind::from_tag(frame.payload_type), Some(PayloadKind::ClearCalibration));

    let intrinsics = CameraIntrinsics::from_vertical_fov(1.2, 1920, 1080, 1.0);
    let frame = Outbound::Camera(mrc_wire::CameraUpdate::Intrinsics(intrinsics)).to_frame();
    assert_eq!(frame.payload_type, PayloadKind::CameraUpdate.tag());
    assert_eq!(frame.data.len(), 16 + 9 * 4);

    // Neither is accepted back from the headset.
    assert!(Message::decode(&frame).unwrap_err().is_forward_compatible());
}
