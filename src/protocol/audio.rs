//! Audio sub-record carried by `audioData` payloads.
//!
//! ```text
//! ┌──────────────────┬──────────┬─────────────┐
//! │ timestamp (µs)   │ channels │ data length │ f32 samples ...
//! │      u64         │   i32    │     i32     │
//! └──────────────────┴──────────┴─────────────┘
//! ```
//!
//! Samples are planar: all frames of channel 0, then all of channel 1, and so on.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{PayloadError, PayloadKind};

/// Size of the audio sub-header in bytes.
pub const AUDIO_HEADER_SIZE: usize = 16;

const SAMPLE_SIZE: usize = std::mem::size_of::<f32>();

/// One block of 32-bit float PCM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioPacket {
    pub timestamp_micros: u64,
    pub channels: u32,
    /// Channel-major sample blocks.
    pub samples: Vec<f32>,
}

impl AudioPacket {
    /// Decode an `audioData` body, validating the sub-header against the body size.
    pub fn decode(body: &[u8]) -> Result<Self, PayloadError> {
        if body.len() < AUDIO_HEADER_SIZE {
            return Err(PayloadError::TooShort {
                kind: PayloadKind::AudioData,
                minimum: AUDIO_HEADER_SIZE,
                found: body.len(),
            });
        }

        let (header, data) = body.split_at(AUDIO_HEADER_SIZE);
        let timestamp_micros = u64::from_le_bytes(header[0..8].try_into().unwrap_or_default());
        let channels = i32::from_le_bytes(header[8..12].try_into().unwrap_or_default());
        let declared = i32::from_le_bytes(header[12..16].try_into().unwrap_or_default());

        if usize::try_from(declared).ok() != Some(data.len()) {
            return Err(PayloadError::AudioLength { declared, available: data.len() });
        }
        let channels = u32::try_from(channels)
            .ok()
            .filter(|&c| c > 0)
            .ok_or(PayloadError::ChannelCount(channels))?;
        if data.len() % (SAMPLE_SIZE * channels as usize) != 0 {
            return Err(PayloadError::SampleAlignment { bytes: data.len(), channels });
        }

        let samples = data
            .chunks_exact(SAMPLE_SIZE)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();

        Ok(Self { timestamp_micros, channels, samples })
    }

    /// Serialize as an `audioData` body.
    pub fn encode(&self) -> Vec<u8> {
        let data_length = self.samples.len() * SAMPLE_SIZE;
        let mut out = Vec::with_capacity(AUDIO_HEADER_SIZE + data_length);
        out.extend_from_slice(&self.timestamp_micros.to_le_bytes());
        out.extend_from_slice(&(self.channels as i32).to_le_bytes());
        out.extend_from_slice(&(data_length as i32).to_le_bytes());
        for sample in &self.samples {
            out.extend_from_slice(&sample.to_le_bytes());
        }
        out
    }

    /// Number of sample frames per channel.
    pub fn frames(&self) -> usize {
        match self.channels {
            0 => 0,
            channels => self.samples.len() / channels as usize,
        }
    }

    /// Samples of one channel.
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        if index >= self.channels as usize {
            return None;
        }
        let frames = self.frames();
        self.samples.get(index * frames..(index + 1) * frames)
    }

    /// Samples re-arranged frame by frame (L R L R ...).
    pub fn interleaved(&self) -> Vec<f32> {
        let frames = self.frames();
        let channels = self.channels as usize;
        let mut out = Vec::with_capacity(self.samples.len());
        for frame in 0..frames {
            for channel in 0..channels {
                out.push(self.samples[channel * frames + frame]);
            }
        }
        out
    }

    pub fn timestamp(&self) -> Duration {
        Duration::from_micros(self.timestamp_micros)
    }
}
