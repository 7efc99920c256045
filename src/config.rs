//! Session configuration.
//!
//! Every field has a default, so an empty YAML document is a valid
//! configuration:
//!
//! ```rust
//! use mrc_wire::{ResyncPolicy, WireConfig};
//!
//! let config = WireConfig::from_yaml_str("max_buffered_bytes: 1048576\nresync: stall\n").unwrap();
//! assert_eq!(config.max_buffered_bytes, 1 << 20);
//! assert_eq!(config.resync, ResyncPolicy::Stall);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::{Result, WireError};

/// What the frame accumulator does when the head of its buffer is not a
/// valid frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResyncPolicy {
    /// Skip forward to the next occurrence of the protocol identifier.
    #[default]
    ScanForIdentifier,
    /// Never advance past a bad header. Later frames are never extracted.
    Stall,
}

/// What the frame accumulator does when buffered bytes exceed the cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Fail the `add` call; the owner is expected to close the session.
    #[default]
    Reject,
    /// Drop every unparsed byte and continue with the next chunk.
    DiscardBuffered,
}

/// Configuration shared by the framer, the dispatcher and the connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WireConfig {
    /// Upper bound on bytes held while waiting for a complete frame.
    pub max_buffered_bytes: usize,
    pub resync: ResyncPolicy,
    pub overflow: OverflowPolicy,
    /// `dataVersion` the calibration producer is expected to announce.
    pub expected_data_version: i32,
    pub connect_timeout_ms: u64,
    /// Size of each socket read.
    pub read_chunk_size: usize,
    /// Capacity of the per-connection message channel.
    pub channel_capacity: usize,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            max_buffered_bytes: 16 * 1024 * 1024,
            resync: ResyncPolicy::default(),
            overflow: OverflowPolicy::default(),
            expected_data_version: 1,
            connect_timeout_ms: 10_000,
            read_chunk_size: 64 * 1024,
            channel_capacity: 256,
        }
    }
}

impl WireConfig {
    /// Parse a configuration from a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Self::parse_with_path(yaml, Path::new("<memory>"))
    }

    /// Load a configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| WireError::io(format!("reading {}", path.display()), e))?;
        Self::parse_with_path(&yaml, path)
    }

    fn parse_with_path(yaml: &str, path: &Path) -> Result<Self> {
        let config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml_ng::from_str(yaml)
                .map_err(|e| WireError::config_error(path, e.to_string()))?
        };
        config.validate().map_err(|details| WireError::config_error(path, details))?;
        debug!("Loaded wire configuration from {}: {:?}", path.display(), config);
        Ok(config)
    }

    /// Check that all sizes are usable.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.max_buffered_bytes == 0 {
            return Err("max_buffered_bytes must be greater than zero".to_string());
        }
        if self.read_chunk_size == 0 {
            return Err("read_chunk_size must be greater than zero".to_string());
        }
        if self.channel_capacity == 0 {
            return Err("channel_capacity must be greater than zero".to_string());
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
