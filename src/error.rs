//! Error types for the wire protocol layer.
//!
//! Most failures inside the protocol layer are not errors at all: a short read
//! is a wait state, and a malformed payload is dropped and logged by the
//! [`SessionDispatcher`](crate::SessionDispatcher). [`WireError`] covers what
//! remains and is surfaced to the caller:
//!
//! - **Connection Errors**: TCP connect or read failures
//! - **Buffer Errors**: the frame accumulator exceeded its configured cap
//! - **Config Errors**: invalid or unreadable configuration
//! - **Codec Errors**: the external decoder session went away
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use mrc_wire::WireError;
//!
//! let error = WireError::connection_failed("headset refused connection");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for wire operations.
pub type Result<T, E = WireError> = std::result::Result<T, E>;

/// Main error type for wire operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum WireError {
    #[error("Failed to connect to headset: {reason}")]
    Connection {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("I/O error during {operation}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Configuration error in {path}: {details}")]
    Config { path: PathBuf, details: String },

    #[error("Frame buffer overflow: {buffered} bytes buffered, limit {limit}")]
    BufferOverflow { buffered: usize, limit: usize },

    #[error("Decoder session unavailable: {reason}")]
    Decoder { reason: String },

    #[error("Decoder queue full ({capacity} requests pending)")]
    DecoderBusy { capacity: usize },
}

impl WireError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            WireError::Connection { .. } => true,
            WireError::Timeout { .. } => true,
            WireError::Io { .. } => true,
            WireError::BufferOverflow { .. } => true,
            WireError::Config { .. } => false,
            WireError::Decoder { .. } => false,
            WireError::DecoderBusy { .. } => true,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            WireError::Connection { .. } => vec![
                "Ensure the headset is running the capture app",
                "Check that both devices are on the same network",
                "Verify the address and port",
            ],
            WireError::Io { .. } => vec![
                "Check network connectivity",
                "Reconnect to the headset",
            ],
            WireError::Timeout { .. } => vec![
                "Increase the connect timeout",
                "Verify the headset is reachable",
            ],
            WireError::Config { .. } => vec![
                "Check the configuration file syntax",
                "Remove unknown keys from the configuration",
            ],
            WireError::BufferOverflow { .. } => vec![
                "Reconnect to resynchronize the stream",
                "Raise max_buffered_bytes if frames are legitimately large",
                "Verify both ends speak the same protocol version",
            ],
            WireError::Decoder { .. } => vec![
                "Restart the video decoder service",
                "Wait for the next keyframe with parameter sets",
            ],
            WireError::DecoderBusy { .. } => vec![
                "Drain decoded frames faster",
                "Increase channel_capacity",
            ],
        }
    }

    /// Helper constructor for connection errors.
    pub fn connection_failed(reason: impl Into<String>) -> Self {
        WireError::Connection { reason: reason.into(), source: None }
    }

    /// Helper constructor for connection errors with source.
    pub fn connection_failed_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        WireError::Connection { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for I/O errors with operation context.
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        WireError::Io { operation: operation.into(), source }
    }

    /// Helper constructor for configuration errors.
    pub fn config_error(path: impl Into<PathBuf>, details: impl Into<String>) -> Self {
        WireError::Config { path: path.into(), details: details.into() }
    }

    /// Helper constructor for decoder errors.
    pub fn decoder_unavailable(reason: impl Into<String>) -> Self {
        WireError::Decoder { reason: reason.into() }
    }
}

impl From<std::io::Error> for WireError {
    fn from(err: std::io::Error) -> Self {
        WireError::Io { operation: "<unknown>".to_string(), source: err }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn error_messages_carry_their_context(
            reason in ".*",
            buffered in 0usize..1 << 30,
            limit in 0usize..1 << 30,
            details in ".*"
        ) {
            let connection = WireError::connection_failed(reason.clone());
            prop_assert!(connection.to_string().contains(&reason));

            let overflow = WireError::BufferOverflow { buffered, limit };
            let msg = overflow.to_string();
            prop_assert!(msg.contains(&buffered.to_string()));
            prop_assert!(msg.contains(&limit.to_string()));

            let config = WireError::config_error("/etc/mrc.yaml", details.clone());
            prop_assert!(config.to_string().contains(&details));
        }
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<WireError>();

        let error = WireError::connection_failed("test");
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn recovery_methods_work() {
        let connection_error = WireError::connection_failed("test");
        let config_error = WireError::config_error("/etc/mrc.yaml", "bad key");
        let overflow = WireError::BufferOverflow { buffered: 10, limit: 5 };

        assert!(connection_error.is_retryable());
        assert!(overflow.is_retryable());
        assert!(!config_error.is_retryable());

        for error in [&connection_error, &config_error, &overflow] {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty());
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }
    }

    #[test]
    fn io_conversion_preserves_source() {
        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "peer reset");
        let wire_err: WireError = io_err.into();

        match wire_err {
            WireError::Io { source, .. } => assert_eq!(source.to_string(), "peer reset"),
            other => panic!("Expected Io error variant, got {other:?}"),
        }
    }
}
