//! Error types for the streaming session.
//!
//! Most failures in this crate never reach the caller: the session controller
//! turns remote-call failures into log events and keeps running. The errors
//! here surface from configuration loading, single still captures, and from
//! [`FrameSource`](crate::FrameSource) implementations.
//!
//! ## Error Categories
//!
//! - **Connection Errors**: the device is not connected
//! - **Remote Errors**: start/stop/fetch transport failures
//! - **Timeouts**: a remote call exceeded its configured deadline
//! - **Protocol Errors**: a frame source produced output it could not interpret
//! - **Capture Errors**: a still capture returned no image
//! - **Configuration Errors**: invalid or unreadable configuration
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use scopestream::StreamError;
//!
//! let error = StreamError::remote_failed("fetch", "usb transfer stalled");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for streaming operations.
pub type Result<T, E = StreamError> = std::result::Result<T, E>;

/// Main error type for streaming operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StreamError {
    #[error("Capture device is not connected")]
    NotConnected,

    #[error("Remote {operation} failed: {reason}")]
    Remote {
        operation: String,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Protocol error in {context}: {details}")]
    Protocol { context: String, details: String },

    #[error("Capture failed: {reason}")]
    Capture { reason: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Configuration file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StreamError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            StreamError::NotConnected => true,
            StreamError::Remote { .. } => true,
            StreamError::Timeout { .. } => true,
            StreamError::Protocol { .. } => true,
            StreamError::Capture { .. } => true,
            StreamError::Config { .. } => false,
            StreamError::File { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            StreamError::NotConnected => vec![
                "Check the device is plugged in",
                "Run connect again before starting the stream",
            ],
            StreamError::Remote { .. } => vec![
                "Retry the operation",
                "Check the capture helper is installed and runnable",
                "Reconnect the device",
            ],
            StreamError::Timeout { .. } => vec![
                "Increase the fetch timeout",
                "Check whether another process holds the camera",
            ],
            StreamError::Protocol { .. } => vec![
                "Check the capture helper version",
                "Inspect the helper output manually",
            ],
            StreamError::Capture { .. } => vec![
                "Retry the capture",
                "Check the device is not in use by another application",
            ],
            StreamError::Config { .. } => vec![
                "Fix the offending configuration value",
                "Remove the key to fall back to the default",
            ],
            StreamError::File { .. } => vec![
                "Check the file exists and is readable",
                "Check file permissions",
            ],
        }
    }

    /// Helper constructor for remote-call failures.
    pub fn remote_failed(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        StreamError::Remote { operation: operation.into(), reason: reason.into(), source: None }
    }

    /// Helper constructor for remote-call failures with source.
    pub fn remote_failed_with_source(
        operation: impl Into<String>,
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        StreamError::Remote {
            operation: operation.into(),
            reason: reason.into(),
            source: Some(source),
        }
    }

    /// Helper constructor for protocol errors.
    pub fn protocol(context: impl Into<String>, details: impl Into<String>) -> Self {
        StreamError::Protocol { context: context.into(), details: details.into() }
    }

    /// Helper constructor for failed still captures.
    pub fn capture_failed(reason: impl Into<String>) -> Self {
        StreamError::Capture { reason: reason.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        StreamError::Config { reason: reason.into() }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        StreamError::File { path, source }
    }
}

impl From<serde_yaml_ng::Error> for StreamError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        StreamError::Config { reason: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
          #[test]
          fn error_messages_carry_their_context(
            operation in "\\w+",
            reason in ".*",
            details in ".*",
            duration_ms in 1u64..60000u64
          ) {
            let remote = StreamError::remote_failed(operation.clone(), reason.clone());
            let protocol = StreamError::protocol("frame output", details.clone());
            let timeout = StreamError::Timeout { duration: Duration::from_millis(duration_ms) };

            let remote_msg = remote.to_string();
            prop_assert!(remote_msg.contains(&operation));
            prop_assert!(remote_msg.contains(&reason));
            prop_assert!(protocol.to_string().contains(&details));
            prop_assert!(!timeout.to_string().is_empty());
          }

          #[test]
          fn remote_source_chain_is_preserved(base_message in ".+") {
            let source: Box<dyn std::error::Error + Send + Sync> =
              Box::new(std::io::Error::other(base_message.clone()));
            let error = StreamError::remote_failed_with_source("start", "spawn failed", source);

            let inner = std::error::Error::source(&error);
            prop_assert!(inner.is_some());
            prop_assert_eq!(inner.map(|e| e.to_string()), Some(base_message));
          }
        }
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<StreamError>();

        let error = StreamError::NotConnected;
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn retry_classification() {
        assert!(StreamError::NotConnected.is_retryable());
        assert!(StreamError::remote_failed("fetch", "stalled").is_retryable());
        assert!(StreamError::Timeout { duration: Duration::from_millis(250) }.is_retryable());
        assert!(!StreamError::config("tick_interval_ms must be non-zero").is_retryable());

        for error in [
            StreamError::NotConnected,
            StreamError::remote_failed("stop", "broken pipe"),
            StreamError::config("bad"),
        ] {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty());
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }
    }

    #[test]
    fn yaml_errors_become_config_errors() {
        let err = serde_yaml_ng::from_str::<u32>("not: [a number").unwrap_err();
        let converted: StreamError = err.into();
        assert!(matches!(converted, StreamError::Config { .. }));
    }
}
