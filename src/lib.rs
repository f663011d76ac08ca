//! Client-side live streaming for remote capture devices.
//!
//! Scopestream drives a capture device (typically a USB microscope behind a
//! helper process) that offers only three remote operations: start capture,
//! stop capture and fetch one frame. It turns those into a live stream by
//! polling at a fixed cadence.
//!
//! # Features
//!
//! - **Single-flight polling**: at most one fetch is ever outstanding
//! - **Rate measurement**: frames per second over fixed one-second windows
//! - **Clean shutdown**: stopping, disconnecting or dropping the controller
//!   cancels the timer and discards late results
//! - **Observer fan-out**: callbacks or tokio channels for UI layers
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use scopestream::{ChannelObserver, CommandSource, SessionController, StreamConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> scopestream::Result<()> {
//!     let config = StreamConfig::default();
//!     let source = CommandSource::new("scope-helper", config.device.clone());
//!     let (observer, mut channels) = ChannelObserver::new();
//!
//!     let controller = SessionController::new(Arc::new(source), Arc::new(observer), config)?;
//!     controller.connect().await;
//!     controller.toggle().await;
//!
//!     while let Ok(event) = channels.logs.recv().await {
//!         println!("{event}");
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
pub mod config;
mod error;
pub mod types;

// Streaming architecture
pub mod observer;
pub mod rate;
pub mod session;
pub mod source;
pub mod sources;
pub mod timer;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Core exports
pub use config::{DeviceConfig, StreamConfig};
pub use error::*;
pub use types::*;

// Main API exports
pub use observer::{ChannelObserver, Observer, ObserverChannels, TracingObserver};
pub use rate::RateMeter;
pub use session::SessionController;
pub use source::FrameSource;
pub use sources::CommandSource;
pub use timer::TickTimer;
