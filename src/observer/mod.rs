//! Observer interface for session notifications
//!
//! The controller pushes everything the presentation layer needs through an
//! [`Observer`]: log messages, frames, rate samples and session counts.
//! Callbacks run on the controller's tasks and must not block. Frame and rate
//! callbacks are serialised with `stop`, so they must not call back into the
//! controller.

mod channel;

pub use channel::{ChannelObserver, ObserverChannels};

use tracing::{debug, error, info, warn};

use crate::types::{Frame, LogEvent, LogLevel};

/// Receiver of session notifications.
///
/// Every method has an empty default so implementors pick what they need.
pub trait Observer: Send + Sync + 'static {
    /// A message for the log panel
    fn on_log(&self, _event: &LogEvent) {}

    /// A new frame from the live stream
    fn on_frame(&self, _frame: &Frame) {}

    /// The current rate in frames per second; 0 when streaming stops
    fn on_rate(&self, _rate: u32) {}

    /// A completed rate sample; the observer keeps the running maximum
    fn on_max_rate_candidate(&self, _rate: u32) {}

    /// Total number of sessions started so far
    fn on_session_count_changed(&self, _count: u64) {}

    /// A still image taken with [`capture`](crate::SessionController::capture)
    fn on_capture(&self, _frame: &Frame) {}
}

/// Observer that forwards notifications to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_log(&self, event: &LogEvent) {
        match event.level {
            LogLevel::Info => info!("{}", event.message),
            LogLevel::Warning => warn!("{}", event.message),
            LogLevel::Error => error!("{}", event.message),
        }
    }

    fn on_frame(&self, frame: &Frame) {
        debug!(sequence = frame.sequence, bytes = frame.len(), "Frame received");
    }

    fn on_rate(&self, rate: u32) {
        debug!(rate, "Frame rate updated");
    }

    fn on_session_count_changed(&self, count: u64) {
        debug!(count, "Session count changed");
    }

    fn on_capture(&self, frame: &Frame) {
        info!(bytes = frame.len(), "Still image captured");
    }
}
