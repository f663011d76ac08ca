//! Channel-backed observer for UI layers

use futures::{Stream, StreamExt};
use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::WatchStream;

use super::Observer;
use crate::types::{Frame, LogEvent, SessionStats};

/// Capacity of the log broadcast; slow readers lose the oldest messages.
const LOG_CAPACITY: usize = 256;

/// Observer that publishes notifications on tokio channels.
///
/// Frames and statistics are latest-value (`watch`) channels, log events go
/// through a `broadcast` channel so every subscriber sees each message.
#[derive(Debug)]
pub struct ChannelObserver {
    frame_tx: watch::Sender<Option<Frame>>,
    stats_tx: watch::Sender<SessionStats>,
    log_tx: broadcast::Sender<LogEvent>,
}

/// Receiving side of a [`ChannelObserver`]
#[derive(Debug)]
pub struct ObserverChannels {
    /// Latest frame, `None` until the first one arrives
    pub frames: watch::Receiver<Option<Frame>>,
    /// Rates, maximum rate and counters
    pub stats: watch::Receiver<SessionStats>,
    /// Log messages in emission order
    pub logs: broadcast::Receiver<LogEvent>,
}

impl ChannelObserver {
    /// Create the observer and its receivers
    pub fn new() -> (Self, ObserverChannels) {
        let (frame_tx, frames) = watch::channel(None);
        let (stats_tx, stats) = watch::channel(SessionStats::default());
        let (log_tx, logs) = broadcast::channel(LOG_CAPACITY);

        (Self { frame_tx, stats_tx, log_tx }, ObserverChannels { frames, stats, logs })
    }

    /// Additional log receiver starting from the next message
    pub fn subscribe_logs(&self) -> broadcast::Receiver<LogEvent> {
        self.log_tx.subscribe()
    }
}

impl Observer for ChannelObserver {
    fn on_log(&self, event: &LogEvent) {
        // No receivers is fine, the log panel may not be open
        let _ = self.log_tx.send(event.clone());
    }

    fn on_frame(&self, frame: &Frame) {
        self.frame_tx.send_replace(Some(frame.clone()));
        self.stats_tx.send_modify(|stats| stats.frames += 1);
    }

    fn on_rate(&self, rate: u32) {
        self.stats_tx.send_if_modified(|stats| {
            let changed = stats.current_rate != rate;
            stats.current_rate = rate;
            changed
        });
    }

    fn on_max_rate_candidate(&self, rate: u32) {
        self.stats_tx.send_if_modified(|stats| {
            if rate > stats.max_rate {
                stats.max_rate = rate;
                true
            } else {
                false
            }
        });
    }

    fn on_session_count_changed(&self, count: u64) {
        self.stats_tx.send_modify(|stats| stats.session_count = count);
    }

    fn on_capture(&self, _frame: &Frame) {
        self.stats_tx.send_modify(|stats| stats.capture_count += 1);
    }
}

impl ObserverChannels {
    /// Current statistics
    pub fn stats(&self) -> SessionStats {
        self.stats.borrow().clone()
    }

    /// Most recent frame, if any
    pub fn latest_frame(&self) -> Option<Frame> {
        self.frames.borrow().clone()
    }

    /// Stream of frames with latest-wins semantics
    ///
    /// Readers slower than the stream skip intermediate frames.
    pub fn frame_stream(&self) -> impl Stream<Item = Frame> + 'static {
        WatchStream::new(self.frames.clone()).filter_map(|opt| async move { opt })
    }
}
