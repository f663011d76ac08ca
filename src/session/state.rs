//! Controller-owned session state

use std::time::Duration;
use tokio::time::Instant;

use crate::rate::RateMeter;
use crate::timer::TickTimer;
use crate::types::{DeviceStatus, SessionPhase, SessionSnapshot};

/// What a tick should do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum TickDecision {
    /// Not streaming or not connected
    Idle,
    /// A fetch is still outstanding
    Busy,
    /// Issue a fetch tagged with this generation
    Fetch(u64),
}

/// Mutable state of the streaming session, only touched under the
/// controller's lock.
///
/// `timer` is `Some` exactly while `active` is set. `generation` changes on
/// every activation and deactivation so late fetch completions can tell
/// whether they still belong to the running session.
#[derive(Debug)]
pub(super) struct SessionState {
    pub device: DeviceStatus,
    pub active: bool,
    pub starting: bool,
    pub in_flight: bool,
    pub timer: Option<TickTimer>,
    pub session_count: u64,
    pub generation: u64,
    pub rate: RateMeter,
    pub current_rate: u32,
    pub frames_received: u64,
    pub skipped_ticks: u64,
    pub capture_count: u64,
}

impl SessionState {
    pub fn new(rate_window: Duration) -> Self {
        Self {
            device: DeviceStatus::disconnected(),
            active: false,
            starting: false,
            in_flight: false,
            timer: None,
            session_count: 0,
            generation: 0,
            rate: RateMeter::new(rate_window),
            current_rate: 0,
            frames_received: 0,
            skipped_ticks: 0,
            capture_count: 0,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.device.connected
    }

    pub fn phase(&self) -> SessionPhase {
        if self.active {
            SessionPhase::Streaming
        } else if self.starting {
            SessionPhase::Starting
        } else {
            SessionPhase::Idle
        }
    }

    /// Begin a new session driven by `timer`. Returns the session number.
    pub fn activate(&mut self, timer: TickTimer) -> u64 {
        self.active = true;
        self.timer = Some(timer);
        self.session_count += 1;
        self.generation += 1;
        self.in_flight = false;
        self.rate.reset();
        self.current_rate = 0;
        self.frames_received = 0;
        self.skipped_ticks = 0;
        self.session_count
    }

    /// Synchronous half of a stop. Returns `false` if nothing was streaming.
    pub fn deactivate(&mut self) -> bool {
        if !self.active {
            return false;
        }

        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
        self.active = false;
        self.current_rate = 0;
        self.in_flight = false;
        self.rate.reset();
        self.generation += 1;
        true
    }

    /// Single-flight gate for a timer tick
    pub fn begin_fetch(&mut self) -> TickDecision {
        if !self.active || !self.is_connected() {
            return TickDecision::Idle;
        }
        if self.in_flight {
            self.skipped_ticks += 1;
            return TickDecision::Busy;
        }

        self.in_flight = true;
        TickDecision::Fetch(self.generation)
    }

    /// Release the in-flight flag for a fetch of `generation`.
    ///
    /// Returns whether the completion belongs to the running session. A
    /// stale completion leaves the state untouched.
    pub fn finish_fetch(&mut self, generation: u64) -> bool {
        if generation != self.generation {
            return false;
        }
        self.in_flight = false;
        self.active
    }

    /// Count a delivered frame. Returns its sequence number and any
    /// completed rate sample.
    pub fn record_frame(&mut self, now: Instant) -> (u64, Option<u32>) {
        self.frames_received += 1;
        let sample = self.rate.record_frame(now);
        if let Some(rate) = sample {
            self.current_rate = rate;
        }
        (self.frames_received, sample)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase(),
            connected: self.is_connected(),
            in_flight: self.in_flight,
            current_rate: self.current_rate,
            session_count: self.session_count,
            frames_received: self.frames_received,
            skipped_ticks: self.skipped_ticks,
            capture_count: self.capture_count,
        }
    }
}
