//! Test utilities: a scriptable frame source and a recording observer
//!
//! These are used by the crate's own tests and are available to downstream
//! crates through the `test-utils` feature.

#![cfg(any(test, feature = "test-utils"))]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::config::DeviceConfig;
use crate::observer::Observer;
use crate::source::FrameSource;
use crate::types::{DeviceStatus, Frame, FrameResult, LogEvent, LogLevel};
use crate::{Result, StreamError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scripted response to one fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedFetch {
    /// Successful fetch with this payload
    Frame(Vec<u8>),
    /// `success == true` without a payload
    Empty,
    /// Soft failure with this reason
    Soft(String),
    /// Transport failure with this reason
    Fail(String),
    /// Never completes
    Hang,
}

/// Call counters of a [`ScriptedSource`]
#[derive(Debug, Default)]
pub struct CallCounts {
    pub probe: AtomicUsize,
    pub start: AtomicUsize,
    pub stop: AtomicUsize,
    pub fetch: AtomicUsize,
    pub still: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl CallCounts {
    /// Highest number of fetches observed running at the same time
    pub fn max_concurrent_fetches(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn fetches_in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight fetch count even if the fetch is cancelled.
struct FetchTracker<'a>(&'a CallCounts);

impl<'a> FetchTracker<'a> {
    fn enter(counts: &'a CallCounts) -> Self {
        counts.fetch.fetch_add(1, Ordering::SeqCst);
        let now = counts.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        counts.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(counts)
    }
}

impl Drop for FetchTracker<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Frame source driven by a script of fetch responses.
///
/// When the script runs out every fetch returns a small JPEG-like payload
/// tagged with the fetch number.
#[derive(Debug)]
pub struct ScriptedSource {
    device: DeviceConfig,
    connected: bool,
    fetches: Mutex<VecDeque<ScriptedFetch>>,
    start_failure: Mutex<Option<String>>,
    stop_failure: Option<String>,
    fetch_latency: Duration,
    start_latency: Duration,
    stop_latency: Duration,
    pub calls: CallCounts,
}

impl Default for ScriptedSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedSource {
    /// A connected source answering immediately
    pub fn new() -> Self {
        Self {
            device: DeviceConfig::default(),
            connected: true,
            fetches: Mutex::new(VecDeque::new()),
            start_failure: Mutex::new(None),
            stop_failure: None,
            fetch_latency: Duration::ZERO,
            start_latency: Duration::ZERO,
            stop_latency: Duration::ZERO,
            calls: CallCounts::default(),
        }
    }

    /// Probe reports no device
    pub fn disconnected(mut self) -> Self {
        self.connected = false;
        self
    }

    pub fn with_fetch_latency(mut self, latency: Duration) -> Self {
        self.fetch_latency = latency;
        self
    }

    pub fn with_start_latency(mut self, latency: Duration) -> Self {
        self.start_latency = latency;
        self
    }

    pub fn with_stop_latency(mut self, latency: Duration) -> Self {
        self.stop_latency = latency;
        self
    }

    /// Every start-capture fails until [`allow_start`](Self::allow_start)
    pub fn failing_start(self, reason: impl Into<String>) -> Self {
        *lock(&self.start_failure) = Some(reason.into());
        self
    }

    pub fn failing_stop(mut self, reason: impl Into<String>) -> Self {
        self.stop_failure = Some(reason.into());
        self
    }

    pub fn allow_start(&self) {
        *lock(&self.start_failure) = None;
    }

    /// Queue responses for the next fetches
    pub fn push_fetches(&self, responses: impl IntoIterator<Item = ScriptedFetch>) {
        lock(&self.fetches).extend(responses);
    }

    pub fn starts(&self) -> usize {
        self.calls.start.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.calls.stop.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.calls.fetch.load(Ordering::SeqCst)
    }

    async fn delay(latency: Duration) {
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait::async_trait]
impl FrameSource for ScriptedSource {
    async fn probe(&self) -> Result<DeviceStatus> {
        self.calls.probe.fetch_add(1, Ordering::SeqCst);
        if self.connected {
            Ok(DeviceStatus::connected(&self.device))
        } else {
            Ok(DeviceStatus::disconnected())
        }
    }

    async fn start_capture(&self) -> Result<()> {
        self.calls.start.fetch_add(1, Ordering::SeqCst);
        Self::delay(self.start_latency).await;
        let failure = lock(&self.start_failure).clone();
        match failure {
            Some(reason) => Err(StreamError::remote_failed("start", reason)),
            None => Ok(()),
        }
    }

    async fn stop_capture(&self) -> Result<()> {
        self.calls.stop.fetch_add(1, Ordering::SeqCst);
        Self::delay(self.stop_latency).await;
        match &self.stop_failure {
            Some(reason) => Err(StreamError::remote_failed("stop", reason.clone())),
            None => Ok(()),
        }
    }

    async fn fetch_frame(&self) -> Result<FrameResult> {
        let _tracker = FetchTracker::enter(&self.calls);
        let number = self.fetches();
        let next = lock(&self.fetches).pop_front();

        Self::delay(self.fetch_latency).await;

        match next {
            None => Ok(FrameResult::frame(vec![0xFF, 0xD8, number as u8], Some(number as u64))),
            Some(ScriptedFetch::Frame(payload)) => Ok(FrameResult::frame(payload, None)),
            Some(ScriptedFetch::Empty) => Ok(FrameResult { success: true, ..Default::default() }),
            Some(ScriptedFetch::Soft(reason)) => Ok(FrameResult::failure(reason)),
            Some(ScriptedFetch::Fail(reason)) => Err(StreamError::remote_failed("fetch", reason)),
            Some(ScriptedFetch::Hang) => std::future::pending().await,
        }
    }

    async fn capture_still(&self) -> Result<FrameResult> {
        self.calls.still.fetch_add(1, Ordering::SeqCst);
        Ok(FrameResult::frame(vec![0xFF, 0xD8, 0xFF, 0xE0], Some(0)))
    }
}

/// Observer that records every notification.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    logs: Mutex<Vec<LogEvent>>,
    frames: Mutex<Vec<Frame>>,
    rates: Mutex<Vec<u32>>,
    max_candidates: Mutex<Vec<u32>>,
    session_counts: Mutex<Vec<u64>>,
    captures: Mutex<Vec<Frame>>,
}

impl RecordingObserver {
    pub fn logs(&self) -> Vec<LogEvent> {
        lock(&self.logs).clone()
    }

    /// Messages logged at exactly `level`
    pub fn messages_at(&self, level: LogLevel) -> Vec<String> {
        lock(&self.logs)
            .iter()
            .filter(|e| e.level == level)
            .map(|e| e.message.clone())
            .collect()
    }

    pub fn frames(&self) -> Vec<Frame> {
        lock(&self.frames).clone()
    }

    pub fn frame_count(&self) -> usize {
        lock(&self.frames).len()
    }

    pub fn rates(&self) -> Vec<u32> {
        lock(&self.rates).clone()
    }

    pub fn max_candidates(&self) -> Vec<u32> {
        lock(&self.max_candidates).clone()
    }

    pub fn session_counts(&self) -> Vec<u64> {
        lock(&self.session_counts).clone()
    }

    pub fn captures(&self) -> Vec<Frame> {
        lock(&self.captures).clone()
    }
}

impl Observer for RecordingObserver {
    fn on_log(&self, event: &LogEvent) {
        lock(&self.logs).push(event.clone());
    }

    fn on_frame(&self, frame: &Frame) {
        lock(&self.frames).push(frame.clone());
    }

    fn on_rate(&self, rate: u32) {
        lock(&self.rates).push(rate);
    }

    fn on_max_rate_candidate(&self, rate: u32) {
        lock(&self.max_candidates).push(rate);
    }

    fn on_session_count_changed(&self, count: u64) {
        lock(&self.session_counts).push(count);
    }

    fn on_capture(&self, frame: &Frame) {
        lock(&self.captures).push(frame.clone());
    }
}
