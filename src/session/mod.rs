//! Streaming session controller
//!
//! The controller owns the polling timer, the single-flight guard for frame
//! fetches, the rate meter and the session counters. User intent arrives
//! through [`SessionController::start`], [`stop`](SessionController::stop)
//! and [`toggle`](SessionController::toggle); results leave through the
//! [`Observer`].
//!
//! ## Lifecycle
//!
//! ```text
//! Idle --start()--> Starting --remote ack--> Streaming --stop()--> Idle
//!                       \--remote error--> Idle
//! ```
//!
//! While streaming, a [`TickTimer`] fires every tick interval. A tick issues a
//! fetch on its own task unless one is already outstanding, so a slow device
//! never causes overlapping requests.
//!
//! ## Example
//!
//! ```rust,no_run
//! use scopestream::{ChannelObserver, CommandSource, SessionController, StreamConfig};
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> scopestream::Result<()> {
//! let config = StreamConfig::load("scopestream.yaml")?;
//! let source = CommandSource::new("scope-helper", config.device.clone());
//! let (observer, channels) = ChannelObserver::new();
//!
//! let controller = SessionController::new(Arc::new(source), Arc::new(observer), config)?;
//! if controller.connect().await.connected {
//!     controller.start().await;
//! }
//! # Ok(())
//! # }
//! ```

mod state;

use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

use self::state::{SessionState, TickDecision};
use crate::observer::Observer;
use crate::source::FrameSource;
use crate::timer::TickTimer;
use crate::types::{
    DeviceStatus, FetchOutcome, Frame, FrameResult, LogEvent, SessionSnapshot,
};
use crate::{Result, StreamConfig, StreamError};

/// Controller for live streaming sessions against one frame source.
///
/// Dropping the controller cancels the polling timer immediately, even if a
/// fetch is still in flight. Use [`shutdown`](SessionController::shutdown)
/// to also stop the remote capture and wait for it.
pub struct SessionController {
    shared: Arc<Shared>,
}

struct Shared {
    source: Arc<dyn FrameSource>,
    observer: Arc<dyn Observer>,
    config: StreamConfig,
    state: Mutex<SessionState>,
    /// Serialises observer notifications with stop. Taken before `state`.
    emit: Mutex<()>,
}

impl SessionController {
    /// Create a controller after validating `config`.
    pub fn new(
        source: Arc<dyn FrameSource>,
        observer: Arc<dyn Observer>,
        config: StreamConfig,
    ) -> Result<Self> {
        config.validate()?;

        let state = Mutex::new(SessionState::new(config.rate_window()));
        let emit = Mutex::new(());
        Ok(Self { shared: Arc::new(Shared { source, observer, config, state, emit }) })
    }

    /// Probe the device and remember whether it is connected.
    ///
    /// A probe reporting the device gone stops any running session.
    pub async fn connect(&self) -> DeviceStatus {
        self.shared.connect().await
    }

    /// Forget the device, stopping any running session first.
    pub async fn disconnect(&self) {
        self.shared.disconnect().await
    }

    /// Start a streaming session.
    ///
    /// No-op when already streaming or starting. Without a connected device
    /// the request is rejected locally and only logged.
    pub async fn start(&self) {
        self.shared.start().await
    }

    /// Stop the streaming session.
    ///
    /// The local state is reset on the first poll of the returned future,
    /// before the remote stop is issued.
    pub async fn stop(&self) {
        self.shared.stop().await
    }

    /// Stop if streaming, start otherwise.
    pub async fn toggle(&self) {
        let active = self.shared.lock().active;
        if active {
            self.shared.stop().await
        } else {
            self.shared.start().await
        }
    }

    /// Capture a single still image, independent of the live stream.
    pub async fn capture(&self) -> Result<Frame> {
        self.shared.capture().await
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.lock().snapshot()
    }

    pub fn is_streaming(&self) -> bool {
        self.shared.lock().active
    }

    /// Last known device status
    pub fn device(&self) -> DeviceStatus {
        self.shared.lock().device.clone()
    }

    pub fn config(&self) -> &StreamConfig {
        &self.shared.config
    }

    /// Stop streaming, wait for the remote stop, then drop the controller.
    pub async fn shutdown(self) {
        self.shared.stop().await;
        debug!("Session controller shut down");
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        let was_active = self.shared.halt(false);
        if !was_active {
            return;
        }

        debug!("Session controller dropped while streaming");

        // Best-effort release of the remote capture
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let source = Arc::clone(&self.shared.source);
            handle.spawn(async move {
                if let Err(e) = source.stop_capture().await {
                    warn!("Failed to stop capture on teardown: {}", e);
                }
            });
        }
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit_lock(&self) -> MutexGuard<'_, ()> {
        self.emit.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Synchronous half of a stop: deactivate and publish the zero rate
    /// before any pending fetch can notify. Returns `false` if nothing was
    /// streaming.
    fn halt(&self, forget_device: bool) -> bool {
        let _emit = self.emit_lock();
        let was_active = {
            let mut state = self.lock();
            if forget_device {
                state.device = DeviceStatus::disconnected();
            }
            state.deactivate()
        };

        if was_active {
            self.observer.on_rate(0);
        }
        was_active
    }

    fn log(&self, event: LogEvent) {
        self.observer.on_log(&event);
    }

    async fn connect(&self) -> DeviceStatus {
        let status = match self.source.probe().await {
            Ok(status) => status,
            Err(e) => {
                error!("Failed to check device: {}", e);
                self.log(LogEvent::error(format!("Failed to check device: {e}")));
                self.mark_disconnected().await;
                return DeviceStatus::disconnected();
            }
        };

        if status.connected {
            info!(
                device_id = status.device_id.as_deref().unwrap_or("unknown"),
                resolution = %status.resolution,
                fps = status.fps,
                "Device connected"
            );
            self.log(LogEvent::info(format!(
                "Device connected: {} ({} @ {} fps)",
                status.device_id.as_deref().unwrap_or("unknown"),
                status.resolution,
                status.fps
            )));
            self.lock().device = status.clone();
        } else {
            self.log(LogEvent::warning("Device not found"));
            self.mark_disconnected().await;
        }

        status
    }

    async fn disconnect(&self) {
        self.mark_disconnected().await;
        info!("Device disconnected");
        self.log(LogEvent::info("Device disconnected"));
    }

    /// Drop the device and halt streaming in one step so no tick or pending
    /// start can observe a connected device without an active session.
    async fn mark_disconnected(&self) {
        if self.halt(true) {
            self.finish_stop().await;
        }
    }

    async fn start(self: &Arc<Self>) {
        let pending = {
            let mut state = self.lock();
            if !state.is_connected() {
                drop(state);
                warn!("Start requested without a connected device");
                self.log(LogEvent::error(format!(
                    "Failed to start streaming: {}",
                    StreamError::NotConnected
                )));
                return;
            }
            if state.active || state.starting {
                trace!(phase = ?state.phase(), "Start ignored");
                return;
            }
            state.starting = true;
            PendingStart { shared: self, armed: true }
        };

        let result = self.source.start_capture().await;

        let started = {
            let mut state = self.lock();
            pending.finish(&mut state);
            match result {
                Ok(()) if state.is_connected() => Ok(Some(state.activate(self.spawn_timer()))),
                Ok(()) => Ok(None),
                Err(e) => Err(e),
            }
        };

        match started {
            Ok(Some(session)) => {
                info!(
                    session,
                    interval_ms = self.config.tick_interval_ms,
                    "Live streaming started"
                );
                self.observer.on_session_count_changed(session);
                self.log(LogEvent::info(format!("Live streaming started (session {session})")));
            }
            Ok(None) => {
                warn!("Device disconnected while starting, releasing capture");
                self.log(LogEvent::warning("Device disconnected before streaming started"));
                if let Err(e) = self.source.stop_capture().await {
                    debug!("Releasing capture failed: {}", e);
                }
            }
            Err(e) => {
                error!("Failed to start streaming: {}", e);
                self.log(LogEvent::error(format!("Failed to start streaming: {e}")));
            }
        }
    }

    async fn stop(&self) {
        if !self.halt(false) {
            trace!("Stop ignored, not streaming");
            return;
        }

        self.finish_stop().await;
    }

    /// Asynchronous half of a stop; local state has already been reset.
    async fn finish_stop(&self) {
        match self.source.stop_capture().await {
            Ok(()) => {
                info!("Live streaming stopped");
                self.log(LogEvent::info("Live streaming stopped"));
            }
            Err(e) => {
                error!("Failed to stop streaming: {}", e);
                self.log(LogEvent::error(format!("Failed to stop streaming: {e}")));
            }
        }
    }

    fn spawn_timer(self: &Arc<Self>) -> TickTimer {
        let weak = Arc::downgrade(self);
        TickTimer::spawn(self.config.tick_interval(), move || match weak.upgrade() {
            Some(shared) => {
                shared.on_tick();
                ControlFlow::Continue(())
            }
            None => ControlFlow::Break(()),
        })
    }

    fn on_tick(self: &Arc<Self>) {
        let decision = self.lock().begin_fetch();

        let generation = match decision {
            TickDecision::Fetch(generation) => generation,
            TickDecision::Busy => {
                trace!("Tick skipped, fetch still outstanding");
                return;
            }
            TickDecision::Idle => return,
        };

        let guard = InFlight { shared: Arc::clone(self), generation, armed: true };
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            let result = shared.fetch_frame().await;
            shared.complete_fetch(guard, result);
        });
    }

    async fn fetch_frame(&self) -> Result<FrameResult> {
        match self.config.fetch_timeout() {
            Some(duration) => tokio::time::timeout(duration, self.source.fetch_frame())
                .await
                .map_err(|_| StreamError::Timeout { duration })?,
            None => self.source.fetch_frame().await,
        }
    }

    fn complete_fetch(&self, guard: InFlight, result: Result<FrameResult>) {
        // Held until every notification for this fetch is out, so a concurrent
        // stop either discards it or publishes its zero rate after it.
        let _emit = self.emit_lock();
        let mut state = self.lock();
        if !guard.release(&mut state) {
            drop(state);
            debug!("Discarding fetch completion from a stopped session");
            return;
        }

        let outcome = match result {
            Ok(result) => result.into_outcome(),
            Err(e) => {
                drop(state);
                error!("Live frame fetch failed: {}", e);
                self.log(LogEvent::error(format!("Live frame error: {e}")));
                return;
            }
        };

        match outcome {
            FetchOutcome::Frame { payload, timestamp_ms } => {
                let (sequence, sample) = state.record_frame(Instant::now());
                drop(state);

                let frame = Frame::new(payload, sequence, timestamp_ms);
                trace!(sequence, bytes = frame.len(), "Frame delivered");
                self.observer.on_frame(&frame);

                if let Some(rate) = sample {
                    debug!(rate, "Rate window closed");
                    self.observer.on_rate(rate);
                    self.observer.on_max_rate_candidate(rate);
                }
            }
            FetchOutcome::Empty => {
                drop(state);
                warn!("Device answered without a frame");
                self.log(LogEvent::warning("Frame missing from device response"));
            }
            FetchOutcome::Failed { reason } => {
                drop(state);
                let reason = reason.unwrap_or_else(|| "unknown".to_string());
                warn!("Frame error (ignoring): {}", reason);
                self.log(LogEvent::warning(format!("Frame error: {reason}")));
            }
        }
    }

    async fn capture(&self) -> Result<Frame> {
        let connected = self.lock().is_connected();
        if !connected {
            self.log(LogEvent::error(format!(
                "Failed to capture image: {}",
                StreamError::NotConnected
            )));
            return Err(StreamError::NotConnected);
        }

        let result = self.source.capture_still().await.and_then(|result| {
            match result.into_outcome() {
                FetchOutcome::Frame { payload, timestamp_ms } => Ok((payload, timestamp_ms)),
                FetchOutcome::Empty => Err(StreamError::capture_failed("no image in response")),
                FetchOutcome::Failed { reason } => Err(StreamError::capture_failed(
                    reason.unwrap_or_else(|| "unknown error".to_string()),
                )),
            }
        });

        match result {
            Ok((payload, timestamp_ms)) => {
                let count = {
                    let mut state = self.lock();
                    state.capture_count += 1;
                    state.capture_count
                };
                let frame = Frame::new(payload, count, timestamp_ms);
                info!(count, bytes = frame.len(), "Image captured");
                self.observer.on_capture(&frame);
                self.log(LogEvent::info("Image captured"));
                Ok(frame)
            }
            Err(e) => {
                error!("Failed to capture image: {}", e);
                self.log(LogEvent::error(format!("Failed to capture image: {e}")));
                Err(e)
            }
        }
    }
}

/// Clears the starting flag if a start is abandoned mid-flight.
struct PendingStart<'a> {
    shared: &'a Shared,
    armed: bool,
}

impl PendingStart<'_> {
    fn finish(mut self, state: &mut SessionState) {
        state.starting = false;
        self.armed = false;
    }
}

impl Drop for PendingStart<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.shared.lock().starting = false;
        }
    }
}

/// Releases the single-flight flag on every exit path of a fetch task,
/// including panics in the frame source.
struct InFlight {
    shared: Arc<Shared>,
    generation: u64,
    armed: bool,
}

impl InFlight {
    /// Returns whether the fetch still belongs to the running session.
    fn release(mut self, state: &mut SessionState) -> bool {
        self.armed = false;
        state.finish_fetch(self.generation)
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.armed {
            self.shared.lock().finish_fetch(self.generation);
        }
    }
}
