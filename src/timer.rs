//! Cancellable periodic task

use std::ops::ControlFlow;
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Repeating timer running on its own tokio task.
///
/// The callback first fires one period after spawning. Cancellation is
/// idempotent and also happens on drop, so a timer never outlives its owner.
#[derive(Debug)]
pub struct TickTimer {
    cancel: CancellationToken,
}

impl TickTimer {
    /// Spawn a timer calling `on_tick` every `period` until cancelled or the
    /// callback returns [`ControlFlow::Break`].
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            // Don't burst after a stall
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        if on_tick().is_break() {
                            break;
                        }
                    }
                }
            }

            trace!("Tick timer ended");
        });

        Self { cancel }
    }

    /// Stop the timer. Safe to call any number of times.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for TickTimer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
