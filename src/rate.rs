//! Frame rate measurement over fixed wall-clock windows

use std::time::Duration;
use tokio::time::Instant;

use crate::config::DEFAULT_RATE_WINDOW_MS;

/// Counts frames over fixed windows and yields one sample per closed window.
///
/// The first frame after construction or [`reset`](RateMeter::reset) opens a
/// window and is not itself counted. Every later frame is counted; the frame
/// that reaches the end of the window closes it, is included in the sample,
/// and opens the next window.
///
/// ```rust
/// use scopestream::RateMeter;
/// use std::time::Duration;
/// use tokio::time::Instant;
///
/// let mut meter = RateMeter::default();
/// let start = Instant::now();
/// for i in 0..7 {
///     assert_eq!(meter.record_frame(start + Duration::from_millis(i * 100)), None);
/// }
/// assert_eq!(meter.record_frame(start + Duration::from_millis(1005)), Some(7));
/// ```
#[derive(Debug, Clone)]
pub struct RateMeter {
    window: Duration,
    current: Option<RateWindow>,
}

#[derive(Debug, Clone, Copy)]
struct RateWindow {
    frame_count: u32,
    window_start: Instant,
}

impl RateWindow {
    fn open(now: Instant) -> Self {
        Self { frame_count: 0, window_start: now }
    }
}

impl RateMeter {
    /// Create a meter with the given window length
    pub fn new(window: Duration) -> Self {
        Self { window, current: None }
    }

    /// Record a frame arrival, returning the closed window's count if this
    /// frame ended it.
    pub fn record_frame(&mut self, now: Instant) -> Option<u32> {
        let Some(window) = self.current.as_mut() else {
            self.current = Some(RateWindow::open(now));
            return None;
        };

        window.frame_count = window.frame_count.saturating_add(1);

        if now.saturating_duration_since(window.window_start) >= self.window {
            let sample = window.frame_count;
            *window = RateWindow::open(now);
            return Some(sample);
        }

        None
    }

    /// Discard the current window
    pub fn reset(&mut self) {
        self.current = None;
    }

    /// Frames counted in the open window
    pub fn pending(&self) -> u32 {
        self.current.map_or(0, |w| w.frame_count)
    }
}

impl Default for RateMeter {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_RATE_WINDOW_MS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn seven_frames_then_boundary_yields_seven() {
        let mut meter = RateMeter::default();
        let start = Instant::now();

        for offset in [0, 120, 260, 400, 610, 800, 990] {
            assert_eq!(meter.record_frame(start + ms(offset)), None);
        }
        assert_eq!(meter.record_frame(start + ms(1005)), Some(7));
        assert_eq!(meter.pending(), 0);

        // The closing frame opened the next window
        assert_eq!(meter.record_frame(start + ms(1500)), None);
        assert_eq!(meter.pending(), 1);
        assert_eq!(meter.record_frame(start + ms(2005)), Some(2));
    }

    #[test]
    fn ten_hz_stream_samples_ten() {
        let mut meter = RateMeter::default();
        let start = Instant::now();

        let samples: Vec<_> =
            (0..12).filter_map(|i| meter.record_frame(start + ms(i * 100))).collect();
        assert_eq!(samples, vec![10]);
    }

    #[test]
    fn reset_reopens_on_next_frame() {
        let mut meter = RateMeter::default();
        let start = Instant::now();

        meter.record_frame(start);
        meter.record_frame(start + ms(300));
        meter.reset();
        assert_eq!(meter.pending(), 0);

        // Window restarts here, so 1000ms after the original start is not a boundary
        assert_eq!(meter.record_frame(start + ms(600)), None);
        assert_eq!(meter.record_frame(start + ms(1100)), None);
        assert_eq!(meter.record_frame(start + ms(1600)), Some(2));
    }

    #[test]
    fn long_gap_closes_window_with_single_frame() {
        let mut meter = RateMeter::default();
        let start = Instant::now();

        meter.record_frame(start);
        assert_eq!(meter.record_frame(start + ms(5000)), Some(1));
    }

    proptest! {
        #[test]
        fn samples_account_for_every_counted_frame(
            gaps in prop::collection::vec(0u64..400, 1..200)
        ) {
            let mut meter = RateMeter::default();
            let mut now = Instant::now();
            let mut sampled = 0u64;

            for gap in &gaps {
                now += ms(*gap);
                if let Some(sample) = meter.record_frame(now) {
                    prop_assert!(sample >= 1);
                    sampled += u64::from(sample);
                }
            }

            // The opening frame is the only one never counted
            prop_assert_eq!(sampled + u64::from(meter.pending()), gaps.len() as u64 - 1);
        }

        #[test]
        fn no_sample_before_window_elapses(count in 1usize..100, step in 0u64..10) {
            let mut meter = RateMeter::default();
            let start = Instant::now();

            for i in 0..count {
                let offset = (i as u64 * step).min(999);
                prop_assert_eq!(meter.record_frame(start + ms(offset)), None);
            }
        }
    }
}
