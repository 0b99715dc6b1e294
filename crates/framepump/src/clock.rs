//! Fixed-timestep frame clock.
//!
//! Hosts embedded in an engine already have a frame loop and just call
//! `Dispatcher::tick` from it. Standalone hosts (tools, bots, headless
//! clients) use [`FrameClock`] to get one: await
//! [`wait_for_frame`](FrameClock::wait_for_frame), tick, repeat.
//!
//! ```ignore
//! let mut clock = FrameClock::with_rate(60);
//! loop {
//!     clock.wait_for_frame().await;
//!     dispatcher.tick();
//! }
//! ```

use std::time::Duration;

use tokio::time::{self, Instant};

/// Information about a frame, returned by [`FrameClock::wait_for_frame`].
#[derive(Debug, Clone, Copy)]
pub struct FrameInfo {
    /// Monotonically increasing frame number (starts at 1).
    pub frame: u64,
    /// Fixed delta time for this frame (always `1 / rate`).
    pub dt: Duration,
    /// `true` if this frame fired late. Missed frames are skipped — the
    /// clock reschedules from now rather than bursting to catch up.
    pub overrun: bool,
}

/// Fixed-timestep frame scheduler for a client's dispatch loop.
pub struct FrameClock {
    period: Duration,
    next: Instant,
    frame: u64,
}

impl FrameClock {
    /// Maximum supported frame rate.
    pub const MAX_RATE_HZ: u32 = 240;

    /// Creates a clock firing `rate_hz` times per second.
    ///
    /// Out-of-range rates are clamped to `1..=MAX_RATE_HZ`.
    pub fn with_rate(rate_hz: u32) -> Self {
        let rate_hz = if rate_hz == 0 {
            tracing::warn!("frame rate of 0 would never fire — clamping to 1");
            1
        } else if rate_hz > Self::MAX_RATE_HZ {
            tracing::warn!(
                rate = rate_hz,
                max = Self::MAX_RATE_HZ,
                "frame rate exceeds maximum — clamping"
            );
            Self::MAX_RATE_HZ
        } else {
            rate_hz
        };

        let period = Duration::from_secs_f64(1.0 / f64::from(rate_hz));
        Self {
            period,
            next: Instant::now() + period,
            frame: 0,
        }
    }

    /// Waits until the next frame is due. Returns [`FrameInfo`] for it.
    pub async fn wait_for_frame(&mut self) -> FrameInfo {
        time::sleep_until(self.next).await;

        let now = Instant::now();
        self.frame += 1;

        let late_by = now.saturating_duration_since(self.next);
        let overrun = late_by > self.period / 10; // >10% late = overrun
        if overrun {
            tracing::trace!(
                frame = self.frame,
                late_ms = late_by.as_secs_f64() * 1000.0,
                "frame overrun — skipping ahead"
            );
        }

        // Skip policy: after an overrun, schedule from now instead of the
        // missed deadline so a long stall doesn't cause a frame burst.
        self.next = if overrun {
            now + self.period
        } else {
            self.next + self.period
        };

        FrameInfo {
            frame: self.frame,
            dt: self.period,
            overrun,
        }
    }

    /// Frames fired so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// The fixed frame period.
    pub fn period(&self) -> Duration {
        self.period
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_frame_counts_frames_at_fixed_dt() {
        let mut clock = FrameClock::with_rate(50);

        for expected in 1..=3u64 {
            let info = clock.wait_for_frame().await;
            assert_eq!(info.frame, expected);
            assert_eq!(info.dt, Duration::from_millis(20));
            assert!(!info.overrun);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_frame_detects_overrun_and_skips_ahead() {
        let mut clock = FrameClock::with_rate(100);
        clock.wait_for_frame().await;

        // Stall well past the next deadline.
        time::advance(Duration::from_millis(35)).await;

        let info = clock.wait_for_frame().await;
        assert!(info.overrun);

        // After the skip, the cadence is back to normal.
        let info = clock.wait_for_frame().await;
        assert!(!info.overrun);
    }

    #[test]
    fn test_with_rate_clamps_out_of_range_rates() {
        assert_eq!(FrameClock::with_rate(0).period(), Duration::from_secs(1));
        assert_eq!(
            FrameClock::with_rate(100_000).period(),
            Duration::from_secs_f64(1.0 / f64::from(FrameClock::MAX_RATE_HZ)),
        );
    }
}
