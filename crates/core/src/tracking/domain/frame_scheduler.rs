use std::thread;
use std::time::Duration;

/// Decides which frames get full tracking and paces processed frames to a
/// target rate.
///
/// Frame counters are 0-based. Until a frame has been processed there is no
/// "last processed" index and the frame is always processed, so with an
/// interval of `k` the processed frames are `0, k, 2k, ...`.
#[derive(Clone, Debug)]
pub struct FrameScheduler {
    skip_interval: u64,
    target_frame_interval: Duration,
    throttle_enabled: bool,
}

impl FrameScheduler {
    pub fn new(skip_interval: usize, target_frame_interval: Duration, throttle_enabled: bool) -> Self {
        Self {
            skip_interval: skip_interval.max(1) as u64,
            target_frame_interval,
            throttle_enabled,
        }
    }

    /// True iff `frame_counter - last_processed >= skip_interval`.
    pub fn should_process(frame_counter: u64, last_processed: Option<u64>, skip_interval: u64) -> bool {
        match last_processed {
            None => true,
            Some(last) => frame_counter.saturating_sub(last) >= skip_interval.max(1),
        }
    }

    pub fn decide(&self, frame_counter: u64, last_processed: Option<u64>) -> bool {
        Self::should_process(frame_counter, last_processed, self.skip_interval)
    }

    /// Time left in the frame budget, or `None` when processing already
    /// took at least the target interval.
    pub fn pacing_delay(elapsed: Duration, target_frame_interval: Duration) -> Option<Duration> {
        target_frame_interval
            .checked_sub(elapsed)
            .filter(|d| !d.is_zero())
    }

    /// Blocks the calling thread for the remainder of the frame budget.
    ///
    /// Returns how long it slept; zero when throttling is disabled.
    pub fn throttle(&self, elapsed: Duration) -> Duration {
        if !self.throttle_enabled {
            return Duration::ZERO;
        }
        match Self::pacing_delay(elapsed, self.target_frame_interval) {
            Some(delay) => {
                thread::sleep(delay);
                delay
            }
            None => Duration::ZERO,
        }
    }

    pub fn skip_interval(&self) -> u64 {
        self.skip_interval
    }
}
