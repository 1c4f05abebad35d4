//! Minimum per-task duration.

use std::time::Duration;

use tokio::time::Instant;

/// Pads fast tasks so each one spans at least `min_duration`.
///
/// This bounds the wall-clock span of every task from below. It does not
/// coalesce calls, so it is not a debounce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Throttle {
    min_duration: Duration,
}

impl Throttle {
    /// Create a throttle with the given floor. A zero floor disables it.
    pub fn new(min_duration: Duration) -> Self {
        Self { min_duration }
    }

    /// The configured floor.
    pub fn min_duration(&self) -> Duration {
        self.min_duration
    }

    /// Whether the throttle ever waits.
    pub fn is_enabled(&self) -> bool {
        !self.min_duration.is_zero()
    }

    /// Extra time to wait after a task that ran from `started` to `finished`.
    pub fn remaining(&self, started: Instant, finished: Instant) -> Duration {
        if !self.is_enabled() {
            return Duration::ZERO;
        }
        let elapsed = finished.saturating_duration_since(started);
        self.min_duration.saturating_sub(elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_disabled_throttle_never_waits() {
        let throttle = Throttle::default();
        let start = Instant::now();

        assert!(!throttle.is_enabled());
        assert_eq!(throttle.remaining(start, start), Duration::ZERO);
    }

    #[test]
    fn test_fast_task_is_padded() {
        let throttle = Throttle::new(ms(100));
        let start = Instant::now();

        assert_eq!(throttle.remaining(start, start + ms(30)), ms(70));
    }

    #[test]
    fn test_slow_task_is_not_padded() {
        let throttle = Throttle::new(ms(100));
        let start = Instant::now();

        assert_eq!(throttle.remaining(start, start + ms(500)), Duration::ZERO);
        assert_eq!(throttle.remaining(start, start + ms(100)), Duration::ZERO);
    }

    #[test]
    fn test_clock_skew_saturates() {
        let throttle = Throttle::new(ms(100));
        let start = Instant::now() + ms(10);

        // finished before started: treated as zero elapsed
        assert_eq!(throttle.remaining(start, start - ms(10)), ms(100));
    }
}
