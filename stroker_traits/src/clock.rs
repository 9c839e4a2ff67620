use std::thread;
use std::time::{Duration, Instant};

/// Monotonic clock abstraction used by the tick loop.
///
/// - now(): monotonic Instant
/// - sleep_until(): block until the deadline (implementations may simulate)
/// - ms_since(): elapsed milliseconds from an epoch Instant
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep_until(&self, deadline: Instant);

    /// Milliseconds elapsed since `epoch`, saturating at 0 on underflow.
    fn ms_since(&self, epoch: Instant) -> u64 {
        let dur = self.now().saturating_duration_since(epoch);
        u64::try_from(dur.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Real-time monotonic clock backed by `std::time::Instant`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep_until(&self, deadline: Instant) {
        let now = Instant::now();
        if deadline <= now {
            return;
        }
        thread::sleep(deadline - now);
    }
}

/// Deterministic clock whose time only moves when told to.
///
/// now() = origin + offset; sleep_until(d) jumps straight to `d`.
#[derive(Debug, Clone)]
pub struct TestClock {
    origin: Instant,
    offset: std::sync::Arc<std::sync::Mutex<Duration>>,
}

impl Default for TestClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TestClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: std::sync::Arc::new(std::sync::Mutex::new(Duration::ZERO)),
        }
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, d: Duration) {
        if let Ok(mut off) = self.offset.lock() {
            *off = off.saturating_add(d);
        }
    }
}

impl Clock for TestClock {
    fn now(&self) -> Instant {
        let off = self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO);
        self.origin + off
    }

    fn sleep_until(&self, deadline: Instant) {
        let target = deadline.saturating_duration_since(self.origin);
        if let Ok(mut off) = self.offset.lock()
            && target > *off
        {
            *off = target;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_jumps_to_deadline() {
        let clock = TestClock::new();
        let start = clock.now();
        clock.sleep_until(start + Duration::from_millis(10));
        assert_eq!(clock.ms_since(start), 10);
        // Deadlines in the past never move time backwards.
        clock.sleep_until(start);
        assert_eq!(clock.ms_since(start), 10);
    }

    #[test]
    fn advance_accumulates() {
        let clock = TestClock::new();
        let start = clock.now();
        clock.advance(Duration::from_millis(3));
        clock.advance(Duration::from_millis(4));
        assert_eq!(clock.ms_since(start), 7);
    }
}
