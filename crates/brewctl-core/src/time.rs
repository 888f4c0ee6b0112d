//! Time sources
//!
//! The decision engine measures dwell times against a [`Clock`].
//! Production code uses the [`MonotonicClock`], tests and simulations
//! drive a [`ManualClock`] explicitly.
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::Mutex;

/// A monotonic source of time stamps
pub trait Clock {
    /// Read the current time stamp.
    fn now(&self) -> Instant;
}

impl<C> Clock for &C
where
    C: Clock + ?Sized,
{
    fn now(&self) -> Instant {
        (**self).now()
    }
}

impl<C> Clock for Arc<C>
where
    C: Clock + ?Sized,
{
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// The monotonic clock of the operating system
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only advances when told to
///
/// Clones share the same time, i.e. advancing one of them
/// advances all of them.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Arc<Mutex<Duration>>,
}

impl ManualClock {
    /// Start a new clock at the current instant
    pub fn new() -> Self {
        Self::with_origin(Instant::now())
    }

    pub fn with_origin(origin: Instant) -> Self {
        Self {
            origin,
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// The time stamp at which the clock has been started
    pub fn origin(&self) -> Instant {
        self.origin
    }

    /// The time that passed since the origin
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }

    /// Move the clock forward
    pub fn advance(&self, delta: Duration) {
        *self.elapsed.lock() += delta;
    }

    /// Move the clock to the given offset from its origin
    ///
    /// The clock never goes backwards. Requests for an earlier
    /// offset are ignored and return `false`.
    pub fn set_elapsed(&self, elapsed: Duration) -> bool {
        let mut guard = self.elapsed.lock();
        if elapsed < *guard {
            return false;
        }
        *guard = elapsed;
        true
    }

    /// Convenience wrapper of [`ManualClock::set_elapsed()`] for seconds
    pub fn set_elapsed_secs(&self, secs: f64) -> bool {
        self.set_elapsed(Duration::from_secs_f64(secs))
    }

    /// Map a time stamp of this clock to its offset from the origin
    pub fn offset_of(&self, ts: Instant) -> Duration {
        ts.saturating_duration_since(self.origin)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let shared = clock.clone();
        assert_eq!(clock.now(), clock.origin());
        shared.advance(Duration::from_secs(5));
        assert_eq!(clock.elapsed(), Duration::from_secs(5));
        assert_eq!(clock.offset_of(clock.now()), Duration::from_secs(5));
    }

    #[test]
    fn manual_clock_never_goes_backwards() {
        let clock = ManualClock::new();
        assert!(clock.set_elapsed_secs(10.0));
        assert!(!clock.set_elapsed_secs(9.0));
        assert_eq!(clock.elapsed(), Duration::from_secs(10));
    }

    #[test]
    fn monotonic_clock_does_not_decrease() {
        let clock = MonotonicClock;
        let before = clock.now();
        assert!(clock.now() >= before);
    }
}
