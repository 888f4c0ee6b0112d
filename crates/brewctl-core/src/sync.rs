//! Synchronization between the control loop and its owner
use std::time::{Duration, Instant};

use parking_lot::{const_mutex, Condvar, Mutex};

/// Request a control loop to stop
///
/// A condition variable with a sticky flag. Once raised the signal
/// stays raised until it is reset explicitly, i.e. a stop request
/// never gets lost even if the loop is busy when it arrives.
#[derive(Debug, Default)]
pub struct StopSignal {
    mutex: Mutex<bool>,
    condvar: Condvar,
}

impl StopSignal {
    pub const fn new() -> Self {
        Self {
            mutex: const_mutex(false),
            condvar: Condvar::new(),
        }
    }

    /// Raise the signal and wake up all waiting threads
    ///
    /// Returns `false` if the signal has already been raised before.
    pub fn raise(&self) -> bool {
        let mut guard = self.mutex.lock();
        if *guard {
            return false;
        }
        *guard = true;
        // Dropping the guard before notifying consumers might
        // cause spurious wakeups. These are handled appropriately.
        drop(guard);
        self.condvar.notify_all();
        true
    }

    pub fn is_raised(&self) -> bool {
        *self.mutex.lock()
    }

    pub fn reset(&self) {
        *self.mutex.lock() = false;
    }

    /// Wait until either the signal is raised or the deadline expired
    ///
    /// Returns `true` if the signal has been raised.
    pub fn wait_until(&self, deadline: Instant) -> bool {
        let mut guard = self.mutex.lock();
        // The loop is required to handle spurious wakeups
        while !*guard && !self.condvar.wait_until(&mut guard, deadline).timed_out() {}
        *guard
    }

    /// Wait until either the signal is raised or the timeout expired
    ///
    /// Returns `true` if the signal has been raised.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.wait_until(deadline),
            None => {
                let mut guard = self.mutex.lock();
                while !*guard {
                    self.condvar.wait(&mut guard);
                }
                true
            }
        }
    }
}
