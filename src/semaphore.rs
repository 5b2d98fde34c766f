//! Counting semaphore used by the blocking wrapper.
//!
//! Built on `Mutex` + `Condvar` so it is portable and correct under spurious
//! wakeups. The count tracks "items available"; the producer signals it after
//! every successful enqueue and the consumer waits on it before dequeuing.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub(crate) struct Semaphore {
    count: Mutex<usize>,
    available: Condvar,
}

impl Semaphore {
    pub(crate) fn new(initial: usize) -> Self {
        Self {
            count: Mutex::new(initial),
            available: Condvar::new(),
        }
    }

    // A poisoned mutex only means a consumer panicked mid-wait; the count
    // itself is always consistent, so keep going with the inner guard.
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.count.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Increments the count and wakes one waiter.
    pub(crate) fn signal(&self) {
        let mut count = self.lock();
        *count += 1;
        drop(count);
        self.available.notify_one();
    }

    /// Decrements the count without blocking. Returns false if it was zero.
    pub(crate) fn try_wait(&self) -> bool {
        let mut count = self.lock();
        if *count > 0 {
            *count -= 1;
            true
        } else {
            false
        }
    }

    /// Blocks until the count is nonzero, then decrements it.
    pub(crate) fn wait(&self) {
        let mut count = self.lock();
        while *count == 0 {
            count = self
                .available
                .wait(count)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *count -= 1;
    }

    /// Blocks until the count is nonzero or `timeout` elapses. Returns true
    /// if a unit was acquired.
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> bool {
        let count = self.lock();
        let (mut count, _result) = self
            .available
            .wait_timeout_while(count, timeout, |count| *count == 0)
            .unwrap_or_else(PoisonError::into_inner);
        if *count > 0 {
            *count -= 1;
            true
        } else {
            false
        }
    }
}
