//! Blocking wrapper: the lock-free queue plus an "items available" semaphore.
//!
//! The producer signals the semaphore after every successful enqueue; the
//! consumer waits on it before dequeuing. A successful wait therefore
//! guarantees at least one element was enqueued, and the release fence inside
//! enqueue precedes the signal, so the element is visible by the time the
//! waiter runs. The post-wait dequeue loop still tolerates transient failure
//! by spinning with [`Backoff`] rather than assuming the first attempt wins.

use crate::backoff::Backoff;
use crate::config::Config;
use crate::error::{FullError, WaitTimeoutError};
use crate::metrics::MetricsSnapshot;
use crate::queue::{queue_with, Consumer, Producer};
use crate::semaphore::Semaphore;
use std::sync::Arc;
use std::time::Duration;

/// Creates a blocking queue able to hold `max_size` elements without
/// allocating again, returning its two endpoint handles.
///
/// # Example
///
/// ```
/// use std::thread;
///
/// let (mut tx, mut rx) = ringspsc::blocking_queue::<u32>(100);
///
/// let consumer = thread::spawn(move || {
///     assert_eq!(rx.wait_dequeue(), 42);
/// });
///
/// tx.enqueue(42);
/// consumer.join().unwrap();
/// ```
///
/// # Panics
///
/// Panics if `max_size` is 0.
pub fn blocking_queue<T>(max_size: usize) -> (BlockingProducer<T>, BlockingConsumer<T>) {
    blocking_queue_with(Config::with_capacity(max_size))
}

/// Creates a blocking queue from a full [`Config`].
pub fn blocking_queue_with<T>(config: Config) -> (BlockingProducer<T>, BlockingConsumer<T>) {
    let (tx, rx) = queue_with(config);
    let items = Arc::new(Semaphore::new(0));
    (
        BlockingProducer {
            inner: tx,
            items: Arc::clone(&items),
        },
        BlockingConsumer {
            inner: rx,
            items,
        },
    )
}

/// The enqueuing half of a blocking queue. Not `Clone`, like [`Producer`].
pub struct BlockingProducer<T> {
    inner: Producer<T>,
    items: Arc<Semaphore>,
}

impl<T> BlockingProducer<T> {
    /// Enqueues `element`, allocating if the ring is full, and wakes a
    /// waiting consumer.
    #[inline]
    pub fn enqueue(&mut self, element: T) {
        self.inner.enqueue(element);
        self.items.signal();
    }

    /// Enqueues `element` without allocating, waking a waiting consumer on
    /// success.
    #[inline]
    pub fn try_enqueue(&mut self, element: T) -> Result<(), FullError<T>> {
        self.inner.try_enqueue(element)?;
        self.items.signal();
        Ok(())
    }

    /// Approximate number of elements currently queued.
    #[inline]
    pub fn size_approx(&self) -> usize {
        self.inner.size_approx()
    }

    /// Snapshot of the operation counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics()
    }
}

/// The dequeuing half of a blocking queue. Not `Clone`, like [`Consumer`].
pub struct BlockingConsumer<T> {
    inner: Consumer<T>,
    items: Arc<Semaphore>,
}

impl<T> BlockingConsumer<T> {
    /// Blocks until an element is available, then dequeues it.
    pub fn wait_dequeue(&mut self) -> T {
        self.items.wait();
        self.dequeue_signalled()
    }

    /// Blocks until an element is available or `timeout` elapses.
    pub fn wait_dequeue_timed(&mut self, timeout: Duration) -> Result<T, WaitTimeoutError> {
        if !self.items.wait_timeout(timeout) {
            return Err(WaitTimeoutError);
        }
        Ok(self.dequeue_signalled())
    }

    /// Dequeues after a semaphore unit was acquired. The matching enqueue has
    /// already published its element, so only a transient visibility gap can
    /// make an attempt fail; spin it out.
    fn dequeue_signalled(&mut self) -> T {
        let mut backoff = Backoff::new();
        loop {
            if let Some(value) = self.inner.try_dequeue() {
                return value;
            }
            backoff.snooze();
        }
    }

    /// Dequeues the front element without blocking, or returns `None` if the
    /// queue is empty.
    pub fn try_dequeue(&mut self) -> Option<T> {
        if !self.items.try_wait() {
            return None;
        }
        match self.inner.try_dequeue() {
            Some(value) => Some(value),
            None => {
                // Element not visible yet; hand the unit back so the count
                // keeps matching the number of queued elements.
                self.items.signal();
                None
            }
        }
    }

    /// Dequeues and drops the front element without blocking. Returns false
    /// if the queue is empty.
    pub fn pop(&mut self) -> bool {
        if !self.items.try_wait() {
            return false;
        }
        if self.inner.pop() {
            true
        } else {
            self.items.signal();
            false
        }
    }

    /// Borrows the front element without dequeuing it. Does not touch the
    /// semaphore.
    #[inline]
    pub fn peek(&mut self) -> Option<&T> {
        self.inner.peek()
    }

    /// Approximate number of elements currently queued.
    #[inline]
    pub fn size_approx(&self) -> usize {
        self.inner.size_approx()
    }

    /// Snapshot of the operation counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics()
    }
}
