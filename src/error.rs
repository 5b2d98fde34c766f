//! Error types for queue operations.

use std::error::Error;
use std::fmt;
use thiserror::Error as ThisError;

/// Error returned by `try_enqueue` when the ring has no free slot and growing
/// is not allowed.
///
/// Carries the rejected element back to the caller. This is an expected
/// condition, not a failure of the queue.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FullError<T>(pub T);

impl<T> FullError<T> {
    /// Consumes the error, returning the element that could not be enqueued.
    #[inline]
    pub fn into_inner(self) -> T {
        self.0
    }
}

// Manual impls: the payload is generic and must not be required to be
// Display'able for the error to format.
impl<T> fmt::Debug for FullError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FullError(..)")
    }
}

impl<T> fmt::Display for FullError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("queue is full")
    }
}

impl<T> Error for FullError<T> {}

/// Error returned by [`wait_dequeue_timed`] when the timeout elapses before an
/// element becomes available.
///
/// [`wait_dequeue_timed`]: crate::BlockingConsumer::wait_dequeue_timed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
#[error("timed out waiting for an element")]
pub struct WaitTimeoutError;
