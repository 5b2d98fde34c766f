//! ringspsc - Lock-Free Single-Producer Single-Consumer Queue
//!
//! A FIFO queue for exactly one enqueuing thread and one dequeuing thread,
//! built as a circular linked list of fixed-size ring-buffer blocks. The
//! common path is wait-free; when the ring fills up, the producer splices in
//! a new block of twice the previous size, so allocation happens O(log n)
//! times over n enqueues and never once if the initial capacity is not
//! exceeded. Blocks are never removed.
//!
//! # Key Features
//!
//! - Fence-ordered protocol over relaxed atomics (no CAS on the hot path)
//! - 128-byte alignment of producer-owned and consumer-owned fields
//! - Growable without ever moving or freeing live storage
//! - Blocking variant with semaphore-backed `wait_dequeue` / timed wait
//!
//! # Example
//!
//! ```
//! use std::thread;
//!
//! let (mut tx, mut rx) = ringspsc::queue::<u64>(100);
//!
//! let producer = thread::spawn(move || {
//!     for i in 0..1000 {
//!         tx.enqueue(i);
//!     }
//! });
//!
//! let mut received = 0;
//! while received < 1000 {
//!     if let Some(value) = rx.try_dequeue() {
//!         assert_eq!(value, received);
//!         received += 1;
//!     }
//! }
//! producer.join().unwrap();
//! ```
//!
//! The handles are the two roles: `Producer` enqueues, `Consumer` dequeues,
//! and neither is `Clone`. Using both from one thread is fine, though a bit
//! silly.

mod backoff;
mod block;
mod blocking;
mod config;
mod error;
mod invariants;
mod metrics;
mod queue;
mod semaphore;

pub use backoff::Backoff;
pub use blocking::{blocking_queue, blocking_queue_with, BlockingConsumer, BlockingProducer};
pub use config::Config;
pub use error::{FullError, WaitTimeoutError};
pub use metrics::{Metrics, MetricsSnapshot};
pub use queue::{queue, queue_with, Consumer, Producer};
