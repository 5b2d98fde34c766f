use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe operation counters.
///
/// Uses atomic counters with `Relaxed` ordering since these are purely
/// statistical - no control flow depends on exact values, and eventual
/// visibility is acceptable for observability.
#[derive(Debug, Default)]
pub struct Metrics {
    enqueued: AtomicU64,
    dequeued: AtomicU64,
    full_rejections: AtomicU64,
    empty_polls: AtomicU64,
    blocks_grown: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a successfully enqueued element.
    #[inline]
    pub fn add_enqueued(&self, n: u64) {
        self.enqueued.fetch_add(n, Ordering::Relaxed);
    }

    /// Count a successfully dequeued element.
    #[inline]
    pub fn add_dequeued(&self, n: u64) {
        self.dequeued.fetch_add(n, Ordering::Relaxed);
    }

    /// Count a `try_enqueue` that found no free slot.
    #[inline]
    pub fn add_full_rejection(&self) {
        self.full_rejections.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a dequeue attempt that found the queue empty.
    #[inline]
    pub fn add_empty_poll(&self) {
        self.empty_polls.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a growth allocation (a new block spliced into the ring).
    #[inline]
    pub fn add_block_grown(&self) {
        self.blocks_grown.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a snapshot of current counter values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dequeued: self.dequeued.load(Ordering::Relaxed),
            full_rejections: self.full_rejections.load(Ordering::Relaxed),
            empty_polls: self.empty_polls.load(Ordering::Relaxed),
            blocks_grown: self.blocks_grown.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of metrics values.
///
/// Plain data struct (Copy, Clone) for easy use in aggregation and display.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub enqueued: u64,
    pub dequeued: u64,
    pub full_rejections: u64,
    pub empty_polls: u64,
    pub blocks_grown: u64,
}
