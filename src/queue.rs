//! The lock-free queue core and its producer/consumer handles.
//!
//! # Memory ordering and synchronization strategy
//!
//! The queue is a circular singly-linked list of [`Block`]s. Every shared
//! variable is loaded and stored with `Relaxed` ordering; ordering between
//! independent locations is established exclusively by explicit fences. The
//! protocol is wait-free on the common path and lock-free everywhere (the
//! only wait is inside the allocator when the ring grows).
//!
//! ## Single-writer discipline
//!
//! The producer exclusively writes `tail_block`, `largest_block_size`, every
//! block's `tail` and `next`, and constructs elements. The consumer
//! exclusively writes `front_block` and every block's `front`, and destroys
//! elements. Both sides read the other's variables, knowing they only ever
//! move forward.
//!
//! ## Producer (enqueue)
//!
//! 1. Load our `tail_block`, then its `front` (consumer's) and `tail` (ours).
//! 2. Acquire fence, so the consumer's `front` is ordered before anything we
//!    read after it.
//! 3. Room in the block: write the element, release fence, store the new
//!    `tail`. The release fence publishes the element before the index store
//!    that exposes it.
//! 4. Block full, drained block ahead: write into that block, bump its
//!    `tail`, release fence, store `tail_block`. The element is visible by
//!    the time the consumer can observe the advanced tail block.
//! 5. Block full, front block ahead: allocate a block of twice the last
//!    size, write the element and wire `next` before touching the ring, then
//!    splice and publish with a release fence.
//!
//! ## Consumer (dequeue)
//!
//! 1. Snapshot `tail_block` FIRST, then acquire fence. If emptiness were
//!    checked before sampling the tail block, the producer could fill the
//!    current block and advance `tail_block` in between; a stale "am I at the
//!    tail block" check would then report empty and skip a filled block.
//!    Sampling first closes the race: either the snapshot already shows the
//!    advance (so we walk forward), or emptiness at that instant was real.
//! 2. Load `front_block`, its `front` (ours) and `tail` (producer's),
//!    acquire fence.
//! 3. Block nonempty: move the element out, release fence, store the new
//!    `front`. The release fence orders the destructive read before the index
//!    store that lets the producer reuse the slot.
//! 4. Block empty but we are not at the snapshot: the block ahead must hold
//!    elements (published tail blocks are only advanced after being written
//!    to). Release our last `front` store, advance `front_block`, dequeue
//!    from the block ahead.

use crate::block::{Block, CacheAligned};
use crate::config::Config;
use crate::error::FullError;
use crate::invariants::{debug_assert_block_drained, debug_assert_block_occupied};
use crate::metrics::{Metrics, MetricsSnapshot};
use std::cell::Cell;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::sync::atomic::{compiler_fence, fence, AtomicPtr, Ordering};
use std::sync::Arc;

/// Creates a queue able to hold `max_size` elements without allocating again,
/// returning its two endpoint handles.
///
/// The backing block is rounded up to the next power of two internally.
/// Additional capacity is allocated on demand by [`Producer::enqueue`].
///
/// # Example
///
/// ```
/// let (mut tx, mut rx) = ringspsc::queue::<u32>(100);
///
/// tx.enqueue(1);
/// assert_eq!(rx.try_dequeue(), Some(1));
/// assert_eq!(rx.try_dequeue(), None);
/// ```
///
/// # Panics
///
/// Panics if `max_size` is 0.
pub fn queue<T>(max_size: usize) -> (Producer<T>, Consumer<T>) {
    queue_with(Config::with_capacity(max_size))
}

/// Creates a queue from a full [`Config`], returning its two endpoint
/// handles.
pub fn queue_with<T>(config: Config) -> (Producer<T>, Consumer<T>) {
    let inner = Arc::new(Inner::new(config));
    (
        Producer {
            inner: Arc::clone(&inner),
        },
        Consumer { inner },
    )
}

/// Shared queue state. Owned jointly by the two handles through an `Arc`;
/// the last handle dropped destroys residual elements and frees the ring.
pub(crate) struct Inner<T> {
    /// Block elements are dequeued from. Written by the consumer only.
    front_block: CacheAligned<AtomicPtr<Block<T>>>,

    /// Block elements are enqueued to. Written by the producer only.
    tail_block: CacheAligned<AtomicPtr<Block<T>>>,

    /// Size of the most recently allocated block; doubles on each growth.
    /// Producer-private, kept off the shared cache lines.
    largest_block_size: CacheAligned<Cell<usize>>,

    config: Config,
    metrics: Metrics,

    /// In-section flags for the debug reentrancy check. Each is touched by
    /// exactly one role's thread, so plain cells are enough.
    #[cfg(debug_assertions)]
    enqueuing: Cell<bool>,
    #[cfg(debug_assertions)]
    dequeuing: Cell<bool>,

    _owns: PhantomData<T>,
}

// Safety: Inner is shared by exactly one Producer and one Consumer, and every
// field has a single writing role (see the module docs). The Cell fields are
// each confined to one role's thread. Elements are Send, and the protocol's
// fences order every cross-thread hand-off.
unsafe impl<T: Send> Send for Inner<T> {}
unsafe impl<T: Send> Sync for Inner<T> {}

impl<T> Inner<T> {
    fn new(config: Config) -> Self {
        // One spare slot so a block of this size holds `initial_capacity`
        // elements while keeping front == tail meaning empty.
        let size = (config.initial_capacity + 1).next_power_of_two();

        let first = Block::<T>::allocate(size);
        unsafe {
            (*first).next.store(first, Ordering::Relaxed);
        }

        let inner = Self {
            front_block: CacheAligned::new(AtomicPtr::new(first)),
            tail_block: CacheAligned::new(AtomicPtr::new(first)),
            largest_block_size: CacheAligned::new(Cell::new(size)),
            config,
            metrics: Metrics::new(),
            #[cfg(debug_assertions)]
            enqueuing: Cell::new(false),
            #[cfg(debug_assertions)]
            dequeuing: Cell::new(false),
            _owns: PhantomData,
        };

        // Full barrier so whichever threads first use the endpoints observe
        // the fully initialized ring.
        fence(Ordering::SeqCst);
        inner
    }

    fn enqueue_inner(&self, element: T, can_alloc: bool) -> Result<(), FullError<T>> {
        #[cfg(debug_assertions)]
        let _guard = ReentrantGuard::enter(&self.enqueuing, "enqueue");

        let tail_ptr = self.tail_block.load(Ordering::Relaxed);
        let tail_block = unsafe { &*tail_ptr };

        let block_front = tail_block.front.load(Ordering::Relaxed);
        let block_tail = tail_block.tail.load(Ordering::Relaxed);
        fence(Ordering::Acquire);

        let next_tail = (block_tail + 1) & tail_block.mask;
        if next_tail != block_front {
            // Room for at least one more element in the current block.
            unsafe { tail_block.write_slot(block_tail, element) };

            fence(Ordering::Release);
            tail_block.tail.store(next_tail, Ordering::Relaxed);
        } else if tail_block.next.load(Ordering::Relaxed) != self.front_block.load(Ordering::Relaxed)
        {
            // Current block is full, but the block ahead has been drained by
            // the consumer; advance into it. We cannot skip ahead to the
            // front block itself even when it looks drained: the consumer
            // only leaves a block after emptying it, and if we wrote fresh
            // elements there it would keep consuming them in place and never
            // advance to the blocks holding older elements.
            fence(Ordering::Acquire); // freshest front/tail of the block ahead

            let ahead_ptr = tail_block.next.load(Ordering::Relaxed);
            let ahead_block = unsafe { &*ahead_ptr };
            let ahead_front = ahead_block.front.load(Ordering::Relaxed);
            let ahead_tail = ahead_block.tail.load(Ordering::Relaxed);
            fence(Ordering::Acquire);
            debug_assert_block_drained!(ahead_front, ahead_tail);

            unsafe { ahead_block.write_slot(ahead_tail, element) };
            // Plain store: the consumer cannot look at this block before the
            // tail-block publication below.
            ahead_block
                .tail
                .store((ahead_tail + 1) & ahead_block.mask, Ordering::Relaxed);

            fence(Ordering::Release);
            self.tail_block.store(ahead_ptr, Ordering::Relaxed);
        } else if can_alloc {
            // Full ring: allocate a block of twice the last size. The element
            // is written and the block fully wired before the ring can see
            // any of it, so an allocator abort leaves the queue intact.
            let new_size = self.largest_block_size.get() * 2;
            self.largest_block_size.set(new_size);

            let new_ptr = Block::<T>::allocate(new_size);
            let new_block = unsafe { &*new_ptr };
            unsafe { new_block.write_slot(0, element) };
            new_block.tail.store(1, Ordering::Relaxed);

            new_block
                .next
                .store(tail_block.next.load(Ordering::Relaxed), Ordering::Relaxed);
            tail_block.next.store(new_ptr, Ordering::Relaxed);

            // The consumer may observe the new `next` before the new tail
            // block, which is harmless: it never advances past the published
            // tail block.
            fence(Ordering::Release);
            self.tail_block.store(new_ptr, Ordering::Relaxed);

            if self.config.enable_metrics {
                self.metrics.add_block_grown();
            }
        } else {
            if self.config.enable_metrics {
                self.metrics.add_full_rejection();
            }
            return Err(FullError(element));
        }

        if self.config.enable_metrics {
            self.metrics.add_enqueued(1);
        }
        Ok(())
    }

    fn try_dequeue_inner(&self) -> Option<T> {
        #[cfg(debug_assertions)]
        let _guard = ReentrantGuard::enter(&self.dequeuing, "dequeue");

        // The tail block must be sampled before the emptiness check below;
        // see the module docs for the race this closes.
        let tail_at_start = self.tail_block.load(Ordering::Relaxed);
        fence(Ordering::Acquire);

        let front_ptr = self.front_block.load(Ordering::Relaxed);
        let front_block = unsafe { &*front_ptr };
        let block_front = front_block.front.load(Ordering::Relaxed);
        let block_tail = front_block.tail.load(Ordering::Relaxed);
        fence(Ordering::Acquire);

        if block_front != block_tail {
            // Front block not empty, dequeue from here.
            let value = unsafe { front_block.read_slot(block_front) };

            fence(Ordering::Release);
            front_block
                .front
                .store((block_front + 1) & front_block.mask, Ordering::Relaxed);

            if self.config.enable_metrics {
                self.metrics.add_dequeued(1);
            }
            Some(value)
        } else if front_ptr != tail_at_start {
            // Front block is empty but another block is ahead; advance to it.
            // No acquire is needed for `next` itself: it is only ever written
            // on the tail block, we are not at the tail block, and the
            // acquire after the tail snapshot freshened it in case we
            // recently were.
            let next_ptr = front_block.next.load(Ordering::Relaxed);
            let next_block = unsafe { &*next_ptr };

            let next_front = next_block.front.load(Ordering::Relaxed);
            let next_tail = next_block.tail.load(Ordering::Relaxed);
            fence(Ordering::Acquire);
            // The tail block is only advanced after being written to, so
            // there is an element here for sure.
            debug_assert_block_occupied!(next_front, next_tail);

            // Done with the drained block; expose the pending `front` store
            // from our last dequeue before the producer can reuse it.
            fence(Ordering::Release);
            self.front_block.store(next_ptr, Ordering::Relaxed);

            compiler_fence(Ordering::Release); // not strictly needed

            let value = unsafe { next_block.read_slot(next_front) };

            fence(Ordering::Release);
            next_block
                .front
                .store((next_front + 1) & next_block.mask, Ordering::Relaxed);

            if self.config.enable_metrics {
                self.metrics.add_dequeued(1);
            }
            Some(value)
        } else {
            // No elements in the current block and no block to advance to.
            if self.config.enable_metrics {
                self.metrics.add_empty_poll();
            }
            None
        }
    }

    /// Dequeue steps 1-2 without moving the element; advances `front_block`
    /// past a drained block just like a dequeue would.
    fn peek_inner(&self) -> Option<NonNull<T>> {
        #[cfg(debug_assertions)]
        let _guard = ReentrantGuard::enter(&self.dequeuing, "peek");

        let tail_at_start = self.tail_block.load(Ordering::Relaxed);
        fence(Ordering::Acquire);

        let front_ptr = self.front_block.load(Ordering::Relaxed);
        let front_block = unsafe { &*front_ptr };
        let block_front = front_block.front.load(Ordering::Relaxed);
        let block_tail = front_block.tail.load(Ordering::Relaxed);
        fence(Ordering::Acquire);

        if block_front != block_tail {
            NonNull::new(unsafe { front_block.slot_ptr(block_front) })
        } else if front_ptr != tail_at_start {
            let next_ptr = front_block.next.load(Ordering::Relaxed);
            let next_block = unsafe { &*next_ptr };

            let next_front = next_block.front.load(Ordering::Relaxed);
            let next_tail = next_block.tail.load(Ordering::Relaxed);
            fence(Ordering::Acquire);
            debug_assert_block_occupied!(next_front, next_tail);

            fence(Ordering::Release);
            self.front_block.store(next_ptr, Ordering::Relaxed);

            NonNull::new(unsafe { next_block.slot_ptr(next_front) })
        } else {
            None
        }
    }

    fn pop_inner(&self) -> bool {
        #[cfg(debug_assertions)]
        let _guard = ReentrantGuard::enter(&self.dequeuing, "pop");

        let tail_at_start = self.tail_block.load(Ordering::Relaxed);
        fence(Ordering::Acquire);

        let front_ptr = self.front_block.load(Ordering::Relaxed);
        let front_block = unsafe { &*front_ptr };
        let block_front = front_block.front.load(Ordering::Relaxed);
        let block_tail = front_block.tail.load(Ordering::Relaxed);
        fence(Ordering::Acquire);

        if block_front != block_tail {
            unsafe { front_block.drop_slot(block_front) };

            fence(Ordering::Release);
            front_block
                .front
                .store((block_front + 1) & front_block.mask, Ordering::Relaxed);
        } else if front_ptr != tail_at_start {
            let next_ptr = front_block.next.load(Ordering::Relaxed);
            let next_block = unsafe { &*next_ptr };

            let next_front = next_block.front.load(Ordering::Relaxed);
            let next_tail = next_block.tail.load(Ordering::Relaxed);
            fence(Ordering::Acquire);
            debug_assert_block_occupied!(next_front, next_tail);

            fence(Ordering::Release);
            self.front_block.store(next_ptr, Ordering::Relaxed);

            compiler_fence(Ordering::Release);

            unsafe { next_block.drop_slot(next_front) };

            fence(Ordering::Release);
            next_block
                .front
                .store((next_front + 1) & next_block.mask, Ordering::Relaxed);
        } else {
            if self.config.enable_metrics {
                self.metrics.add_empty_poll();
            }
            return false;
        }

        if self.config.enable_metrics {
            self.metrics.add_dequeued(1);
        }
        true
    }

    fn size_approx_inner(&self) -> usize {
        let tail_at_start = self.tail_block.load(Ordering::Relaxed);
        let mut block_ptr = self.front_block.load(Ordering::Relaxed);

        // Walk the ring from the front block until the sampled tail block has
        // been summed. The ring is a cycle and blocks are never removed, so
        // the snapshot stays reachable even while the producer splices.
        let mut result = 0;
        loop {
            fence(Ordering::Acquire);
            let block = unsafe { &*block_ptr };
            let block_tail = block.tail.load(Ordering::Relaxed);
            let block_front = block.front.load(Ordering::Relaxed);
            result += block_tail.wrapping_sub(block_front) & block.mask;

            if block_ptr == tail_at_start {
                break;
            }
            block_ptr = block.next.load(Ordering::Relaxed);
        }
        result
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        if self.config.enable_metrics {
            self.metrics.snapshot()
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        // Get the latest version of every index and pointer from other CPUs.
        fence(Ordering::SeqCst);

        // Residual elements live in front_block..tail_block in ring order, so
        // walking from the front block destroys them in enqueue order. The
        // walk continues all the way around the cycle so the drained slack
        // blocks sitting behind the front block are freed too.
        let start = self.front_block.load(Ordering::Relaxed);
        let mut block_ptr = start;
        loop {
            let next_ptr;
            {
                let block = unsafe { &*block_ptr };
                next_ptr = block.next.load(Ordering::Relaxed);

                let block_tail = block.tail.load(Ordering::Relaxed);
                let mut idx = block.front.load(Ordering::Relaxed);
                while idx != block_tail {
                    unsafe { block.drop_slot(idx) };
                    idx = (idx + 1) & block.mask;
                }
            }
            unsafe { drop(Box::from_raw(block_ptr)) };

            block_ptr = next_ptr;
            if block_ptr == start {
                break;
            }
        }
    }
}

/// Sets an in-section flag for the duration of an operation and panics if it
/// was already set, which means the operation was re-entered from an element
/// constructor or destructor running inside the queue. Debug builds only.
#[cfg(debug_assertions)]
struct ReentrantGuard<'a> {
    flag: &'a Cell<bool>,
}

#[cfg(debug_assertions)]
impl<'a> ReentrantGuard<'a> {
    fn enter(flag: &'a Cell<bool>, op: &str) -> Self {
        assert!(
            !flag.get(),
            "re-entered {op} from an element constructor or destructor on the same queue"
        );
        flag.set(true);
        Self { flag }
    }
}

#[cfg(debug_assertions)]
impl Drop for ReentrantGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

/// The enqueuing half of the queue.
///
/// Exactly one exists per queue and it is deliberately not `Clone`: a second
/// producer would break the single-writer invariant that makes the protocol
/// lock-free. Move it to another thread to transfer the producer role (the
/// move is the external synchronization the transfer requires).
pub struct Producer<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Producer<T> {
    /// Enqueues `element`, allocating an additional block if the ring is
    /// full.
    ///
    /// Wait-free unless it grows; growth doubles the block size each time, so
    /// allocation happens O(log n) times over n enqueues. If the allocator
    /// fails the process aborts.
    #[inline]
    pub fn enqueue(&mut self, element: T) {
        // The growth path always makes room, so this cannot report full.
        let result = self.inner.enqueue_inner(element, true);
        debug_assert!(result.is_ok());
    }

    /// Enqueues `element` if there is room in the ring, without allocating.
    ///
    /// On failure the element is handed back inside [`FullError`].
    #[inline]
    pub fn try_enqueue(&mut self, element: T) -> Result<(), FullError<T>> {
        self.inner.enqueue_inner(element, false)
    }

    /// Approximate number of elements currently queued. See
    /// [`Consumer::size_approx`].
    #[inline]
    pub fn size_approx(&self) -> usize {
        self.inner.size_approx_inner()
    }

    /// Snapshot of the operation counters. All zeros unless
    /// [`Config::enable_metrics`] was set.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics_snapshot()
    }
}

/// The dequeuing half of the queue.
///
/// Exactly one exists per queue; like [`Producer`] it is deliberately not
/// `Clone`, and moving it between threads is the only supported role
/// transfer.
pub struct Consumer<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Consumer<T> {
    /// Dequeues the element at the front of the queue, or returns `None` if
    /// the queue was empty at some instant during the call.
    #[inline]
    pub fn try_dequeue(&mut self) -> Option<T> {
        self.inner.try_dequeue_inner()
    }

    /// Borrows the element at the front of the queue without dequeuing it.
    ///
    /// While the returned borrow is alive no other consumer operation can
    /// run, so the next [`try_dequeue`](Self::try_dequeue) returns exactly
    /// the element that was peeked.
    #[inline]
    pub fn peek(&mut self) -> Option<&T> {
        // Safety: the pointer targets the slot at the consumer position. The
        // producer never writes a live slot, and the &mut borrow on self
        // keeps the consumer from retiring it while the reference is out.
        self.inner.peek_inner().map(|p| unsafe { &*p.as_ptr() })
    }

    /// Dequeues and drops the front element. Returns false if the queue was
    /// empty.
    #[inline]
    pub fn pop(&mut self) -> bool {
        self.inner.pop_inner()
    }

    /// Approximate number of elements currently queued.
    ///
    /// The per-block indices are read without mutual consistency, so the
    /// result is only guaranteed to lie between 0 and the true size at some
    /// moment during the call. Exact when both threads are quiescent.
    #[inline]
    pub fn size_approx(&self) -> usize {
        self.inner.size_approx_inner()
    }

    /// Snapshot of the operation counters. All zeros unless
    /// [`Config::enable_metrics`] was set.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics_snapshot()
    }
}
