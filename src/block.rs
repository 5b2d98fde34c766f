//! Fixed-capacity circular buffer blocks, the unit of allocation.
//!
//! A `Block<T>` is one circular buffer in the queue's ring of blocks. Its
//! `front` index is written only by the consumer, its `tail` index and `next`
//! pointer only by the producer; each of the three lives on its own cache
//! line so the two sides never write-share a line.
//!
//! One slot per block is always wasted: a block is full when
//! `(tail + 1) & mask == front`, which keeps `front == tail` unambiguously
//! meaning empty.

use crate::invariants::{debug_assert_pow2_size, debug_assert_slot_in_bounds};
use std::mem::MaybeUninit;
use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicUsize};

/// One fixed circular buffer in the ring.
///
/// Slot storage is a separate heap allocation held as a raw pointer so the
/// producer and consumer can touch disjoint slots concurrently without either
/// side materializing a reference to the whole buffer.
#[repr(C)]
pub(crate) struct Block<T> {
    // === CONSUMER HOT === (own cache line)
    /// Index of the next slot to read. Written by the consumer only.
    pub(crate) front: CacheAligned<AtomicUsize>,

    // === PRODUCER HOT === (own cache line)
    /// Index of the next slot to write. Written by the producer only.
    pub(crate) tail: CacheAligned<AtomicUsize>,

    /// Next block in the ring. Written by the producer only. Not very
    /// contended, but kept off `tail`'s cache line, which is.
    pub(crate) next: CacheAligned<AtomicPtr<Block<T>>>,

    // === COLD ===
    /// Slot storage, `size` slots, naturally aligned for `T`. Released from a
    /// `Box<[MaybeUninit<T>]>` at construction and reboxed in `Drop`.
    data: *mut MaybeUninit<T>,
    /// Slot count. Power of two, immutable after construction.
    pub(crate) size: usize,
    /// `size - 1`, for index wrapping.
    pub(crate) mask: usize,
}

impl<T> Block<T> {
    /// Heap-allocates a block of `size` slots with `front = tail = 0` and a
    /// null `next`.
    ///
    /// The caller owns the returned pointer and frees it with
    /// `Box::from_raw` (the queue does this when it is dropped).
    pub(crate) fn allocate(size: usize) -> *mut Block<T> {
        debug_assert_pow2_size!(size);

        // Stable Rust: allocate via Vec then convert to Box<[T]>.
        let mut slots: Vec<MaybeUninit<T>> = Vec::with_capacity(size);
        slots.resize_with(size, MaybeUninit::uninit);
        let data = Box::into_raw(slots.into_boxed_slice()).cast::<MaybeUninit<T>>();

        Box::into_raw(Box::new(Block {
            front: CacheAligned::new(AtomicUsize::new(0)),
            tail: CacheAligned::new(AtomicUsize::new(0)),
            next: CacheAligned::new(AtomicPtr::new(ptr::null_mut())),
            data,
            size,
            mask: size - 1,
        }))
    }

    /// Raw pointer to slot `idx`.
    ///
    /// # Safety
    ///
    /// `idx` must be in bounds. Whether the slot currently holds a live `T`
    /// is governed by the `front`/`tail` protocol; the caller is responsible
    /// for only reading initialized slots and only writing free ones.
    #[inline]
    pub(crate) unsafe fn slot_ptr(&self, idx: usize) -> *mut T {
        debug_assert_slot_in_bounds!(idx, self.size);
        self.data.add(idx).cast::<T>()
    }

    /// Moves `value` into slot `idx`.
    ///
    /// # Safety
    ///
    /// `idx` must be in bounds and the slot must be free (outside the live
    /// `front..tail` range).
    #[inline]
    pub(crate) unsafe fn write_slot(&self, idx: usize, value: T) {
        self.slot_ptr(idx).write(value);
    }

    /// Moves the value out of slot `idx`, leaving it logically uninitialized.
    ///
    /// # Safety
    ///
    /// `idx` must be in bounds and the slot must hold a live `T` that is read
    /// exactly once.
    #[inline]
    pub(crate) unsafe fn read_slot(&self, idx: usize) -> T {
        self.slot_ptr(idx).read()
    }

    /// Runs the destructor of the value in slot `idx` in place.
    ///
    /// # Safety
    ///
    /// Same contract as [`read_slot`](Self::read_slot).
    #[inline]
    pub(crate) unsafe fn drop_slot(&self, idx: usize) {
        ptr::drop_in_place(self.slot_ptr(idx));
    }
}

impl<T> Drop for Block<T> {
    fn drop(&mut self) {
        // Frees the slot storage only. Any live elements were already
        // destroyed by the queue's drop walk, which knows front and tail.
        let slice = ptr::slice_from_raw_parts_mut(self.data, self.size);
        unsafe {
            drop(Box::from_raw(slice));
        }
    }
}

/// Wrapper type that ensures 128-byte alignment to prevent prefetcher-induced
/// false sharing on Intel/AMD CPUs (which may prefetch adjacent cache lines).
#[repr(align(128))]
pub(crate) struct CacheAligned<T> {
    value: T,
}

impl<T> CacheAligned<T> {
    pub(crate) const fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T> std::ops::Deref for CacheAligned<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}
