//! Debug assertion macros for the block-ring invariants.
//!
//! Active only in debug builds (`debug_assert!`), so there is zero overhead on
//! release hot paths. Used by `Block<T>` and the queue core.

/// Assert that a block size is a usable power of two.
///
/// Block capacities must be powers of two (`>= 2`) so index wrapping is a
/// single bitmask instead of a division.
macro_rules! debug_assert_pow2_size {
    ($size:expr) => {
        debug_assert!(
            $size >= 2 && $size.is_power_of_two(),
            "block size {} is not a power of two >= 2",
            $size
        )
    };
}

/// Assert that a slot index is inside the block.
///
/// Every index handed to a slot accessor has already been wrapped with the
/// block's mask; anything else is a bug in the protocol code.
macro_rules! debug_assert_slot_in_bounds {
    ($idx:expr, $size:expr) => {
        debug_assert!(
            $idx < $size,
            "slot index {} out of bounds for block of size {}",
            $idx,
            $size
        )
    };
}

/// Assert that a block the producer is about to advance into is empty.
///
/// Every block strictly between the front block and the tail block in ring
/// order has been fully drained by the consumer, so its indices must be equal.
macro_rules! debug_assert_block_drained {
    ($front:expr, $tail:expr) => {
        debug_assert!(
            $front == $tail,
            "block ahead of the tail block still holds elements (front {}, tail {})",
            $front,
            $tail
        )
    };
}

/// Assert that a block the consumer is about to advance into holds an element.
///
/// The tail block is only ever published after an element was written into it,
/// so a block the consumer walks forward to can never be empty.
macro_rules! debug_assert_block_occupied {
    ($front:expr, $tail:expr) => {
        debug_assert!(
            $front != $tail,
            "advanced to a block with no element to dequeue (front == tail == {})",
            $front
        )
    };
}

pub(crate) use debug_assert_block_drained;
pub(crate) use debug_assert_block_occupied;
pub(crate) use debug_assert_pow2_size;
pub(crate) use debug_assert_slot_in_bounds;
