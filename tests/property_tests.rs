//! Property-based tests comparing the queue against a `VecDeque` model.
//!
//! Single-threaded: with only one thread driving both handles, every
//! operation is exact and must agree with the model step for step.

use proptest::prelude::*;
use ringspsc::{queue, queue_with, Config};
use std::collections::VecDeque;

#[derive(Debug, Clone)]
enum Op {
    Enqueue(u32),
    TryEnqueue(u32),
    TryDequeue,
    Pop,
    Peek,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<u32>().prop_map(Op::Enqueue),
        any::<u32>().prop_map(Op::TryEnqueue),
        Just(Op::TryDequeue),
        Just(Op::Pop),
        Just(Op::Peek),
    ]
}

proptest! {
    /// Any single-threaded interleaving of operations matches the model.
    #[test]
    fn prop_matches_vecdeque_model(
        capacity in 1usize..64,
        ops in proptest::collection::vec(op_strategy(), 0..400),
    ) {
        let (mut tx, mut rx) = queue(capacity);
        let mut model: VecDeque<u32> = VecDeque::new();
        // Elements the ring holds before a growth allocation: the block
        // rounds up to a power of two, minus the one wasted slot.
        let fixed_capacity = (capacity + 1).next_power_of_two() - 1;
        let mut grown = false;

        for op in ops {
            match op {
                Op::Enqueue(v) => {
                    tx.enqueue(v);
                    model.push_back(v);
                    if model.len() > fixed_capacity {
                        grown = true;
                    }
                }
                Op::TryEnqueue(v) => {
                    // Before any growth the non-allocating capacity is exact;
                    // afterwards the reachable slack depends on where the
                    // indices sit, so only the success case is checked.
                    match tx.try_enqueue(v) {
                        Ok(()) => model.push_back(v),
                        Err(rejected) => {
                            prop_assert_eq!(rejected.into_inner(), v);
                            if !grown {
                                prop_assert_eq!(model.len(), fixed_capacity);
                            }
                        }
                    }
                }
                Op::TryDequeue => {
                    prop_assert_eq!(rx.try_dequeue(), model.pop_front());
                }
                Op::Pop => {
                    prop_assert_eq!(rx.pop(), model.pop_front().is_some());
                }
                Op::Peek => {
                    prop_assert_eq!(rx.peek().copied(), model.front().copied());
                }
            }
            prop_assert_eq!(rx.size_approx(), model.len());
        }

        // Drain and compare the tail end.
        while let Some(expected) = model.pop_front() {
            prop_assert_eq!(rx.try_dequeue(), Some(expected));
        }
        prop_assert_eq!(rx.try_dequeue(), None);
    }

    /// Growth never reorders: any enqueue count drains back in FIFO order.
    #[test]
    fn prop_fifo_across_growth(
        capacity in 1usize..32,
        count in 0usize..2000,
    ) {
        let (mut tx, mut rx) = queue(capacity);

        for i in 0..count {
            tx.enqueue(i);
        }
        for i in 0..count {
            prop_assert_eq!(rx.try_dequeue(), Some(i));
        }
        prop_assert_eq!(rx.try_dequeue(), None);
    }

    /// Counter conservation: enqueued - dequeued equals what is left.
    #[test]
    fn prop_counter_conservation(
        enqueues in 0usize..500,
        dequeues in 0usize..500,
    ) {
        let (mut tx, mut rx) = queue_with(Config::new(15, true));

        for i in 0..enqueues {
            tx.enqueue(i);
        }
        let mut dequeued = 0;
        for _ in 0..dequeues {
            if rx.try_dequeue().is_some() {
                dequeued += 1;
            }
        }

        let m = rx.metrics();
        prop_assert_eq!(m.enqueued as usize, enqueues);
        prop_assert_eq!(m.dequeued as usize, dequeued);
        prop_assert_eq!(rx.size_approx(), enqueues - dequeued);
    }
}
