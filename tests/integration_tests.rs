use ringspsc::{queue, queue_with, Config};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

/// Element type that records the order its values are destroyed in.
///
/// Ids are handed out sequentially at construction; the log checks that every
/// drop sees the id right after the previously dropped one.
struct Tracked {
    id: i64,
    log: Arc<DropLog>,
}

#[derive(Default)]
struct DropLog {
    count: AtomicUsize,
    last_id: AtomicI64,
    out_of_order: AtomicBool,
}

impl DropLog {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            count: AtomicUsize::new(0),
            last_id: AtomicI64::new(-1),
            out_of_order: AtomicBool::new(false),
        })
    }

    fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    fn in_order(&self) -> bool {
        !self.out_of_order.load(Ordering::SeqCst)
    }
}

fn tracked(log: &Arc<DropLog>, id: i64) -> Tracked {
    Tracked {
        id,
        log: Arc::clone(log),
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        let last = self.log.last_id.swap(self.id, Ordering::SeqCst);
        if self.id != last + 1 {
            self.log.out_of_order.store(true, Ordering::SeqCst);
        }
        self.log.count.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_create_empty_queue() {
    {
        let (_tx, _rx) = queue::<i32>(15);
    }
    {
        let (_tx, _rx) = queue::<i32>(1234);
    }
}

#[test]
fn test_enqueue_one() {
    {
        let (mut tx, mut rx) = queue(1);
        tx.enqueue(12345);
        assert_eq!(rx.try_dequeue(), Some(12345));
    }
    {
        let (mut tx, mut rx) = queue(1);
        assert!(tx.try_enqueue(12345).is_ok());
        assert_eq!(rx.try_dequeue(), Some(12345));
    }
}

#[test]
fn test_enqueue_many_within_capacity() {
    let (mut tx, mut rx) = queue(100);
    for i in 0..100 {
        tx.enqueue(i);
    }
    for i in 0..100 {
        assert_eq!(rx.try_dequeue(), Some(i));
    }
    assert_eq!(rx.try_dequeue(), None);
}

#[test]
fn test_enqueue_many_with_growth() {
    let (mut tx, mut rx) = queue(100);
    for i in 0..1200 {
        tx.enqueue(i);
    }
    for i in 0..1200 {
        assert_eq!(rx.try_dequeue(), Some(i));
    }
    assert_eq!(rx.try_dequeue(), None);
}

#[test]
fn test_nonempty_destroy_some_elements() {
    let log = DropLog::new();
    {
        let (mut tx, _rx) = queue(31);
        for id in 0..10 {
            tx.enqueue(tracked(&log, id));
        }
    }
    assert_eq!(log.count(), 10);
    assert!(log.in_order());
}

#[test]
fn test_nonempty_destroy_entire_block() {
    let log = DropLog::new();
    {
        let (mut tx, _rx) = queue(31);
        for id in 0..31 {
            tx.enqueue(tracked(&log, id));
        }
    }
    assert_eq!(log.count(), 31);
    assert!(log.in_order());
}

#[test]
fn test_nonempty_destroy_multiple_blocks() {
    let log = DropLog::new();
    {
        let (mut tx, _rx) = queue(31);
        for id in 0..94 {
            tx.enqueue(tracked(&log, id));
        }
    }
    assert_eq!(log.count(), 94);
    assert!(log.in_order());
}

#[test]
fn test_nonempty_destroy_after_partial_drain() {
    let log = DropLog::new();
    {
        let (mut tx, mut rx) = queue(31);
        for id in 0..42 {
            tx.enqueue(tracked(&log, id));
        }
        for _ in 0..31 {
            assert!(rx.try_dequeue().is_some());
        }
    }
    assert_eq!(log.count(), 42);
    assert!(log.in_order());
}

#[test]
fn test_nonempty_destroy_mixed_phases() {
    let log = DropLog::new();
    {
        let (mut tx, mut rx) = queue(31);
        let mut next_id = 0;
        let mut enqueue = |tx: &mut ringspsc::Producer<Tracked>, n: i64| {
            for _ in 0..n {
                tx.enqueue(tracked(&log, next_id));
                next_id += 1;
            }
        };

        enqueue(&mut tx, 123);
        for _ in 0..25 {
            assert!(rx.try_dequeue().is_some());
        }
        enqueue(&mut tx, 47);
        for _ in 0..140 {
            assert!(rx.try_dequeue().is_some());
        }
        enqueue(&mut tx, 230);
        for _ in 0..130 {
            assert!(rx.try_dequeue().is_some());
        }
        enqueue(&mut tx, 100);
    }
    assert_eq!(log.count(), 500);
    assert!(log.in_order());
}

#[test]
fn test_randomized_try_ops_against_model() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::VecDeque;

    let (mut tx, mut rx) = queue(31);
    let mut model = VecDeque::new();
    let mut rng = StdRng::seed_from_u64(0x5eed_cafe);

    for i in 0..10_000 {
        if rng.gen::<bool>() {
            let result = tx.try_enqueue(i);
            if model.len() == 31 {
                assert!(result.is_err(), "enqueue succeeded on a full ring");
            } else {
                assert!(result.is_ok());
                model.push_back(i);
            }
        } else {
            let result = rx.try_dequeue();
            assert_eq!(result, model.pop_front());
        }
    }
}

#[test]
fn test_threaded_fifo() {
    const N: u64 = 1_000_000;

    let (mut tx, mut rx) = queue::<u64>(100);
    let done = Arc::new(AtomicBool::new(false));

    let producer = thread::spawn(move || {
        let mut enqueued = 0u64;
        for i in 0..N {
            // Alternate runs of allocating and non-allocating enqueues.
            if (i >> 7) & 1 == 0 {
                tx.enqueue(i);
                enqueued += 1;
            } else if tx.try_enqueue(i).is_ok() {
                enqueued += 1;
            }
        }
        enqueued
    });

    let consumer = {
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut prev: i64 = -1;
            let mut received = 0u64;
            loop {
                while let Some(value) = rx.try_dequeue() {
                    assert!(
                        value as i64 > prev,
                        "order violation: got {} after {}",
                        value,
                        prev
                    );
                    prev = value as i64;
                    received += 1;
                }
                if done.load(Ordering::Acquire) {
                    // Drain anything that landed before the flag was set.
                    while let Some(value) = rx.try_dequeue() {
                        assert!(value as i64 > prev);
                        prev = value as i64;
                        received += 1;
                    }
                    return received;
                }
                std::hint::spin_loop();
            }
        })
    };

    let enqueued = producer.join().unwrap();
    done.store(true, Ordering::Release);
    let received = consumer.join().unwrap();

    assert!(enqueued >= N / 2); // every allocating enqueue succeeded
    assert_eq!(received, enqueued);
}

#[test]
fn test_threaded_drop_tracking() {
    const N: i64 = 100_000;

    let log = DropLog::new();
    let (mut tx, mut rx) = queue(64);
    let done = Arc::new(AtomicBool::new(false));

    let producer = {
        let log = Arc::clone(&log);
        thread::spawn(move || {
            for id in 0..N {
                tx.enqueue(tracked(&log, id));
            }
        })
    };

    let consumer = {
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut received = 0usize;
            loop {
                while rx.try_dequeue().is_some() {
                    received += 1;
                }
                if done.load(Ordering::Acquire) {
                    while rx.try_dequeue().is_some() {
                        received += 1;
                    }
                    return received;
                }
                thread::yield_now();
            }
        })
    };

    producer.join().unwrap();
    done.store(true, Ordering::Release);
    let received = consumer.join().unwrap();

    assert_eq!(received, N as usize);
    assert_eq!(log.count(), N as usize);
    assert!(log.in_order());
}

#[test]
fn test_metrics_conservation() {
    let (mut tx, mut rx) = queue_with(Config::new(15, true));

    for i in 0..200 {
        tx.enqueue(i);
    }
    let mut drained = 0;
    while rx.try_dequeue().is_some() {
        drained += 1;
    }

    let m = rx.metrics();
    assert_eq!(m.enqueued, 200);
    assert_eq!(m.dequeued, 200);
    assert_eq!(drained, 200);
    assert_eq!(rx.size_approx(), 0);
}
