use ringspsc::{blocking_queue, queue_with, Config};
use std::thread;
use std::time::Instant;

fn main() {
    println!("ringspsc Basic Example");
    println!("======================\n");

    const ITEMS: u64 = 10_000_000;

    // --- Non-blocking queue, spinning consumer ---------------------------
    let config = Config::new(1 << 15, true);
    let (mut tx, mut rx) = queue_with::<u64>(config);

    println!("Non-blocking queue:");
    println!("  Initial capacity: {}", config.initial_capacity);
    println!("  Items: {}\n", ITEMS);

    let start = Instant::now();

    let producer = thread::spawn(move || {
        for i in 0..ITEMS {
            tx.enqueue(i);
        }
    });

    let mut received = 0u64;
    let mut checksum = 0u64;
    while received < ITEMS {
        if let Some(value) = rx.try_dequeue() {
            checksum = checksum.wrapping_add(value);
            received += 1;
        } else {
            std::hint::spin_loop();
        }
    }
    producer.join().unwrap();

    let elapsed = start.elapsed();
    let metrics = rx.metrics();
    println!("  Received {} items in {:?}", received, elapsed);
    println!(
        "  Throughput: {:.1}M items/sec",
        received as f64 / elapsed.as_secs_f64() / 1e6
    );
    println!("  Checksum: {}", checksum);
    println!("  Growth allocations: {}\n", metrics.blocks_grown);

    // --- Blocking queue, parked consumer ---------------------------------
    let (mut tx, mut rx) = blocking_queue::<u64>(1 << 15);

    println!("Blocking queue:");
    let start = Instant::now();

    let producer = thread::spawn(move || {
        for i in 0..ITEMS {
            tx.enqueue(i);
        }
    });

    let mut checksum = 0u64;
    for _ in 0..ITEMS {
        checksum = checksum.wrapping_add(rx.wait_dequeue());
    }
    producer.join().unwrap();

    let elapsed = start.elapsed();
    println!("  Received {} items in {:?}", ITEMS, elapsed);
    println!(
        "  Throughput: {:.1}M items/sec",
        ITEMS as f64 / elapsed.as_secs_f64() / 1e6
    );
    println!("  Checksum: {}", checksum);
    println!("  Remaining: {}", rx.size_approx());
}
