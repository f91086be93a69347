//! Bounded queue benchmark suite.
//!
//! Benchmarks the outbound path building blocks:
//! - Non-blocking put/get at different capacities
//! - One producer and one consumer across tasks with `Block` backpressure
//!
//! Run with: cargo bench --bench queue_throughput
//! Results saved to: target/criterion/

use std::sync::Arc;

use bytes::Bytes;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use session_pump::{BoundedQueue, OverflowPolicy};
use tokio::runtime::Runtime;

// ============================================================================
// Benchmark Parameters
// ============================================================================

const CAPACITIES: &[usize] = &[16, 512, 4096];
const ITEMS: usize = 10_000;

// ============================================================================
// Benchmark: Fill and Drain
// ============================================================================

fn bench_fill_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("fill_drain");

    for &capacity in CAPACITIES {
        group.throughput(Throughput::Elements(capacity as u64));
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, &cap| {
            let queue = BoundedQueue::new(cap, OverflowPolicy::Reject).unwrap();
            let payload = Bytes::from_static(b"payload");
            b.iter(|| {
                for _ in 0..cap {
                    let _ = queue.try_put(payload.clone());
                }
                while queue.get().is_some() {}
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Drop Oldest Under Pressure
// ============================================================================

fn bench_drop_oldest(c: &mut Criterion) {
    let mut group = c.benchmark_group("drop_oldest");
    group.throughput(Throughput::Elements(ITEMS as u64));

    group.bench_function("overfill_16", |b| {
        let queue = BoundedQueue::new(16, OverflowPolicy::DropOldest).unwrap();
        b.iter(|| {
            for i in 0..ITEMS {
                let _ = queue.try_put(i);
            }
            while queue.get().is_some() {}
        });
    });

    group.finish();
}

// ============================================================================
// Benchmark: Producer / Consumer
// ============================================================================

fn bench_producer_consumer(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("producer_consumer");
    group.sample_size(20);
    group.throughput(Throughput::Elements(ITEMS as u64));

    for &capacity in CAPACITIES {
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, &cap| {
            b.to_async(&rt).iter(|| async move {
                let queue = Arc::new(BoundedQueue::new(cap, OverflowPolicy::Block).unwrap());

                let consumer = {
                    let queue = Arc::clone(&queue);
                    tokio::spawn(async move {
                        let mut received = 0usize;
                        while queue.recv().await.is_some() {
                            received += 1;
                        }
                        received
                    })
                };

                for i in 0..ITEMS {
                    let _ = queue.put(i).await.unwrap();
                }
                queue.close();

                assert_eq!(consumer.await.unwrap(), ITEMS);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fill_drain, bench_drop_oldest, bench_producer_consumer);
criterion_main!(benches);
