use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tubeq::{MessageQueue, QueueRegistry};

/// Benchmark: Single-threaded enqueue then drain
fn bench_enqueue_dequeue_single_thread(c: &mut Criterion) {
    let mut group = c.benchmark_group("enqueue_dequeue_single_thread");

    for batch in [1_000usize, 10_000].iter() {
        group.throughput(Throughput::Elements(*batch as u64));
        group.bench_with_input(BenchmarkId::from_parameter(batch), batch, |b, &batch| {
            let queue = MessageQueue::new();

            b.iter(|| {
                for _ in 0..batch {
                    queue.enqueue(black_box("payload".to_string()));
                }
                for _ in 0..batch {
                    black_box(queue.try_dequeue());
                }
            });
        });
    }
    group.finish();
}

/// Benchmark: Registry lookup of an existing queue
fn bench_registry_lookup(c: &mut Criterion) {
    let registry = QueueRegistry::new();
    for i in 0..1_000 {
        registry.get_or_create(&format!("queue-{}", i));
    }

    c.bench_function("registry_get_or_create_existing", |b| {
        b.iter(|| black_box(registry.get_or_create(black_box("queue-500"))));
    });
}

/// Benchmark: Concurrent producers on one queue
fn bench_concurrent_producers(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("concurrent_producers");

    for num_producers in [2u64, 4, 8].iter() {
        group.throughput(Throughput::Elements(*num_producers * 1000));
        group.bench_with_input(
            BenchmarkId::from_parameter(num_producers),
            num_producers,
            |b, &num_producers| {
                b.iter(|| {
                    rt.block_on(async {
                        let registry = Arc::new(QueueRegistry::new());

                        let mut handles = vec![];
                        for _ in 0..num_producers {
                            let registry = registry.clone();
                            handles.push(tokio::spawn(async move {
                                for _ in 0..1000 {
                                    let _ = registry.enqueue("bench", black_box("data".to_string()));
                                }
                            }));
                        }

                        for handle in handles {
                            handle.await.unwrap();
                        }
                    });
                });
            },
        );
    }
    group.finish();
}

/// Benchmark: One producer feeding one blocked consumer
fn bench_producer_consumer(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("producer_consumer");
    group.sample_size(20);

    group.bench_function("1_producer_1_consumer", |b| {
        b.iter(|| {
            rt.block_on(async {
                let queue = Arc::new(MessageQueue::new());

                let consumer = {
                    let queue = queue.clone();
                    tokio::spawn(async move {
                        let cancel = CancellationToken::new();
                        let mut count = 0;
                        while count < 10_000 {
                            if queue.dequeue(Duration::from_millis(100), &cancel).await.is_ok() {
                                count += 1;
                            }
                        }
                    })
                };

                let producer = {
                    let queue = queue.clone();
                    tokio::spawn(async move {
                        for _ in 0..10_000 {
                            queue.enqueue("data".to_string());
                        }
                    })
                };

                producer.await.unwrap();
                consumer.await.unwrap();
            });
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_enqueue_dequeue_single_thread,
    bench_registry_lookup,
    bench_concurrent_producers,
    bench_producer_consumer,
);

criterion_main!(benches);
