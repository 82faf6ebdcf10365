use corral_async::BoundedQueue;
use criterion::*;
use std::hint::black_box;
use std::sync::Arc;

fn bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("bounded-queue");

    group.throughput(Throughput::Elements(1));
    group.bench_function("push-pop", |b| {
        let queue = BoundedQueue::new(1024).unwrap();
        b.iter(|| {
            queue.push(black_box(42u64)).unwrap();
            black_box(queue.pop().unwrap())
        })
    });

    group.throughput(Throughput::Elements(10_000));
    group.bench_function("contended-push-pop", |b| {
        b.iter(|| {
            let queue = Arc::new(BoundedQueue::new(64).unwrap());
            std::thread::scope(|s| {
                let producer = queue.clone();
                s.spawn(move || {
                    let mut i = 0u64;
                    while i < 10_000 {
                        if producer.push(i).is_ok() {
                            i += 1;
                        }
                    }
                });

                let mut received = 0;
                while received < 10_000 {
                    if queue.pop().is_ok() {
                        received += 1;
                    }
                }
            });
        })
    });
    group.finish();
}

criterion_group!(benches, bench);
criterion_main!(benches);
