use criterion::{Criterion, black_box, criterion_group, criterion_main};
use dumalloc::{Heap, HeapConfig, Strategy};

fn config(strategy: Strategy) -> HeapConfig {
    HeapConfig::new(strategy)
        .with_young_size(64 * 1024)
        .with_old_size(64 * 1024)
        .with_handle_capacity(8192)
}

/// Allocate a mix of sizes, releasing every other object
fn churn(heap: &mut Heap) {
    let mut handles = Vec::new();
    for i in 0..256 {
        if let Ok(h) = heap.allocate(8 + (i * 13) % 120) {
            handles.push(h);
        }
    }
    for h in handles.into_iter().step_by(2) {
        heap.release(h).unwrap();
    }
}

fn bench_alloc_first_fit(c: &mut Criterion) {
    c.bench_function("alloc/release churn first-fit", |b| {
        b.iter(|| {
            let mut heap = Heap::new(config(Strategy::FirstFit)).unwrap();
            churn(&mut heap);
            black_box(heap.free_bytes(heap.current_young()))
        })
    });
}

fn bench_alloc_best_fit(c: &mut Criterion) {
    c.bench_function("alloc/release churn best-fit", |b| {
        b.iter(|| {
            let mut heap = Heap::new(config(Strategy::BestFit)).unwrap();
            churn(&mut heap);
            black_box(heap.free_bytes(heap.current_young()))
        })
    });
}

fn bench_minor_collection(c: &mut Criterion) {
    c.bench_function("minor collection 128 survivors", |b| {
        b.iter(|| {
            let mut heap = Heap::new(config(Strategy::FirstFit)).unwrap();
            churn(&mut heap);
            black_box(heap.minor_collection().unwrap())
        })
    });
}

fn bench_major_collection(c: &mut Criterion) {
    c.bench_function("major collection after promotion", |b| {
        b.iter(|| {
            let mut heap = Heap::new(config(Strategy::FirstFit)).unwrap();
            churn(&mut heap);
            for _ in 0..3 {
                heap.minor_collection().unwrap();
            }
            let live: Vec<_> = heap.handles().live().map(|(h, _)| h).collect();
            for h in live.into_iter().step_by(3) {
                heap.release(h).unwrap();
            }
            black_box(heap.major_collection())
        })
    });
}

criterion_group!(
    benches,
    bench_alloc_first_fit,
    bench_alloc_best_fit,
    bench_minor_collection,
    bench_major_collection,
);

criterion_main!(benches);
