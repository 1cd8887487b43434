use std::alloc::{alloc, dealloc, Layout};
use std::time::Instant;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use filch::{GhostPoolAllocator, GhostToken};

fn benchmark_small_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("small_alloc_cycle");

    group.bench_function("filch_pool", |b| {
        b.iter_custom(|iters| {
            GhostToken::new(|token| {
                let pool: GhostPoolAllocator<'_> =
                    GhostPoolAllocator::with_sizes(&[16, 64, 256, 1024]);
                let start = Instant::now();
                for _ in 0..iters {
                    let p = pool.allocate(&token, 64).unwrap();
                    black_box(p);
                    unsafe { pool.deallocate(&token, p, 64) };
                }
                start.elapsed()
            })
        })
    });

    group.bench_function("system_baseline", |b| {
        b.iter_custom(|iters| {
            let layout = Layout::from_size_align(64, 8).unwrap();
            let start = Instant::now();
            for _ in 0..iters {
                let p = unsafe { alloc(layout) };
                black_box(p);
                unsafe { dealloc(p, layout) };
            }
            start.elapsed()
        })
    });

    group.finish();
}

criterion_group!(benches, benchmark_small_cycle);
criterion_main!(benches);
