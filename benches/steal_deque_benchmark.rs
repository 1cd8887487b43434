use core::ptr::NonNull;
use std::collections::VecDeque;
use std::sync::Barrier;
use std::time::Instant;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use filch::{GhostStealDeque, GhostToken};

fn benchmark_owner_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("owner_cycle");

    group.bench_function("filch_push_pop_bottom", |b| {
        b.iter_custom(|iters| {
            GhostToken::new(|token| {
                let deque: GhostStealDeque<'_, u64> = GhostStealDeque::new();
                let (mut owner, _thief) = token.split_roles();
                let mut task = 0u64;
                let ptr = NonNull::from(&mut task);

                let start = Instant::now();
                for _ in 0..iters {
                    deque.push_bottom(&mut owner, ptr);
                    black_box(deque.pop_bottom(&mut owner));
                }
                start.elapsed()
            })
        })
    });

    group.bench_function("vec_deque_baseline", |b| {
        b.iter_custom(|iters| {
            let mut deque: VecDeque<u64> = VecDeque::new();
            let start = Instant::now();
            for i in 0..iters {
                deque.push_back(i);
                black_box(deque.pop_back());
            }
            start.elapsed()
        })
    });

    group.finish();
}

fn benchmark_steal_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("steal_drain");

    for thieves in [1usize, 2, 4] {
        group.bench_function(format!("{thieves}_thieves"), |b| {
            b.iter_custom(|iters| {
                GhostToken::new(|token| {
                    let deque: GhostStealDeque<'_, u64> = GhostStealDeque::new();
                    let (mut owner, thief) = token.split_roles();
                    let mut tasks: Vec<u64> = (0..iters).collect();
                    for t in tasks.iter_mut() {
                        deque.push_bottom(&mut owner, NonNull::from(t));
                    }

                    let deque = &deque;
                    let barrier = Barrier::new(thieves + 1);
                    let barrier = &barrier;
                    let start = Instant::now();
                    std::thread::scope(|s| {
                        for _ in 0..thieves {
                            s.spawn(move || {
                                barrier.wait();
                                loop {
                                    let (stolen, now_empty) = deque.pop_top(&thief);
                                    black_box(stolen);
                                    if now_empty {
                                        break;
                                    }
                                }
                            });
                        }
                        barrier.wait();
                    });
                    start.elapsed()
                })
            })
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_owner_cycle, benchmark_steal_drain);
criterion_main!(benches);
