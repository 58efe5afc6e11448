//! Benchmark harness using Criterion for latency measurement.
//!
//! Measures:
//! - Submit (no match) and submit (full match at varying depth)
//! - Cancel at varying book size
//! - Pool acquire/release churn
//! - Mixed workload

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use tickmatch::{MatchingEngine, OrderPool, OrderType, Side};

fn bench_submit_no_match(c: &mut Criterion) {
    let mut engine = MatchingEngine::new();
    let mut id = 0u64;

    c.bench_function("submit_no_match", |b| {
        b.iter(|| {
            id += 1;
            black_box(engine.submit_order(id, Side::Buy, OrderType::Limit, 9_000, 100))
        })
    });
}

fn bench_submit_full_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit_full_match");

    for depth in [1u64, 10, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            let mut engine = MatchingEngine::new();
            for i in 0..depth {
                engine.submit_order(i, Side::Sell, OrderType::Limit, 10_000, 100);
            }

            let mut id = 1_000u64;
            b.iter(|| {
                id += 1;
                let status = engine.submit_order(id, Side::Buy, OrderType::Limit, 10_000, 100);

                // replenish the consumed resting order
                engine.submit_order(id + 1_000_000, Side::Sell, OrderType::Limit, 10_000, 100);
                engine.drain_trades();
                black_box(status)
            })
        });
    }

    group.finish();
}

fn bench_cancel(c: &mut Criterion) {
    let mut group = c.benchmark_group("cancel");

    for book_size in [100u64, 1_000, 10_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(book_size),
            &book_size,
            |b, &book_size| {
                let mut engine = MatchingEngine::new();
                for i in 0..book_size {
                    let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
                    let price = if i % 2 == 0 {
                        9_000 + (i % 100) as i64
                    } else {
                        11_000 + (i % 100) as i64
                    };
                    engine.submit_order(i, side, OrderType::Limit, price, 100);
                }

                let mut cancel_id = 0u64;
                let mut next_id = book_size;
                b.iter(|| {
                    let result = engine.cancel_order(cancel_id);

                    // replenish at the same level
                    let side = if cancel_id % 2 == 0 { Side::Buy } else { Side::Sell };
                    let price = if cancel_id % 2 == 0 {
                        9_000 + (cancel_id % 100) as i64
                    } else {
                        11_000 + (cancel_id % 100) as i64
                    };
                    engine.submit_order(next_id, side, OrderType::Limit, price, 100);

                    cancel_id = next_id;
                    next_id += 1;
                    black_box(result)
                })
            },
        );
    }

    group.finish();
}

fn bench_pool_churn(c: &mut Criterion) {
    let mut pool = OrderPool::new(4_096);

    c.bench_function("pool_acquire_release", |b| {
        b.iter(|| {
            let handle = pool.acquire().unwrap();
            pool.release(black_box(handle));
        })
    });
}

fn bench_mixed_workload(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixed_workload");

    group.bench_function("60_submit_40_cancel", |b| {
        let mut engine = MatchingEngine::new();
        let mut rng = ChaCha8Rng::seed_from_u64(0xDEADBEEF);
        let mut id = 0u64;

        for _ in 0..1_000 {
            id += 1;
            engine.submit_order(
                id,
                if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell },
                OrderType::Limit,
                rng.gen_range(9_900..10_100),
                rng.gen_range(1..1_000),
            );
        }

        b.iter(|| {
            if rng.gen_bool(0.6) {
                id += 1;
                black_box(engine.submit_order(
                    id,
                    if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell },
                    OrderType::Limit,
                    rng.gen_range(9_900..10_100),
                    rng.gen_range(1..1_000),
                ));
            } else {
                let cancel_id = rng.gen_range(1..=id);
                black_box(engine.cancel_order(cancel_id));
            }
            engine.drain_trades();
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_submit_no_match,
    bench_submit_full_match,
    bench_cancel,
    bench_pool_churn,
    bench_mixed_workload,
);

criterion_main!(benches);
