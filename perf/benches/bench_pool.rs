use cairn_pool::{PoolConfig, SlotPool};
use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

const SLOT_SIZE: usize = 500;

fn bench_uncontended_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool");
    group.throughput(Throughput::Elements(1));

    for &count in &[1usize, 5, 64] {
        let pool = SlotPool::<u8>::new(PoolConfig::new(count, SLOT_SIZE));
        group.bench_function(format!("write_read_cycle_{count}_slots"), |b| {
            b.iter(|| {
                let mut w = pool.claim_for_write().unwrap();
                w[0] = black_box(1);
                drop(w);
                let r = pool.claim_for_read().unwrap();
                black_box(r[0]);
            });
        });
    }

    group.finish();
}

fn bench_fill_and_verify(c: &mut Criterion) {
    let pool = SlotPool::<u8>::new(PoolConfig::new(5, SLOT_SIZE));

    let mut group = c.benchmark_group("pool");
    group.throughput(Throughput::Bytes(SLOT_SIZE as u64));

    group.bench_function("fill_verify_cycle", |b| {
        let mut seq = 0u64;
        b.iter(|| {
            let mut w = pool.claim_for_write().unwrap();
            w.fill(cairn_engine::stamp(0, seq));
            drop(w);
            let r = pool.claim_for_read().unwrap();
            black_box(cairn_engine::verify(&r));
            seq += 1;
        });
    });

    group.finish();
}

fn bench_try_claim_exhausted(c: &mut Criterion) {
    let pool = SlotPool::<u8>::new(PoolConfig::new(5, SLOT_SIZE));
    // Every slot held for writing: writers and readers both find nothing.
    let _held: Vec<_> = (0..5).map(|_| pool.claim_for_write().unwrap()).collect();

    let mut group = c.benchmark_group("pool");
    group.throughput(Throughput::Elements(1));

    group.bench_function("try_claim_write (exhausted)", |b| {
        b.iter(|| black_box(pool.try_claim_for_write().is_err()));
    });
    group.bench_function("try_claim_read (exhausted)", |b| {
        b.iter(|| black_box(pool.try_claim_for_read().is_err()));
    });

    group.finish();
}

/// One writer thread and the bench thread reading, through a single slot, so
/// every iteration crosses threads twice.
fn bench_ping_pong(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_cross_thread");
    group.throughput(Throughput::Elements(1));

    for &count in &[1usize, 5] {
        let pool = SlotPool::<u8>::new(PoolConfig::new(count, SLOT_SIZE));
        let done = AtomicBool::new(false);

        thread::scope(|s| {
            s.spawn(|| {
                while !done.load(Ordering::Relaxed) {
                    match pool.claim_for_write() {
                        Ok(mut w) => w[0] = 1,
                        Err(_) => break,
                    }
                }
            });

            group.bench_function(format!("ping_pong_{count}_slots"), |b| {
                b.iter_custom(|iters| {
                    let start = Instant::now();
                    for _ in 0..iters {
                        let r = pool.claim_for_read().unwrap();
                        black_box(r[0]);
                    }
                    start.elapsed()
                });
            });

            done.store(true, Ordering::Relaxed);
            pool.stop();
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_uncontended_cycle,
    bench_fill_and_verify,
    bench_try_claim_exhausted,
    bench_ping_pong,
);
criterion_main!(benches);
