//! Multi-threaded integration tests for the slot pool.
//!
//! # Overview
//!
//! Several writer and reader threads share one pool concurrently:
//!
//! ```text
//! [Writer 0] --claim--fill--publish--claim--fill--publish-- ...
//! [Writer 1] --claim--fill--publish---------claim--fill---- ...
//!                  |             |               |
//!                  v             v               v
//!             [slot 0]  [slot 1]  ...  [slot COUNT-1]
//!                  |             |               |
//!                  v             v               v
//! [Reader 0] ----claim--verify--drain---claim--verify------ ...
//! [Reader 1] ------------claim--verify--drain-------------- ...
//! ```
//!
//! Every payload is stamped with `(writer, seq)` across the whole slot, so a
//! reader seeing a mixed slot means two claims overlapped. Each slot also has
//! an occupancy flag that a claimer must be able to flip from 0 to 1.
//!
//! # Running
//!
//! ```bash
//! cargo test -p cairn-pool --test contention -- --nocapture
//! ```

use cairn_pool::{ClaimError, PoolConfig, PoolStopped, SlotPool, SlotState};
use std::io::Write;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Writes to stderr with immediate flush to bypass test output capture.
macro_rules! log {
    ($($arg:tt)*) => {{
        let _ = writeln!(std::io::stderr(), $($arg)*);
        let _ = std::io::stderr().flush();
    }};
}

/// Elements per slot.
const SLOT_SIZE: usize = 16;

/// Upper bound for anything that should finish promptly.
const DEADLINE: Duration = Duration::from_secs(30);

fn stamp(writer: u64, seq: u64) -> u64 {
    (writer << 32) | seq
}

/// Per-slot occupancy flags shared by all workers of one test.
struct Occupancy(Vec<AtomicBool>);

impl Occupancy {
    fn new(count: usize) -> Self {
        Self((0..count).map(|_| AtomicBool::new(false)).collect())
    }

    fn enter(&self, index: usize) {
        let was = self.0[index].swap(true, Ordering::AcqRel);
        assert!(!was, "slot {index} claimed twice concurrently");
    }

    fn leave(&self, index: usize) {
        self.0[index].store(false, Ordering::Release);
    }
}

/// Runs `writers` writer threads publishing `per_writer` payloads each and
/// `readers` reader threads until everything is consumed. Returns every stamp
/// seen by readers.
fn run_handoff(
    pool: &SlotPool<u64>,
    writers: u64,
    readers: usize,
    per_writer: u64,
    bounded: bool,
) -> Vec<u64> {
    let occupancy = Occupancy::new(pool.slot_count());
    let total = writers * per_writer;
    let consumed = AtomicU64::new(0);
    let retry = Duration::from_millis(5);

    thread::scope(|s| {
        let writer_threads: Vec<_> = (0..writers)
            .map(|writer| {
                let occupancy = &occupancy;
                s.spawn(move || {
                    for seq in 0..per_writer {
                        let mut handle = loop {
                            let claim = if bounded {
                                pool.claim_for_write_timeout(retry)
                            } else {
                                pool.claim_for_write().map_err(ClaimError::from)
                            };
                            match claim {
                                Ok(handle) => break handle,
                                Err(ClaimError::TimedOut(_)) => continue,
                                Err(err) => panic!("writer {writer}: {err}"),
                            }
                        };
                        occupancy.enter(handle.index());
                        handle.fill(stamp(writer, seq));
                        occupancy.leave(handle.index());
                    }
                })
            })
            .collect();

        let reader_threads: Vec<_> = (0..readers)
            .map(|reader| {
                let occupancy = &occupancy;
                let consumed = &consumed;
                s.spawn(move || {
                    let mut seen = Vec::new();
                    loop {
                        let claim = if bounded {
                            pool.claim_for_read_timeout(retry)
                        } else {
                            pool.claim_for_read().map_err(ClaimError::from)
                        };
                        let handle = match claim {
                            Ok(handle) => handle,
                            Err(ClaimError::TimedOut(_)) => continue,
                            Err(ClaimError::Stopped(_)) => break,
                            Err(err) => panic!("reader {reader}: {err}"),
                        };
                        occupancy.enter(handle.index());
                        let first = handle[0];
                        assert!(
                            handle.iter().all(|&v| v == first),
                            "reader {reader}: torn payload in slot {}",
                            handle.index()
                        );
                        seen.push(first);
                        occupancy.leave(handle.index());
                        drop(handle);
                        consumed.fetch_add(1, Ordering::AcqRel);
                    }
                    seen
                })
            })
            .collect();

        for w in writer_threads {
            w.join().expect("writer panicked");
        }

        let started = Instant::now();
        while consumed.load(Ordering::Acquire) < total {
            assert!(
                started.elapsed() < DEADLINE,
                "readers stalled at {}/{total}",
                consumed.load(Ordering::Acquire)
            );
            thread::sleep(Duration::from_millis(1));
        }
        pool.stop();

        reader_threads
            .into_iter()
            .flat_map(|r| r.join().expect("reader panicked"))
            .collect()
    })
}

fn expected_stamps(writers: u64, per_writer: u64) -> Vec<u64> {
    let mut all: Vec<u64> = (0..writers)
        .flat_map(|w| (0..per_writer).map(move |seq| stamp(w, seq)))
        .collect();
    all.sort_unstable();
    all
}

#[test]
fn every_write_is_read_exactly_once() {
    let pool = SlotPool::<u64>::new(PoolConfig::new(5, SLOT_SIZE));
    let (writers, readers, per_writer) = (3, 4, 2_000);

    let started = Instant::now();
    let mut seen = run_handoff(&pool, writers, readers, per_writer, false);
    log!(
        "[HANDOFF] {} payloads through {} slots in {:?}",
        seen.len(),
        pool.slot_count(),
        started.elapsed()
    );

    seen.sort_unstable();
    assert_eq!(seen, expected_stamps(writers, per_writer));
    assert!(pool.slot_states().iter().all(|&s| s == SlotState::Drained));
}

#[test]
fn single_slot_ping_pong_stays_live() {
    let pool = SlotPool::<u64>::new(PoolConfig::new(1, SLOT_SIZE));
    let (writers, readers, per_writer) = (4, 4, 500);

    let mut seen = run_handoff(&pool, writers, readers, per_writer, false);
    seen.sort_unstable();
    assert_eq!(seen, expected_stamps(writers, per_writer));
}

#[test]
fn bounded_claims_deliver_everything() {
    let pool = SlotPool::<u64>::new(PoolConfig::new(2, SLOT_SIZE));
    let (writers, readers, per_writer) = (2, 3, 1_000);

    let mut seen = run_handoff(&pool, writers, readers, per_writer, true);
    seen.sort_unstable();
    assert_eq!(seen, expected_stamps(writers, per_writer));
}

#[test]
fn stop_unblocks_every_waiter() {
    let pool = SlotPool::<u64>::new(PoolConfig::new(2, SLOT_SIZE));
    // Both slots held for reading: writers find nothing drained and readers
    // find nothing written.
    drop(pool.claim_for_write().unwrap());
    drop(pool.claim_for_write().unwrap());
    let _r0 = pool.claim_for_read().unwrap();
    let _r1 = pool.claim_for_read().unwrap();

    thread::scope(|s| {
        let mut blocked = Vec::new();
        for _ in 0..4 {
            blocked.push(s.spawn(|| pool.claim_for_write().map(|h| h.index())));
            blocked.push(s.spawn(|| pool.claim_for_read().map(|h| h.index())));
        }

        thread::sleep(Duration::from_millis(50));
        let stopped_at = Instant::now();
        pool.stop();

        for b in blocked {
            assert_eq!(b.join().unwrap(), Err(PoolStopped));
        }
        log!("[STOP] all waiters released in {:?}", stopped_at.elapsed());
        assert!(stopped_at.elapsed() < DEADLINE);
    });
}

#[test]
fn stop_interrupts_bounded_claims_before_deadline() {
    let pool = SlotPool::<u64>::new(PoolConfig::new(1, SLOT_SIZE));
    // The only slot is held for writing: bounded writers and readers both park.
    let _held = pool.claim_for_write().unwrap();

    thread::scope(|s| {
        let writer = s.spawn(|| {
            let started = Instant::now();
            let claim = pool.claim_for_write_timeout(DEADLINE).map(|h| h.index());
            (claim, started.elapsed())
        });
        let reader = s.spawn(|| {
            let started = Instant::now();
            let claim = pool.claim_for_read_timeout(DEADLINE).map(|h| h.index());
            (claim, started.elapsed())
        });

        thread::sleep(Duration::from_millis(50));
        pool.stop();

        for (claim, waited) in [writer.join().unwrap(), reader.join().unwrap()] {
            assert_eq!(claim, Err(ClaimError::Stopped(PoolStopped)));
            assert!(waited < DEADLINE, "stop took {waited:?}");
            log!("[STOP] bounded claim released after {waited:?}");
        }
    });
}

#[test]
fn panicking_writer_still_publishes() {
    let pool = SlotPool::<u64>::new(PoolConfig::new(1, SLOT_SIZE));

    let outcome = thread::scope(|s| {
        s.spawn(|| {
            let mut handle = pool.claim_for_write().unwrap();
            handle.fill(42);
            if handle[0] == 42 {
                panic!("writer failed after filling");
            }
        })
        .join()
    });
    assert!(outcome.is_err(), "writer thread should have panicked");
    assert_eq!(pool.state_of(0), Some(SlotState::Written));

    let handle = pool.claim_for_read().unwrap();
    assert_eq!(handle.index(), 0);
    assert!(handle.iter().all(|&v| v == 42));
}

#[test]
fn panicking_reader_does_not_strand_slot() {
    let pool = SlotPool::<u64>::new(PoolConfig::new(1, SLOT_SIZE));
    drop(pool.claim_for_write().unwrap());

    let result = catch_unwind(AssertUnwindSafe(|| {
        let handle = pool.claim_for_read().unwrap();
        assert_eq!(handle[0], 1, "deliberate mismatch");
    }));
    assert!(result.is_err());

    // The slot came back around and a writer can claim it again.
    let handle = pool
        .claim_for_write_timeout(Duration::from_secs(5))
        .expect("slot 0 should be drained after the reader unwound");
    assert_eq!(handle.index(), 0);
}
