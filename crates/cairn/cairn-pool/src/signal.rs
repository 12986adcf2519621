//! Wake-up plumbing shared by every slot in a pool.
//!
//! A [`SignalChannel`] holds two independent waiter groups: one for threads
//! waiting to write, one for threads waiting to read. A release wakes only the
//! opposite group, so a slot becoming readable never disturbs blocked writers.
//!
//! # Missed-wakeup protection
//!
//! Each group carries a wake *epoch* guarded by its lock. The claim protocol is:
//!
//! ```text
//! claimer                               releaser
//! ───────                               ────────
//! e = group.epoch()                     slot.state = next
//! scan slots -> nothing                 lock; epoch += 1; unlock
//! lock; wait while epoch == e           notify_one
//!       && !stopped
//! ```
//!
//! Because `e` is sampled before the scan and the wait re-checks the epoch
//! under the same lock the releaser bumps it under, a release that lands
//! between the failed scan and the wait makes the predicate false and the
//! claimer rescans instead of sleeping.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Result of blocking on a waiter group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WaitOutcome {
    /// Woken by a release, by stop, or the epoch had already moved. Rescan.
    Rescan,
    /// The deadline passed while the predicate still held.
    TimedOut,
}

/// One (lock, condition) pair plus its wake epoch.
#[derive(Debug, Default)]
pub(crate) struct WaiterGroup {
    epoch: Mutex<u64>,
    cond: Condvar,
}

impl WaiterGroup {
    /// Samples the current wake epoch. Call before scanning.
    #[inline]
    pub(crate) fn epoch(&self) -> u64 {
        *self.epoch.lock()
    }

    /// Records one release and wakes a single waiter of this group.
    pub(crate) fn notify_one(&self) {
        {
            let mut epoch = self.epoch.lock();
            *epoch = epoch.wrapping_add(1);
        }
        self.cond.notify_one();
    }

    /// Wakes every waiter of this group.
    ///
    /// The lock is taken so that a waiter which checked `stopped` just before
    /// the flag flipped is already parked when the broadcast fires.
    pub(crate) fn notify_all(&self) {
        let _guard = self.epoch.lock();
        self.cond.notify_all();
    }

    /// Blocks until the epoch moves past `observed`, `stopped` is set, or
    /// `deadline` passes.
    pub(crate) fn wait(
        &self,
        observed: u64,
        stopped: &AtomicBool,
        deadline: Option<Instant>,
    ) -> WaitOutcome {
        let mut epoch = self.epoch.lock();
        let unchanged = |e: &mut u64| *e == observed && !stopped.load(Ordering::Acquire);
        match deadline {
            None => {
                self.cond.wait_while(&mut epoch, unchanged);
                WaitOutcome::Rescan
            }
            Some(deadline) => {
                let result = self.cond.wait_while_until(&mut epoch, unchanged, deadline);
                if result.timed_out() {
                    WaitOutcome::TimedOut
                } else {
                    WaitOutcome::Rescan
                }
            }
        }
    }
}

/// The two waiter groups of a pool.
#[derive(Debug, Default)]
pub(crate) struct SignalChannel {
    pub(crate) writers: WaiterGroup,
    pub(crate) readers: WaiterGroup,
}

impl SignalChannel {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A slot became writable.
    #[inline]
    pub(crate) fn wake_writer(&self) {
        self.writers.notify_one();
    }

    /// A slot became readable.
    #[inline]
    pub(crate) fn wake_reader(&self) {
        self.readers.notify_one();
    }

    /// Wakes every blocked writer and reader so they can observe a stop.
    pub(crate) fn wake_all(&self) {
        self.writers.notify_all();
        self.readers.notify_all();
    }
}
