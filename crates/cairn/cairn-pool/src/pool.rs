//! Fixed set of fungible slots shared by any number of writers and readers.
//!
//! # Design
//! - **Writers** claim any `Drained` slot, fill it, and publish it by dropping
//!   their [`WriteHandle`].
//! - **Readers** claim any `Written` slot, consume it, and drain it by dropping
//!   their [`ReadHandle`].
//! - Claims scan slots in index order and take the first eligible one, so among
//!   equally eligible slots the lowest index wins. There is no FIFO ordering
//!   between writes and reads.
//! - A claim that finds nothing blocks on its role's waiter group until a
//!   release of the opposite role or [`SlotPool::stop`].
//!
//! # Sharing
//! `SlotPool` is `Sync` for `T: Send + Sync`. Hand it to workers by reference
//! (`std::thread::scope`) or through an `Arc`; handles borrow from the pool.

use crate::config::PoolConfig;
use crate::error::{ClaimError, PoolStopped};
use crate::handle::{ReadHandle, WriteHandle};
use crate::signal::{SignalChannel, WaitOutcome, WaiterGroup};
use crate::slot::{Slot, SlotState};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Writer,
    Reader,
}

impl Role {
    fn as_str(self) -> &'static str {
        match self {
            Role::Writer => "write",
            Role::Reader => "read",
        }
    }
}

/// A pool of `slot_count` slots holding `slot_size` elements of `T` each.
pub struct SlotPool<T> {
    slots: Box<[Slot<T>]>,
    signals: SignalChannel,
    stopped: AtomicBool,
    config: PoolConfig,
}

impl<T: Default> SlotPool<T> {
    /// Allocates every slot up front, all `Drained`, payloads set to
    /// `T::default()`.
    pub fn new(config: PoolConfig) -> Self {
        let slots = (0..config.slot_count)
            .map(|_| Slot::new(config.slot_size))
            .collect();
        tracing::debug!(
            slot_count = config.slot_count,
            slot_size = config.slot_size,
            "slot pool created"
        );
        Self {
            slots,
            signals: SignalChannel::new(),
            stopped: AtomicBool::new(false),
            config,
        }
    }
}

impl<T> SlotPool<T> {
    /// Blocks until a `Drained` slot can be claimed for writing.
    ///
    /// # Errors
    /// [`PoolStopped`] once [`stop`](Self::stop) has been called, including
    /// for callers already blocked here.
    pub fn claim_for_write(&self) -> Result<WriteHandle<'_, T>, PoolStopped> {
        let index = self.acquire(Role::Writer, None).map_err(stopped_only)?;
        Ok(WriteHandle::new(self, index))
    }

    /// Blocks until a `Written` slot can be claimed for reading.
    ///
    /// # Errors
    /// [`PoolStopped`] once [`stop`](Self::stop) has been called.
    pub fn claim_for_read(&self) -> Result<ReadHandle<'_, T>, PoolStopped> {
        let index = self.acquire(Role::Reader, None).map_err(stopped_only)?;
        Ok(ReadHandle::new(self, index))
    }

    /// Like [`claim_for_write`](Self::claim_for_write), giving up after
    /// `timeout` with [`ClaimError::TimedOut`].
    pub fn claim_for_write_timeout(
        &self,
        timeout: Duration,
    ) -> Result<WriteHandle<'_, T>, ClaimError> {
        let index = self.acquire(Role::Writer, Some(timeout))?;
        Ok(WriteHandle::new(self, index))
    }

    /// Like [`claim_for_read`](Self::claim_for_read), giving up after
    /// `timeout` with [`ClaimError::TimedOut`].
    pub fn claim_for_read_timeout(
        &self,
        timeout: Duration,
    ) -> Result<ReadHandle<'_, T>, ClaimError> {
        let index = self.acquire(Role::Reader, Some(timeout))?;
        Ok(ReadHandle::new(self, index))
    }

    /// One scan for a `Drained` slot, never blocks.
    pub fn try_claim_for_write(&self) -> Result<WriteHandle<'_, T>, ClaimError> {
        let index = self.try_acquire(Role::Writer)?;
        Ok(WriteHandle::new(self, index))
    }

    /// One scan for a `Written` slot, never blocks.
    pub fn try_claim_for_read(&self) -> Result<ReadHandle<'_, T>, ClaimError> {
        let index = self.try_acquire(Role::Reader)?;
        Ok(ReadHandle::new(self, index))
    }

    /// Stops the pool: every blocked and every future claim returns
    /// [`PoolStopped`]. Idempotent and irreversible.
    ///
    /// Handles already issued stay valid and release normally.
    pub fn stop(&self) {
        let was_stopped = self.stopped.swap(true, Ordering::AcqRel);
        self.signals.wake_all();
        if !was_stopped {
            tracing::debug!("slot pool stopped");
        }
    }

    /// Whether [`stop`](Self::stop) has been called.
    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    #[inline]
    pub fn config(&self) -> PoolConfig {
        self.config
    }

    #[inline]
    pub fn slot_count(&self) -> usize {
        self.config.slot_count
    }

    #[inline]
    pub fn slot_size(&self) -> usize {
        self.config.slot_size
    }

    /// State of slot `index`, or `None` if out of range.
    pub fn state_of(&self, index: usize) -> Option<SlotState> {
        self.slots.get(index).map(Slot::state)
    }

    /// Per-slot state snapshot. Each entry is read under its own slot lock;
    /// the vector as a whole is not an atomic picture of the pool.
    pub fn slot_states(&self) -> Vec<SlotState> {
        self.slots.iter().map(Slot::state).collect()
    }

    #[inline]
    pub(crate) fn slot(&self, index: usize) -> &Slot<T> {
        &self.slots[index]
    }

    pub(crate) fn release_write(&self, index: usize) {
        self.slots[index].release_write(&self.signals);
        tracing::trace!(slot = index, "slot published");
    }

    pub(crate) fn release_read(&self, index: usize) {
        self.slots[index].release_read(&self.signals);
        tracing::trace!(slot = index, "slot drained");
    }

    fn waiters(&self, role: Role) -> &WaiterGroup {
        match role {
            Role::Writer => &self.signals.writers,
            Role::Reader => &self.signals.readers,
        }
    }

    /// First eligible slot in index order, claimed for `role`.
    fn scan(&self, role: Role) -> Option<usize> {
        self.slots.iter().position(|slot| match role {
            Role::Writer => slot.try_claim_for_write(),
            Role::Reader => slot.try_claim_for_read(),
        })
    }

    fn try_acquire(&self, role: Role) -> Result<usize, ClaimError> {
        if self.is_stopped() {
            return Err(PoolStopped.into());
        }
        let index = self.scan(role).ok_or(ClaimError::WouldBlock)?;
        tracing::trace!(slot = index, role = role.as_str(), "slot claimed");
        Ok(index)
    }

    /// The claim loop: scan, and if nothing is eligible, wait on the role's
    /// waiter group until a release moves its epoch or the pool stops.
    fn acquire(&self, role: Role, timeout: Option<Duration>) -> Result<usize, ClaimError> {
        // A deadline past the clock's range waits like an unbounded claim.
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let waiters = self.waiters(role);

        while !self.is_stopped() {
            // Sampled before the scan so a release racing the scan is seen.
            let observed = waiters.epoch();
            if let Some(index) = self.scan(role) {
                tracing::trace!(slot = index, role = role.as_str(), "slot claimed");
                return Ok(index);
            }
            if waiters.wait(observed, &self.stopped, deadline) == WaitOutcome::TimedOut {
                return self.final_scan(role, timeout.unwrap_or_default());
            }
        }
        Err(PoolStopped.into())
    }

    /// Last scan once the deadline has passed, so a release that landed right
    /// at the deadline is still claimed instead of reported as a timeout.
    fn final_scan(&self, role: Role, waited: Duration) -> Result<usize, ClaimError> {
        let index = self.scan(role).ok_or(ClaimError::TimedOut(waited))?;
        tracing::trace!(slot = index, role = role.as_str(), "slot claimed at deadline");
        Ok(index)
    }
}

/// Unbounded claims cannot time out or bail on an empty scan.
fn stopped_only(err: ClaimError) -> PoolStopped {
    debug_assert!(err.is_stopped(), "unbounded claim failed with {err:?}");
    PoolStopped
}

impl<T> fmt::Debug for SlotPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotPool")
            .field("config", &self.config)
            .field("stopped", &self.is_stopped())
            .field("slots", &self.slot_states())
            .finish()
    }
}
