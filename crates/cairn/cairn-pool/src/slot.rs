//! A single buffer slot and its four-state claim cycle.
//!
//! # State Cycle
//!
//! ```text
//!            try_claim_for_write            release_write
//!  ┌─────────┐ ─────────────> ┌─────────┐ ─────────────> ┌─────────┐
//!  │ Drained │                │ Writing │                │ Written │
//!  └─────────┘ <───────────── └─────────┘                └─────────┘
//!       ^        release_read  ┌─────────┐  try_claim_for_read  │
//!       └───────────────────── │ Reading │ <────────────────────┘
//!                              └─────────┘
//! ```
//!
//! Every transition happens under the slot's own lock, so two slots never
//! contend with each other. The lock covers the state only; the payload is
//! touched outside any lock by whoever holds the current claim.

use crate::signal::SignalChannel;
use parking_lot::Mutex;
use std::cell::UnsafeCell;
use std::fmt;

/// Where a slot currently is in its claim cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotState {
    /// Empty and ready for a writer. Initial state.
    Drained,
    /// Claimed by exactly one writer; invisible to readers.
    Writing,
    /// Holds unread data, ready for a reader.
    Written,
    /// Claimed by exactly one reader; not writable.
    Reading,
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SlotState::Drained => "drained",
            SlotState::Writing => "writing",
            SlotState::Written => "written",
            SlotState::Reading => "reading",
        };
        f.write_str(name)
    }
}

/// One fixed-size buffer plus its claim state.
pub(crate) struct Slot<T> {
    state: Mutex<SlotState>,
    payload: UnsafeCell<Box<[T]>>,
}

// SAFETY: the payload is only reached through a claim handle, and the state
// machine admits at most one claim per slot at a time. A write handle hands out
// `&mut [T]` on whichever thread holds it (needs `T: Send`); a read handle can
// be shared, exposing `&[T]` across threads (needs `T: Sync`).
unsafe impl<T: Send + Sync> Sync for Slot<T> {}

impl<T: Default> Slot<T> {
    pub(crate) fn new(size: usize) -> Self {
        let payload: Box<[T]> = (0..size).map(|_| T::default()).collect();
        Self {
            state: Mutex::new(SlotState::Drained),
            payload: UnsafeCell::new(payload),
        }
    }
}

impl<T> Slot<T> {
    /// Drained -> Writing. Returns `false` (and changes nothing) from any
    /// other state.
    #[inline]
    pub(crate) fn try_claim_for_write(&self) -> bool {
        self.try_advance(SlotState::Drained, SlotState::Writing)
    }

    /// Written -> Reading. Returns `false` (and changes nothing) from any
    /// other state.
    #[inline]
    pub(crate) fn try_claim_for_read(&self) -> bool {
        self.try_advance(SlotState::Written, SlotState::Reading)
    }

    /// Writing -> Written, then wakes one blocked reader.
    ///
    /// # Panics
    /// Panics if the slot is not in `Writing`. Only the write handle that owns
    /// the claim calls this, so any other state is a logic bug.
    pub(crate) fn release_write(&self, signals: &SignalChannel) {
        self.advance(SlotState::Writing, SlotState::Written);
        signals.wake_reader();
    }

    /// Reading -> Drained, then wakes one blocked writer.
    ///
    /// # Panics
    /// Panics if the slot is not in `Reading`.
    pub(crate) fn release_read(&self, signals: &SignalChannel) {
        self.advance(SlotState::Reading, SlotState::Drained);
        signals.wake_writer();
    }

    /// Current state. Only a snapshot: it may change as soon as the lock drops.
    pub(crate) fn state(&self) -> SlotState {
        *self.state.lock()
    }

    /// # Safety
    /// The caller must hold the slot's `Writing` claim.
    #[allow(clippy::mut_from_ref)]
    #[inline]
    pub(crate) unsafe fn payload_mut(&self) -> &mut [T] {
        // SAFETY: exclusivity is guaranteed by the caller's Writing claim.
        unsafe { &mut *self.payload.get() }
    }

    /// # Safety
    /// The caller must hold the slot's `Reading` claim (or `Writing`).
    #[inline]
    pub(crate) unsafe fn payload(&self) -> &[T] {
        // SAFETY: no writer can exist while the caller's claim is live.
        unsafe { &*self.payload.get() }
    }

    #[inline]
    fn try_advance(&self, from: SlotState, to: SlotState) -> bool {
        let mut state = self.state.lock();
        if *state == from {
            *state = to;
            true
        } else {
            false
        }
    }

    fn advance(&self, from: SlotState, to: SlotState) {
        let mut state = self.state.lock();
        let current = *state;
        assert!(
            current == from,
            "slot released from {current}, expected {from}; claim released twice?"
        );
        *state = to;
    }
}

impl<T> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot").field("state", &self.state()).finish()
    }
}
