//! Scope-bound claim tokens.
//!
//! A successful claim returns a [`WriteHandle`] or [`ReadHandle`]. The handle
//! is the claim: while it lives, its holder has exclusive access to one slot's
//! payload; when it goes away, the slot advances exactly one step and the
//! opposite waiter group is woken.
//!
//! Release is tied to `Drop`, so it runs on every exit path: falling out of
//! scope, early return, `?`, and panic unwinding. Moving a handle moves the
//! release duty with it; the moved-from binding is gone and drops nothing.
//! [`WriteHandle::release`] / [`ReadHandle::release`] end a claim early; the
//! `live` marker turns the drop that follows into a no-op.

use crate::pool::SlotPool;
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Exclusive claim on a slot in the `Writing` state.
///
/// Dropping it moves the slot to `Written` and wakes one blocked reader.
#[must_use = "dropping the handle immediately publishes the slot"]
pub struct WriteHandle<'a, T> {
    pool: &'a SlotPool<T>,
    index: usize,
    live: bool,
}

/// Claim on a slot in the `Reading` state. Grants a read-only view.
///
/// Dropping it moves the slot back to `Drained` and wakes one blocked writer.
#[must_use = "dropping the handle immediately drains the slot"]
pub struct ReadHandle<'a, T> {
    pool: &'a SlotPool<T>,
    index: usize,
    live: bool,
}

impl<'a, T> WriteHandle<'a, T> {
    /// Binds a handle to a slot the caller has just moved to `Writing`.
    pub(crate) fn new(pool: &'a SlotPool<T>, index: usize) -> Self {
        Self {
            pool,
            index,
            live: true,
        }
    }

    /// Index of the claimed slot.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Mutable view of the slot's payload (`slot_size` elements).
    #[inline]
    pub fn payload_mut(&mut self) -> &mut [T] {
        // SAFETY: this handle owns the slot's Writing claim and `&mut self`
        // rules out a second borrow through the same handle.
        unsafe { self.pool.slot(self.index).payload_mut() }
    }

    /// Read-only view of the payload written so far.
    #[inline]
    pub fn payload(&self) -> &[T] {
        // SAFETY: this handle owns the slot's Writing claim.
        unsafe { self.pool.slot(self.index).payload() }
    }

    /// Publishes the slot now instead of at end of scope.
    pub fn release(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if std::mem::replace(&mut self.live, false) {
            self.pool.release_write(self.index);
        }
    }
}

impl<'a, T> ReadHandle<'a, T> {
    /// Binds a handle to a slot the caller has just moved to `Reading`.
    pub(crate) fn new(pool: &'a SlotPool<T>, index: usize) -> Self {
        Self {
            pool,
            index,
            live: true,
        }
    }

    /// Index of the claimed slot.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Read-only view of the slot's payload (`slot_size` elements).
    #[inline]
    pub fn payload(&self) -> &[T] {
        // SAFETY: this handle owns the slot's Reading claim; no writer can
        // reach the slot until it is drained.
        unsafe { self.pool.slot(self.index).payload() }
    }

    /// Drains the slot now instead of at end of scope.
    pub fn release(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if std::mem::replace(&mut self.live, false) {
            self.pool.release_read(self.index);
        }
    }
}

impl<T> Drop for WriteHandle<'_, T> {
    fn drop(&mut self) {
        self.finish();
    }
}

impl<T> Drop for ReadHandle<'_, T> {
    fn drop(&mut self) {
        self.finish();
    }
}

impl<T> Deref for WriteHandle<'_, T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        self.payload()
    }
}

impl<T> DerefMut for WriteHandle<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        self.payload_mut()
    }
}

impl<T> Deref for ReadHandle<'_, T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        self.payload()
    }
}

impl<T> fmt::Debug for WriteHandle<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteHandle")
            .field("index", &self.index)
            .field("live", &self.live)
            .finish()
    }
}

impl<T> fmt::Debug for ReadHandle<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadHandle")
            .field("index", &self.index)
            .field("live", &self.live)
            .finish()
    }
}
