//! Pool shape: how many slots and how many elements each slot holds.
//!
//! Both values are fixed for the lifetime of a [`SlotPool`](crate::SlotPool).
//! Every slot is allocated up front when the pool is built; nothing is
//! allocated on the claim/release path.

/// Configuration for a slot pool.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of slots in the pool. Must be at least 1.
    pub slot_count: usize,
    /// Number of payload elements per slot. Must be at least 1.
    pub slot_size: usize,
}

impl PoolConfig {
    /// Creates a pool configuration.
    ///
    /// # Panics
    /// Panics if `slot_count` or `slot_size` is zero.
    ///
    /// # Example
    /// ```
    /// use cairn_pool::PoolConfig;
    /// let cfg = PoolConfig::new(5, 500); // 5 slots of 500 elements
    /// // PoolConfig::new(0, 500);        // Would panic: empty pool
    /// ```
    pub fn new(slot_count: usize, slot_size: usize) -> Self {
        assert!(slot_count > 0, "Slot count must be non-zero");
        assert!(slot_size > 0, "Slot size must be non-zero");
        Self {
            slot_count,
            slot_size,
        }
    }

    /// Total payload elements held by the pool, across all slots.
    ///
    /// # Example
    /// ```
    /// use cairn_pool::PoolConfig;
    /// assert_eq!(PoolConfig::new(4, 64).total_elements(), 256);
    /// ```
    #[inline]
    pub fn total_elements(&self) -> usize {
        self.slot_count.saturating_mul(self.slot_size)
    }
}
