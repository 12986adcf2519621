//! Blocking slot pool for handing fixed-size buffers between writer and
//! reader threads.
//!
//! * [`SlotPool`] – `slot_count` fungible slots; any idle writer claims any
//!   drained slot, any idle reader claims any written slot.
//! * [`WriteHandle`] / [`ReadHandle`] – scope-bound claims; dropping one
//!   advances its slot exactly once, on every exit path including panics.
//! * [`PoolStopped`] – the shutdown notice returned by claims after
//!   [`SlotPool::stop`].
//!
//! ```
//! use cairn_pool::{PoolConfig, SlotPool};
//!
//! let pool = SlotPool::<u8>::new(PoolConfig::new(3, 1));
//! {
//!     let mut w = pool.claim_for_write().unwrap();
//!     w[0] = 0xAB;
//! }
//! let r = pool.claim_for_read().unwrap();
//! assert_eq!((r.index(), r[0]), (0, 0xAB));
//! ```

mod config;
mod error;
mod handle;
mod pool;
mod signal;
mod slot;

pub use config::PoolConfig;
pub use error::{ClaimError, PoolStopped};
pub use handle::{ReadHandle, WriteHandle};
pub use pool::SlotPool;
pub use slot::SlotState;
