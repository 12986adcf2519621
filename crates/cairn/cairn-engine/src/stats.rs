use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by every worker of one engine.
#[derive(Debug, Default)]
pub struct EngineStats {
    writes: AtomicU64,
    reads: AtomicU64,
    torn_reads: AtomicU64,
    claim_timeouts: AtomicU64,
}

/// Point-in-time copy of [`EngineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub writes: u64,
    pub reads: u64,
    pub torn_reads: u64,
    pub claim_timeouts: u64,
}

impl EngineStats {
    #[inline]
    pub(crate) fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_read(&self, torn: bool) {
        self.reads.fetch_add(1, Ordering::Relaxed);
        if torn {
            self.torn_reads.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn record_timeout(&self) {
        self.claim_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    /// Counters are read one by one; a snapshot taken while workers run may
    /// show a read before the write it consumed has been counted.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            writes: self.writes.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
            torn_reads: self.torn_reads.load(Ordering::Relaxed),
            claim_timeouts: self.claim_timeouts.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "writes={} reads={} torn={} timeouts={}",
            self.writes, self.reads, self.torn_reads, self.claim_timeouts
        )
    }
}
