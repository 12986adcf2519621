use std::time::Duration;

/// Returned by a claim once the pool has been stopped.
///
/// This is the normal shutdown notice, not a fault: a worker that gets it
/// should stop working rather than retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("slot pool stopped")]
pub struct PoolStopped;

/// Failure of a non-blocking or deadline-bounded claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ClaimError {
    #[error(transparent)]
    Stopped(#[from] PoolStopped),

    /// A single scan found nothing eligible (`try_claim_*` only).
    #[error("no slot is eligible right now")]
    WouldBlock,

    /// The deadline passed with nothing eligible.
    #[error("no slot became eligible within {0:?}")]
    TimedOut(Duration),
}

impl ClaimError {
    /// True if this error is the pool shutdown notice.
    pub fn is_stopped(&self) -> bool {
        matches!(self, ClaimError::Stopped(_))
    }
}
