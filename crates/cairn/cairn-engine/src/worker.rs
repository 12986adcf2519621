use crate::payload::{stamp, verify};
use crate::stats::EngineStats;
use cairn_perf_recorder::{PerfRecorder, PerfStage};
use cairn_pool::{ClaimError, SlotPool};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Everything a worker thread needs, cloned once per spawn.
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub pool: Arc<SlotPool<u8>>,
    pub stats: Arc<EngineStats>,
    pub hold: Duration,
    pub claim_timeout: Option<Duration>,
}

/// Claims, stamps and publishes slots until the pool stops.
pub(crate) fn run_writer(id: usize, ctx: WorkerContext) -> PerfRecorder {
    let mut rec = PerfRecorder::new();
    let mut seq: u64 = 0;
    tracing::debug!(writer = id, "writer started");

    loop {
        rec.begin(PerfStage::WriteCycle);
        rec.begin(PerfStage::ClaimWrite);
        let claim = match ctx.claim_timeout {
            Some(timeout) => ctx.pool.claim_for_write_timeout(timeout),
            None => ctx.pool.claim_for_write().map_err(ClaimError::from),
        };
        rec.end(PerfStage::ClaimWrite);

        let mut handle = match claim {
            Ok(handle) => handle,
            Err(ClaimError::TimedOut(waited)) => {
                ctx.stats.record_timeout();
                tracing::warn!(writer = id, ?waited, "no drained slot, retrying");
                continue;
            }
            Err(_) => break,
        };
        tracing::debug!(writer = id, "claimed slot {} for write", handle.index());

        rec.begin(PerfStage::FillPayload);
        handle.fill(stamp(id, seq));
        rec.end(PerfStage::FillPayload);

        if !ctx.hold.is_zero() {
            thread::sleep(ctx.hold);
        }
        handle.release();
        rec.end(PerfStage::WriteCycle);

        ctx.stats.record_write();
        seq += 1;
    }

    tracing::debug!(writer = id, writes = seq, "writer exiting");
    rec
}

/// Claims, verifies and drains slots until the pool stops.
pub(crate) fn run_reader(id: usize, ctx: WorkerContext) -> PerfRecorder {
    let mut rec = PerfRecorder::new();
    let mut reads: u64 = 0;
    tracing::debug!(reader = id, "reader started");

    loop {
        rec.begin(PerfStage::ReadCycle);
        rec.begin(PerfStage::ClaimRead);
        let claim = match ctx.claim_timeout {
            Some(timeout) => ctx.pool.claim_for_read_timeout(timeout),
            None => ctx.pool.claim_for_read().map_err(ClaimError::from),
        };
        rec.end(PerfStage::ClaimRead);

        let handle = match claim {
            Ok(handle) => handle,
            Err(ClaimError::TimedOut(waited)) => {
                ctx.stats.record_timeout();
                tracing::warn!(reader = id, ?waited, "no written slot, retrying");
                continue;
            }
            Err(_) => break,
        };
        let index = handle.index();
        tracing::debug!(reader = id, "claimed slot {index} for read");

        rec.begin(PerfStage::VerifyPayload);
        let torn = !verify(&handle);
        rec.end(PerfStage::VerifyPayload);
        if torn {
            tracing::error!(reader = id, slot = index, "torn read: slot payload is not uniform");
        }

        if !ctx.hold.is_zero() {
            thread::sleep(ctx.hold);
        }
        handle.release();
        rec.end(PerfStage::ReadCycle);

        ctx.stats.record_read(torn);
        reads += 1;
    }

    tracing::debug!(reader = id, reads, "reader exiting");
    rec
}
