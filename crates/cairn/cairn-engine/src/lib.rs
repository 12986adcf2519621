//! Writer/reader harness around a shared [`SlotPool`].
//!
//! [`Engine::start`] spawns `writers` threads that stamp whole slots and
//! `readers` threads that check every byte of each slot they consume. A read
//! that does not see one uniform stamp means two claims overlapped; it is
//! counted in [`StatsSnapshot::torn_reads`].

mod payload;
mod stats;
mod worker;

pub use cairn_perf_recorder::PerfRecorder;
pub use payload::{stamp, verify};
pub use stats::{EngineStats, StatsSnapshot};

use cairn_config::{CairnConfig, ConfigError};
use cairn_pool::{PoolConfig, SlotPool};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use worker::{WorkerContext, run_reader, run_writer};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to spawn {name}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{name} panicked")]
    WorkerPanicked { name: String },
}

struct Worker {
    name: String,
    handle: JoinHandle<PerfRecorder>,
}

/// Final counters plus each worker's recorder, in spawn order.
pub struct EngineReport {
    pub stats: StatsSnapshot,
    pub writers: Vec<PerfRecorder>,
    pub readers: Vec<PerfRecorder>,
}

pub struct Engine {
    pool: Arc<SlotPool<u8>>,
    stats: Arc<EngineStats>,
    writers: Vec<Worker>,
    readers: Vec<Worker>,
}

impl Engine {
    pub fn start(config: &CairnConfig) -> Result<Self, EngineError> {
        config.validate()?;

        let pool = Arc::new(SlotPool::new(PoolConfig::new(
            config.pool.slot_count,
            config.pool.slot_size,
        )));
        let mut engine = Engine {
            pool: Arc::clone(&pool),
            stats: Arc::new(EngineStats::default()),
            writers: Vec::with_capacity(config.writers),
            readers: Vec::with_capacity(config.readers),
        };

        let claim_timeout = config.pacing.claim_timeout();
        let writer_ctx = WorkerContext {
            pool: Arc::clone(&pool),
            stats: Arc::clone(&engine.stats),
            hold: config.pacing.writer_hold(),
            claim_timeout,
        };
        let reader_ctx = WorkerContext {
            hold: config.pacing.reader_hold(),
            ..writer_ctx.clone()
        };

        // On a spawn failure `engine` drops here, which stops the pool so the
        // workers already running exit on their own.
        for id in 0..config.writers {
            let ctx = writer_ctx.clone();
            let worker = spawn(format!("cairn-writer-{id}"), move || run_writer(id, ctx))?;
            engine.writers.push(worker);
        }
        for id in 0..config.readers {
            let ctx = reader_ctx.clone();
            let worker = spawn(format!("cairn-reader-{id}"), move || run_reader(id, ctx))?;
            engine.readers.push(worker);
        }

        tracing::info!(
            writers = config.writers,
            readers = config.readers,
            slot_count = config.pool.slot_count,
            slot_size = config.pool.slot_size,
            "engine started"
        );
        Ok(engine)
    }

    #[inline]
    pub fn pool(&self) -> &Arc<SlotPool<u8>> {
        &self.pool
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Stops the pool. Workers finish the slot they hold, then exit.
    pub fn stop(&self) {
        self.pool.stop();
    }

    /// Stops the pool and waits for every worker.
    ///
    /// # Errors
    /// [`EngineError::WorkerPanicked`] naming the first worker that panicked.
    /// Every worker is joined before the error is returned.
    pub fn join(mut self) -> Result<EngineReport, EngineError> {
        self.stop();

        let mut panicked = None;
        let writers = join_all(std::mem::take(&mut self.writers), &mut panicked);
        let readers = join_all(std::mem::take(&mut self.readers), &mut panicked);
        if let Some(name) = panicked {
            return Err(EngineError::WorkerPanicked { name });
        }

        let stats = self.stats.snapshot();
        tracing::info!(%stats, "engine joined");
        Ok(EngineReport {
            stats,
            writers,
            readers,
        })
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.pool.stop();
    }
}

fn spawn<F>(name: String, f: F) -> Result<Worker, EngineError>
where
    F: FnOnce() -> PerfRecorder + Send + 'static,
{
    match thread::Builder::new().name(name.clone()).spawn(f) {
        Ok(handle) => Ok(Worker { name, handle }),
        Err(source) => Err(EngineError::Spawn { name, source }),
    }
}

fn join_all(workers: Vec<Worker>, panicked: &mut Option<String>) -> Vec<PerfRecorder> {
    let mut recorders = Vec::with_capacity(workers.len());
    for Worker { name, handle } in workers {
        match handle.join() {
            Ok(rec) => recorders.push(rec),
            Err(_) => {
                tracing::error!(worker = %name, "worker panicked");
                panicked.get_or_insert(name);
            }
        }
    }
    recorders
}
