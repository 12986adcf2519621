//! Per-stage latency recorder for cairn worker loops.
//!
//! When the `record` feature is **off** (default), `PerfRecorder` is a
//! zero-sized type and every method is an `#[inline(always)]` no-op.
//!
//! When `record` is **on**, each stage gets a pre-allocated `[u64; MAX_SAMPLES]`
//! buffer (~3 MB per recorder) and `begin`/`end` pairs store elapsed
//! nanoseconds via `clock_gettime(CLOCK_MONOTONIC)`. Each worker thread owns
//! its recorder; nothing here is shared.

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PerfStage {
    /// Time spent inside `claim_for_write`, including any wait.
    ClaimWrite = 0,
    /// Time spent inside `claim_for_read`, including any wait.
    ClaimRead = 1,
    FillPayload = 2,
    VerifyPayload = 3,
    /// Claim through release, writer side.
    WriteCycle = 4,
    /// Claim through release, reader side.
    ReadCycle = 5,
}

pub const NUM_STAGES: usize = 6;
pub const MAX_SAMPLES: usize = 65_536; // 64K per stage

pub const ALL_STAGES: [PerfStage; NUM_STAGES] = [
    PerfStage::ClaimWrite,
    PerfStage::ClaimRead,
    PerfStage::FillPayload,
    PerfStage::VerifyPayload,
    PerfStage::WriteCycle,
    PerfStage::ReadCycle,
];

impl PerfStage {
    pub fn name(self) -> &'static str {
        match self {
            PerfStage::ClaimWrite => "ClaimWrite",
            PerfStage::ClaimRead => "ClaimRead",
            PerfStage::FillPayload => "FillPayload",
            PerfStage::VerifyPayload => "VerifyPayload",
            PerfStage::WriteCycle => "WriteCycle",
            PerfStage::ReadCycle => "ReadCycle",
        }
    }
}

// ─── Feature: record ON ─────────────────────────────────────────────────────

#[cfg(feature = "record")]
mod inner {
    use super::*;

    /// Monotonic nanoseconds; only differences are meaningful.
    #[inline(always)]
    fn now_ns() -> u64 {
        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        // SAFETY: `ts` is a valid out-pointer for the duration of the call.
        unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
        ts.tv_sec as u64 * 1_000_000_000 + ts.tv_nsec as u64
    }

    struct StageBuf {
        samples: Box<[u64]>,
        count: usize,
        pending: u64,
    }

    impl StageBuf {
        fn new() -> Self {
            Self {
                samples: vec![0u64; MAX_SAMPLES].into_boxed_slice(),
                count: 0,
                pending: 0,
            }
        }

        #[inline(always)]
        fn push(&mut self, sample: u64) {
            if self.count < MAX_SAMPLES {
                self.samples[self.count] = sample;
                self.count += 1;
            }
        }
    }

    pub struct PerfRecorder {
        stages: Vec<StageBuf>,
    }

    impl PerfRecorder {
        pub fn new() -> Self {
            Self {
                stages: (0..NUM_STAGES).map(|_| StageBuf::new()).collect(),
            }
        }

        #[inline(always)]
        pub fn begin(&mut self, stage: PerfStage) {
            self.stages[stage as usize].pending = now_ns();
        }

        #[inline(always)]
        pub fn end(&mut self, stage: PerfStage) {
            let buf = &mut self.stages[stage as usize];
            let elapsed = now_ns().saturating_sub(buf.pending);
            buf.push(elapsed);
        }

        #[inline(always)]
        pub fn record(&mut self, stage: PerfStage, duration_ns: u64) {
            self.stages[stage as usize].push(duration_ns);
        }

        pub fn samples(&self, stage: PerfStage) -> &[u64] {
            let buf = &self.stages[stage as usize];
            &buf.samples[..buf.count]
        }

        pub fn count(&self, stage: PerfStage) -> usize {
            self.stages[stage as usize].count
        }

        pub fn reset(&mut self) {
            for buf in self.stages.iter_mut() {
                buf.count = 0;
            }
        }
    }

    impl Default for PerfRecorder {
        fn default() -> Self {
            Self::new()
        }
    }
}

// ─── Feature: record OFF (zero-cost stubs) ──────────────────────────────────

#[cfg(not(feature = "record"))]
mod inner {
    use super::*;

    pub struct PerfRecorder;

    impl PerfRecorder {
        #[inline(always)]
        pub fn new() -> Self {
            Self
        }
        #[inline(always)]
        pub fn begin(&mut self, _stage: PerfStage) {}
        #[inline(always)]
        pub fn end(&mut self, _stage: PerfStage) {}
        #[inline(always)]
        pub fn record(&mut self, _stage: PerfStage, _duration_ns: u64) {}
        #[inline(always)]
        pub fn samples(&self, _stage: PerfStage) -> &[u64] {
            &[]
        }
        #[inline(always)]
        pub fn count(&self, _stage: PerfStage) -> usize {
            0
        }
        #[inline(always)]
        pub fn reset(&mut self) {}
    }

    impl Default for PerfRecorder {
        fn default() -> Self {
            Self
        }
    }
}

pub use inner::PerfRecorder;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_indices_match_table() {
        for (i, stage) in ALL_STAGES.iter().enumerate() {
            assert_eq!(*stage as usize, i, "{} out of order", stage.name());
        }
    }

    #[cfg(not(feature = "record"))]
    #[test]
    fn disabled_recorder_is_zero_sized() {
        let mut rec = PerfRecorder::new();
        rec.begin(PerfStage::ClaimWrite);
        rec.end(PerfStage::ClaimWrite);
        assert_eq!(std::mem::size_of::<PerfRecorder>(), 0);
        assert!(rec.samples(PerfStage::ClaimWrite).is_empty());
    }

    #[cfg(feature = "record")]
    #[test]
    fn enabled_recorder_keeps_samples() {
        let mut rec = PerfRecorder::new();
        rec.begin(PerfStage::ReadCycle);
        rec.end(PerfStage::ReadCycle);
        rec.record(PerfStage::ReadCycle, 42);
        assert_eq!(rec.count(PerfStage::ReadCycle), 2);
        assert_eq!(rec.samples(PerfStage::ReadCycle)[1], 42);
        rec.reset();
        assert_eq!(rec.count(PerfStage::ReadCycle), 0);
    }

    #[cfg(feature = "record")]
    #[test]
    fn buffer_saturates_at_capacity() {
        let mut rec = PerfRecorder::new();
        for i in 0..(MAX_SAMPLES as u64 + 10) {
            rec.record(PerfStage::ClaimRead, i);
        }
        assert_eq!(rec.count(PerfStage::ClaimRead), MAX_SAMPLES);
    }
}
