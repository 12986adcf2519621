use crate::{BenchResult, compute_stats};
use cairn_perf_recorder::{ALL_STAGES, PerfRecorder, PerfStage};

/// Writer-side stages, cycle last.
pub const WRITER_STAGES: [PerfStage; 3] = [
    PerfStage::ClaimWrite,
    PerfStage::FillPayload,
    PerfStage::WriteCycle,
];

/// Reader-side stages, cycle last.
pub const READER_STAGES: [PerfStage; 3] = [
    PerfStage::ClaimRead,
    PerfStage::VerifyPayload,
    PerfStage::ReadCycle,
];

/// All samples of `stage` across `recorders`.
pub fn merged_samples(recorders: &[PerfRecorder], stage: PerfStage) -> Vec<u64> {
    recorders
        .iter()
        .flat_map(|rec| rec.samples(stage).iter().copied())
        .collect()
}

/// One `BenchResult` per stage that has samples.
pub fn stage_results(recorders: &[PerfRecorder]) -> Vec<BenchResult> {
    ALL_STAGES
        .iter()
        .filter_map(|&stage| {
            let mut samples = merged_samples(recorders, stage);
            (!samples.is_empty()).then(|| BenchResult {
                name: stage.name().to_string(),
                unit: "ns".to_string(),
                stats: compute_stats(&mut samples),
            })
        })
        .collect()
}

/// Per-stage percentiles, with each stage's p50 as a share of the cycle p50.
pub fn print_stage_table(recorders: &[PerfRecorder], stages: &[PerfStage], cycle: PerfStage) {
    println!(
        "  {:<16} {:>9} {:>9} {:>9} {:>9} {:>10} {:>8}  {:>6}",
        "Stage", "p50", "p90", "p99", "p99.9", "max", "count", "% cyc"
    );
    println!("  {}", "\u{2500}".repeat(86));

    let cycle_p50 = {
        let mut v = merged_samples(recorders, cycle);
        if v.is_empty() { 0 } else { compute_stats(&mut v).p50 }
    };

    for &stage in stages {
        let mut samples = merged_samples(recorders, stage);
        if samples.is_empty() {
            continue;
        }
        let stats = compute_stats(&mut samples);
        let pct = if stage == cycle {
            "100%".to_string()
        } else if cycle_p50 > 0 {
            format!("{:.0}%", stats.p50 as f64 / cycle_p50 as f64 * 100.0)
        } else {
            "-".to_string()
        };
        println!(
            "  {:<16} {:>9} {:>9} {:>9} {:>9} {:>10} {:>8}  {:>6}",
            stage.name(),
            stats.p50,
            stats.p90,
            stats.p99,
            stats.p999,
            stats.max,
            stats.count,
            pct
        );
    }
}

pub fn print_writer_report(recorders: &[PerfRecorder]) {
    println!("\n  Writer Per-Stage Timing (ns, {} threads):\n", recorders.len());
    print_stage_table(recorders, &WRITER_STAGES, PerfStage::WriteCycle);
}

pub fn print_reader_report(recorders: &[PerfRecorder]) {
    println!("\n  Reader Per-Stage Timing (ns, {} threads):\n", recorders.len());
    print_stage_table(recorders, &READER_STAGES, PerfStage::ReadCycle);
}
