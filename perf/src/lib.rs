//! Measurement helpers shared by the cairn benches and `perf_report`.
//!
//! Latencies are nanoseconds throughout: per-call costs from
//! [`measure_batched`], per-stage samples merged from worker recorders in
//! [`report`].

pub mod report;

use std::time::Instant;

// ─── Latency summary ────────────────────────────────────────────────────────

/// Summary of one set of latency samples, in nanoseconds.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Stats {
    pub count: usize,
    pub min: u64,
    pub p50: u64,
    pub p90: u64,
    pub p99: u64,
    pub p999: u64,
    pub max: u64,
    pub mean: f64,
    pub stddev: f64,
}

/// A named [`Stats`] row, as printed in tables and written to JSON.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BenchResult {
    pub name: String,
    pub unit: String,
    pub stats: Stats,
}

/// Summarises claim/cycle latencies. Sorts `samples` in place.
///
/// # Panics
/// Panics if `samples` is empty; callers skip stages nothing recorded.
pub fn compute_stats(samples: &mut [u64]) -> Stats {
    assert!(!samples.is_empty(), "cannot compute stats on empty samples");
    samples.sort_unstable();

    let n = samples.len() as f64;
    let (sum, sum_sq) = samples.iter().fold((0.0, 0.0), |(s, sq), &ns| {
        let ns = ns as f64;
        (s + ns, sq + ns * ns)
    });
    let mean = sum / n;
    // Population variance; clamp rounding noise below zero.
    let variance = (sum_sq / n - mean * mean).max(0.0);

    let at = |pct: f64| nearest_rank(samples, pct);
    Stats {
        count: samples.len(),
        min: samples[0],
        p50: at(50.0),
        p90: at(90.0),
        p99: at(99.0),
        p999: at(99.9),
        max: samples[samples.len() - 1],
        mean,
        stddev: variance.sqrt(),
    }
}

/// Sample at nearest rank `ceil(pct% * len)`, 1-based, in an ascending slice.
fn nearest_rank(ascending: &[u64], pct: f64) -> u64 {
    let rank = (pct / 100.0 * ascending.len() as f64).ceil() as usize;
    ascending[rank.clamp(1, ascending.len()) - 1]
}

// ─── Single-thread timing ───────────────────────────────────────────────────

/// Per-call cost of `op`, for claim/release paths too short to time one call
/// at a time.
///
/// Runs `warmup_batches` untimed batches, then `batches` timed batches of
/// `calls_per_batch` calls each; every timed batch contributes one sample,
/// its elapsed time divided by the call count (rounded, at least 1 ns).
pub fn measure_batched<F: FnMut()>(
    name: &str,
    batches: usize,
    calls_per_batch: usize,
    warmup_batches: usize,
    mut op: F,
) -> BenchResult {
    (0..warmup_batches * calls_per_batch).for_each(|_| op());

    let calls = calls_per_batch as u128;
    let mut per_call = Vec::with_capacity(batches);
    for _ in 0..batches {
        let started = Instant::now();
        (0..calls_per_batch).for_each(|_| op());
        let ns = (started.elapsed().as_nanos() + calls / 2) / calls;
        per_call.push((ns as u64).max(1));
    }

    BenchResult {
        name: name.to_owned(),
        unit: "ns/op".to_owned(),
        stats: compute_stats(&mut per_call),
    }
}

// ─── Process resources ──────────────────────────────────────────────────────

/// `getrusage(RUSAGE_SELF)` counters. Blocked claims park their thread, so
/// they show up as voluntary context switches.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ResourceSnapshot {
    pub max_rss_bytes: i64,
    pub vol_ctx_switches: i64,
    pub invol_ctx_switches: i64,
    pub user_time_us: i64,
    pub sys_time_us: i64,
}

impl ResourceSnapshot {
    pub fn capture() -> Self {
        // SAFETY: `rusage` is plain old data and `getrusage` only writes it.
        let usage = unsafe {
            let mut usage: libc::rusage = std::mem::zeroed();
            libc::getrusage(libc::RUSAGE_SELF, &mut usage);
            usage
        };
        let micros = |tv: libc::timeval| tv.tv_sec as i64 * 1_000_000 + tv.tv_usec as i64;

        // Linux reports max RSS in KiB, macOS in bytes.
        let rss_scale = if cfg!(target_os = "linux") { 1024 } else { 1 };
        Self {
            max_rss_bytes: usage.ru_maxrss as i64 * rss_scale,
            vol_ctx_switches: usage.ru_nvcsw as i64,
            invol_ctx_switches: usage.ru_nivcsw as i64,
            user_time_us: micros(usage.ru_utime),
            sys_time_us: micros(usage.ru_stime),
        }
    }

    /// (voluntary, involuntary) context switches since `earlier`.
    pub fn switches_since(&self, earlier: &ResourceSnapshot) -> (u64, u64) {
        let delta = |now: i64, then: i64| now.saturating_sub(then).max(0) as u64;
        (
            delta(self.vol_ctx_switches, earlier.vol_ctx_switches),
            delta(self.invol_ctx_switches, earlier.invol_ctx_switches),
        )
    }
}

// ─── Formatting ─────────────────────────────────────────────────────────────

/// Compact count for claim and cycle totals: `999`, `12.3K`, `2.50M`.
pub fn format_count(n: u64) -> String {
    match n {
        0..=999 => n.to_string(),
        1_000..=999_999 => format!("{:.1}K", n as f64 / 1e3),
        _ => format!("{:.2}M", n as f64 / 1e6),
    }
}

pub fn format_ns(ns: f64) -> String {
    match ns.abs() {
        a if a >= 1e6 => format!("{:.1} ms", ns / 1e6),
        a if a >= 1e3 => format!("{:.1} us", ns / 1e3),
        _ => format!("{ns:.0} ns"),
    }
}

pub fn print_table_header() {
    println!(
        "  {:<24} {:>8} {:>8} {:>8} {:>8} {:>8} {:>9}  unit",
        "Benchmark", "min", "p50", "p90", "p99", "p99.9", "max",
    );
    println!("  {}", "─".repeat(86));
}

pub fn print_result_row(r: &BenchResult) {
    let s = &r.stats;
    println!(
        "  {:<24} {:>8} {:>8} {:>8} {:>8} {:>8} {:>9}  {}",
        r.name, s.min, s.p50, s.p90, s.p99, s.p999, s.max, r.unit,
    );
}

pub fn section_header(title: &str) {
    let rule = "─".repeat(90);
    println!("\n{rule}\n  {title}\n{rule}\n");
}
