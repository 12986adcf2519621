//! Runs the cairn engine with per-stage recording for a fixed window and
//! prints latency percentiles.
//!
//! ```bash
//! cargo run -p cairn-perf --release --bin perf_report -- [--secs N] [--json PATH]
//! ```

use std::hint::black_box;
use std::thread;
use std::time::{Duration, Instant};

use cairn_config::CairnConfig;
use cairn_engine::{Engine, EngineReport};
use cairn_perf::report::{print_reader_report, print_writer_report, stage_results};
use cairn_perf::*;
use cairn_pool::{PoolConfig, SlotPool};

const DEFAULT_SECS: u64 = 3;

struct Args {
    window: Duration,
    json: Option<String>,
}

fn parse_args() -> Args {
    let mut args = Args {
        window: Duration::from_secs(DEFAULT_SECS),
        json: None,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--secs" => {
                let secs = it.next().and_then(|v| v.parse().ok()).unwrap_or(DEFAULT_SECS);
                args.window = Duration::from_secs(secs);
            }
            "--json" => args.json = it.next(),
            other => eprintln!("perf_report: ignoring unknown argument {other}"),
        }
    }
    args
}

fn main() {
    let args = parse_args();
    let rusage_start = ResourceSnapshot::capture();

    let bar = "\u{2550}".repeat(90);
    println!("\n{bar}");
    println!("  CAIRN PERFORMANCE REPORT");
    println!("  single-thread micro + multi-thread engine window");
    println!("{bar}");

    // ═══════════════════════════════════════════════════════════════════════
    // 1. Single-thread claim/release cost
    // ═══════════════════════════════════════════════════════════════════════
    let micro = section_micro();

    // ═══════════════════════════════════════════════════════════════════════
    // 2. Engine window, default shape
    // ═══════════════════════════════════════════════════════════════════════
    let config = CairnConfig {
        log_level: "warn".into(),
        ..CairnConfig::default()
    };
    let (report, elapsed) = match section_engine(&config, args.window) {
        Ok(run) => run,
        Err(err) => {
            eprintln!("perf_report: engine failed: {err}");
            std::process::exit(1);
        }
    };

    // ═══════════════════════════════════════════════════════════════════════
    // 3. Resource usage
    // ═══════════════════════════════════════════════════════════════════════
    let rusage_end = ResourceSnapshot::capture();
    let (voluntary, involuntary) = rusage_end.switches_since(&rusage_start);
    section_header("RESOURCE USAGE");
    println!("  voluntary ctx switches:   {}", format_count(voluntary));
    println!("  involuntary ctx switches: {}", format_count(involuntary));
    println!("  max RSS:                  {} KB", rusage_end.max_rss_bytes / 1024);

    // ═══════════════════════════════════════════════════════════════════════
    // 4. JSON output
    // ═══════════════════════════════════════════════════════════════════════
    if let Some(path) = args.json {
        let mut stages = micro;
        stages.extend(stage_results(&report.writers));
        stages.extend(stage_results(&report.readers));

        let output = serde_json::json!({
            "report_type": "cairn",
            "window_ms": elapsed.as_millis() as u64,
            "config": {
                "writers": config.writers,
                "readers": config.readers,
                "slot_count": config.pool.slot_count,
                "slot_size": config.pool.slot_size,
            },
            "counters": {
                "writes": report.stats.writes,
                "reads": report.stats.reads,
                "torn_reads": report.stats.torn_reads,
                "claim_timeouts": report.stats.claim_timeouts,
            },
            "stages": stages,
            "resources": { "start": rusage_start, "end": rusage_end },
        });

        match serde_json::to_string_pretty(&output)
            .map_err(std::io::Error::other)
            .and_then(|text| std::fs::write(&path, text))
        {
            Ok(()) => println!("\n  Results saved to: {path}\n"),
            Err(err) => eprintln!("\n  Failed to save {path}: {err}\n"),
        }
    }

    if report.stats.torn_reads > 0 {
        eprintln!("perf_report: {} torn reads", report.stats.torn_reads);
        std::process::exit(1);
    }
}

fn section_micro() -> Vec<BenchResult> {
    section_header("SINGLE-THREAD CLAIM/RELEASE");

    let pool = SlotPool::<u8>::new(PoolConfig::new(5, 500));
    let mut results = vec![
        measure_batched("write_read_cycle", 2_000, 100, 10, || {
            if let Ok(mut w) = pool.claim_for_write() {
                w[0] = black_box(1);
            }
            if let Ok(r) = pool.claim_for_read() {
                black_box(r[0]);
            }
        }),
    ];

    let held: Vec<_> = (0..5).filter_map(|_| pool.try_claim_for_write().ok()).collect();
    results.push(measure_batched("try_claim (exhausted)", 2_000, 100, 10, || {
        black_box(pool.try_claim_for_write().is_err());
    }));
    drop(held);

    print_table_header();
    for r in &results {
        print_result_row(r);
    }
    results
}

fn section_engine(
    config: &CairnConfig,
    window: Duration,
) -> Result<(EngineReport, Duration), cairn_engine::EngineError> {
    section_header(&format!(
        "ENGINE WINDOW  ({} writers, {} readers, {} x {} B, {:?})",
        config.writers, config.readers, config.pool.slot_count, config.pool.slot_size, window
    ));

    let started = Instant::now();
    let engine = Engine::start(config)?;
    thread::sleep(window);
    let report = engine.join()?;
    let elapsed = started.elapsed();

    let secs = elapsed.as_secs_f64().max(f64::EPSILON);
    println!(
        "  writes {}  reads {}  ({}/s)  torn {}  timeouts {}",
        format_count(report.stats.writes),
        format_count(report.stats.reads),
        format_count((report.stats.reads as f64 / secs) as u64),
        report.stats.torn_reads,
        report.stats.claim_timeouts,
    );

    print_writer_report(&report.writers);
    print_reader_report(&report.readers);
    Ok((report, elapsed))
}
