use anyhow::{Context, Result, bail};
use cairn_config::CairnConfig;
use cairn_engine::Engine;
use std::io::BufRead;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const STATUS_INTERVAL: Duration = Duration::from_secs(1);

fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            CairnConfig::load(&path).with_context(|| format!("loading config from {path}"))?
        }
        None => CairnConfig::default(),
    };
    init_tracing(&config.log_level);

    let engine = Engine::start(&config).context("starting engine")?;
    eprintln!(
        "CAIRN: {} writers, {} readers, {} slots x {} bytes; press Enter to stop",
        config.writers, config.readers, config.pool.slot_count, config.pool.slot_size
    );

    let stop_rx = spawn_stdin_watcher()?;
    loop {
        match stop_rx.recv_timeout(STATUS_INTERVAL) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                let states: Vec<String> = engine
                    .pool()
                    .slot_states()
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                tracing::info!(stats = %engine.stats(), slots = ?states, "status");
            }
        }
    }

    tracing::info!("stopping");
    let report = engine.join().context("joining workers")?;
    println!("CAIRN: {}", report.stats);

    if report.stats.torn_reads > 0 {
        bail!("{} torn reads detected", report.stats.torn_reads);
    }
    Ok(())
}

/// RUST_LOG wins; otherwise `level` applies to the cairn crates only.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "cairn={level},cairn_pool={level},cairn_engine={level}"
        ))
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_thread_names(true).with_writer(std::io::stderr))
        .try_init();
}

/// Sends once when a line is read from stdin or stdin closes.
fn spawn_stdin_watcher() -> Result<mpsc::Receiver<()>> {
    let (tx, rx) = mpsc::channel();
    thread::Builder::new()
        .name("cairn-stdin".into())
        .spawn(move || {
            let mut line = String::new();
            let _ = std::io::stdin().lock().read_line(&mut line);
            let _ = tx.send(());
        })
        .context("spawning stdin watcher")?;
    Ok(rx)
}
