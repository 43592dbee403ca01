//! PQM Monitor
//!
//! Thin presentation shell over the acquisition core: polls the meter on a
//! fixed interval, prints the latest sample as three scalar metrics, and
//! renders a recent-history table. Simulated samples are marked, and a
//! persistence failure is warned about without suppressing the display.
//!
//! Usage: cargo run --bin monitor
//!
//! Configuration is read from the file named by `PQM_CONFIG`
//! (default `pqm-monitor.toml`); a missing file runs with defaults.

use tokio::signal;
use tokio::time::{interval, MissedTickBehavior};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use voltage_pqm::{
    AcquisitionCycle, CycleError, MeterLink, MonitorConfig, Reading, SampleStore, Simulator,
};

/// Rows shown in the history table
const HISTORY_WINDOW: usize = 20;

fn init_tracing() {
    let filter = EnvFilter::from_default_env().add_directive(
        "voltage_pqm=info"
            .parse()
            .unwrap_or_else(|_| "info".parse().unwrap()),
    );

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn display_sample(reading: &Reading) {
    let marker = if reading.is_simulated() {
        "  [SIMULATED]"
    } else {
        ""
    };
    println!(
        "{}  {:>7.1} V  {:>7.2} A  {:>8.0} W{}",
        reading.timestamp.format("%Y-%m-%d %H:%M:%S"),
        reading.voltage,
        reading.current,
        reading.power,
        marker
    );
}

fn display_history(store: &SampleStore) {
    let mut history = store.recent(HISTORY_WINDOW);
    if history.len() < 2 {
        return;
    }
    // Ascending by time for reading top-to-bottom like a chart
    history.reverse();

    println!("  ── last {} samples ──", history.len());
    for reading in &history {
        println!(
            "  {}  {:>7.1} V  {:>7.2} A  {:>8.0} W  {}",
            reading.timestamp.format("%H:%M:%S"),
            reading.voltage,
            reading.current,
            reading.power,
            reading.source
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = MonitorConfig::load()?;
    let store = SampleStore::open(&config.store.path)?;
    let link = MeterLink::new(config.link_config());

    println!("PQM Monitor — polling {}", link.endpoint());
    println!(
        "Store: {} ({} samples on record)",
        store.path().display(),
        store.len()
    );

    let mut cycle = AcquisitionCycle::new(link, Simulator::new(), store);

    let mut ticker = interval(config.poll_interval());
    // One cycle at a time: ticks that elapse while a cycle is still
    // running are skipped, never queued
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => break,
            _ = ticker.tick() => {
                match cycle.run_once().await {
                    Ok(reading) => display_sample(&reading),
                    Err(CycleError::PersistFailure { reading, source }) => {
                        warn!(error = %source, "telemetry history is incomplete");
                        eprintln!("WARNING: reading not persisted: {source}");
                        display_sample(&reading);
                    }
                }
                display_history(cycle.store());
            }
        }
    }

    let stats = cycle.link().stats();
    println!(
        "\n{} cycles, {} failures, {} bytes in / {} bytes out",
        stats.cycles, stats.failures, stats.bytes_received, stats.bytes_sent
    );

    cycle.close()?;
    Ok(())
}
