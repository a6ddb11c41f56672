//! Run the reference solar system with a ring for a few seconds and print
//! a summary line per second of simulated time.
//!
//! ```text
//! RUST_LOG=orrery_engine=debug cargo run --example solar_system -- 2000
//! ```

use std::time::Duration;

use orrery_bench::{ringed_system, RINGED_PLANET};
use orrery_engine::{EngineConfig, Frame, Scheduler};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let run_ms: u64 = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(3_000);

    let config = EngineConfig {
        target_interval: Duration::from_millis(20),
        ..EngineConfig::default()
    };
    let ticks_per_report = 1_000 / config.target_interval.as_millis() as u64;

    let mut scheduler = Scheduler::new(ringed_system(7, 500), config, move |frame: &Frame| {
        if frame.tick.0 % ticks_per_report != 0 {
            return;
        }
        let saturn = frame.snapshot.get(RINGED_PLANET).unwrap_or_default();
        info!(
            tick = %frame.tick,
            moved = frame.delta().count(),
            warnings = frame.warnings.len(),
            total_us = frame.metrics.total_us,
            saturn_x = saturn.x,
            saturn_y = saturn.y,
            "frame"
        );
    })?;

    scheduler.start()?;
    std::thread::sleep(Duration::from_millis(run_ms));
    scheduler.request_stop();
    let report = scheduler.await_stopped()?;

    info!(
        ticks = report.ticks_completed,
        overruns = report.overrun_events,
        faults = report.body_fault_events,
        "done"
    );
    Ok(())
}
