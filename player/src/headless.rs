//! Windowless session in real time

use anyhow::Result;
use paintwar_core::{
    Coordinator, HeadlessDriver, HeadlessOptions, NetLink, ShellConfig, SimulationHandle,
};

use crate::HeadlessRun;

pub(crate) fn run(
    config: &ShellConfig,
    sim: SimulationHandle,
    mut net: Option<NetLink>,
    run: &HeadlessRun,
) -> Result<()> {
    let mut coordinator = Coordinator::start(config, sim, 0.0)?;

    let driver = HeadlessDriver::new(HeadlessOptions {
        duration_ms: run.duration_ms,
        refresh_hz: run.refresh_hz,
        realtime: true,
    });
    let summary = driver.run(&mut coordinator, 0.0, |_| crate::poll_network(&mut net));
    coordinator.stop();

    let stats = coordinator.stats();
    let timing = coordinator.timing().summary();
    tracing::info!(
        "Headless run finished after {:.0} ms: {} ticks ({} faulted, {} skipped), {} draws ({} faulted)",
        summary.elapsed_ms,
        stats.ticks,
        stats.tick_faults,
        stats.skipped_ticks,
        stats.draws,
        stats.draw_faults
    );
    tracing::info!(
        "Average tick {:.2} ms, average draw {:.2} ms",
        timing.tick_avg_ms.unwrap_or(0.0),
        timing.draw_avg_ms.unwrap_or(0.0)
    );

    if let Some(path) = &run.screenshot {
        crate::save_png(coordinator.visible(), path)?;
    }
    Ok(())
}
