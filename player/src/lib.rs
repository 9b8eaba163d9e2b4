//! Paintwar player
//!
//! Loads a simulation module, opens the optional server link and runs the
//! shell either in a window or headless.

mod app;
mod capture;
mod graphics;
mod headless;

use std::path::PathBuf;

use anyhow::{Context, Result};
use paintwar_core::{NetLink, ShellConfig, SimulationHandle, WasmEngine};

pub use capture::save_png;
pub use graphics::{Viewport, fit_viewport};

/// Headless run settings from the CLI
#[derive(Debug, Clone)]
pub struct HeadlessRun {
    pub duration_ms: f64,
    pub refresh_hz: u32,
    /// Where to write the final visible canvas
    pub screenshot: Option<PathBuf>,
}

/// Player configuration passed from CLI
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    pub module_path: PathBuf,
    pub shell: ShellConfig,
    /// Run without a window when set
    pub headless: Option<HeadlessRun>,
}

/// Run the player until the window closes or the headless run ends
pub fn run(config: PlayerConfig) -> Result<()> {
    config.shell.validate()?;

    let bytes = std::fs::read(&config.module_path).with_context(|| {
        format!(
            "Failed to read simulation module {}",
            config.module_path.display()
        )
    })?;
    let engine = WasmEngine::new()?;
    let sim = SimulationHandle::load(
        &engine,
        &bytes,
        config.shell.simulation.memory_limit_bytes(),
    )?;
    tracing::info!(
        "Loaded {} ({} bytes of linear memory)",
        config.module_path.display(),
        sim.memory_size()
    );

    let net = NetLink::open(&config.shell.network);

    match config.headless {
        Some(run) => headless::run(&config.shell, sim, net, &run),
        None => app::run(config.shell, sim, net),
    }
}

/// Drain the server link, dropping it once the server has gone away
pub(crate) fn poll_network(net: &mut Option<NetLink>) {
    let Some(link) = net else {
        return;
    };
    link.poll();
    if link.is_closed() {
        tracing::info!("Server link {} closed; continuing offline", link.url());
        *net = None;
    }
}
