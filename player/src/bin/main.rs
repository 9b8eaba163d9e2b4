//! Paintwar - client shell
//!
//! Runs a paintwar simulation module in a window, or headless for a fixed
//! duration.
//!
//! # Usage
//!
//! ```bash
//! paintwar game.wasm
//! paintwar game.wasm --host localhost:8910 --scale 2
//! paintwar game.wasm --headless --duration-ms 5000 --screenshot out.png
//! ```
//!
//! # Controls
//!
//! - Arrow keys: Pan
//! - Mouse wheel: Zoom
//! - ESC: Quit

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use paintwar_core::{ShellConfig, config};
use paintwar_player::{HeadlessRun, PlayerConfig, run};

#[derive(Parser)]
#[command(name = "paintwar")]
#[command(author, version, about = "Paintwar - tick-based painting simulation shell")]
struct Args {
    /// Simulation module to run (.wasm)
    module: PathBuf,

    /// Config file (default: platform config directory)
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Server to connect to (host[:port])
    #[arg(long)]
    host: Option<String>,

    /// Simulation tick period in milliseconds
    #[arg(long, value_name = "MS")]
    tick_step: Option<u32>,

    /// Canvas width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Canvas height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Integer window scaling factor
    #[arg(long, short = 's')]
    scale: Option<u32>,

    // === Headless ===
    /// Run without a window
    #[arg(long)]
    headless: bool,

    /// How long a headless run lasts (default: 10000)
    #[arg(long, value_name = "MS", requires = "headless", value_parser = parse_duration_ms)]
    duration_ms: Option<f64>,

    /// Animation frames per second in headless mode (default: video.refresh_hz)
    #[arg(long, value_name = "HZ", requires = "headless")]
    refresh_hz: Option<u32>,

    /// Save the final canvas as PNG after a headless run
    #[arg(long, value_name = "FILE", requires = "headless")]
    screenshot: Option<PathBuf>,
}

/// A finite, non-negative number of milliseconds
fn parse_duration_ms(value: &str) -> Result<f64, String> {
    let ms: f64 = value
        .parse()
        .map_err(|_| format!("`{}` is not a number", value))?;
    if !ms.is_finite() || ms < 0.0 {
        return Err(format!("duration must be a finite, non-negative number, got {}", value));
    }
    Ok(ms)
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if !args.module.exists() {
        anyhow::bail!("Module file not found: {}", args.module.display());
    }

    let mut shell = match &args.config {
        Some(path) => ShellConfig::load_from(path)?,
        None => config::load(),
    };

    if let Some(host) = args.host {
        shell.network.host = Some(host);
    }
    if let Some(tick_step) = args.tick_step {
        shell.simulation.tick_step_ms = tick_step;
    }
    if let Some(width) = args.width {
        shell.canvas.width = width;
    }
    if let Some(height) = args.height {
        shell.canvas.height = height;
    }
    if let Some(scale) = args.scale {
        shell.video.window_scale = scale;
    }
    shell.validate()?;

    let headless = args.headless.then(|| HeadlessRun {
        duration_ms: args.duration_ms.unwrap_or(10_000.0),
        refresh_hz: args.refresh_hz.unwrap_or(shell.video.refresh_hz),
        screenshot: args.screenshot,
    });

    run(PlayerConfig {
        module_path: args.module,
        shell,
        headless,
    })
}
