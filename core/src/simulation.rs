//! Simulation module contract
//!
//! The coordinator only talks to the simulation through [`Simulation`]. The
//! wasm-backed implementation is [`crate::wasm::SimulationHandle`]; tests use
//! an in-memory double.

use anyhow::Result;

use crate::canvas::Canvas2d;
use crate::config::ShellConfig;

/// Arguments forwarded to the module's `init_game` entry point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameParams {
    pub canvas_id: String,
    pub width: u32,
    pub height: u32,
    pub palette: i32,
    pub tick_step_ms: u32,
    pub extra: i32,
}

impl GameParams {
    pub fn from_config(config: &ShellConfig) -> Self {
        Self {
            canvas_id: config.canvas.id.clone(),
            width: config.canvas.width,
            height: config.canvas.height,
            palette: config.simulation.palette,
            tick_step_ms: config.simulation.tick_step_ms,
            extra: config.simulation.extra,
        }
    }
}

/// Entry points of a loaded simulation.
///
/// Every call is synchronous and runs to completion. Module memory belongs to
/// the module; [`Simulation::memory`] only lends it out, and any `&mut self`
/// call may grow or move it.
pub trait Simulation {
    /// Set up a game for the given canvas and cadence
    fn init_game(&mut self, params: &GameParams) -> Result<()>;

    /// Advance the simulation by one tick
    fn tick(&mut self) -> Result<()>;

    /// Draw dynamic overlays onto `canvas` under its current transform
    fn draw(&mut self, delta_ms: f64, canvas: &mut Canvas2d) -> Result<()>;

    /// Offset of a named buffer in module memory, `0` when unavailable
    fn buffer_pointer(&mut self, buffer_id: i32) -> Result<u32>;

    /// Current linear memory contents
    fn memory(&self) -> &[u8];
}
