//! Paintwar Core - client runtime shell
//!
//! Hosts a tick-based 2D simulation compiled to WebAssembly. The module owns
//! its state and linear memory; the shell steps it on a fixed cadence, draws
//! it once per display refresh and applies the player's pan/zoom.
//!
//! # Architecture
//!
//! - [`Coordinator`] - Dual-rate loop: fixed-period ticks, display-rate draws
//! - [`Compositor`] - Map buffer to off-screen canvas to visible canvas, then overlays
//! - [`PixelBufferView`] - Bounds-checked, read-only view into module memory
//! - [`CameraController`] - Wheel zoom and arrow-key pan
//! - [`TimingTracker`] - Rolling tick/draw duration windows
//! - [`SimulationHandle`] - WASM module loaded and instantiated

pub mod buffer;
pub mod camera;
pub mod canvas;
pub mod compositor;
pub mod config;
pub mod error;
pub mod ffi;
pub mod net;
pub mod runtime;
pub mod simulation;
#[cfg(test)]
pub mod test_utils;
pub mod timing;
pub mod wasm;

pub use buffer::{BufferBinding, BufferError, MAP_BUFFER_ID, PixelBufferView};
pub use camera::{CameraController, CameraTransform, InputEvent, Key};
pub use canvas::Canvas2d;
pub use compositor::Compositor;
pub use config::{ConfigError, ShellConfig};
pub use error::{LoopPhase, ShellError};
pub use net::{NetError, NetEvent, NetLink};
pub use runtime::{
    Coordinator, DrawOutcome, HeadlessDriver, HeadlessOptions, LoopState, LoopStats,
    RunSummary, RuntimeConfig, SystemClock, TickOutcome,
};
pub use simulation::{GameParams, Simulation};
pub use timing::{FrameTiming, TIMING_WINDOW_SIZE, TimingSummary, TimingTracker};
pub use wasm::{SimulationHandle, WasmEngine};
