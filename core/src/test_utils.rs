//! Shared test utilities for unit tests

use anyhow::{Result, bail};

use crate::buffer::rgba_len;
use crate::canvas::Canvas2d;
use crate::config::ShellConfig;
use crate::simulation::{GameParams, Simulation};

/// Color the fake simulation fills its map with
pub const MAP_COLOR: [u8; 4] = [10, 20, 30, 255];

/// Color the fake simulation draws its overlay with
pub const OVERLAY_COLOR: [u8; 4] = [250, 0, 250, 255];

/// Offset of the map buffer in fake memory
pub const MAP_OFFSET: usize = 1024;

// ============================================================================
// In-memory simulation double
// ============================================================================

/// Simulation double with plain `Vec<u8>` memory.
///
/// Records every call so tests can check ordering and counts, and can be
/// told to fault, lose its buffer or grow its memory.
pub struct FakeSimulation {
    memory: Vec<u8>,
    width: u32,
    height: u32,
    map_pointer: u32,
    in_step: bool,
    fail_init: bool,
    fail_ticks: u32,
    fail_draws: u32,
    fail_buffer_queries: bool,
    pub init_params: Option<GameParams>,
    pub ticks: u32,
    pub draw_deltas: Vec<f64>,
    pub calls: Vec<&'static str>,
}

impl FakeSimulation {
    pub fn new(width: u32, height: u32) -> Self {
        let map_len = rgba_len(width, height).unwrap_or(0);
        let mut memory = vec![0u8; MAP_OFFSET + map_len];
        for pixel in memory[MAP_OFFSET..].chunks_exact_mut(4) {
            pixel.copy_from_slice(&MAP_COLOR);
        }
        Self {
            memory,
            width,
            height,
            map_pointer: MAP_OFFSET as u32,
            in_step: false,
            fail_init: false,
            fail_ticks: 0,
            fail_draws: 0,
            fail_buffer_queries: false,
            init_params: None,
            ticks: 0,
            draw_deltas: Vec::new(),
            calls: Vec::new(),
        }
    }

    /// Report the map buffer as unavailable
    pub fn without_map(mut self) -> Self {
        self.map_pointer = 0;
        self
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    /// Fault the next `count` ticks
    pub fn fail_ticks(&mut self, count: u32) {
        self.fail_ticks = count;
    }

    /// Fault the next `count` draws
    pub fn fail_draws(&mut self, count: u32) {
        self.fail_draws = count;
    }

    pub fn fail_buffer_queries(&mut self) {
        self.fail_buffer_queries = true;
    }

    pub fn set_map_pointer(&mut self, pointer: u32) {
        self.map_pointer = pointer;
    }

    /// Grow memory by `extra` bytes and move the map to the new tail
    pub fn grow_and_move_map(&mut self, extra: usize) {
        let map_len = rgba_len(self.width, self.height).unwrap_or(0);
        let old = self.map_pointer as usize;
        let new = self.memory.len();
        self.memory.resize(new + extra.max(map_len), 0);
        if old != 0 {
            self.memory.copy_within(old..old + map_len, new);
            self.memory[old..old + map_len].fill(0);
        }
        self.map_pointer = new as u32;
    }

    /// Overwrite every map pixel
    pub fn fill_map(&mut self, color: [u8; 4]) {
        let map_len = rgba_len(self.width, self.height).unwrap_or(0);
        let start = self.map_pointer as usize;
        for pixel in self.memory[start..start + map_len].chunks_exact_mut(4) {
            pixel.copy_from_slice(&color);
        }
    }
}

impl Simulation for FakeSimulation {
    fn init_game(&mut self, params: &GameParams) -> Result<()> {
        self.calls.push("init_game");
        if self.fail_init {
            bail!("init_game rejected canvas '{}'", params.canvas_id);
        }
        self.init_params = Some(params.clone());
        Ok(())
    }

    fn tick(&mut self) -> Result<()> {
        assert!(!self.in_step, "tick re-entered while a step was running");
        self.in_step = true;
        self.calls.push("tick");
        self.ticks += 1;
        self.in_step = false;
        if self.fail_ticks > 0 {
            self.fail_ticks -= 1;
            bail!("tick {} trapped", self.ticks);
        }
        Ok(())
    }

    fn draw(&mut self, delta_ms: f64, canvas: &mut Canvas2d) -> Result<()> {
        self.calls.push("draw");
        self.draw_deltas.push(delta_ms);
        if self.fail_draws > 0 {
            self.fail_draws -= 1;
            bail!("draw trapped");
        }
        canvas.fill_rect(0.0, 0.0, 1.0, 1.0, OVERLAY_COLOR);
        Ok(())
    }

    fn buffer_pointer(&mut self, buffer_id: i32) -> Result<u32> {
        self.calls.push("buffer");
        if self.fail_buffer_queries {
            bail!("get_buffer({}) trapped", buffer_id);
        }
        Ok(self.map_pointer)
    }

    fn memory(&self) -> &[u8] {
        &self.memory
    }
}

/// Small config suitable for fast tests
pub fn test_config(width: u32, height: u32) -> ShellConfig {
    let mut config = ShellConfig::default();
    config.canvas.width = width;
    config.canvas.height = height;
    config
}

// ============================================================================
// WAT fixtures
// ============================================================================

/// A module implementing the full contract on an 8x8 canvas.
///
/// - map buffer at offset 1024, filled with opaque green by `init_game`
/// - `tick` bumps a counter at offset 0 and paints map pixel 0 red
/// - `draw` fills a 1x1 white rect at (7, 7) through the host
/// - `get_buffer(-1)` returns 1024, anything else 0
/// - `alloc` hands out offset 512 for the canvas id
pub const CONTRACT_WAT: &str = r#"
(module
    (import "env" "fill_rect" (func $fill_rect (param f32 f32 f32 f32 i32)))
    (import "env" "log" (func $log (param i32 i32)))
    (memory (export "memory") 1)
    (data (i32.const 256) "ready")
    (global $last_delta (mut f64) (f64.const -1))

    (func (export "init") (result i32)
        (call $log (i32.const 256) (i32.const 5))
        (i32.const 1))

    (func (export "alloc") (param $len i32) (result i32)
        (i32.const 512))

    (func (export "init_game") (param $id i32) (param $id_len i32) (param $w i32) (param $h i32)
                               (param $palette i32) (param $step i32) (param $extra i32)
        (local $i i32)
        ;; record the arguments at offsets 16..44
        (i32.store (i32.const 16) (local.get $id))
        (i32.store (i32.const 20) (local.get $id_len))
        (i32.store (i32.const 24) (local.get $w))
        (i32.store (i32.const 28) (local.get $h))
        (i32.store (i32.const 32) (local.get $palette))
        (i32.store (i32.const 36) (local.get $step))
        (i32.store (i32.const 40) (local.get $extra))
        ;; fill the map with opaque green (little-endian 0xFF00FF00 = 00 FF 00 FF)
        (block $done
            (loop $fill
                (br_if $done (i32.ge_u (local.get $i) (i32.mul (i32.mul (local.get $w) (local.get $h)) (i32.const 4))))
                (i32.store (i32.add (i32.const 1024) (local.get $i)) (i32.const 0xFF00FF00))
                (local.set $i (i32.add (local.get $i) (i32.const 4)))
                (br $fill))))

    (func (export "tick")
        (i32.store (i32.const 0) (i32.add (i32.load (i32.const 0)) (i32.const 1)))
        ;; map pixel 0 becomes opaque red (FF 00 00 FF)
        (i32.store (i32.const 1024) (i32.const 0xFF0000FF)))

    (func (export "draw") (param $delta f64)
        (global.set $last_delta (local.get $delta))
        (call $fill_rect (f32.const 7) (f32.const 7) (f32.const 1) (f32.const 1) (i32.const 0xFFFFFFFF)))

    (func (export "last_delta") (result f64)
        (global.get $last_delta))

    (func (export "get_buffer") (param $id i32) (result i32)
        (if (result i32) (i32.eq (local.get $id) (i32.const -1))
            (then (i32.const 1024))
            (else (i32.const 0))))
)
"#;

/// Same contract, but `get_buffer` always reports the buffer unavailable
pub const NO_MAP_WAT: &str = r#"
(module
    (import "env" "fill_rect" (func $fill_rect (param f32 f32 f32 f32 i32)))
    (memory (export "memory") 1)
    (func (export "init") (result i32) (i32.const 1))
    (func (export "init_game") (param i32 i32 i32 i32 i32 i32 i32))
    (func (export "tick"))
    (func (export "draw") (param $delta f64)
        (call $fill_rect (f32.const 0) (f32.const 0) (f32.const 1) (f32.const 1) (i32.const 0x0000FFFF)))
    (func (export "get_buffer") (param i32) (result i32) (i32.const 0))
)
"#;

/// Traps on every odd tick
pub const FLAKY_TICK_WAT: &str = r#"
(module
    (memory (export "memory") 1)
    (func (export "init") (result i32) (i32.const 1))
    (func (export "init_game") (param i32 i32 i32 i32 i32 i32 i32))
    (func (export "tick")
        (i32.store (i32.const 0) (i32.add (i32.load (i32.const 0)) (i32.const 1)))
        (if (i32.and (i32.load (i32.const 0)) (i32.const 1))
            (then unreachable)))
    (func (export "draw") (param f64))
    (func (export "get_buffer") (param i32) (result i32) (i32.const 1024))
)
"#;

/// Grows memory by one page on the first tick and moves the map there.
/// If the host denies the growth the map stays at 1024.
pub const GROWING_WAT: &str = r#"
(module
    (memory (export "memory") 1)
    (global $map (mut i32) (i32.const 1024))
    (func (export "init") (result i32) (i32.const 1))
    (func (export "init_game") (param i32 i32 i32 i32 i32 i32 i32))
    (func (export "tick")
        (if (i32.eq (memory.size) (i32.const 1))
            (then
                (if (i32.ne (memory.grow (i32.const 1)) (i32.const -1))
                    (then
                        (global.set $map (i32.const 65536))
                        ;; first map pixel on the new page is opaque blue (00 00 FF FF)
                        (i32.store (i32.const 65536) (i32.const 0xFFFF0000)))))))
    (func (export "draw") (param f64))
    (func (export "get_buffer") (param i32) (result i32) (global.get $map))
)
"#;

/// Switches its map from 1024 (green) to 2048 (blue) on the first tick,
/// without growing memory
pub const SWAPPING_WAT: &str = r#"
(module
    (memory (export "memory") 1)
    (data (i32.const 1024) "\00\ff\00\ff")
    (data (i32.const 2048) "\00\00\ff\ff")
    (global $map (mut i32) (i32.const 1024))
    (func (export "init") (result i32) (i32.const 1))
    (func (export "init_game") (param i32 i32 i32 i32 i32 i32 i32))
    (func (export "tick") (global.set $map (i32.const 2048)))
    (func (export "draw") (param f64))
    (func (export "get_buffer") (param i32) (result i32) (global.get $map))
)
"#;

/// `init` reports not ready
pub const NOT_READY_WAT: &str = r#"
(module
    (memory (export "memory") 1)
    (func (export "init") (result i32) (i32.const 0))
    (func (export "init_game") (param i32 i32 i32 i32 i32 i32 i32))
    (func (export "tick"))
    (func (export "draw") (param f64))
    (func (export "get_buffer") (param i32) (result i32) (i32.const 0))
)
"#;

/// Missing the `tick` export
pub const MISSING_TICK_WAT: &str = r#"
(module
    (memory (export "memory") 1)
    (func (export "init") (result i32) (i32.const 1))
    (func (export "init_game") (param i32 i32 i32 i32 i32 i32 i32))
    (func (export "draw") (param f64))
    (func (export "get_buffer") (param i32) (result i32) (i32.const 0))
)
"#;

/// Draws a 2x1 sprite from its own memory at (1, 1)
pub const SPRITE_WAT: &str = r#"
(module
    (import "env" "draw_pixels" (func $draw_pixels (param i32 i32 i32 f32 f32)))
    (import "env" "canvas_width" (func $canvas_width (result i32)))
    (memory (export "memory") 1)
    ;; red then blue, RGBA
    (data (i32.const 64) "\ff\00\00\ff\00\00\ff\ff")
    (func (export "init") (result i32) (i32.const 1))
    (func (export "init_game") (param i32 i32 i32 i32 i32 i32 i32))
    (func (export "tick"))
    (func (export "draw") (param f64)
        (call $draw_pixels (i32.const 64) (i32.const 2) (i32.const 1) (f32.const 1) (f32.const 1))
        ;; out-of-range pointer is ignored by the host
        (call $draw_pixels (i32.const 65530) (i32.const 2) (i32.const 2) (f32.const 0) (f32.const 0)))
    (func (export "width_seen") (result i32) (call $canvas_width))
    (func (export "get_buffer") (param i32) (result i32) (i32.const 0))
)
"#;
