//! Store data shared with host functions

use wasmtime::{Memory, StoreLimits, StoreLimitsBuilder};

use crate::canvas::Canvas2d;

/// Data held in the wasmtime store.
///
/// `canvas` is only the real visible canvas while `draw` runs; the handle
/// swaps it in and back out around the call. Outside a draw it is an empty
/// 0x0 canvas, so stray draw calls from `tick` do nothing.
pub struct HostContext {
    /// Linear memory export (set after instantiation)
    pub memory: Option<Memory>,

    /// Canvas the drawing imports paint on
    pub canvas: Canvas2d,

    /// Canvas size reported to the module
    pub canvas_width: u32,
    pub canvas_height: u32,

    /// Whether a `draw` call is in progress
    pub in_draw: bool,

    /// Linear memory growth limit
    pub limits: StoreLimits,
}

impl HostContext {
    pub fn with_memory_limit(memory_limit: usize) -> Self {
        Self {
            memory: None,
            canvas: Canvas2d::default(),
            canvas_width: 0,
            canvas_height: 0,
            in_draw: false,
            limits: StoreLimitsBuilder::new().memory_size(memory_limit).build(),
        }
    }
}
