//! Host functions imported by simulation modules
//!
//! Everything lives in the `env` namespace. Pointers and lengths coming from
//! the module are bounds-checked against its memory; bad ones are logged and
//! ignored rather than trapping.

use anyhow::Result;
use wasmtime::{Caller, Linker};

use crate::buffer::rgba_len;
use crate::canvas::unpack_rgba;
use crate::wasm::HostContext;

/// Register the host imports with the linker
pub fn register_host_functions(linker: &mut Linker<HostContext>) -> Result<()> {
    // System functions
    linker.func_wrap("env", "log", log_message)?;

    // Canvas queries
    linker.func_wrap("env", "canvas_width", canvas_width)?;
    linker.func_wrap("env", "canvas_height", canvas_height)?;

    // Drawing, only effective during draw()
    linker.func_wrap("env", "fill_rect", fill_rect)?;
    linker.func_wrap("env", "clear_rect", clear_rect)?;
    linker.func_wrap("env", "draw_pixels", draw_pixels)?;

    Ok(())
}

/// Log a UTF-8 message from module memory
fn log_message(caller: Caller<'_, HostContext>, ptr: u32, len: u32) {
    if let Some(memory) = caller.data().memory {
        let data = memory.data(&caller);
        let ptr = ptr as usize;
        let len = len as usize;
        match ptr.checked_add(len).and_then(|end| data.get(ptr..end)) {
            Some(bytes) => match std::str::from_utf8(bytes) {
                Ok(msg) => tracing::info!("[module] {}", msg),
                Err(_) => tracing::warn!("[module] log message is not valid UTF-8"),
            },
            None => tracing::warn!(
                "[module] log message at {:#x}+{} is outside memory",
                ptr,
                len
            ),
        }
    }
}

fn canvas_width(caller: Caller<'_, HostContext>) -> i32 {
    caller.data().canvas_width as i32
}

fn canvas_height(caller: Caller<'_, HostContext>) -> i32 {
    caller.data().canvas_height as i32
}

/// Fill a rect under the current transform. `rgba` is 0xRRGGBBAA.
fn fill_rect(mut caller: Caller<'_, HostContext>, x: f32, y: f32, w: f32, h: f32, rgba: u32) {
    let ctx = caller.data_mut();
    if !ctx.in_draw {
        tracing::trace!("fill_rect outside draw ignored");
        return;
    }
    ctx.canvas.fill_rect(x, y, w, h, unpack_rgba(rgba));
}

fn clear_rect(mut caller: Caller<'_, HostContext>, x: f32, y: f32, w: f32, h: f32) {
    let ctx = caller.data_mut();
    if !ctx.in_draw {
        tracing::trace!("clear_rect outside draw ignored");
        return;
    }
    ctx.canvas.clear_rect(x, y, w, h);
}

/// Draw `width x height` RGBA pixels read from module memory
fn draw_pixels(
    mut caller: Caller<'_, HostContext>,
    ptr: u32,
    width: u32,
    height: u32,
    dx: f32,
    dy: f32,
) {
    let Some(memory) = caller.data().memory else {
        return;
    };
    let (data, ctx) = memory.data_and_store_mut(&mut caller);
    if !ctx.in_draw {
        tracing::trace!("draw_pixels outside draw ignored");
        return;
    }

    let start = ptr as usize;
    let src = rgba_len(width, height)
        .and_then(|len| start.checked_add(len))
        .and_then(|end| data.get(start..end));
    match src {
        Some(src) => {
            ctx.canvas.draw_rgba(src, width, height, dx, dy);
        }
        None => tracing::warn!(
            "draw_pixels: {}x{} at {:#x} is outside module memory",
            width,
            height,
            ptr
        ),
    }
}
