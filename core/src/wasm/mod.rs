//! WASM simulation host
//!
//! Loads a simulation module with wasmtime and exposes it through the
//! [`Simulation`] trait. A module must export:
//!
//! - `memory`
//! - `init() -> i32`, nonzero when ready
//! - `init_game(id_ptr, id_len, width, height, palette, tick_step_ms, extra)`
//! - `tick()`
//! - `draw(delta_ms: f64)`
//! - `get_buffer(id: i32) -> i32`, `0` when the buffer is unavailable
//!
//! `alloc(len) -> ptr` is optional; when present the canvas id string is
//! copied into module memory for `init_game`, otherwise `(0, 0)` is passed.

use anyhow::{Context, Result};
use wasmtime::{Instance, Linker, Memory, Module, Store, TypedFunc, WasmParams, WasmResults};

use crate::canvas::Canvas2d;
use crate::error::ShellError;
use crate::ffi::register_host_functions;
use crate::simulation::{GameParams, Simulation};

mod engine;
mod state;

#[cfg(test)]
mod tests;

pub use engine::{WASM_PAGE_SIZE, WasmEngine};
pub use state::HostContext;

type InitGameParams = (i32, i32, i32, i32, i32, i32, i32);

/// A loaded, initialised simulation module
pub struct SimulationHandle {
    store: Store<HostContext>,
    /// The WASM instance.
    /// Not used after the exports are looked up, but kept alive with them.
    #[allow(dead_code)]
    instance: Instance,
    memory: Memory,
    alloc_fn: Option<TypedFunc<i32, i32>>,
    init_game_fn: TypedFunc<InitGameParams, ()>,
    tick_fn: TypedFunc<(), ()>,
    draw_fn: TypedFunc<f64, ()>,
    get_buffer_fn: TypedFunc<i32, i32>,
}

impl SimulationHandle {
    /// Compile, instantiate and `init()` a module from bytes
    pub fn load(engine: &WasmEngine, bytes: &[u8], memory_limit: usize) -> Result<Self, ShellError> {
        let module = engine
            .load_module(bytes)
            .map_err(|e| ShellError::module_unavailable(format!("{:#}", e)))?;
        Self::instantiate(engine, &module, memory_limit)
    }

    /// Instantiate a compiled module and run its `init()`
    pub fn instantiate(
        engine: &WasmEngine,
        module: &Module,
        memory_limit: usize,
    ) -> Result<Self, ShellError> {
        if let Some(minimum) = declared_memory_minimum(module)
            && minimum > memory_limit as u64
        {
            return Err(ShellError::module_unavailable(format!(
                "module memory requires {} bytes at start, limit is {} bytes",
                minimum, memory_limit
            )));
        }

        let mut linker = Linker::new(engine.engine());
        register_host_functions(&mut linker)
            .map_err(|e| ShellError::module_unavailable(format!("{:#}", e)))?;

        let mut store = Store::new(engine.engine(), HostContext::with_memory_limit(memory_limit));
        // Enable resource limiter to enforce memory constraints
        store.limiter(|ctx| &mut ctx.limits);

        let instance = linker
            .instantiate(&mut store, module)
            .context("Failed to instantiate WASM module")
            .map_err(|e| ShellError::module_unavailable(format!("{:#}", e)))?;

        let memory = instance
            .get_memory(&mut store, "memory")
            .ok_or_else(|| ShellError::module_unavailable("missing export `memory`"))?;
        store.data_mut().memory = Some(memory);

        let init_fn = required::<(), i32>(&instance, &mut store, "init")?;
        let init_game_fn = required::<InitGameParams, ()>(&instance, &mut store, "init_game")?;
        let tick_fn = required::<(), ()>(&instance, &mut store, "tick")?;
        let draw_fn = required::<f64, ()>(&instance, &mut store, "draw")?;
        let get_buffer_fn = required::<i32, i32>(&instance, &mut store, "get_buffer")?;
        let alloc_fn = instance.get_typed_func::<i32, i32>(&mut store, "alloc").ok();

        let ready = init_fn
            .call(&mut store, ())
            .map_err(|e| ShellError::module_unavailable(format!("WASM init() failed: {:#}", e)))?;
        if ready == 0 {
            return Err(ShellError::module_unavailable("init() reported not ready"));
        }

        tracing::info!(
            "simulation module ready ({} bytes of memory)",
            memory.data_size(&store)
        );

        Ok(Self {
            store,
            instance,
            memory,
            alloc_fn,
            init_game_fn,
            tick_fn,
            draw_fn,
            get_buffer_fn,
        })
    }

    pub fn store(&self) -> &Store<HostContext> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut Store<HostContext> {
        &mut self.store
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// Current linear memory size in bytes
    pub fn memory_size(&self) -> usize {
        self.memory.data_size(&self.store)
    }

    /// Copy the canvas id into module memory, if the module can allocate
    fn write_canvas_id(&mut self, id: &str) -> Result<(i32, i32)> {
        let Some(alloc) = &self.alloc_fn else {
            return Ok((0, 0));
        };
        let bytes = id.as_bytes();
        let len = i32::try_from(bytes.len()).context("canvas id is too long")?;
        let ptr = alloc
            .call(&mut self.store, len)
            .context("WASM alloc() failed")?;
        self.memory
            .write(&mut self.store, ptr as u32 as usize, bytes)
            .with_context(|| format!("canvas id does not fit at {:#x}", ptr))?;
        Ok((ptr, len))
    }
}

/// Initial size of the `memory` export in bytes, checked before
/// instantiation so an oversized module gets a readable error
fn declared_memory_minimum(module: &Module) -> Option<u64> {
    module
        .exports()
        .find(|export| export.name() == "memory")
        .and_then(|export| export.ty().memory().map(|memory| memory.minimum()))
        .map(|pages| pages.saturating_mul(WASM_PAGE_SIZE as u64))
}

/// Look up a typed export, reporting absence or a signature mismatch
fn required<P: WasmParams, R: WasmResults>(
    instance: &Instance,
    store: &mut Store<HostContext>,
    name: &str,
) -> Result<TypedFunc<P, R>, ShellError> {
    instance
        .get_typed_func::<P, R>(&mut *store, name)
        .map_err(|e| ShellError::module_unavailable(format!("export `{}`: {:#}", name, e)))
}

fn to_wasm_i32(value: u32, what: &str) -> Result<i32> {
    i32::try_from(value).with_context(|| format!("{} {} does not fit in an i32", what, value))
}

impl Simulation for SimulationHandle {
    fn init_game(&mut self, params: &GameParams) -> Result<()> {
        {
            let ctx = self.store.data_mut();
            ctx.canvas_width = params.width;
            ctx.canvas_height = params.height;
        }
        let width = to_wasm_i32(params.width, "canvas width")?;
        let height = to_wasm_i32(params.height, "canvas height")?;
        let tick_step_ms = to_wasm_i32(params.tick_step_ms, "tick step")?;
        let (id_ptr, id_len) = self.write_canvas_id(&params.canvas_id)?;
        self.init_game_fn
            .call(
                &mut self.store,
                (
                    id_ptr,
                    id_len,
                    width,
                    height,
                    params.palette,
                    tick_step_ms,
                    params.extra,
                ),
            )
            .context("WASM init_game() failed")
    }

    fn tick(&mut self) -> Result<()> {
        self.tick_fn
            .call(&mut self.store, ())
            .context("WASM tick() failed")
    }

    fn draw(&mut self, delta_ms: f64, canvas: &mut Canvas2d) -> Result<()> {
        {
            let ctx = self.store.data_mut();
            std::mem::swap(&mut ctx.canvas, canvas);
            ctx.in_draw = true;
        }
        let result = self.draw_fn.call(&mut self.store, delta_ms);
        {
            let ctx = self.store.data_mut();
            ctx.in_draw = false;
            std::mem::swap(&mut ctx.canvas, canvas);
        }
        result.context("WASM draw() failed")
    }

    fn buffer_pointer(&mut self, buffer_id: i32) -> Result<u32> {
        let pointer = self
            .get_buffer_fn
            .call(&mut self.store, buffer_id)
            .with_context(|| format!("WASM get_buffer({}) failed", buffer_id))?;
        Ok(pointer as u32)
    }

    fn memory(&self) -> &[u8] {
        self.memory.data(&self.store)
    }
}
