//! Shared wasmtime engine

use anyhow::{Context, Result};
use wasmtime::{Engine, Module};

/// WASM page size in bytes
pub const WASM_PAGE_SIZE: usize = 65536;

/// Compiles simulation modules. One per process is enough.
pub struct WasmEngine {
    engine: Engine,
}

impl WasmEngine {
    pub fn new() -> Result<Self> {
        Ok(Self {
            engine: Engine::default(),
        })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Compile `.wasm` bytes (WAT text is accepted too)
    pub fn load_module(&self, bytes: &[u8]) -> Result<Module> {
        Module::new(&self.engine, bytes).context("Failed to compile simulation module")
    }
}
