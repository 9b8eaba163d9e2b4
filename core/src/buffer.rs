//! Read-only pixel views into simulation memory
//!
//! A [`PixelBufferView`] borrows the simulation, so it can't outlive the
//! next `&mut` call (tick, draw, buffer query) that might grow memory. The
//! only thing kept between frames is a [`BufferBinding`]: the buffer id, its
//! dimensions and the pointer and memory size last validated. Every
//! [`BufferBinding::view`] asks the module for the pointer again, since a tick
//! may move the buffer without growing memory.

use crate::canvas::BYTES_PER_PIXEL;
use crate::simulation::Simulation;

/// Buffer id of the default (map) buffer
pub const MAP_BUFFER_ID: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    /// The module returned a null pointer
    #[error("buffer {id} unavailable: module returned a null pointer")]
    Unavailable { id: i32 },

    /// The view would read past the end of module memory
    #[error(
        "buffer {id} at {pointer:#x} needs {len} bytes but module memory is {memory} bytes"
    )]
    OutOfBounds {
        id: i32,
        pointer: u32,
        len: usize,
        memory: usize,
    },

    /// `width * height * 4` does not fit in memory addressing
    #[error("buffer {id} dimensions {width}x{height} overflow")]
    Overflow { id: i32, width: u32, height: u32 },

    /// The buffer query itself faulted
    #[error("buffer {id} query failed: {message}")]
    Query { id: i32, message: String },
}

/// Byte length of a `width x height` RGBA buffer
pub fn rgba_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(BYTES_PER_PIXEL)
}

/// Borrowed RGBA window onto module memory
#[derive(Debug, Clone, Copy)]
pub struct PixelBufferView<'a> {
    bytes: &'a [u8],
    width: u32,
    height: u32,
}

impl<'a> PixelBufferView<'a> {
    /// Validate `pointer` and dimensions against `memory` and borrow the bytes
    pub fn new(
        memory: &'a [u8],
        id: i32,
        pointer: u32,
        width: u32,
        height: u32,
    ) -> Result<Self, BufferError> {
        if pointer == 0 {
            return Err(BufferError::Unavailable { id });
        }
        let len = rgba_len(width, height).ok_or(BufferError::Overflow { id, width, height })?;
        let start = pointer as usize;
        let end = start
            .checked_add(len)
            .filter(|&end| end <= memory.len())
            .ok_or(BufferError::OutOfBounds {
                id,
                pointer,
                len,
                memory: memory.len(),
            })?;
        Ok(Self {
            bytes: &memory[start..end],
            width,
            height,
        })
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per pixel
    pub fn stride(&self) -> usize {
        BYTES_PER_PIXEL
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn row(&self, y: u32) -> Option<&'a [u8]> {
        if y >= self.height {
            return None;
        }
        let row_bytes = self.width as usize * BYTES_PER_PIXEL;
        let start = y as usize * row_bytes;
        Some(&self.bytes[start..start + row_bytes])
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width {
            return None;
        }
        let row = self.row(y)?;
        let i = x as usize * BYTES_PER_PIXEL;
        let mut out = [0u8; 4];
        out.copy_from_slice(&row[i..i + BYTES_PER_PIXEL]);
        Some(out)
    }
}

/// A validated buffer pointer, retained between frames
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferBinding {
    id: i32,
    pointer: u32,
    width: u32,
    height: u32,
    memory_len: usize,
}

impl BufferBinding {
    /// Ask the module for buffer `id` and check it fits in memory
    pub fn acquire<S: Simulation + ?Sized>(
        sim: &mut S,
        id: i32,
        width: u32,
        height: u32,
    ) -> Result<Self, BufferError> {
        let pointer = query_pointer(sim, id)?;
        let memory = sim.memory();
        PixelBufferView::new(memory, id, pointer, width, height)?;
        Ok(Self {
            id,
            pointer,
            width,
            height,
            memory_len: memory.len(),
        })
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn pointer(&self) -> u32 {
        self.pointer
    }

    /// Whether module memory changed size since the pointer was last validated
    pub fn is_stale<S: Simulation + ?Sized>(&self, sim: &S) -> bool {
        sim.memory().len() != self.memory_len
    }

    /// Borrow the pixels for this frame.
    ///
    /// Re-queries the pointer and re-checks bounds against the current
    /// memory on every call. On error the binding keeps its last good values.
    pub fn view<'a, S: Simulation + ?Sized>(
        &mut self,
        sim: &'a mut S,
    ) -> Result<PixelBufferView<'a>, BufferError> {
        let pointer = query_pointer(sim, self.id)?;
        let sim: &'a S = sim;
        let memory = sim.memory();
        let view = PixelBufferView::new(memory, self.id, pointer, self.width, self.height)?;

        if pointer != self.pointer || memory.len() != self.memory_len {
            tracing::debug!(
                "buffer {} moved: {:#x} -> {:#x} (memory {} -> {} bytes)",
                self.id,
                self.pointer,
                pointer,
                self.memory_len,
                memory.len()
            );
            self.pointer = pointer;
            self.memory_len = memory.len();
        }
        Ok(view)
    }
}

fn query_pointer<S: Simulation + ?Sized>(sim: &mut S, id: i32) -> Result<u32, BufferError> {
    sim.buffer_pointer(id).map_err(|e| BufferError::Query {
        id,
        message: format!("{:#}", e),
    })
}
