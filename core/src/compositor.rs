//! Two-stage frame compositor
//!
//! Each frame runs in a fixed order:
//!
//! 1. clear the visible canvas under the identity transform
//! 2. copy the map buffer into the off-screen canvas (untransformed), then
//!    draw the off-screen canvas onto the visible one under its current
//!    camera transform
//! 3. let the module draw its overlay with the frame delta
//!
//! The camera transform is only ever written by input handling; the
//! compositor reads whatever is set and leaves it untouched.

use crate::buffer::{BufferBinding, BufferError, MAP_BUFFER_ID};
use crate::canvas::Canvas2d;
use crate::error::{LoopPhase, ShellError};
use crate::simulation::Simulation;

pub struct Compositor {
    offscreen: Canvas2d,
    map: Option<BufferBinding>,
}

impl Compositor {
    /// Create a compositor with an off-screen canvas of the given size
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            offscreen: Canvas2d::new(width, height),
            map: None,
        }
    }

    /// Acquire the map buffer. On failure map compositing stays disabled.
    pub fn bind_map<S: Simulation + ?Sized>(&mut self, sim: &mut S) -> Result<(), BufferError> {
        let width = self.offscreen.width();
        let height = self.offscreen.height();
        match BufferBinding::acquire(sim, MAP_BUFFER_ID, width, height) {
            Ok(binding) => {
                tracing::debug!(
                    "map buffer bound at {:#x} ({}x{})",
                    binding.pointer(),
                    width,
                    height
                );
                self.map = Some(binding);
                Ok(())
            }
            Err(e) => {
                self.map = None;
                Err(e)
            }
        }
    }

    pub fn map_enabled(&self) -> bool {
        self.map.is_some()
    }

    pub fn map_binding(&self) -> Option<&BufferBinding> {
        self.map.as_ref()
    }

    pub fn offscreen(&self) -> &Canvas2d {
        &self.offscreen
    }

    /// Composite one frame onto `visible`.
    ///
    /// A map that can no longer be viewed is disabled with an error log and
    /// the frame carries on. A failing module draw is returned as a
    /// [`ShellError::CallbackFault`]; the map blit has already happened.
    pub fn compose<S: Simulation + ?Sized>(
        &mut self,
        sim: &mut S,
        visible: &mut Canvas2d,
        delta_ms: f64,
    ) -> Result<(), ShellError> {
        visible.save();
        visible.reset_transform();
        visible.clear_rect(0.0, 0.0, visible.width() as f32, visible.height() as f32);
        visible.restore();

        if let Some(binding) = self.map.as_mut() {
            match binding.view(sim) {
                Ok(view) => {
                    self.offscreen
                        .put_image_data(view.as_bytes(), view.width(), view.height(), 0, 0);
                    visible.draw_image(&self.offscreen, 0.0, 0.0);
                }
                Err(e) => {
                    tracing::error!("map compositing disabled: {}", e);
                    self.map = None;
                }
            }
        }

        sim.draw(delta_ms, visible)
            .map_err(|e| ShellError::fault(LoopPhase::Draw, &e))
    }
}
