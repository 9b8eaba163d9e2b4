//! Camera pan/zoom state
//!
//! Input handlers mutate the camera and immediately write the full matrix to
//! the visible canvas. Writes are never deferred to the next draw, so a burst
//! of input between two draws produces several writes and the compositor
//! sees the latest one.

use crate::canvas::Canvas2d;
use crate::config::CameraConfig;

/// Keys the shell reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Other,
}

/// Raw input delivered by the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Wheel movement in device pixels, positive when scrolling down
    Wheel { delta_y: f32 },
    /// Key press
    Key(Key),
}

/// Pan/zoom transform applied to the visible canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraTransform {
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl Default for CameraTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

impl CameraTransform {
    /// Canvas matrix `[scale, 0, 0, scale, offset_x, offset_y]`
    pub fn matrix(&self) -> [f32; 6] {
        [self.scale, 0.0, 0.0, self.scale, self.offset_x, self.offset_y]
    }

    /// Write the whole matrix to the canvas in one call
    pub fn apply_to(&self, canvas: &mut Canvas2d) {
        canvas.set_matrix(self.matrix());
    }
}

/// Owns the camera and turns input into transform changes
#[derive(Debug, Clone)]
pub struct CameraController {
    transform: CameraTransform,
    zoom_sensitivity: f32,
    pan_step: f32,
    min_scale: f32,
    max_scale: f32,
}

impl CameraController {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            transform: CameraTransform::default(),
            zoom_sensitivity: config.zoom_sensitivity,
            pan_step: config.pan_step as f32,
            min_scale: config.min_scale,
            max_scale: config.max_scale,
        }
    }

    pub fn transform(&self) -> CameraTransform {
        self.transform
    }

    /// Apply one input event and re-apply the transform to `canvas`.
    ///
    /// Returns `true` if the camera changed.
    pub fn handle(&mut self, event: InputEvent, canvas: &mut Canvas2d) -> bool {
        let before = self.transform;
        match event {
            InputEvent::Wheel { delta_y } => self.zoom(delta_y),
            InputEvent::Key(key) => self.pan(key),
        }
        if self.transform == before {
            return false;
        }
        self.transform.apply_to(canvas);
        tracing::trace!(
            "camera scale={:.3} offset=({:.1}, {:.1})",
            self.transform.scale,
            self.transform.offset_x,
            self.transform.offset_y
        );
        true
    }

    fn zoom(&mut self, delta_y: f32) {
        if !delta_y.is_finite() {
            return;
        }
        let scale = self.transform.scale + delta_y * self.zoom_sensitivity;
        self.transform.scale = scale.clamp(self.min_scale, self.max_scale);
    }

    // Signs are inverted: panning the view one way shifts content the other way
    fn pan(&mut self, key: Key) {
        let step = self.pan_step;
        match key {
            Key::ArrowLeft => self.transform.offset_x += step,
            Key::ArrowRight => self.transform.offset_x -= step,
            Key::ArrowUp => self.transform.offset_y += step,
            Key::ArrowDown => self.transform.offset_y -= step,
            Key::Other => {}
        }
    }
}
