//! Software 2D canvas
//!
//! An RGBA8 surface with a current affine transform and a save/restore
//! stack, modelled on the canvas 2D context. Transformed operations
//! inverse-map destination pixel centres back into user space and sample
//! nearest-neighbour, so scaled pixel art stays crisp.

use glam::{Affine2, Vec2};

/// Bytes per RGBA pixel
pub const BYTES_PER_PIXEL: usize = 4;

/// Transparent black
pub const TRANSPARENT: [u8; 4] = [0, 0, 0, 0];

/// Unpack a 0xRRGGBBAA color
pub fn unpack_rgba(rgba: u32) -> [u8; 4] {
    rgba.to_be_bytes()
}

/// How a rasterised pixel is written
#[derive(Debug, Clone, Copy)]
enum Paint {
    /// Source-over alpha blending
    Blend([u8; 4]),
    /// Overwrite, ignoring what was there
    Replace([u8; 4]),
}

/// RGBA8 drawing surface with a 2D transform
#[derive(Debug, Clone, Default)]
pub struct Canvas2d {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    transform: Affine2,
    stack: Vec<Affine2>,
    transform_writes: u64,
}

impl Canvas2d {
    /// Create a transparent canvas with the identity transform
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * BYTES_PER_PIXEL],
            transform: Affine2::IDENTITY,
            stack: Vec::new(),
            transform_writes: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Raw RGBA bytes, row-major, `width * 4` bytes per row
    pub fn as_rgba(&self) -> &[u8] {
        &self.pixels
    }

    /// Read one device pixel
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.offset(x, y);
        let mut out = [0u8; 4];
        out.copy_from_slice(&self.pixels[i..i + BYTES_PER_PIXEL]);
        Some(out)
    }

    /// Current transform
    pub fn transform(&self) -> Affine2 {
        self.transform
    }

    /// Current transform as `[a, b, c, d, e, f]`
    pub fn matrix(&self) -> [f32; 6] {
        self.transform.to_cols_array()
    }

    /// Replace the transform with `[a, b, c, d, e, f]`
    pub fn set_transform(&mut self, a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) {
        self.set_matrix([a, b, c, d, e, f]);
    }

    pub fn set_matrix(&mut self, matrix: [f32; 6]) {
        self.transform = Affine2::from_cols_array(&matrix);
        self.transform_writes += 1;
    }

    /// Number of `set_transform`/`set_matrix` calls so far
    pub fn transform_writes(&self) -> u64 {
        self.transform_writes
    }

    pub fn reset_transform(&mut self) {
        self.transform = Affine2::IDENTITY;
    }

    /// Push the current transform
    pub fn save(&mut self) {
        self.stack.push(self.transform);
    }

    /// Pop the last saved transform. Unbalanced restores are ignored.
    pub fn restore(&mut self) {
        if let Some(transform) = self.stack.pop() {
            self.transform = transform;
        }
    }

    /// Clear every device pixel regardless of the transform
    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }

    /// Clear a user-space rectangle to transparent black
    pub fn clear_rect(&mut self, x: f32, y: f32, w: f32, h: f32) {
        if self.transform == Affine2::IDENTITY
            && x <= 0.0
            && y <= 0.0
            && x + w >= self.width as f32
            && y + h >= self.height as f32
        {
            self.pixels.fill(0);
            return;
        }
        self.raster(x, y, w, h, |_| Some(Paint::Replace(TRANSPARENT)));
    }

    /// Fill a user-space rectangle
    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: [u8; 4]) {
        self.raster(x, y, w, h, |_| Some(Paint::Blend(color)));
    }

    /// Copy raw RGBA rows into device space, ignoring the transform.
    ///
    /// Rows outside the canvas are clipped. Pixels are replaced, not blended.
    pub fn put_image_data(&mut self, data: &[u8], width: u32, height: u32, dx: i32, dy: i32) {
        let row_bytes = width as usize * BYTES_PER_PIXEL;
        if data.len() < row_bytes * height as usize {
            tracing::warn!(
                "put_image_data: {} bytes is short of {}x{} RGBA",
                data.len(),
                width,
                height
            );
            return;
        }

        let x0 = dx.max(0);
        let x1 = (dx + width as i32).min(self.width as i32);
        if x0 >= x1 {
            return;
        }
        for sy in 0..height as i32 {
            let ty = dy + sy;
            if ty < 0 || ty >= self.height as i32 {
                continue;
            }
            let src_start = sy as usize * row_bytes + (x0 - dx) as usize * BYTES_PER_PIXEL;
            let len = (x1 - x0) as usize * BYTES_PER_PIXEL;
            let dst_start = self.offset(x0 as u32, ty as u32);
            self.pixels[dst_start..dst_start + len]
                .copy_from_slice(&data[src_start..src_start + len]);
        }
    }

    /// Draw another canvas at user-space `(dx, dy)` under the current transform
    pub fn draw_image(&mut self, image: &Canvas2d, dx: f32, dy: f32) {
        self.draw_rgba(image.as_rgba(), image.width, image.height, dx, dy);
    }

    /// Draw raw RGBA pixels at user-space `(dx, dy)` under the current transform.
    ///
    /// Returns `false` without drawing if `src` is shorter than
    /// `width * height * 4`.
    pub fn draw_rgba(&mut self, src: &[u8], width: u32, height: u32, dx: f32, dy: f32) -> bool {
        let row_bytes = width as usize * BYTES_PER_PIXEL;
        if src.len() < row_bytes * height as usize {
            return false;
        }
        self.raster(dx, dy, width as f32, height as f32, |local| {
            let sx = (local.x - dx).floor();
            let sy = (local.y - dy).floor();
            if sx < 0.0 || sy < 0.0 || sx >= width as f32 || sy >= height as f32 {
                return None;
            }
            let i = sy as usize * row_bytes + sx as usize * BYTES_PER_PIXEL;
            let mut texel = [0u8; 4];
            texel.copy_from_slice(&src[i..i + BYTES_PER_PIXEL]);
            Some(Paint::Blend(texel))
        });
        true
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL
    }

    /// Visit every device pixel whose centre maps inside the user-space rect
    fn raster(
        &mut self,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        mut shade: impl FnMut(Vec2) -> Option<Paint>,
    ) {
        if self.width == 0 || self.height == 0 || !(w.is_finite() && h.is_finite()) {
            return;
        }
        // Negative extents flip the rect, as in the canvas API
        let (x, w) = if w < 0.0 { (x + w, -w) } else { (x, w) };
        let (y, h) = if h < 0.0 { (y + h, -h) } else { (y, h) };
        if w == 0.0 || h == 0.0 {
            return;
        }

        if self.transform.matrix2.determinant().abs() <= f32::EPSILON {
            return;
        }
        let inverse = self.transform.inverse();

        let corners = [
            Vec2::new(x, y),
            Vec2::new(x + w, y),
            Vec2::new(x, y + h),
            Vec2::new(x + w, y + h),
        ]
        .map(|p| self.transform.transform_point2(p));
        let min = corners.iter().copied().reduce(Vec2::min).unwrap_or(Vec2::ZERO);
        let max = corners.iter().copied().reduce(Vec2::max).unwrap_or(Vec2::ZERO);

        let x0 = min.x.floor().max(0.0) as u32;
        let y0 = min.y.floor().max(0.0) as u32;
        let x1 = max.x.ceil().min(self.width as f32).max(0.0) as u32;
        let y1 = max.y.ceil().min(self.height as f32).max(0.0) as u32;

        for py in y0..y1 {
            for px in x0..x1 {
                let centre = Vec2::new(px as f32 + 0.5, py as f32 + 0.5);
                let local = inverse.transform_point2(centre);
                if local.x < x || local.y < y || local.x >= x + w || local.y >= y + h {
                    continue;
                }
                let Some(paint) = shade(local) else {
                    continue;
                };
                let i = self.offset(px, py);
                let dst = &mut self.pixels[i..i + BYTES_PER_PIXEL];
                match paint {
                    Paint::Replace(color) => dst.copy_from_slice(&color),
                    Paint::Blend(color) => blend_over(dst, color),
                }
            }
        }
    }
}

/// Source-over blend of `src` onto `dst`
fn blend_over(dst: &mut [u8], src: [u8; 4]) {
    match src[3] {
        0 => {}
        255 => dst.copy_from_slice(&src),
        alpha => {
            let a = alpha as u32;
            let inv = 255 - a;
            for i in 0..3 {
                dst[i] = ((src[i] as u32 * a + dst[i] as u32 * inv + 127) / 255) as u8;
            }
            dst[3] = (a + (dst[3] as u32 * inv + 127) / 255) as u8;
        }
    }
}
