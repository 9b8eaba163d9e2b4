//! PNG capture of the visible canvas

use std::path::Path;

use anyhow::{Context, Result};
use paintwar_core::Canvas2d;

/// Save the canvas as an RGBA PNG
pub fn save_png(canvas: &Canvas2d, path: &Path) -> Result<()> {
    let image = image::RgbaImage::from_raw(canvas.width(), canvas.height(), canvas.as_rgba().to_vec())
        .context("Canvas pixel data does not match its size")?;
    image
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("Failed to write screenshot {}", path.display()))?;
    tracing::info!(
        "Saved {}x{} screenshot to {}",
        canvas.width(),
        canvas.height(),
        path.display()
    );
    Ok(())
}
