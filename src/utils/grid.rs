//! Sample grid rendering
//!
//! Lays a batch of generated images out on one canvas, the way torchvision's
//! `make_grid(normalize=True)` does, and writes it as a PNG.

use std::path::Path;

use image::{GrayImage, RgbImage};
use tch::{Device, Kind, Tensor};

use crate::error::{Result, WganError};

/// Pixels between neighbouring tiles and around the border
pub const GRID_PADDING: usize = 2;

/// A rendered grid, channel-interleaved `u8` pixels
#[derive(Debug, Clone)]
pub struct GridImage {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub pixels: Vec<u8>,
}

impl GridImage {
    /// Pixel value at (x, y, channel)
    pub fn pixel(&self, x: usize, y: usize, channel: usize) -> u8 {
        self.pixels[(y * self.width + x) * self.channels + channel]
    }
}

/// Arrange `images` (N, C, H, W) into a grid with `nrow` tiles per row
pub fn arrange_grid(images: &Tensor, nrow: usize) -> Result<GridImage> {
    let (n, c, h, w) = images.size4().map_err(|_| {
        WganError::ShapeMismatch(format!(
            "expected a (N, C, H, W) batch, got {:?}",
            images.size()
        ))
    })?;
    if n == 0 || nrow == 0 {
        return Err(WganError::ShapeMismatch("empty sample grid".to_string()));
    }
    let (n, c, h, w) = (n as usize, c as usize, h as usize, w as usize);

    let values = normalize(images)?;

    let cols = nrow.min(n);
    let rows = (n + cols - 1) / cols;
    let width = cols * (w + GRID_PADDING) + GRID_PADDING;
    let height = rows * (h + GRID_PADDING) + GRID_PADDING;
    let mut pixels = vec![0u8; width * height * c];

    for idx in 0..n {
        let origin_x = (idx % cols) * (w + GRID_PADDING) + GRID_PADDING;
        let origin_y = (idx / cols) * (h + GRID_PADDING) + GRID_PADDING;
        for ch in 0..c {
            for y in 0..h {
                for x in 0..w {
                    let v = values[((idx * c + ch) * h + y) * w + x];
                    let dst = ((origin_y + y) * width + origin_x + x) * c + ch;
                    pixels[dst] = quantize(v);
                }
            }
        }
    }

    Ok(GridImage {
        width,
        height,
        channels: c,
        pixels,
    })
}

/// Render `images` as a grid and write it to `path` as PNG
pub fn save_image_grid(images: &Tensor, nrow: usize, path: &Path) -> Result<()> {
    let grid = arrange_grid(images, nrow)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let (w, h) = (grid.width as u32, grid.height as u32);
    match grid.channels {
        1 => GrayImage::from_raw(w, h, grid.pixels)
            .ok_or_else(|| WganError::ShapeMismatch("grayscale buffer size".to_string()))?
            .save(path)?,
        3 => RgbImage::from_raw(w, h, grid.pixels)
            .ok_or_else(|| WganError::ShapeMismatch("rgb buffer size".to_string()))?
            .save(path)?,
        other => {
            return Err(WganError::ShapeMismatch(format!(
                "cannot write a {}-channel image grid",
                other
            )))
        }
    }

    tracing::debug!("Wrote sample grid to {}", path.display());
    Ok(())
}

/// Min-max scale the whole batch into [0, 1]
fn normalize(images: &Tensor) -> Result<Vec<f32>> {
    let flat = images
        .detach()
        .to_device(Device::Cpu)
        .to_kind(Kind::Float)
        .flatten(0, -1);
    let values = Vec::<f32>::try_from(&flat)?;

    let (lo, hi) = values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = (hi - lo).max(1e-5);
    Ok(values.into_iter().map(|v| (v - lo) / range).collect())
}

fn quantize(v: f32) -> u8 {
    (v * 255.0 + 0.5).clamp(0.0, 255.0) as u8
}
