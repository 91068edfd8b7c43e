//! Owned RGBA raster used as the output of every plot kind.

use ocean_common::{TileError, TileResult};

/// Straight (non-premultiplied) RGBA image, row-major, row 0 at the top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaRaster {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl RgbaRaster {
    /// Fully transparent raster.
    pub fn transparent(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0u8; width * height * 4],
        }
    }

    pub fn from_pixels(width: usize, height: usize, pixels: Vec<u8>) -> TileResult<Self> {
        if pixels.len() != width * height * 4 {
            return Err(TileError::RenderError(format!(
                "expected {} bytes for a {}x{} RGBA raster, got {}",
                width * height * 4,
                width,
                height,
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn pixel(&self, row: usize, col: usize) -> [u8; 4] {
        let i = (row * self.width + col) * 4;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    pub fn set_pixel(&mut self, row: usize, col: usize, rgba: [u8; 4]) {
        let i = (row * self.width + col) * 4;
        self.pixels[i..i + 4].copy_from_slice(&rgba);
    }

    pub fn is_fully_transparent(&self) -> bool {
        self.pixels.chunks_exact(4).all(|p| p[3] == 0)
    }
}
