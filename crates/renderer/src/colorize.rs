//! Color mapping of scalar fields onto RGBA rasters.

use crate::colormap::ColorRamp;
use crate::raster::RgbaRaster;
use ocean_common::{ColorScale, ScalarField};
use rayon::prelude::*;

/// Pixels at or below these channel values are treated as background.
const BACKGROUND_MAX: [u8; 3] = [3, 5, 18];

/// True when an 8-bit color is close enough to black to count as
/// background.
#[inline]
pub fn is_background(r: u8, g: u8, b: u8) -> bool {
    r <= BACKGROUND_MAX[0] && g <= BACKGROUND_MAX[1] && b <= BACKGROUND_MAX[2]
}

/// Map a field through `scale` and `ramp` into an RGBA raster.
///
/// Masked entries become `(0, 0, 0, 0)`. Valid entries take the ramp color
/// with alpha forced to 255, except near-black colors which get alpha 0.
pub fn colorize(field: &ScalarField, scale: &ColorScale, ramp: &ColorRamp) -> RgbaRaster {
    let (height, width) = field.shape();
    let mut pixels = vec![0u8; width * height * 4];

    pixels
        .par_chunks_mut(width.max(1) * 4)
        .enumerate()
        .for_each(|(row, row_pixels)| {
            for col in 0..width {
                let Some(value) = field.get(row, col) else {
                    continue;
                };
                let [r, g, b, _] = ramp.rgba8(scale.normalize(value));
                let a = if is_background(r, g, b) { 0 } else { 255 };
                row_pixels[col * 4..col * 4 + 4].copy_from_slice(&[r, g, b, a]);
            }
        });

    RgbaRaster::from_pixels(width, height, pixels)
        .unwrap_or_else(|_| RgbaRaster::transparent(width, height))
}
