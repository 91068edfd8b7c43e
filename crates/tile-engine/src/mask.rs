//! Hiding cells where the seafloor is shallower than the requested depth.

use ocean_common::{ScalarField, TileError, TileResult};
use renderer::filter::gaussian_filter;

/// Smoothing applied to bathymetry before masking filled rasters, in pixels.
pub const BATHYMETRY_SIGMA: f64 = 0.5;

/// How a depth mask is derived from elevation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskRule {
    /// Mask where the smoothed elevation is above `-depth`
    Raster,
    /// Mask where the raw water depth is shallower than `depth`
    Contour,
}

/// `true` for every cell whose seafloor lies above `depth_m` metres.
///
/// Cells without elevation data are masked.
pub fn depth_mask(elevation: &ScalarField, depth_m: f64, rule: MaskRule) -> Vec<bool> {
    let (height, width) = elevation.shape();
    match rule {
        MaskRule::Raster => {
            // Missing elevation is blurred in as sea level
            let smoothed = gaussian_filter(&elevation.filled_with(0.0), width, height, BATHYMETRY_SIGMA);
            smoothed
                .iter()
                .enumerate()
                .map(|(idx, &e)| elevation.is_masked(idx) || e > -depth_m)
                .collect()
        }
        MaskRule::Contour => (0..elevation.len())
            .map(|idx| match elevation.value(idx) {
                Some(e) => -e < depth_m,
                None => true,
            })
            .collect(),
    }
}

/// Mask `field` wherever the seafloor is shallower than `depth_m`.
pub fn apply_depth_mask(
    field: &mut ScalarField,
    elevation: &ScalarField,
    depth_m: f64,
    rule: MaskRule,
) -> TileResult<()> {
    if field.shape() != elevation.shape() {
        return Err(TileError::ShapeMismatch {
            expected: field.shape(),
            actual: elevation.shape(),
        });
    }
    let mask = depth_mask(elevation, depth_m, rule);
    field.mask_where(|idx| mask[idx]);
    Ok(())
}
