//! Shaded-relief topography basemap.
//!
//! Elevations are normalized with a symmetric-log scale so that shallow
//! shelves and coastal land get most of the color range, then looked up in a
//! combined water/land ramp. An optional hillshade brightens slopes facing the
//! light source.

use crate::colormap::{to_rgba8, ColorRamp, ColormapRegistry, Rgba};
use crate::raster::RgbaRaster;
use ocean_common::{ScalarField, TileResult};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

/// Elevation domain of the basemap, metres.
pub const TOPO_MIN: f64 = -4000.0;
pub const TOPO_MAX: f64 = 1000.0;

/// Symmetric logarithmic normalization: linear within `±linthresh`,
/// logarithmic outside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymLogNorm {
    pub linthresh: f64,
    pub linscale: f64,
    pub base: f64,
    pub vmin: f64,
    pub vmax: f64,
}

impl SymLogNorm {
    pub fn new(linthresh: f64, vmin: f64, vmax: f64) -> Self {
        Self {
            linthresh,
            linscale: 1.0,
            base: 10.0,
            vmin,
            vmax,
        }
    }

    /// The normalization used for the topography basemap.
    pub fn topography() -> Self {
        Self::new(0.1, TOPO_MIN, TOPO_MAX)
    }

    fn linscale_adj(&self) -> f64 {
        self.linscale / (1.0 - 1.0 / self.base)
    }

    fn transform(&self, value: f64) -> f64 {
        let abs = value.abs();
        if abs > self.linthresh {
            value.signum()
                * self.linthresh
                * (self.linscale_adj() + (abs / self.linthresh).ln() / self.base.ln())
        } else {
            value * self.linscale_adj()
        }
    }

    /// Map a value to `[0, 1]` over `[vmin, vmax]`. Results outside the
    /// domain are not clipped.
    pub fn normalize(&self, value: f64) -> f64 {
        let lo = self.transform(self.vmin);
        let hi = self.transform(self.vmax);
        (self.transform(value) - lo) / (hi - lo)
    }
}

/// The 256-entry basemap ramp: 128 water colors from the `bathymetry` ramp
/// (deep to shallow), then 128 land colors from the upper part of the
/// reversed brown/blue-green ramp.
pub fn topography_ramp(colormaps: &ColormapRegistry) -> TileResult<ColorRamp> {
    let water = colormaps.get("bathymetry")?.sample_range(1.0, 0.25, 128);
    let land = colormaps
        .get("brbg")?
        .reversed("brbg_r")
        .sample_range(0.6, 1.0, 128);

    let mut entries = water;
    entries.extend(land);
    ColorRamp::from_lut("topo", entries)
}

/// Central-difference gradient along rows and columns, one-sided at the edges.
fn gradient(data: &[f64], width: usize, height: usize) -> (Vec<f64>, Vec<f64>) {
    let at = |r: usize, c: usize| data[r * width + c];
    let diff = |a: f64, b: f64, span: f64| (b - a) / span;

    let mut d_row = vec![0.0; data.len()];
    let mut d_col = vec![0.0; data.len()];

    for r in 0..height {
        for c in 0..width {
            let i = r * width + c;
            d_row[i] = if height < 2 {
                0.0
            } else if r == 0 {
                diff(at(0, c), at(1, c), 1.0)
            } else if r == height - 1 {
                diff(at(r - 1, c), at(r, c), 1.0)
            } else {
                diff(at(r - 1, c), at(r + 1, c), 2.0)
            };
            d_col[i] = if width < 2 {
                0.0
            } else if c == 0 {
                diff(at(r, 0), at(r, 1), 1.0)
            } else if c == width - 1 {
                diff(at(r, c - 1), at(r, c), 1.0)
            } else {
                diff(at(r, c - 1), at(r, c + 1), 2.0)
            };
        }
    }
    (d_row, d_col)
}

/// Per-cell brightness offset in `[0, 0.25]` from a light at altitude π/4
/// and azimuth π/2.
pub fn hillshade(data: &[f64], width: usize, height: usize) -> Vec<f64> {
    let altitude = FRAC_PI_4;
    let azimuth = FRAC_PI_2;
    let (dx, dy) = gradient(data, width, height);

    dx.iter()
        .zip(&dy)
        .map(|(&x, &y)| {
            let slope = FRAC_PI_2 - (x * x + y * y).sqrt().atan();
            let aspect = (-x).atan2(y);
            let shaded = altitude.sin() * slope.sin()
                + altitude.cos() * slope.cos() * ((azimuth - FRAC_PI_2) - aspect).cos();
            (shaded + 1.0) / 8.0
        })
        .collect()
}

/// Color an elevation window into an opaque basemap raster.
///
/// Masked cells stay transparent. With `shaded_relief` the hillshade offset
/// is added to the color channels (not alpha) and clipped.
pub fn render_topography(
    elevation: &ScalarField,
    ramp: &ColorRamp,
    shaded_relief: bool,
) -> RgbaRaster {
    let (height, width) = elevation.shape();
    let norm = SymLogNorm::topography();
    let shade = if shaded_relief {
        Some(hillshade(elevation.raw_values(), width, height))
    } else {
        None
    };

    let mut raster = RgbaRaster::transparent(width, height);
    for row in 0..height {
        for col in 0..width {
            let Some(value) = elevation.get(row, col) else {
                continue;
            };
            let mut color: Rgba = ramp.rgba(norm.normalize(value));
            if let Some(shade) = &shade {
                let s = shade[row * width + col];
                for channel in color.iter_mut().take(3) {
                    *channel = (*channel + s).clamp(0.0, 1.0);
                }
            }
            raster.set_pixel(row, col, to_rgba8(color));
        }
    }
    raster
}
