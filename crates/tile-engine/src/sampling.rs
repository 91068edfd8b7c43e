//! Resampling a regular lat/lon source grid onto tile pixel locations.

use crate::dataset::{Interpolation, SamplingOptions};
use ocean_common::{GeoGrid, TileError, TileResult};
use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometres.
const EARTH_RADIUS_KM: f64 = 6371.0088;
const KM_PER_DEGREE: f64 = EARTH_RADIUS_KM * std::f64::consts::PI / 180.0;

/// A regular latitude/longitude grid with cell centres on both edges.
///
/// Row 0 is `lat_max` (north), column 0 is `lon_min`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegularGrid {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
    pub rows: usize,
    pub cols: usize,
}

impl RegularGrid {
    pub fn new(
        lat_min: f64,
        lat_max: f64,
        lon_min: f64,
        lon_max: f64,
        rows: usize,
        cols: usize,
    ) -> TileResult<Self> {
        let grid = Self {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
            rows,
            cols,
        };
        grid.validate()?;
        Ok(grid)
    }

    pub fn validate(&self) -> TileResult<()> {
        if self.rows < 2 || self.cols < 2 {
            return Err(TileError::DatasetOpen(format!(
                "source grid must be at least 2x2, got {}x{}",
                self.rows, self.cols
            )));
        }
        if self.lat_max <= self.lat_min || self.lon_max <= self.lon_min {
            return Err(TileError::DatasetOpen(
                "source grid bounds must be increasing".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of cells in one horizontal slice.
    pub fn cells(&self) -> usize {
        self.rows * self.cols
    }

    fn lat_step(&self) -> f64 {
        (self.lat_max - self.lat_min) / (self.rows - 1) as f64
    }

    fn lon_step(&self) -> f64 {
        (self.lon_max - self.lon_min) / (self.cols - 1) as f64
    }

    /// Number of distinct columns around the globe, when the grid wraps.
    fn wrap_cols(&self) -> Option<usize> {
        let n = 360.0 / self.lon_step();
        let rounded = n.round();
        if (n - rounded).abs() < 1e-6 && self.cols >= rounded as usize {
            Some(rounded as usize)
        } else {
            None
        }
    }

    fn row_coord(&self, lat: f64) -> f64 {
        (self.lat_max - lat) / self.lat_step()
    }

    fn col_coord(&self, lon: f64) -> f64 {
        let offset = (lon - self.lon_min).rem_euclid(360.0);
        if self.wrap_cols().is_some() {
            return offset / self.lon_step();
        }
        // Outside the span, measure from whichever edge is closer
        let span = self.lon_max - self.lon_min;
        if offset > span && 360.0 - offset < offset - span {
            (offset - 360.0) / self.lon_step()
        } else {
            offset / self.lon_step()
        }
    }

    fn cell_lat(&self, row: isize) -> f64 {
        self.lat_max - row as f64 * self.lat_step()
    }

    fn cell_lon(&self, col: isize) -> f64 {
        self.lon_min + col as f64 * self.lon_step()
    }
}

/// Reads finite values out of one horizontal slice.
struct Slice<'a> {
    grid: &'a RegularGrid,
    values: &'a [f64],
    wrap: Option<usize>,
}

impl Slice<'_> {
    fn at(&self, row: isize, col: isize) -> Option<f64> {
        if row < 0 || row >= self.grid.rows as isize {
            return None;
        }
        let col = match self.wrap {
            Some(n) => col.rem_euclid(n as isize),
            None if col < 0 || col >= self.grid.cols as isize => return None,
            None => col,
        };
        let v = self.values[row as usize * self.grid.cols + col as usize];
        v.is_finite().then_some(v)
    }

    fn nearest(&self, rc: f64, cc: f64) -> Option<f64> {
        self.at(rc.round() as isize, cc.round() as isize)
    }

    fn bilinear(&self, rc: f64, cc: f64) -> Option<f64> {
        let max_row = (self.grid.rows - 1) as f64;
        if rc < 0.0 || rc > max_row {
            return None;
        }
        let r0 = rc.floor().min(max_row - 1.0);
        let c0 = match self.wrap {
            Some(_) => cc.floor(),
            None => {
                let max_col = (self.grid.cols - 1) as f64;
                if cc < 0.0 || cc > max_col {
                    return None;
                }
                cc.floor().min(max_col - 1.0)
            }
        };
        let fr = rc - r0;
        let fc = cc - c0;
        let (r0, c0) = (r0 as isize, c0 as isize);

        let v00 = self.at(r0, c0)?;
        let v01 = self.at(r0, c0 + 1)?;
        let v10 = self.at(r0 + 1, c0)?;
        let v11 = self.at(r0 + 1, c0 + 1)?;

        let top = v00 * (1.0 - fc) + v01 * fc;
        let bottom = v10 * (1.0 - fc) + v11 * fc;
        Some(top * (1.0 - fr) + bottom * fr)
    }

    /// Valid neighbours within `radius_km`, nearest first.
    fn neighbours(&self, lat: f64, lon: f64, rc: f64, cc: f64, options: &SamplingOptions) -> Vec<(f64, f64)> {
        let radius = options.radius_km;
        let lon_km = self.grid.lon_step() * KM_PER_DEGREE * lat.to_radians().cos().abs().max(1e-3);
        // The window never needs to be wider than the grid itself
        let dr = half_window(radius / (self.grid.lat_step() * KM_PER_DEGREE), self.grid.rows);
        let dc = half_window(radius / lon_km, self.grid.cols);

        let (r, c) = (rc.round() as isize, cc.round() as isize);
        let cols = match self.wrap {
            // Visit each distinct column once when the window spans the globe
            Some(n) if 2 * dc + 1 >= n as isize => {
                let start = c - n as isize / 2;
                start..start + n as isize
            }
            _ => (c - dc)..(c + dc + 1),
        };
        let mut found = Vec::new();
        for row in (r - dr)..=(r + dr) {
            for col in cols.clone() {
                let Some(value) = self.at(row, col) else {
                    continue;
                };
                let d = haversine_km(lat, lon, self.grid.cell_lat(row), self.grid.cell_lon(col));
                if d <= radius {
                    found.push((d, value));
                }
            }
        }
        found.sort_by(|a, b| a.0.total_cmp(&b.0));
        found.truncate(options.neighbours.max(1));
        found
    }

    fn gaussian(&self, lat: f64, lon: f64, rc: f64, cc: f64, options: &SamplingOptions) -> Option<f64> {
        let found = self.neighbours(lat, lon, rc, cc, options);
        if found.is_empty() {
            return None;
        }
        let sigma = options.radius_km / 2.0;
        let two_sigma_sq = 2.0 * sigma * sigma;
        let (sum, weights) = found.iter().fold((0.0, 0.0), |(sum, weights), &(d, v)| {
            let w = (-(d * d) / two_sigma_sq).exp();
            (sum + w * v, weights + w)
        });
        (weights > 0.0).then(|| sum / weights)
    }

    fn inverse(&self, lat: f64, lon: f64, rc: f64, cc: f64, options: &SamplingOptions) -> Option<f64> {
        let found = self.neighbours(lat, lon, rc, cc, options);
        let first = found.first()?;
        if first.0 < 1e-9 {
            return Some(first.1);
        }
        let (sum, weights) = found
            .iter()
            .fold((0.0, 0.0), |(sum, weights), &(d, v)| (sum + v / d, weights + 1.0 / d));
        Some(sum / weights)
    }
}

/// Cells either side of the centre covering `cells`, capped at `limit`.
fn half_window(cells: f64, limit: usize) -> isize {
    cells.ceil().min(limit as f64).max(0.0) as isize + 1
}

/// Great-circle distance in kilometres.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let dphi = phi2 - phi1;
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
}

/// Sample one horizontal slice at every point of `target`.
///
/// Points without data come back as NaN.
pub fn sample_grid(
    source: &RegularGrid,
    values: &[f64],
    target: &GeoGrid,
    options: &SamplingOptions,
) -> TileResult<Vec<f64>> {
    if values.len() != source.cells() {
        return Err(TileError::SamplingFailed(format!(
            "slice has {} values, grid expects {}x{}",
            values.len(),
            source.rows,
            source.cols
        )));
    }

    let slice = Slice {
        grid: source,
        values,
        wrap: source.wrap_cols(),
    };

    let out = target
        .points()
        .map(|(lat, lon)| {
            let rc = source.row_coord(lat);
            let cc = source.col_coord(lon);
            let sampled = match options.interpolation {
                Interpolation::Nearest => slice.nearest(rc, cc),
                Interpolation::Bilinear => slice.bilinear(rc, cc),
                Interpolation::Gaussian => slice.gaussian(lat, lon, rc, cc, options),
                Interpolation::Inverse => slice.inverse(lat, lon, rc, cc, options),
            };
            sampled.unwrap_or(f64::NAN)
        })
        .collect();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;

    /// 1 degree grid over 0..4 N, 0..4 E, value = row * 10 + col
    fn small_grid() -> (RegularGrid, Vec<f64>) {
        let grid = RegularGrid::new(0.0, 4.0, 0.0, 4.0, 5, 5).unwrap();
        let values = (0..25).map(|i| ((i / 5) * 10 + i % 5) as f64).collect();
        (grid, values)
    }

    fn options(interpolation: Interpolation) -> SamplingOptions {
        SamplingOptions {
            interpolation,
            ..Default::default()
        }
    }

    #[test]
    fn test_nearest_picks_closest_cell() {
        let (grid, values) = small_grid();
        // lat 3.9 -> row 0, lon 1.2 -> col 1
        let target = GeoGrid::from_axes(&[3.9], &[1.2]);
        let out = sample_grid(&grid, &values, &target, &options(Interpolation::Nearest)).unwrap();
        assert_eq!(out, vec![1.0]);
    }

    #[test]
    fn test_bilinear_interpolates() {
        let (grid, values) = small_grid();
        // Halfway between rows 0 and 1 and columns 0 and 1
        let target = GeoGrid::from_axes(&[3.5], &[0.5]);
        let out = sample_grid(&grid, &values, &target, &options(Interpolation::Bilinear)).unwrap();
        assert_approx_eq!(out[0], 5.5, 1e-9);
    }

    #[test]
    fn test_bilinear_masks_when_a_corner_is_missing() {
        let (grid, mut values) = small_grid();
        values[1] = f64::NAN;
        let target = GeoGrid::from_axes(&[3.5], &[0.5]);
        let out = sample_grid(&grid, &values, &target, &options(Interpolation::Bilinear)).unwrap();
        assert!(out[0].is_nan());
    }

    #[test]
    fn test_outside_grid_is_nan() {
        let (grid, values) = small_grid();
        let target = GeoGrid::from_axes(&[-30.0], &[2.0]);
        for method in [
            Interpolation::Nearest,
            Interpolation::Bilinear,
            Interpolation::Gaussian,
            Interpolation::Inverse,
        ] {
            let out = sample_grid(&grid, &values, &target, &options(method)).unwrap();
            assert!(out[0].is_nan(), "{} should not extrapolate", method);
        }
    }

    #[test]
    fn test_inverse_exact_hit() {
        let (grid, values) = small_grid();
        let target = GeoGrid::from_axes(&[2.0], &[2.0]);
        let out = sample_grid(&grid, &values, &target, &options(Interpolation::Inverse)).unwrap();
        assert_approx_eq!(out[0], 22.0, 1e-9);
    }

    #[test]
    fn test_weighted_methods_on_constant_field() {
        let grid = RegularGrid::new(0.0, 4.0, 0.0, 4.0, 5, 5).unwrap();
        let values = vec![7.0; 25];
        let target = GeoGrid::from_axes(&[1.3, 2.7], &[0.4, 3.1]);
        let opts = SamplingOptions {
            interpolation: Interpolation::Gaussian,
            radius_km: 200.0,
            neighbours: 10,
        };
        for method in [Interpolation::Gaussian, Interpolation::Inverse] {
            let opts = SamplingOptions {
                interpolation: method,
                ..opts
            };
            let out = sample_grid(&grid, &values, &target, &opts).unwrap();
            assert!(out.iter().all(|v| (v - 7.0).abs() < 1e-9));
        }
    }

    #[test]
    fn test_huge_radius_search_stays_within_grid() {
        let (grid, values) = small_grid();
        let target = GeoGrid::from_axes(&[2.0, 1.5], &[2.0, 0.5]);
        for method in [Interpolation::Gaussian, Interpolation::Inverse] {
            let opts = SamplingOptions {
                interpolation: method,
                radius_km: 1e12,
                neighbours: 25,
            };
            let out = sample_grid(&grid, &values, &target, &opts).unwrap();
            assert_eq!(out.len(), 4);
            assert!(out.iter().all(|v| v.is_finite()), "{}: {:?}", method, out);
        }
    }

    #[test]
    fn test_global_window_counts_each_column_once() {
        let grid = RegularGrid::new(-45.0, 45.0, -180.0, 180.0, 2, 5).unwrap();
        let values = vec![1.0, 2.0, 3.0, 4.0, 1.0, 1.0, 2.0, 3.0, 4.0, 1.0];
        let target = GeoGrid::from_axes(&[0.0], &[0.0]);
        let opts = SamplingOptions {
            interpolation: Interpolation::Inverse,
            radius_km: SamplingOptions::MAX_RADIUS_KM,
            neighbours: 100,
        };
        let slice = Slice {
            grid: &grid,
            values: &values,
            wrap: grid.wrap_cols(),
        };
        let found = slice.neighbours(0.0, 0.0, grid.row_coord(0.0), grid.col_coord(0.0), &opts);
        // 2 rows x 4 distinct columns
        assert_eq!(found.len(), 8);
        let out = sample_grid(&grid, &values, &target, &opts).unwrap();
        assert!(out[0].is_finite());
    }

    #[test]
    fn test_global_grid_wraps_longitude() {
        // 90 degree spacing, -180 and 180 are the same column
        let grid = RegularGrid::new(-45.0, 45.0, -180.0, 180.0, 2, 5).unwrap();
        let values = vec![1.0, 2.0, 3.0, 4.0, 1.0, 1.0, 2.0, 3.0, 4.0, 1.0];
        let target = GeoGrid::from_axes(&[45.0], &[179.0, -181.0, 270.0]);
        let out = sample_grid(&grid, &values, &target, &options(Interpolation::Nearest)).unwrap();
        assert_eq!(out, vec![1.0, 1.0, 2.0]);
    }

    #[test]
    fn test_slice_length_checked() {
        let (grid, _) = small_grid();
        let target = GeoGrid::from_axes(&[1.0], &[1.0]);
        let result = sample_grid(&grid, &[1.0; 3], &target, &SamplingOptions::default());
        assert!(matches!(result, Err(TileError::SamplingFailed(_))));
    }

    #[test]
    fn test_haversine_one_degree() {
        let d = haversine_km(0.0, 0.0, 1.0, 0.0);
        assert_approx_eq!(d, KM_PER_DEGREE, 1e-6);
    }
}
