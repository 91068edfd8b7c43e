//! Synthetic ocean-like data generators.
//!
//! These generators create predictable, verifiable patterns that can be used
//! across the test suite. All grids are row-major with row 0 at the top
//! (north).

use ocean_common::ScalarField;

/// Creates a test grid with predictable values.
///
/// Each cell value is `col * 1000 + row`, so `grid[row * width + col]` can be
/// checked directly.
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[1], 1000.0);
/// assert_eq!(grid[10], 1.0);
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f64);
        }
    }
    data
}

/// Sea temperature in Kelvin, warm (≈300K) at the south edge cooling to
/// ≈271K at the north edge.
pub fn create_sea_temperature_grid(width: usize, height: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        let south_factor = row as f64 / height.saturating_sub(1).max(1) as f64;
        for _ in 0..width {
            data.push(271.0 + south_factor * 29.0);
        }
    }
    data
}

/// Eastward current component (m/s), increasing west to east in `[-1, 1]`.
pub fn create_u_current_grid(width: usize, height: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(width * height);
    for _ in 0..height {
        for col in 0..width {
            let x = col as f64 / width.saturating_sub(1).max(1) as f64;
            data.push(2.0 * x - 1.0);
        }
    }
    data
}

/// Northward current component (m/s), increasing south to north in `[-1, 1]`.
pub fn create_v_current_grid(width: usize, height: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        let y = row as f64 / height.saturating_sub(1).max(1) as f64;
        for _ in 0..width {
            data.push(1.0 - 2.0 * y);
        }
    }
    data
}

/// A radial peak of height `peak` at the grid centre falling to zero at the
/// corners. Useful for closed contour rings.
pub fn create_ring_grid(width: usize, height: usize, peak: f64) -> Vec<f64> {
    let cx = (width as f64 - 1.0) / 2.0;
    let cy = (height as f64 - 1.0) / 2.0;
    let max_r = (cx * cx + cy * cy).sqrt().max(1.0);
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let dx = col as f64 - cx;
            let dy = row as f64 - cy;
            let r = (dx * dx + dy * dy).sqrt();
            data.push(peak * (1.0 - r / max_r));
        }
    }
    data
}

/// Elevation (metres) of a continental shelf: land (+200 m) on the west edge
/// sloping to -5000 m on the east edge.
pub fn create_shelf_bathymetry(width: usize, height: usize) -> Vec<f64> {
    let mut data = Vec::with_capacity(width * height);
    for _ in 0..height {
        for col in 0..width {
            let x = col as f64 / width.saturating_sub(1).max(1) as f64;
            data.push(200.0 - x * 5200.0);
        }
    }
    data
}

/// Creates a grid filled with a constant value.
pub fn create_constant_grid(width: usize, height: usize, value: f64) -> Vec<f64> {
    vec![value; width * height]
}

/// Creates a grid with NaN values every `nan_every` cells.
pub fn create_grid_with_nans(width: usize, height: usize, nan_every: usize) -> Vec<f64> {
    let mut data = create_test_grid(width, height);
    for (i, value) in data.iter_mut().enumerate() {
        if nan_every > 0 && i % nan_every == 0 {
            *value = f64::NAN;
        }
    }
    data
}

/// Wrap generator output in a [`ScalarField`] with a unit.
pub fn field(width: usize, height: usize, values: Vec<f64>, unit: &str) -> ScalarField {
    // Generators always produce width * height values.
    match ScalarField::from_values(width, height, values) {
        Ok(field) => field.with_unit(unit),
        Err(e) => panic!("generator produced a mis-shaped grid: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sea_temperature_range() {
        let grid = create_sea_temperature_grid(4, 5);
        assert_eq!(grid[0], 271.0);
        assert_eq!(grid[19], 300.0);
    }

    #[test]
    fn test_current_components() {
        let u = create_u_current_grid(3, 3);
        let v = create_v_current_grid(3, 3);
        assert_eq!(u[0], -1.0);
        assert_eq!(u[2], 1.0);
        assert_eq!(v[0], 1.0);
        assert_eq!(v[8], -1.0);
    }

    #[test]
    fn test_ring_peak() {
        let grid = create_ring_grid(5, 5, 10.0);
        assert_eq!(grid[12], 10.0);
        assert!(grid[0].abs() < 1e-12);
    }

    #[test]
    fn test_shelf_bathymetry_crosses_sea_level() {
        let grid = create_shelf_bathymetry(11, 1);
        assert_eq!(grid[0], 200.0);
        assert_eq!(grid[10], -5000.0);
    }

    #[test]
    fn test_grid_with_nans() {
        let grid = create_grid_with_nans(4, 4, 5);
        assert!(grid[0].is_nan());
        assert!(grid[5].is_nan());
        assert!(!grid[1].is_nan());
    }
}
