//! Tests for tile grid construction across projections.

use ocean_common::tile::deg2num_fractional;
use ocean_common::{Projection, TileAddress, TILE_SIZE};
use projection::{planar_projection, tile_planar_grid, tile_to_geo};
use test_utils::{assert_approx_eq, assert_coords_approx_eq};

// ============================================================================
// Web Mercator
// ============================================================================

#[test]
fn test_mercator_corner_roundtrip_within_one_pixel() {
    for zoom in 0..=12u32 {
        let n = 1u32 << zoom;
        let samples = [0, n / 3, n / 2, n.saturating_sub(1)];
        for &x in &samples {
            for &y in &samples {
                let tile = TileAddress::new(x, y, zoom, Projection::WebMercator).unwrap();
                let grid = tile_to_geo(&tile).unwrap();
                let (lat, lon) = grid.get(0, 0);
                let (fx, fy) = deg2num_fractional(lat, lon, zoom);

                let px_err_x = (fx - x as f64).abs() * TILE_SIZE as f64;
                let px_err_y = (fy - y as f64).abs() * TILE_SIZE as f64;
                assert!(px_err_x < 1.0, "z{} x{} y{}: x error {} px", zoom, x, y, px_err_x);
                assert!(px_err_y < 1.0, "z{} x{} y{}: y error {} px", zoom, x, y, px_err_y);
            }
        }
    }
}

#[test]
fn test_mercator_grid_is_monotonic() {
    let tile = TileAddress::new(5, 11, 5, Projection::WebMercator).unwrap();
    let grid = tile_to_geo(&tile).unwrap();

    for col in 1..TILE_SIZE {
        assert!(grid.get(0, col).1 > grid.get(0, col - 1).1);
    }
    for row in 1..TILE_SIZE {
        assert!(grid.get(row, 0).0 < grid.get(row - 1, 0).0);
    }
}

#[test]
fn test_adjacent_tiles_share_edges() {
    let left = TileAddress::new(4, 6, 4, Projection::WebMercator).unwrap();
    let right = TileAddress::new(5, 6, 4, Projection::WebMercator).unwrap();
    let left = tile_to_geo(&left).unwrap();
    let right = tile_to_geo(&right).unwrap();

    let (_, left_edge) = left.get(0, TILE_SIZE - 1);
    let (_, right_edge) = right.get(0, 0);
    assert_approx_eq!(left_edge, right_edge, 1e-9);
}

// ============================================================================
// Polar
// ============================================================================

#[test]
fn test_polar_grid_inverts_to_planar() {
    for projection in [Projection::PolarNorth, Projection::PolarSouth] {
        let tile = TileAddress::new(1, 2, 2, projection).unwrap();
        let planar = tile_planar_grid(&tile);
        let grid = tile_to_geo(&tile).unwrap();
        let proj = planar_projection(projection);

        for &idx in &[0usize, 1234, TILE_SIZE * TILE_SIZE - 1] {
            let (x, y) = proj.forward(grid.lat[idx], grid.lon[idx]);
            assert_coords_approx_eq!((x, y), (planar.x[idx], planar.y[idx]), 1e-3);
        }
    }
}

#[test]
fn test_polar_tiles_partition_the_extent() {
    // The right edge of one tile is one pixel short of the next tile's left edge
    let a = tile_planar_grid(&TileAddress::new(0, 0, 1, Projection::PolarSouth).unwrap());
    let b = tile_planar_grid(&TileAddress::new(1, 0, 1, Projection::PolarSouth).unwrap());
    let dx = a.x[1] - a.x[0];
    assert_approx_eq!(b.x[0], a.x[TILE_SIZE - 1] + dx, 1e-6);
}

#[test]
fn test_polar_tile_centre_is_the_pole() {
    // Rows count down from the top, so the pole lands on row mid - 1, column mid
    let tile = TileAddress::new(0, 0, 0, Projection::PolarNorth).unwrap();
    let planar = tile_planar_grid(&tile);
    let proj = planar_projection(Projection::PolarNorth);
    let (pole_x, pole_y) = proj.forward(90.0, 0.0);

    let mid = TILE_SIZE / 2;
    let idx = (mid - 1) * TILE_SIZE + mid;
    assert_coords_approx_eq!((planar.x[idx], planar.y[idx]), (pole_x, pole_y), 1e-3);
}

#[test]
fn test_south_pole_tile_hemisphere() {
    let tile = TileAddress::new(0, 0, 0, Projection::PolarSouth).unwrap();
    let grid = tile_to_geo(&tile).unwrap();
    assert!(grid.lat.iter().all(|lat| *lat < 0.0));
}
