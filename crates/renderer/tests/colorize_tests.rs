//! Tests for color mapping of scalar fields.

use ocean_common::{ColorScale, ScalarField};
use renderer::colorize::{colorize, is_background};
use renderer::ColormapRegistry;
use test_utils::{create_constant_grid, create_grid_with_nans, create_sea_temperature_grid, field};

// ============================================================================
// Uniform and masked fields
// ============================================================================

#[test]
fn test_flat_field_maps_to_ramp_midpoint() {
    let registry = ColormapRegistry::builtin();
    let ramp = registry.get("thermal").unwrap();
    let data = field(256, 256, create_constant_grid(256, 256, 10.0), "Celsius");
    let scale = ColorScale::new(0.0, 20.0).unwrap();

    let raster = colorize(&data, &scale, ramp);
    let [r, g, b, _] = ramp.rgba8(0.5);

    for px in raster.pixels().chunks_exact(4) {
        assert_eq!(px, &[r, g, b, 255]);
    }
}

#[test]
fn test_fully_masked_field_is_transparent() {
    let registry = ColormapRegistry::builtin();
    let data = ScalarField::fully_masked(256, 256);
    let scale = ColorScale::new(0.0, 20.0).unwrap();

    let raster = colorize(&data, &scale, registry.get("default").unwrap());
    assert!(raster.is_fully_transparent());
}

#[test]
fn test_nan_cells_are_transparent() {
    let registry = ColormapRegistry::builtin();
    let data = field(8, 8, create_grid_with_nans(8, 8, 3), "");
    let scale = ColorScale::new(0.0, 8000.0).unwrap();
    let raster = colorize(&data, &scale, registry.get("default").unwrap());

    for idx in 0..64 {
        let px = raster.pixel(idx / 8, idx % 8);
        if idx % 3 == 0 {
            assert_eq!(px, [0, 0, 0, 0]);
        } else {
            assert_eq!(px[3], 255);
        }
    }
}

// ============================================================================
// Built-in ramps never produce background pixels
// ============================================================================

#[test]
fn test_builtin_filled_ramps_have_no_background_entries() {
    let registry = ColormapRegistry::builtin();
    for name in registry.names() {
        if name == "transparent_gray" {
            continue;
        }
        let ramp = registry.get(name).unwrap();
        for i in 0..256 {
            let [r, g, b, _] = ramp.rgba8(i as f64 / 255.0);
            assert!(!is_background(r, g, b), "ramp {} entry {} is near-black", name, i);
        }
    }
}

// ============================================================================
// Orientation
// ============================================================================

#[test]
fn test_row_zero_is_top_edge() {
    let registry = ColormapRegistry::builtin();
    let ramp = registry.get("thermal").unwrap();
    let data = field(4, 4, create_sea_temperature_grid(4, 4), "Kelvin");
    let scale = ColorScale::new(271.0, 300.0).unwrap();
    let raster = colorize(&data, &scale, ramp);

    // North edge is coldest, south edge warmest.
    assert_eq!(raster.pixel(0, 0), ramp.rgba8(0.0));
    assert_eq!(raster.pixel(3, 0), ramp.rgba8(1.0));
}
