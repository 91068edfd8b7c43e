//! Spherical Web Mercator (EPSG:3857).

use crate::transform::PlanarProjection;
use std::f64::consts::PI;

/// Sphere radius used by EPSG:3857 (WGS84 semi-major axis).
pub const EARTH_RADIUS: f64 = 6378137.0;

/// Half the width of the projected world, in metres.
pub const MAX_EXTENT: f64 = PI * EARTH_RADIUS;

#[derive(Debug, Clone, Copy, Default)]
pub struct WebMercator;

impl PlanarProjection for WebMercator {
    fn forward(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64) {
        let x = EARTH_RADIUS * lon_deg.to_radians();
        let y = EARTH_RADIUS * (PI / 4.0 + lat_deg.to_radians() / 2.0).tan().ln();
        (x, y)
    }

    fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let lon = (x / EARTH_RADIUS).to_degrees();
        let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();
        (lat, lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin() {
        let (x, y) = WebMercator.forward(0.0, 0.0);
        assert!(x.abs() < 1e-9);
        assert!(y.abs() < 1e-9);
    }

    #[test]
    fn test_world_extent() {
        let (x, y) = WebMercator.forward(85.0511287798, 180.0);
        assert!((x - MAX_EXTENT).abs() < 1e-6);
        assert!((y - MAX_EXTENT).abs() < 1.0);
    }

    #[test]
    fn test_roundtrip() {
        for &(lat, lon) in &[(44.65, -63.57), (-33.9, 18.4), (70.0, 170.0)] {
            let (x, y) = WebMercator.forward(lat, lon);
            let (lat2, lon2) = WebMercator.inverse(x, y);
            assert!((lat - lat2).abs() < 1e-9, "lat {} vs {}", lat, lat2);
            assert!((lon - lon2).abs() < 1e-9, "lon {} vs {}", lon, lon2);
        }
    }
}
