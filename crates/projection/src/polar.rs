//! Polar Stereographic projection on the WGS84 ellipsoid.
//!
//! Two variants are supported (formulas after Snyder, "Map Projections - A
//! Working Manual", §21):
//! - Variant A: natural origin at the pole with a scale factor `k0`
//!   (UPS north, EPSG:32661).
//! - Variant B: true scale at a standard parallel `lat_ts`
//!   (Antarctic Polar Stereographic, EPSG:3031).
//!
//! The south-pole aspect is evaluated by mirroring through the north-pole
//! formulas: latitude and longitude offset are negated on the way in, planar
//! coordinates on the way out.

use crate::transform::PlanarProjection;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

/// WGS84 semi-major axis (metres)
const WGS84_A: f64 = 6378137.0;
/// WGS84 inverse flattening
const WGS84_INV_F: f64 = 298.257223563;

#[derive(Debug, Clone)]
pub struct PolarStereographic {
    /// Central meridian in radians
    pub lon0: f64,
    /// True for the south-pole aspect
    pub south: bool,
    /// False easting (metres)
    pub false_easting: f64,
    /// False northing (metres)
    pub false_northing: f64,
    /// Semi-major axis (metres)
    pub a: f64,
    /// First eccentricity
    pub e: f64,
    /// rho = rho_factor * t
    rho_factor: f64,
}

impl PolarStereographic {
    /// Variant A: origin at the pole with scale factor `k0`.
    pub fn with_scale_factor(
        south: bool,
        lon0_deg: f64,
        k0: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Self {
        let a = WGS84_A;
        let e = wgs84_eccentricity();
        let rho_factor =
            2.0 * a * k0 / ((1.0 + e).powf(1.0 + e) * (1.0 - e).powf(1.0 - e)).sqrt();

        Self {
            lon0: lon0_deg.to_radians(),
            south,
            false_easting,
            false_northing,
            a,
            e,
            rho_factor,
        }
    }

    /// Variant B: true scale along the standard parallel `lat_ts_deg`.
    ///
    /// The sign of `lat_ts_deg` selects the aspect.
    pub fn with_standard_parallel(
        lat_ts_deg: f64,
        lon0_deg: f64,
        false_easting: f64,
        false_northing: f64,
    ) -> Self {
        let a = WGS84_A;
        let e = wgs84_eccentricity();
        let south = lat_ts_deg < 0.0;
        let phi_c = lat_ts_deg.abs().to_radians();

        let m_c = phi_c.cos() / (1.0 - e * e * phi_c.sin().powi(2)).sqrt();
        let t_c = conformal_t(phi_c, e);

        Self {
            lon0: lon0_deg.to_radians(),
            south,
            false_easting,
            false_northing,
            a,
            e,
            rho_factor: a * m_c / t_c,
        }
    }

    /// UPS North (EPSG:32661).
    pub fn ups_north() -> Self {
        Self::with_scale_factor(false, 0.0, 0.994, 2_000_000.0, 2_000_000.0)
    }

    /// Antarctic Polar Stereographic (EPSG:3031).
    pub fn antarctic() -> Self {
        Self::with_standard_parallel(-71.0, 0.0, 0.0, 0.0)
    }
}

impl PlanarProjection for PolarStereographic {
    fn forward(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64) {
        let mut phi = lat_deg.to_radians();
        let mut dlam = lon_deg.to_radians() - self.lon0;
        if self.south {
            phi = -phi;
            dlam = -dlam;
        }

        let rho = self.rho_factor * conformal_t(phi, self.e);
        let (mut x, mut y) = (rho * dlam.sin(), -rho * dlam.cos());
        if self.south {
            x = -x;
            y = -y;
        }

        (self.false_easting + x, self.false_northing + y)
    }

    fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let mut x = x - self.false_easting;
        let mut y = y - self.false_northing;
        if self.south {
            x = -x;
            y = -y;
        }

        let rho = x.hypot(y);
        let t = rho / self.rho_factor;

        let half_e = self.e / 2.0;
        let mut phi = FRAC_PI_2 - 2.0 * t.atan();
        for _ in 0..15 {
            let es = self.e * phi.sin();
            let next = FRAC_PI_2 - 2.0 * (t * ((1.0 - es) / (1.0 + es)).powf(half_e)).atan();
            if (next - phi).abs() < 1e-12 {
                phi = next;
                break;
            }
            phi = next;
        }

        let mut dlam = x.atan2(-y);
        if self.south {
            phi = -phi;
            dlam = -dlam;
        }

        (phi.to_degrees(), normalize_lon(self.lon0 + dlam).to_degrees())
    }
}

fn wgs84_eccentricity() -> f64 {
    let f = 1.0 / WGS84_INV_F;
    (f * (2.0 - f)).sqrt()
}

/// Snyder eq. 15-9, for the north-pole aspect.
fn conformal_t(phi: f64, e: f64) -> f64 {
    let es = e * phi.sin();
    (FRAC_PI_4 - phi / 2.0).tan() / ((1.0 - es) / (1.0 + es)).powf(e / 2.0)
}

/// Wrap a longitude in radians into `[-π, π)`.
fn normalize_lon(lon: f64) -> f64 {
    (lon + PI).rem_euclid(2.0 * PI) - PI
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ups_north_pole_is_false_origin() {
        let proj = PolarStereographic::ups_north();
        let (x, y) = proj.forward(90.0, 0.0);
        assert!((x - 2_000_000.0).abs() < 1e-6);
        assert!((y - 2_000_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_ups_north_greenwich_points_down() {
        let proj = PolarStereographic::ups_north();
        let (x, y) = proj.forward(80.0, 0.0);
        assert!((x - 2_000_000.0).abs() < 1e-6);
        assert!(y < 2_000_000.0);
    }

    #[test]
    fn test_antarctic_true_scale_parallel() {
        // At the standard parallel rho equals a * m_c (~2 082 760 m)
        let proj = PolarStereographic::antarctic();
        let (x, y) = proj.forward(-71.0, 0.0);
        assert!(x.abs() < 1e-6);
        assert!((y - 2_082_760.0).abs() < 1_000.0, "y = {}", y);
    }

    #[test]
    fn test_antarctic_quadrants() {
        let proj = PolarStereographic::antarctic();
        let (x, y) = proj.forward(-60.0, 45.0);
        assert!(x > 0.0 && y > 0.0);
        let (x, y) = proj.forward(-60.0, -135.0);
        assert!(x < 0.0 && y < 0.0);
    }

    #[test]
    fn test_roundtrip_both_aspects() {
        let cases = [
            (PolarStereographic::ups_north(), [(60.0, -45.0), (75.5, 120.0), (88.0, -170.0)]),
            (PolarStereographic::antarctic(), [(-60.0, 45.0), (-75.5, -120.0), (-88.0, 170.0)]),
        ];
        for (proj, points) in cases.iter() {
            for &(lat, lon) in points {
                let (x, y) = proj.forward(lat, lon);
                let (lat2, lon2) = proj.inverse(x, y);
                assert!((lat - lat2).abs() < 1e-8, "lat {} vs {}", lat, lat2);
                assert!((lon - lon2).abs() < 1e-8, "lon {} vs {}", lon, lon2);
            }
        }
    }
}
