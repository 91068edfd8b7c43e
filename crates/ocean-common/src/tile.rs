//! Slippy-map tile addressing.
//!
//! Tiles are addressed by `(x, y, zoom)` with `(0, 0)` at the north-west
//! corner of the tiled extent, in one of the supported map projections.

use crate::{TileError, TileResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tile width and height in pixels.
pub const TILE_SIZE: usize = 256;

/// Map projections tiles can be requested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Projection {
    /// Spherical Web Mercator (EPSG:3857)
    WebMercator,
    /// Universal Polar Stereographic north (EPSG:32661)
    PolarNorth,
    /// Antarctic Polar Stereographic (EPSG:3031)
    PolarSouth,
}

impl Projection {
    /// EPSG code string for this projection.
    pub fn code(&self) -> &'static str {
        match self {
            Projection::WebMercator => "EPSG:3857",
            Projection::PolarNorth => "EPSG:32661",
            Projection::PolarSouth => "EPSG:3031",
        }
    }
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Projection {
    type Err = TileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "EPSG:3857" | "EPSG:900913" | "3857" => Ok(Projection::WebMercator),
            "EPSG:32661" | "32661" => Ok(Projection::PolarNorth),
            "EPSG:3031" | "3031" => Ok(Projection::PolarSouth),
            _ => Err(TileError::UnsupportedProjection(s.to_string())),
        }
    }
}

/// A validated tile address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileAddress {
    pub x: u32,
    pub y: u32,
    pub zoom: u32,
    pub projection: Projection,
}

impl TileAddress {
    /// Create a tile address, rejecting indices outside `[0, 2^zoom)`.
    pub fn new(x: u32, y: u32, zoom: u32, projection: Projection) -> TileResult<Self> {
        if zoom > 30 {
            return Err(TileError::InvalidTile { x, y, zoom });
        }
        let n = 1u64 << zoom;
        if x as u64 >= n || y as u64 >= n {
            return Err(TileError::InvalidTile { x, y, zoom });
        }
        Ok(Self {
            x,
            y,
            zoom,
            projection,
        })
    }

    /// Number of tiles along one axis at this zoom.
    pub fn tiles_per_axis(&self) -> f64 {
        (1u64 << self.zoom) as f64
    }

    /// Pixel offset of this tile inside a raster pre-tiled at the same zoom.
    pub fn pixel_offset(&self) -> (usize, usize) {
        (self.x as usize * TILE_SIZE, self.y as usize * TILE_SIZE)
    }

    /// Generate a cache key string.
    pub fn cache_key(&self) -> String {
        format!("{}/{}/{}/{}", self.projection, self.zoom, self.x, self.y)
    }
}

/// Web Mercator tile corner to latitude/longitude (degrees).
///
/// Fractional tile indices are accepted and map to points inside the tile.
pub fn num2deg(x: f64, y: f64, zoom: u32) -> (f64, f64) {
    let n = (1u64 << zoom) as f64;
    let lon = x / n * 360.0 - 180.0;
    let lat = (std::f64::consts::PI * (1.0 - 2.0 * y / n))
        .sinh()
        .atan()
        .to_degrees();
    (lat, lon)
}

/// Latitude/longitude to fractional Web Mercator tile coordinates.
pub fn deg2num_fractional(lat: f64, lon: f64, zoom: u32) -> (f64, f64) {
    let n = (1u64 << zoom) as f64;
    let lat_rad = lat.to_radians();
    let x = (lon + 180.0) / 360.0 * n;
    let y = (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI) / 2.0 * n;
    (x, y)
}

/// Latitude/longitude to the Web Mercator tile containing it.
pub fn deg2num(lat: f64, lon: f64, zoom: u32) -> (u32, u32) {
    let n = (1u64 << zoom) as f64;
    let (x, y) = deg2num_fractional(lat, lon, zoom);
    let clamp = |v: f64| v.floor().clamp(0.0, n - 1.0) as u32;
    (clamp(x), clamp(y))
}
