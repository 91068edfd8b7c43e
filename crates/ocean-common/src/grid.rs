//! Geographic sampling grids.

use crate::{TileError, TileResult};

/// One `(lat, lon)` pair per output pixel, row-major, row 0 at the top edge.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoGrid {
    pub width: usize,
    pub height: usize,
    /// Latitudes in degrees
    pub lat: Vec<f64>,
    /// Longitudes in degrees
    pub lon: Vec<f64>,
}

impl GeoGrid {
    /// Build a grid from explicit per-pixel coordinates.
    pub fn new(width: usize, height: usize, lat: Vec<f64>, lon: Vec<f64>) -> TileResult<Self> {
        let expected = width * height;
        if lat.len() != expected || lon.len() != expected {
            return Err(TileError::ShapeMismatch {
                expected: (height, width),
                actual: (lat.len() / width.max(1), lon.len() / width.max(1)),
            });
        }
        Ok(Self {
            width,
            height,
            lat,
            lon,
        })
    }

    /// Broadcast a latitude axis (one per row) and a longitude axis (one per
    /// column) into a full mesh.
    pub fn from_axes(lats: &[f64], lons: &[f64]) -> Self {
        let width = lons.len();
        let height = lats.len();
        let mut lat = Vec::with_capacity(width * height);
        let mut lon = Vec::with_capacity(width * height);
        for &row_lat in lats {
            for &col_lon in lons {
                lat.push(row_lat);
                lon.push(col_lon);
            }
        }
        Self {
            width,
            height,
            lat,
            lon,
        }
    }

    /// Coordinates of pixel `(row, col)` as `(lat, lon)`.
    pub fn get(&self, row: usize, col: usize) -> (f64, f64) {
        let idx = row * self.width + col;
        (self.lat[idx], self.lon[idx])
    }

    pub fn len(&self) -> usize {
        self.lat.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lat.is_empty()
    }

    /// Iterate over `(lat, lon)` pairs in row-major order.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.lat.iter().copied().zip(self.lon.iter().copied())
    }
}
