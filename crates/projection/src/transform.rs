//! Tile index to coordinate grid transforms.
//!
//! Web Mercator tiles are sampled by projecting the two tile corners into
//! planar metres, interpolating evenly between them and inverting back to
//! geographic coordinates. Polar tiles are laid out directly in planar space
//! from a square that circumscribes the bounding latitude circle, since
//! interpolating geographic corners near a pole is unstable.

use crate::mercator::WebMercator;
use crate::polar::PolarStereographic;
use ocean_common::tile::num2deg;
use ocean_common::{GeoGrid, Projection, TileAddress, TileResult, TILE_SIZE};

/// Forward/inverse between geographic degrees and planar metres.
pub trait PlanarProjection: Send + Sync {
    /// `(lat, lon)` in degrees to `(x, y)` in metres.
    fn forward(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64);
    /// `(x, y)` in metres to `(lat, lon)` in degrees.
    fn inverse(&self, x: f64, y: f64) -> (f64, f64);
}

/// Planar parameters of the polar tile pyramids.
struct PolarExtent {
    bounding_lat: f64,
    lon0: f64,
    llcrnr_lon: f64,
    urcrnr_lon: f64,
}

const NORTH_EXTENT: PolarExtent = PolarExtent {
    bounding_lat: 60.0,
    lon0: 0.0,
    llcrnr_lon: -45.0,
    urcrnr_lon: 135.0,
};

const SOUTH_EXTENT: PolarExtent = PolarExtent {
    bounding_lat: -60.0,
    lon0: 0.0,
    llcrnr_lon: -135.0,
    urcrnr_lon: 45.0,
};

/// Planar projection for a tile projection.
pub fn planar_projection(projection: Projection) -> Box<dyn PlanarProjection> {
    match projection {
        Projection::WebMercator => Box::new(WebMercator),
        Projection::PolarNorth => Box::new(PolarStereographic::ups_north()),
        Projection::PolarSouth => Box::new(PolarStereographic::antarctic()),
    }
}

/// Planar coordinates of every pixel of a tile, row-major, row 0 on top.
#[derive(Debug, Clone)]
pub struct PlanarGrid {
    pub width: usize,
    pub height: usize,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

/// Evenly spaced samples from `start` to `end`, both inclusive.
fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    if count == 1 {
        return vec![start];
    }
    let step = (end - start) / (count - 1) as f64;
    (0..count).map(|i| start + step * i as f64).collect()
}

/// Lower-left and upper-right planar corners of a polar tile pyramid.
fn polar_corners(proj: &dyn PlanarProjection, extent: &PolarExtent) -> ((f64, f64), (f64, f64)) {
    let (_, yy) = proj.forward(extent.bounding_lat, extent.lon0);
    let (corner_lat, _) = proj.inverse(std::f64::consts::SQRT_2 * yy, 0.0);
    let ll = proj.forward(corner_lat, extent.llcrnr_lon);
    let ur = proj.forward(corner_lat, extent.urcrnr_lon);
    (ll, ur)
}

/// Planar pixel coordinates of a tile.
pub fn tile_planar_grid(tile: &TileAddress) -> PlanarGrid {
    let proj = planar_projection(tile.projection);

    match tile.projection {
        Projection::WebMercator => {
            let (nw_lat, nw_lon) = num2deg(tile.x as f64, tile.y as f64, tile.zoom);
            let (se_lat, se_lon) = num2deg(tile.x as f64 + 1.0, tile.y as f64 + 1.0, tile.zoom);
            let (x1, y1) = proj.forward(nw_lat, nw_lon);
            let (x2, y2) = proj.forward(se_lat, se_lon);

            let xs = linspace(x1, x2, TILE_SIZE);
            let ys = linspace(y1, y2, TILE_SIZE);

            let mut x = Vec::with_capacity(TILE_SIZE * TILE_SIZE);
            let mut y = Vec::with_capacity(TILE_SIZE * TILE_SIZE);
            for &row_y in &ys {
                for &col_x in &xs {
                    x.push(col_x);
                    y.push(row_y);
                }
            }
            PlanarGrid {
                width: TILE_SIZE,
                height: TILE_SIZE,
                x,
                y,
            }
        }
        Projection::PolarNorth | Projection::PolarSouth => {
            let extent = if tile.projection == Projection::PolarNorth {
                &NORTH_EXTENT
            } else {
                &SOUTH_EXTENT
            };
            let ((llx, lly), (urx, ury)) = polar_corners(proj.as_ref(), extent);

            let n = tile.tiles_per_axis();
            let tile_w = (urx - llx) / n;
            let tile_h = (ury - lly) / n;
            let dx = tile_w / TILE_SIZE as f64;
            let dy = tile_h / TILE_SIZE as f64;

            let x0 = llx + tile.x as f64 * tile_w;
            let y0 = lly + (n - tile.y as f64 - 1.0) * tile_h;

            let mut x = Vec::with_capacity(TILE_SIZE * TILE_SIZE);
            let mut y = Vec::with_capacity(TILE_SIZE * TILE_SIZE);
            for row in 0..TILE_SIZE {
                // Rows count down from the top edge
                let py = y0 + dy * (TILE_SIZE - 1 - row) as f64;
                for col in 0..TILE_SIZE {
                    x.push(x0 + dx * col as f64);
                    y.push(py);
                }
            }
            PlanarGrid {
                width: TILE_SIZE,
                height: TILE_SIZE,
                x,
                y,
            }
        }
    }
}

/// Geographic coordinates of every pixel of a tile.
pub fn tile_to_geo(tile: &TileAddress) -> TileResult<GeoGrid> {
    let proj = planar_projection(tile.projection);

    if tile.projection == Projection::WebMercator {
        // Both axes are separable: invert one row and one column, then broadcast
        let planar = tile_planar_grid(tile);
        let lons: Vec<f64> = planar.x[..planar.width]
            .iter()
            .map(|&x| proj.inverse(x, 0.0).1)
            .collect();
        let lats: Vec<f64> = (0..planar.height)
            .map(|row| proj.inverse(0.0, planar.y[row * planar.width]).0)
            .collect();
        return Ok(GeoGrid::from_axes(&lats, &lons));
    }

    let planar = tile_planar_grid(tile);
    let (lat, lon): (Vec<f64>, Vec<f64>) = planar
        .x
        .iter()
        .zip(&planar.y)
        .map(|(&x, &y)| proj.inverse(x, y))
        .unzip();

    tracing::trace!(tile = %tile.cache_key(), "computed polar tile grid");
    GeoGrid::new(planar.width, planar.height, lat, lon)
}
