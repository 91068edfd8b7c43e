//! Coordinate reference system transformations.
//!
//! Implements map projections from scratch without external dependencies.

pub mod mercator;
pub mod polar;
pub mod transform;

pub use mercator::WebMercator;
pub use polar::PolarStereographic;
pub use transform::{planar_projection, tile_planar_grid, tile_to_geo, PlanarGrid, PlanarProjection};
