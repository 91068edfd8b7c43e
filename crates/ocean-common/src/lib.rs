//! Common types shared across the ocean tile crates.

pub mod error;
pub mod field;
pub mod grid;
pub mod scale;
pub mod tile;

pub use error::{FaultKind, TileError, TileResult};
pub use field::ScalarField;
pub use grid::GeoGrid;
pub use scale::ColorScale;
pub use tile::{Projection, TileAddress, TILE_SIZE};
