//! Ocean tile rendering engine.
//!
//! A render goes through four stages:
//! 1. [`request`] parses raw query parameters into a validated request
//! 2. a [`dataset::DatasetProvider`] samples each variable on the tile's
//!    [`GeoGrid`](ocean_common::GeoGrid), awaiting all reads up front
//! 3. [`pipeline`] and [`mask`] transform and mask the values synchronously
//! 4. [`render`] colours or contours the field and encodes a PNG
//!
//! Collaborators (datasets, variable metadata, bathymetry, colormaps) are
//! injected through a [`RenderContext`]. The engine keeps no state between
//! renders.

pub mod bathymetry;
pub mod config;
pub mod dataset;
pub mod mask;
pub mod memory;
pub mod metadata;
pub mod pipeline;
pub mod render;
pub mod request;
pub mod sampling;
pub mod store;

pub use bathymetry::{BathymetryRaster, BathymetryStore, FileBathymetryStore, InMemoryBathymetryStore};
pub use config::EngineConfig;
pub use dataset::{Dataset, DatasetProvider, DepthSelector, Interpolation, SamplingOptions};
pub use memory::{InMemoryDataset, InMemoryDatasetProvider};
pub use metadata::{StaticCatalog, VariableCatalog, VariableInfo};
pub use render::{render, PlotRequest, RenderContext, TileKind};
pub use request::{ScaleRequest, TileRequest};
pub use sampling::RegularGrid;
pub use store::{DatasetManifest, FileDatasetProvider};
