//! Image rendering for ocean data tiles.
//!
//! Implements the raster side of every plot kind:
//! - Color ramps and keyword-based ramp selection
//! - Filled color mapping with background transparency
//! - Contour lines (marching squares, tiny-skia strokes)
//! - Shaded-relief topography
//! - Color-scale legends
//! - PNG encoding

pub mod colorize;
pub mod colormap;
pub mod contour;
pub mod filter;
pub mod legend;
pub mod png;
pub mod raster;
pub mod topo;

pub use colorize::colorize;
pub use colormap::{ColorRamp, ColormapConfig, ColormapRegistry};
pub use contour::{render_contours, ContourLevel};
pub use legend::{legend_title, render_scale, Legend};
pub use png::{encode_png, encode_png_with_text};
pub use raster::RgbaRaster;
