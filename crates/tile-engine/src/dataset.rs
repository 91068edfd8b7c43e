//! Dataset sampling collaborators.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ocean_common::{GeoGrid, ScalarField, TileError, TileResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opens datasets by id.
///
/// Handles returned by [`open`](DatasetProvider::open) are owned by a single
/// render and dropped when it finishes.
#[async_trait]
pub trait DatasetProvider: Send + Sync {
    async fn open(&self, dataset: &str) -> TileResult<Box<dyn Dataset>>;
}

/// An open dataset handle.
#[async_trait]
pub trait Dataset: Send + Sync {
    /// Dataset identifier.
    fn id(&self) -> &str;

    /// Available timestamps, oldest first.
    fn timestamps(&self) -> &[DateTime<Utc>];

    /// Depth levels in metres, shallowest first. Empty for surface-only data.
    fn depths(&self) -> &[f64];

    fn has_variable(&self, variable: &str) -> bool;

    /// Sample `variable` at every point of `grid`.
    ///
    /// `time_index` must already be resolved into `0..timestamps().len()`.
    /// Points with no data come back masked.
    async fn get_area(
        &self,
        grid: &GeoGrid,
        depth: DepthSelector,
        time_index: usize,
        variable: &str,
        options: &SamplingOptions,
    ) -> TileResult<ScalarField>;
}

/// Which depth level to sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepthSelector {
    /// Index into [`Dataset::depths`]
    Index(usize),
    /// Deepest valid value in each water column
    Bottom,
}

impl Default for DepthSelector {
    fn default() -> Self {
        Self::Index(0)
    }
}

impl DepthSelector {
    /// Depth in metres used for bathymetry masking.
    ///
    /// `Bottom` resolves to 0 so only land is masked. A dataset without a
    /// depth axis is treated as surface-only.
    pub fn metres(&self, depths: &[f64]) -> TileResult<f64> {
        match *self {
            DepthSelector::Bottom => Ok(0.0),
            DepthSelector::Index(0) if depths.is_empty() => Ok(0.0),
            DepthSelector::Index(index) => {
                depths
                    .get(index)
                    .copied()
                    .ok_or(TileError::DepthOutOfRange {
                        index,
                        available: depths.len(),
                    })
            }
        }
    }
}

impl fmt::Display for DepthSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepthSelector::Index(index) => write!(f, "{}", index),
            DepthSelector::Bottom => f.write_str("bottom"),
        }
    }
}

/// Sampling method used to read a source grid at tile pixel locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    /// Closest source cell
    Nearest,
    /// Weighted average of the 4 surrounding cells
    Bilinear,
    /// Gaussian-weighted average of neighbours within the radius
    Gaussian,
    /// Inverse-distance-weighted average of neighbours within the radius
    Inverse,
}

impl Default for Interpolation {
    fn default() -> Self {
        Self::Gaussian
    }
}

impl Interpolation {
    /// Parse from string (case-insensitive), falling back to the default.
    pub fn parse_or_default(s: &str) -> Self {
        Self::parse(s).unwrap_or_default()
    }

    /// Parse from string (case-insensitive), `None` when unrecognised.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "nearest" => Some(Self::Nearest),
            "bilinear" => Some(Self::Bilinear),
            "gaussian" => Some(Self::Gaussian),
            "inverse" => Some(Self::Inverse),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Bilinear => "bilinear",
            Self::Gaussian => "gaussian",
            Self::Inverse => "inverse",
        }
    }
}

impl fmt::Display for Interpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Options handed to [`Dataset::get_area`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingOptions {
    pub interpolation: Interpolation,
    /// Search radius for the weighted methods, kilometres
    pub radius_km: f64,
    /// Maximum number of neighbours for the weighted methods
    pub neighbours: usize,
}

impl SamplingOptions {
    /// Largest accepted search radius, roughly half the Earth's circumference.
    pub const MAX_RADIUS_KM: f64 = 20_000.0;
}

impl Default for SamplingOptions {
    fn default() -> Self {
        Self {
            interpolation: Interpolation::default(),
            radius_km: 25.0,
            neighbours: 10,
        }
    }
}

/// Resolve a requested time index against `count` timestamps.
///
/// Negative indices count back from the latest; anything out of range wraps
/// modulo `count`.
pub fn resolve_time_index(requested: i64, count: usize, dataset: &str) -> TileResult<usize> {
    if count == 0 {
        return Err(TileError::NoTimestamps(dataset.to_string()));
    }
    Ok(requested.rem_euclid(count as i64) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpolation_parse() {
        assert_eq!(Interpolation::parse_or_default("Nearest"), Interpolation::Nearest);
        assert_eq!(Interpolation::parse_or_default("BILINEAR"), Interpolation::Bilinear);
        assert_eq!(Interpolation::parse_or_default("inverse"), Interpolation::Inverse);
        assert_eq!(Interpolation::parse_or_default("spline"), Interpolation::Gaussian);
        assert_eq!(Interpolation::parse("spline"), None);
    }

    #[test]
    fn test_interpolation_display() {
        assert_eq!(Interpolation::Gaussian.to_string(), "gaussian");
        assert_eq!(Interpolation::Nearest.to_string(), "nearest");
    }

    #[test]
    fn test_time_index_wraps() {
        assert_eq!(resolve_time_index(-1, 3, "d").unwrap(), 2);
        assert_eq!(resolve_time_index(-3, 3, "d").unwrap(), 0);
        assert_eq!(resolve_time_index(-4, 3, "d").unwrap(), 2);
        assert_eq!(resolve_time_index(0, 3, "d").unwrap(), 0);
        assert_eq!(resolve_time_index(5, 3, "d").unwrap(), 2);
    }

    #[test]
    fn test_time_index_without_timestamps() {
        assert!(matches!(
            resolve_time_index(-1, 0, "empty"),
            Err(TileError::NoTimestamps(_))
        ));
    }

    #[test]
    fn test_depth_metres() {
        let depths = [0.5, 100.0, 1000.0];
        assert_eq!(DepthSelector::Index(1).metres(&depths).unwrap(), 100.0);
        assert_eq!(DepthSelector::Bottom.metres(&depths).unwrap(), 0.0);
        assert_eq!(DepthSelector::Index(0).metres(&[]).unwrap(), 0.0);
        assert!(matches!(
            DepthSelector::Index(3).metres(&depths),
            Err(TileError::DepthOutOfRange { index: 3, available: 3 })
        ));
    }

    #[test]
    fn test_sampling_defaults() {
        let options = SamplingOptions::default();
        assert_eq!(options.interpolation, Interpolation::Gaussian);
        assert_eq!(options.radius_km, 25.0);
        assert_eq!(options.neighbours, 10);
    }
}
