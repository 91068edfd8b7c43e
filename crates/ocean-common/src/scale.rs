//! Numeric colour-scale ranges.

use crate::{TileError, TileResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Normalisation domain for colour mapping and contour levels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorScale {
    pub min: f64,
    pub max: f64,
}

impl ColorScale {
    pub fn new(min: f64, max: f64) -> TileResult<Self> {
        if !min.is_finite() || !max.is_finite() {
            return Err(TileError::invalid_parameter(
                "scale",
                format!("bounds must be finite, got {},{}", min, max),
            ));
        }
        if max <= min {
            return Err(TileError::invalid_parameter(
                "scale",
                format!("max ({}) must be greater than min ({})", max, min),
            ));
        }
        if !(max - min).is_finite() {
            return Err(TileError::invalid_parameter(
                "scale",
                format!("range {},{} overflows", min, max),
            ));
        }
        Ok(Self { min, max })
    }

    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    /// Map a value to `[0, 1]`, clamping outside the domain.
    pub fn normalize(&self, value: f64) -> f64 {
        ((value - self.min) / self.range()).clamp(0.0, 1.0)
    }

    /// `count` equally spaced levels above `min`, the last being exactly `max`.
    pub fn quantized_levels(&self, count: usize) -> Vec<f64> {
        if count == 0 {
            return vec![];
        }
        let step = self.range() / count as f64;
        let mut levels: Vec<f64> = (1..count).map(|i| self.min + i as f64 * step).collect();
        levels.push(self.max);
        levels
    }

    /// A value strictly below every normalised level, used to fill masked
    /// cells before contouring.
    pub fn below_range(&self) -> f64 {
        self.min - self.range().abs().max(1.0) * 1e-3
    }
}

impl FromStr for ColorScale {
    type Err = TileError;

    /// Parse `"min,max"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 2 {
            return Err(TileError::invalid_parameter(
                "scale",
                format!("expected 'min,max', got '{}'", s),
            ));
        }
        let parse = |p: &str| {
            p.parse::<f64>().map_err(|_| {
                TileError::invalid_parameter("scale", format!("'{}' is not a number", p))
            })
        };
        ColorScale::new(parse(parts[0])?, parse(parts[1])?)
    }
}
