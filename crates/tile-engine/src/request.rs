//! Parsing raw query parameters into validated requests.

use crate::dataset::{DepthSelector, Interpolation, SamplingOptions};
use ocean_common::{ColorScale, TileError, TileResult};
use std::collections::HashMap;
use std::str::FromStr;

/// Suffix on the variable parameter that requests an anomaly.
pub const ANOMALY_SUFFIX: &str = "_anom";

/// Contour ramp name meaning "pick by variable".
pub const DEFAULT_CONTOURS: &str = "default";

const MAX_COMPONENTS: usize = 2;

/// A validated data tile request (filled raster or contours).
#[derive(Debug, Clone, PartialEq)]
pub struct TileRequest {
    pub dataset: String,
    /// One variable, or two vector components
    pub variables: Vec<String>,
    pub anomaly: bool,
    pub depth: DepthSelector,
    /// Requested time index; negative counts back from the latest
    pub time: i64,
    pub scale: ColorScale,
    pub sampling: SamplingOptions,
    /// Ramp override for the filled raster
    pub display: Option<String>,
    /// Ramp for contour lines, or [`DEFAULT_CONTOURS`]
    pub contours: String,
    /// Skip bathymetry masking
    pub masking_disabled: bool,
}

impl TileRequest {
    /// Parse query parameters. `defaults` supplies sampling options the
    /// request leaves out.
    pub fn from_params(
        params: &HashMap<String, String>,
        defaults: &SamplingOptions,
    ) -> TileResult<Self> {
        let dataset = required(params, "dataset")?.to_string();
        let (variables, anomaly) = parse_variables(required(params, "variable")?)?;
        let scale = ColorScale::from_str(required(params, "scale")?)?;

        let depth = match optional(params, "depth") {
            None => DepthSelector::default(),
            Some(d) if d.eq_ignore_ascii_case("bottom") => DepthSelector::Bottom,
            Some(d) => DepthSelector::Index(parse_number(d, "depth")?),
        };

        let time = match optional(params, "time") {
            None => -1,
            Some(t) => parse_number(t, "time")?,
        };

        let mut sampling = *defaults;
        if let Some(interp) = optional(params, "interp") {
            sampling.interpolation = Interpolation::parse(interp).ok_or_else(|| {
                TileError::invalid_parameter(
                    "interp",
                    format!("'{}' is not one of nearest, bilinear, gaussian, inverse", interp),
                )
            })?;
        }
        if let Some(radius) = optional(params, "radius") {
            let radius: f64 = parse_number(radius, "radius")?;
            if !(radius.is_finite() && radius > 0.0) {
                return Err(TileError::invalid_parameter("radius", "must be positive"));
            }
            if radius > SamplingOptions::MAX_RADIUS_KM {
                return Err(TileError::invalid_parameter(
                    "radius",
                    format!("must be at most {} km", SamplingOptions::MAX_RADIUS_KM),
                ));
            }
            sampling.radius_km = radius;
        }
        if let Some(neighbours) = optional(params, "neighbours") {
            let neighbours: usize = parse_number(neighbours, "neighbours")?;
            if neighbours == 0 {
                return Err(TileError::invalid_parameter("neighbours", "must be at least 1"));
            }
            sampling.neighbours = neighbours;
        }

        Ok(Self {
            dataset,
            variables,
            anomaly,
            depth,
            time,
            scale,
            sampling,
            display: optional(params, "display").map(str::to_string),
            contours: optional(params, "contours")
                .unwrap_or(DEFAULT_CONTOURS)
                .to_string(),
            masking_disabled: optional(params, "masked").map(parse_flag).unwrap_or(false),
        })
    }

    pub fn components(&self) -> usize {
        self.variables.len()
    }
}

/// A validated legend request.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleRequest {
    pub dataset: String,
    pub variables: Vec<String>,
    pub anomaly: bool,
    pub scale: ColorScale,
}

impl ScaleRequest {
    pub fn from_params(params: &HashMap<String, String>) -> TileResult<Self> {
        let dataset = required(params, "dataset")?.to_string();
        let (variables, anomaly) = parse_variables(required(params, "variable")?)?;
        let scale = ColorScale::from_str(required(params, "scale")?)?;
        Ok(Self {
            dataset,
            variables,
            anomaly,
            scale,
        })
    }
}

/// Whether a topography request asks for shaded relief.
pub fn shaded_relief(params: &HashMap<String, String>) -> bool {
    optional(params, "shaded_relief")
        .map(parse_flag)
        .unwrap_or(false)
}

/// Split `"a,b"` / `"a_anom"` into variable keys and the anomaly flag.
pub fn parse_variables(raw: &str) -> TileResult<(Vec<String>, bool)> {
    let raw = raw.trim();
    let (list, anomaly) = match raw.strip_suffix(ANOMALY_SUFFIX) {
        Some(stripped) => (stripped, true),
        None => (raw, false),
    };

    let variables: Vec<String> = list.split(',').map(|v| v.trim().to_string()).collect();
    if variables.iter().any(String::is_empty) {
        return Err(TileError::invalid_parameter(
            "variable",
            format!("empty variable name in '{}'", raw),
        ));
    }
    if variables.len() > MAX_COMPONENTS {
        return Err(TileError::UnsupportedComponents(variables.len()));
    }
    Ok((variables, anomaly))
}

fn optional<'a>(params: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    params
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

fn required<'a>(params: &'a HashMap<String, String>, name: &str) -> TileResult<&'a str> {
    optional(params, name).ok_or_else(|| TileError::MissingParameter(name.to_string()))
}

fn parse_number<T: FromStr>(value: &str, name: &str) -> TileResult<T> {
    value
        .parse()
        .map_err(|_| TileError::invalid_parameter(name, format!("'{}' is not a valid number", value)))
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes")
}
