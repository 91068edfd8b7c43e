//! Named color ramps and keyword-based ramp selection.
//!
//! A ramp is a 256-entry lookup table of RGBA floats in `[0, 1]`. Sampling
//! follows the usual colormap convention: a normalized value `t` selects
//! entry `min(floor(t * 256), 255)`, so `t = 1.0` lands on the last entry.
//!
//! Ramps can be loaded from a JSON document shaped like:
//!
//! ```json
//! {
//!   "version": "1",
//!   "ramps": {
//!     "thermal": {
//!       "stops": [{"position": 0.0, "color": "#042333"}, {"position": 1.0, "color": "#e8fa5b"}],
//!       "keywords": ["temperature"]
//!     }
//!   }
//! }
//! ```

use ocean_common::{TileError, TileResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Number of entries in every ramp lookup table.
pub const LUT_SIZE: usize = 256;

/// Float RGBA color, each channel in `[0, 1]`.
pub type Rgba = [f64; 4];

/// A sampled color ramp.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorRamp {
    name: String,
    lut: Vec<Rgba>,
}

impl ColorRamp {
    /// Build a ramp by linear interpolation between positioned stops.
    ///
    /// Stops are sorted by position. Positions outside the first and last stop
    /// take the nearest stop's color.
    pub fn from_stops(name: impl Into<String>, stops: &[(f64, Rgba)]) -> TileResult<Self> {
        let name = name.into();
        if stops.is_empty() {
            return Err(TileError::ConfigError(format!(
                "color ramp '{}' has no stops",
                name
            )));
        }

        let mut sorted = stops.to_vec();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let lut = (0..LUT_SIZE)
            .map(|i| {
                let t = i as f64 / (LUT_SIZE - 1) as f64;
                interpolate_stops(&sorted, t)
            })
            .collect();

        Ok(Self { name, lut })
    }

    /// Build a ramp from evenly spaced colors.
    pub fn from_colors(name: impl Into<String>, colors: &[Rgba]) -> TileResult<Self> {
        let last = colors.len().saturating_sub(1).max(1) as f64;
        let stops: Vec<(f64, Rgba)> = colors
            .iter()
            .enumerate()
            .map(|(i, c)| (i as f64 / last, *c))
            .collect();
        Self::from_stops(name, &stops)
    }

    /// Build an opaque ramp from evenly spaced hex colors.
    pub fn from_hex(name: impl Into<String>, colors: &[&str]) -> TileResult<Self> {
        let name = name.into();
        let parsed = colors
            .iter()
            .map(|hex| {
                hex_to_rgba(hex, 1.0).ok_or_else(|| {
                    TileError::ConfigError(format!("invalid color '{}' in ramp '{}'", hex, name))
                })
            })
            .collect::<TileResult<Vec<_>>>()?;
        Self::from_colors(name, &parsed)
    }

    /// Wrap an existing table. Tables of any other length are resampled.
    pub fn from_lut(name: impl Into<String>, entries: Vec<Rgba>) -> TileResult<Self> {
        if entries.len() == LUT_SIZE {
            return Ok(Self {
                name: name.into(),
                lut: entries,
            });
        }
        Self::from_colors(name, &entries)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[Rgba] {
        &self.lut
    }

    /// Color at normalized position `t`. Values outside `[0, 1]` clamp to the
    /// end entries; NaN maps to the first entry.
    pub fn rgba(&self, t: f64) -> Rgba {
        self.lut[lut_index(t)]
    }

    /// Color at `t` as 8-bit channels, truncating `c * 255`.
    pub fn rgba8(&self, t: f64) -> [u8; 4] {
        to_rgba8(self.rgba(t))
    }

    /// `count` colors taken from this ramp at evenly spaced positions between
    /// `start` and `end` (inclusive, either direction).
    pub fn sample_range(&self, start: f64, end: f64, count: usize) -> Vec<Rgba> {
        match count {
            0 => Vec::new(),
            1 => vec![self.rgba(start)],
            _ => (0..count)
                .map(|i| {
                    let t = start + (end - start) * i as f64 / (count - 1) as f64;
                    self.rgba(t)
                })
                .collect(),
        }
    }

    /// The same ramp traversed end to start.
    pub fn reversed(&self, name: impl Into<String>) -> Self {
        let mut lut = self.lut.clone();
        lut.reverse();
        Self {
            name: name.into(),
            lut,
        }
    }
}

fn lut_index(t: f64) -> usize {
    if t.is_nan() || t <= 0.0 {
        return 0;
    }
    ((t * LUT_SIZE as f64) as usize).min(LUT_SIZE - 1)
}

fn interpolate_stops(stops: &[(f64, Rgba)], t: f64) -> Rgba {
    let first = stops[0];
    let last = stops[stops.len() - 1];
    if t <= first.0 {
        return first.1;
    }
    if t >= last.0 {
        return last.1;
    }

    for pair in stops.windows(2) {
        let (p0, c0) = pair[0];
        let (p1, c1) = pair[1];
        if t >= p0 && t <= p1 {
            let span = p1 - p0;
            let f = if span > 0.0 { (t - p0) / span } else { 0.0 };
            return [
                c0[0] + (c1[0] - c0[0]) * f,
                c0[1] + (c1[1] - c0[1]) * f,
                c0[2] + (c1[2] - c0[2]) * f,
                c0[3] + (c1[3] - c0[3]) * f,
            ];
        }
    }
    last.1
}

/// Convert a float color to 8-bit channels by truncation.
pub fn to_rgba8(c: Rgba) -> [u8; 4] {
    [
        channel_u8(c[0]),
        channel_u8(c[1]),
        channel_u8(c[2]),
        channel_u8(c[3]),
    ]
}

fn channel_u8(c: f64) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0) as u8
}

/// Parse a `#rrggbb` hex color into float RGBA with the given alpha.
pub fn hex_to_rgba(hex: &str, alpha: f64) -> Option<Rgba> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

    Some([
        r as f64 / 255.0,
        g as f64 / 255.0,
        b as f64 / 255.0,
        alpha,
    ])
}

/// Ramp configuration document.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ColormapConfig {
    pub version: String,
    pub ramps: HashMap<String, RampDefinition>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RampDefinition {
    pub stops: Vec<RampStop>,
    /// Lowercase substrings of variable names that select this ramp.
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RampStop {
    pub position: f64,
    pub color: String,
    #[serde(default = "default_alpha")]
    pub alpha: f64,
}

fn default_alpha() -> f64 {
    1.0
}

impl ColormapConfig {
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }
}

/// Ramp used when no keyword matches a variable name.
pub const DEFAULT_RAMP: &str = "default";

/// Registry of named ramps plus the keyword table used to pick a ramp for a
/// variable.
#[derive(Debug, Clone)]
pub struct ColormapRegistry {
    ramps: HashMap<String, ColorRamp>,
    // Checked in order; first match wins.
    keywords: Vec<(String, String)>,
}

impl ColormapRegistry {
    /// The built-in ramp set. Apart from `transparent_gray`, which only strokes
    /// contour lines, no built-in ramp contains a near-black color: the raster
    /// path treats near-black pixels as background.
    pub fn builtin() -> Self {
        let mut registry = Self {
            ramps: HashMap::new(),
            keywords: Vec::new(),
        };

        for (name, colors) in BUILTIN_HEX_RAMPS {
            // Built-in tables are static and well-formed.
            if let Ok(ramp) = ColorRamp::from_hex(*name, colors) {
                registry.insert(ramp);
            }
        }
        if let Ok(gray) = ColorRamp::from_colors(
            "transparent_gray",
            &[[0.0, 0.0, 0.0, 1.0], [0.0, 0.0, 0.0, 0.5]],
        ) {
            registry.insert(gray);
        }

        registry.keywords = BUILTIN_KEYWORDS
            .iter()
            .map(|(k, r)| (k.to_string(), r.to_string()))
            .collect();
        registry
    }

    /// Built-in ramps extended (or overridden) by a JSON configuration.
    pub fn with_config(config: &ColormapConfig) -> TileResult<Self> {
        let mut registry = Self::builtin();
        registry.extend(config)?;
        Ok(registry)
    }

    pub fn extend(&mut self, config: &ColormapConfig) -> TileResult<()> {
        let mut names: Vec<&String> = config.ramps.keys().collect();
        names.sort();

        for name in names {
            let def = &config.ramps[name];
            let stops = def
                .stops
                .iter()
                .map(|s| {
                    hex_to_rgba(&s.color, s.alpha)
                        .map(|c| (s.position, c))
                        .ok_or_else(|| {
                            TileError::ConfigError(format!(
                                "invalid color '{}' in ramp '{}'",
                                s.color, name
                            ))
                        })
                })
                .collect::<TileResult<Vec<_>>>()?;
            self.insert(ColorRamp::from_stops(name.clone(), &stops)?);

            // Configured keywords take precedence over built-in ones.
            for (i, keyword) in def.keywords.iter().enumerate() {
                self.keywords
                    .insert(i, (keyword.to_lowercase(), name.clone()));
            }
        }
        Ok(())
    }

    pub fn insert(&mut self, ramp: ColorRamp) {
        self.ramps.insert(ramp.name().to_string(), ramp);
    }

    /// Look up a ramp by exact name.
    pub fn get(&self, name: &str) -> TileResult<&ColorRamp> {
        self.ramps
            .get(name)
            .ok_or_else(|| TileError::UnknownColormap(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ramps.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.ramps.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Name of the ramp that suits a variable. A keyword matches when its
    /// words appear in order as whole words of the variable name, ignoring
    /// case and punctuation.
    pub fn ramp_name_for_variable(&self, variable: &str) -> &str {
        let words = words(variable);
        self.keywords
            .iter()
            .find(|(keyword, ramp)| contains_words(&words, keyword) && self.contains(ramp))
            .map(|(_, ramp)| ramp.as_str())
            .unwrap_or(DEFAULT_RAMP)
    }

    /// Ramp that suits a variable, falling back to the default ramp.
    pub fn for_variable(&self, variable: &str) -> TileResult<&ColorRamp> {
        self.get(self.ramp_name_for_variable(variable))
    }
}

fn words(s: &str) -> Vec<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn contains_words(haystack: &[String], keyword: &str) -> bool {
    let needle = words(keyword);
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle.as_slice())
}

impl Default for ColormapRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

const BUILTIN_HEX_RAMPS: &[(&str, &[&str])] = &[
    (
        "default",
        &["#440154", "#3b528b", "#21918c", "#5ec962", "#fde725"],
    ),
    (
        "thermal",
        &[
            "#042333", "#2c3395", "#744992", "#b15f82", "#eb7655", "#fbb33e", "#e8fa5b",
        ],
    ),
    (
        "haline",
        &[
            "#2a186c", "#14439c", "#206e8b", "#3c9387", "#5ab978", "#aad85c", "#fdef9a",
        ],
    ),
    (
        "speed",
        &[
            "#fffdcd", "#e1cd73", "#aaac20", "#5f920c", "#187328", "#144b2a", "#172313",
        ],
    ),
    (
        "anomaly",
        &["#3b4cc0", "#8db0fe", "#f5f5f5", "#f4987a", "#b40426"],
    ),
    (
        "bathymetry",
        &[
            "#fdfecc", "#a5dbb2", "#5bb7b5", "#3b8fb6", "#3e62a6", "#403f7c", "#281a3f",
        ],
    ),
    (
        "chlorophyll",
        &["#d7f9d0", "#8ccb7c", "#3d9a44", "#1b6a2b", "#0f3f1d"],
    ),
    (
        "ice",
        &["#0a1a3a", "#245b9e", "#66a5cc", "#c8e7f0", "#f9fdff"],
    ),
    (
        "waveheight",
        &["#e0f3f8", "#91bfdb", "#4575b4", "#7b3294", "#3d1054"],
    ),
    (
        "oxygen",
        &["#400505", "#8f1d1d", "#c55a3c", "#e8c5a0", "#a9a9a9", "#4f4f4f"],
    ),
    (
        "density",
        &["#e6f1f1", "#a0c7d8", "#7a94c9", "#7a5aa8", "#5d2a74", "#360e24"],
    ),
    (
        "greyscale",
        &["#2b2b2b", "#7f7f7f", "#ffffff"],
    ),
    (
        "brbg",
        &[
            "#543005", "#8c510a", "#bf812d", "#dfc27d", "#f6e8c3", "#f5f5f5", "#c7eae5",
            "#80cdc1", "#35978f", "#01665e", "#003c30",
        ],
    ),
];

const BUILTIN_KEYWORDS: &[(&str, &str)] = &[
    ("anomaly", "anomaly"),
    ("bathymetry", "bathymetry"),
    ("temperature", "thermal"),
    ("temp", "thermal"),
    ("salinity", "haline"),
    ("salt", "haline"),
    ("chlorophyll", "chlorophyll"),
    ("sea ice", "ice"),
    ("ice thickness", "ice"),
    ("wave", "waveheight"),
    ("oxygen", "oxygen"),
    ("density", "density"),
    ("speed", "speed"),
    ("velocity", "speed"),
    ("current", "speed"),
    ("wind", "speed"),
    ("eastward", "speed"),
    ("northward", "speed"),
    ("zonal", "speed"),
    ("meridional", "speed"),
    ("x", "speed"),
    ("y", "speed"),
];
