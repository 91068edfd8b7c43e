//! Error types for tile rendering.

use thiserror::Error;

/// Result type alias using TileError.
pub type TileResult<T> = Result<T, TileError>;

/// Who is at fault for a failed render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// The request itself is malformed or names something that does not exist.
    Client,
    /// A dataset, raster or other collaborator failed underneath us.
    Upstream,
    /// A bug or resource failure inside the engine.
    Internal,
}

impl FaultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultKind::Client => "client",
            FaultKind::Upstream => "upstream",
            FaultKind::Internal => "internal",
        }
    }
}

/// Primary error type for tile operations.
#[derive(Debug, Error)]
pub enum TileError {
    // === Input Errors ===
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("Tile {x}/{y} is outside zoom level {zoom}")]
    InvalidTile { x: u32, y: u32, zoom: u32 },

    #[error("Unsupported projection: {0}")]
    UnsupportedProjection(String),

    #[error("Unsupported number of variable components: {0} (at most 2)")]
    UnsupportedComponents(usize),

    #[error("Unknown colormap: {0}")]
    UnknownColormap(String),

    // === Data Errors ===
    #[error("Dataset not found: {0}")]
    DatasetNotFound(String),

    #[error("Variable '{variable}' not found in dataset '{dataset}'")]
    VariableNotFound { dataset: String, variable: String },

    #[error("No climatology configured for dataset '{0}'")]
    NoClimatology(String),

    #[error("Depth index {index} out of range ({available} depths)")]
    DepthOutOfRange { index: usize, available: usize },

    #[error("Field shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    // === Upstream Errors ===
    #[error("Failed to open dataset: {0}")]
    DatasetOpen(String),

    #[error("Dataset has no timestamps: {0}")]
    NoTimestamps(String),

    #[error("Sampling failed: {0}")]
    SamplingFailed(String),

    #[error("Bathymetry unavailable: {0}")]
    BathymetryUnavailable(String),

    #[error("Raster window ({x}, {y}, {width}x{height}) outside raster {raster_width}x{raster_height}")]
    RasterOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        raster_width: usize,
        raster_height: usize,
    },

    // === Internal Errors ===
    #[error("Rendering failed: {0}")]
    RenderError(String),

    #[error("Encoding failed: {0}")]
    EncodeError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl TileError {
    /// Shorthand for an InvalidParameter error.
    pub fn invalid_parameter(param: impl Into<String>, message: impl Into<String>) -> Self {
        TileError::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }

    /// Classify the error.
    pub fn kind(&self) -> FaultKind {
        match self {
            TileError::MissingParameter(_)
            | TileError::InvalidParameter { .. }
            | TileError::InvalidTile { .. }
            | TileError::UnsupportedProjection(_)
            | TileError::UnsupportedComponents(_)
            | TileError::UnknownColormap(_)
            | TileError::DatasetNotFound(_)
            | TileError::VariableNotFound { .. }
            | TileError::NoClimatology(_)
            | TileError::DepthOutOfRange { .. } => FaultKind::Client,

            TileError::DatasetOpen(_)
            | TileError::NoTimestamps(_)
            | TileError::SamplingFailed(_)
            | TileError::BathymetryUnavailable(_)
            | TileError::RasterOutOfBounds { .. } => FaultKind::Upstream,

            TileError::ShapeMismatch { .. }
            | TileError::RenderError(_)
            | TileError::EncodeError(_)
            | TileError::ConfigError(_)
            | TileError::InternalError(_) => FaultKind::Internal,
        }
    }

    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            TileError::DatasetNotFound(_) | TileError::VariableNotFound { .. } => 404,
            TileError::RasterOutOfBounds { .. } | TileError::SamplingFailed(_) => 502,
            _ => match self.kind() {
                FaultKind::Client => 400,
                FaultKind::Upstream => 503,
                FaultKind::Internal => 500,
            },
        }
    }
}

impl From<std::io::Error> for TileError {
    fn from(err: std::io::Error) -> Self {
        TileError::InternalError(err.to_string())
    }
}

impl From<serde_json::Error> for TileError {
    fn from(err: serde_json::Error) -> Self {
        TileError::ConfigError(format!("JSON error: {}", err))
    }
}
