//! Configuration for the tile engine.

use crate::dataset::{Interpolation, SamplingOptions};
use ocean_common::{TileError, TileResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration handed to the dataset, bathymetry and colormap stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// YAML manifest listing the datasets.
    pub dataset_manifest: PathBuf,

    /// Bathymetry raster path with `{projection}` and `{zoom}` placeholders.
    pub bathymetry_path_template: String,

    /// Optional JSON file of extra colormaps.
    pub colormap_file: Option<PathBuf>,

    /// Sampling used when a request does not say otherwise.
    pub sampling: SamplingOptions,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dataset_manifest: PathBuf::from("datasets.yaml"),
            bathymetry_path_template: "/data/bathymetry/etopo_{projection}_z{zoom}.f32".to_string(),
            colormap_file: None,
            sampling: SamplingOptions::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Parse a YAML config file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> TileResult<Self> {
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            TileError::ConfigError(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_yaml::from_str(&yaml)
            .map_err(|e| TileError::ConfigError(format!("{}: {}", path.display(), e)))
    }

    /// File (if any), then environment overrides, then validation.
    pub fn load(path: Option<&Path>) -> TileResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate().map_err(TileError::ConfigError)?;
        Ok(config)
    }

    /// Override fields from `lookup(NAME)`; unparseable values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("DATASET_MANIFEST") {
            self.dataset_manifest = PathBuf::from(val);
        }

        if let Some(val) = lookup("BATHYMETRY_PATH_TEMPLATE") {
            self.bathymetry_path_template = val;
        }

        if let Some(val) = lookup("COLORMAP_FILE") {
            self.colormap_file = (!val.is_empty()).then(|| PathBuf::from(val));
        }

        if let Some(val) = lookup("SAMPLING_INTERPOLATION") {
            self.sampling.interpolation = Interpolation::parse_or_default(&val);
        }

        if let Some(val) = lookup("SAMPLING_RADIUS_KM") {
            if let Ok(radius) = val.parse() {
                self.sampling.radius_km = radius;
            }
        }

        if let Some(val) = lookup("SAMPLING_NEIGHBOURS") {
            if let Ok(neighbours) = val.parse() {
                self.sampling.neighbours = neighbours;
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.dataset_manifest.as_os_str().is_empty() {
            return Err("dataset_manifest must be set".to_string());
        }

        if !self.bathymetry_path_template.contains("{zoom}") {
            return Err("bathymetry_path_template must contain {zoom}".to_string());
        }

        if self.sampling.radius_km.is_nan() || self.sampling.radius_km <= 0.0 {
            return Err("sampling.radius_km must be > 0".to_string());
        }

        if self.sampling.radius_km > SamplingOptions::MAX_RADIUS_KM {
            return Err(format!(
                "sampling.radius_km must be <= {}",
                SamplingOptions::MAX_RADIUS_KM
            ));
        }

        if self.sampling.neighbours == 0 {
            return Err("sampling.neighbours must be > 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sampling.interpolation, Interpolation::Gaussian);
        assert!(config.colormap_file.is_none());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("BATHYMETRY_PATH_TEMPLATE", "/tmp/{projection}/{zoom}.f32"),
            ("SAMPLING_INTERPOLATION", "nearest"),
            ("SAMPLING_RADIUS_KM", "12.5"),
            ("SAMPLING_NEIGHBOURS", "many"),
            ("COLORMAP_FILE", "/etc/colormaps.json"),
        ]
        .into_iter()
        .collect();

        let mut config = EngineConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.bathymetry_path_template, "/tmp/{projection}/{zoom}.f32");
        assert_eq!(config.sampling.interpolation, Interpolation::Nearest);
        assert_eq!(config.sampling.radius_km, 12.5);
        assert_eq!(config.sampling.neighbours, 10);
        assert_eq!(config.colormap_file, Some(PathBuf::from("/etc/colormaps.json")));
    }

    #[test]
    fn test_validation() {
        let mut config = EngineConfig::default();
        config.bathymetry_path_template = "/data/etopo.f32".to_string();
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.sampling.neighbours = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.sampling.radius_km = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.sampling.radius_km = 1e12;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.yaml");
        std::fs::write(
            &path,
            "dataset_manifest: /data/datasets.yaml\nsampling:\n  interpolation: bilinear\n",
        )
        .unwrap();

        let config = EngineConfig::from_file(&path).unwrap();
        assert_eq!(config.dataset_manifest, PathBuf::from("/data/datasets.yaml"));
        assert_eq!(config.sampling.interpolation, Interpolation::Bilinear);
        assert_eq!(config.sampling.radius_km, 25.0);
        assert_eq!(
            config.bathymetry_path_template,
            EngineConfig::default().bathymetry_path_template
        );
    }
}
