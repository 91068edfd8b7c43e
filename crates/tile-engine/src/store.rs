//! File-backed datasets described by a YAML manifest.
//!
//! Each variable is a raw little-endian `f32` array laid out
//! `[time][depth][row][col]` (or `[time][row][col]` when the variable has no
//! depth axis) on the manifest's [`RegularGrid`]. NaN marks missing data.
//! Paths are relative to the directory holding the manifest.

use crate::dataset::{Dataset, DatasetProvider, DepthSelector, SamplingOptions};
use crate::sampling::{sample_grid, RegularGrid};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ocean_common::{GeoGrid, ScalarField, TileError, TileResult};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Top-level manifest document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetManifest {
    pub datasets: Vec<DatasetEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetEntry {
    pub id: String,
    /// Id of the paired climatology dataset
    #[serde(default)]
    pub climatology: Option<String>,
    pub timestamps: Vec<DateTime<Utc>>,
    #[serde(default)]
    pub depths: Vec<f64>,
    pub grid: RegularGrid,
    pub variables: Vec<VariableEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableEntry {
    pub key: String,
    pub name: String,
    pub unit: String,
    pub file: PathBuf,
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,
    #[serde(default = "default_depth_dependent")]
    pub depth_dependent: bool,
}

fn default_scale_factor() -> f64 {
    1.0
}

fn default_depth_dependent() -> bool {
    true
}

impl DatasetManifest {
    pub fn from_yaml(yaml: &str) -> TileResult<Self> {
        let manifest: Self = serde_yaml::from_str(yaml)
            .map_err(|e| TileError::ConfigError(format!("invalid dataset manifest: {}", e)))?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn from_file(path: &Path) -> TileResult<Self> {
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            TileError::ConfigError(format!("cannot read manifest {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&yaml)
    }

    pub fn validate(&self) -> TileResult<()> {
        let mut ids = HashSet::new();
        for dataset in &self.datasets {
            if !ids.insert(dataset.id.as_str()) {
                return Err(TileError::ConfigError(format!(
                    "dataset '{}' is listed twice",
                    dataset.id
                )));
            }
            dataset
                .grid
                .validate()
                .map_err(|e| TileError::ConfigError(format!("dataset '{}': {}", dataset.id, e)))?;
        }
        for dataset in &self.datasets {
            if let Some(climatology) = &dataset.climatology {
                if !ids.contains(climatology.as_str()) {
                    return Err(TileError::ConfigError(format!(
                        "dataset '{}' names unknown climatology '{}'",
                        dataset.id, climatology
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn dataset(&self, id: &str) -> Option<&DatasetEntry> {
        self.datasets.iter().find(|d| d.id == id)
    }
}

impl DatasetEntry {
    pub fn variable(&self, key: &str) -> Option<&VariableEntry> {
        self.variables.iter().find(|v| v.key == key)
    }
}

/// Opens datasets listed in a manifest.
#[derive(Debug, Clone)]
pub struct FileDatasetProvider {
    datasets: HashMap<String, Arc<DatasetEntry>>,
    root: PathBuf,
}

impl FileDatasetProvider {
    pub fn new(manifest: &DatasetManifest, root: impl Into<PathBuf>) -> Self {
        let datasets = manifest
            .datasets
            .iter()
            .map(|d| (d.id.clone(), Arc::new(d.clone())))
            .collect();
        Self {
            datasets,
            root: root.into(),
        }
    }

    /// Load the manifest at `path`; variable files resolve against its directory.
    pub fn from_manifest_file(path: &Path) -> TileResult<(Self, DatasetManifest)> {
        let manifest = DatasetManifest::from_file(path)?;
        let root = path.parent().map(Path::to_path_buf).unwrap_or_default();
        info!(
            manifest = %path.display(),
            datasets = manifest.datasets.len(),
            "Loaded dataset manifest"
        );
        Ok((Self::new(&manifest, root), manifest))
    }
}

#[async_trait]
impl DatasetProvider for FileDatasetProvider {
    async fn open(&self, dataset: &str) -> TileResult<Box<dyn Dataset>> {
        let entry = self
            .datasets
            .get(dataset)
            .ok_or_else(|| TileError::DatasetNotFound(dataset.to_string()))?;
        Ok(Box::new(FileDataset {
            entry: Arc::clone(entry),
            root: self.root.clone(),
        }))
    }
}

/// An open manifest dataset.
pub struct FileDataset {
    entry: Arc<DatasetEntry>,
    root: PathBuf,
}

#[async_trait]
impl Dataset for FileDataset {
    fn id(&self) -> &str {
        &self.entry.id
    }

    fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.entry.timestamps
    }

    fn depths(&self) -> &[f64] {
        &self.entry.depths
    }

    fn has_variable(&self, variable: &str) -> bool {
        self.entry.variable(variable).is_some()
    }

    async fn get_area(
        &self,
        grid: &GeoGrid,
        depth: DepthSelector,
        time_index: usize,
        variable: &str,
        options: &SamplingOptions,
    ) -> TileResult<ScalarField> {
        let var = self
            .entry
            .variable(variable)
            .ok_or_else(|| TileError::VariableNotFound {
                dataset: self.entry.id.clone(),
                variable: variable.to_string(),
            })?;
        if time_index >= self.entry.timestamps.len() {
            return Err(TileError::SamplingFailed(format!(
                "time index {} out of range for '{}'",
                time_index, self.entry.id
            )));
        }

        let read = SliceRead::plan(&self.entry, var, depth, time_index)?;
        let path = self.root.join(&var.file);
        let source = self.entry.grid;
        let target = grid.clone();
        let options = *options;

        debug!(
            dataset = %self.entry.id,
            variable = variable,
            depth = %depth,
            time_index = time_index,
            interpolation = %options.interpolation,
            "Sampling variable"
        );

        let values = tokio::task::spawn_blocking(move || {
            let slice = read.execute(&path, source.cells())?;
            sample_grid(&source, &slice, &target, &options)
        })
        .await
        .map_err(|e| TileError::InternalError(format!("sampling task failed: {}", e)))??;

        ScalarField::from_values(grid.width, grid.height, values).map(|f| f.with_unit(&var.unit))
    }
}

/// Which slices of a variable file one request needs.
#[derive(Debug, Clone, Copy)]
struct SliceRead {
    first: usize,
    count: usize,
}

impl SliceRead {
    fn plan(
        entry: &DatasetEntry,
        var: &VariableEntry,
        depth: DepthSelector,
        time_index: usize,
    ) -> TileResult<Self> {
        if !var.depth_dependent {
            return Ok(Self {
                first: time_index,
                count: 1,
            });
        }
        let levels = entry.depths.len().max(1);
        match depth {
            DepthSelector::Index(index) if index < levels => Ok(Self {
                first: time_index * levels + index,
                count: 1,
            }),
            DepthSelector::Index(index) => Err(TileError::DepthOutOfRange {
                index,
                available: entry.depths.len(),
            }),
            DepthSelector::Bottom => Ok(Self {
                first: time_index * levels,
                count: levels,
            }),
        }
    }

    /// Read the planned slices; several levels collapse to the deepest
    /// finite value per cell.
    fn execute(&self, path: &Path, cells: usize) -> TileResult<Vec<f64>> {
        let mut file = File::open(path).map_err(|e| {
            TileError::DatasetOpen(format!("cannot open {}: {}", path.display(), e))
        })?;
        let slice_bytes = (cells * 4) as u64;
        file.seek(SeekFrom::Start(self.first as u64 * slice_bytes))
            .map_err(|e| TileError::SamplingFailed(e.to_string()))?;

        let mut bytes = vec![0u8; cells * 4 * self.count];
        file.read_exact(&mut bytes).map_err(|e| {
            TileError::SamplingFailed(format!(
                "{} is shorter than its manifest entry: {}",
                path.display(),
                e
            ))
        })?;

        let mut out = vec![f64::NAN; cells];
        for level in bytes.chunks_exact(cells * 4) {
            for (cell, raw) in out.iter_mut().zip(level.chunks_exact(4)) {
                let v = f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as f64;
                if v.is_finite() {
                    *cell = v;
                }
            }
        }
        Ok(out)
    }
}
