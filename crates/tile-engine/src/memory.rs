//! In-memory datasets whose variables are functions of position.

use crate::dataset::{Dataset, DatasetProvider, DepthSelector, SamplingOptions};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ocean_common::{GeoGrid, ScalarField, TileError, TileResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A point a variable function is evaluated at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    pub lat: f64,
    pub lon: f64,
    pub depth: DepthSelector,
    pub time_index: usize,
}

/// Value of a variable at a point; non-finite means no data.
pub type VariableFn = Arc<dyn Fn(SamplePoint) -> f64 + Send + Sync>;

#[derive(Clone)]
pub struct InMemoryDataset {
    id: String,
    timestamps: Vec<DateTime<Utc>>,
    depths: Vec<f64>,
    variables: HashMap<String, (VariableFn, String)>,
}

impl InMemoryDataset {
    pub fn new(id: impl Into<String>, timestamps: Vec<DateTime<Utc>>, depths: Vec<f64>) -> Self {
        Self {
            id: id.into(),
            timestamps,
            depths,
            variables: HashMap::new(),
        }
    }

    pub fn with_variable<F>(mut self, key: impl Into<String>, unit: impl Into<String>, f: F) -> Self
    where
        F: Fn(SamplePoint) -> f64 + Send + Sync + 'static,
    {
        self.variables
            .insert(key.into(), (Arc::new(f), unit.into()));
        self
    }

    pub fn with_constant(self, key: impl Into<String>, unit: impl Into<String>, value: f64) -> Self {
        self.with_variable(key, unit, move |_| value)
    }
}

/// Serves [`InMemoryDataset`]s and counts the handles currently open.
#[derive(Clone, Default)]
pub struct InMemoryDatasetProvider {
    datasets: HashMap<String, InMemoryDataset>,
    open_handles: Arc<AtomicUsize>,
}

impl InMemoryDatasetProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dataset(mut self, dataset: InMemoryDataset) -> Self {
        self.datasets.insert(dataset.id.clone(), dataset);
        self
    }

    /// Handles opened and not yet dropped.
    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DatasetProvider for InMemoryDatasetProvider {
    async fn open(&self, dataset: &str) -> TileResult<Box<dyn Dataset>> {
        let data = self
            .datasets
            .get(dataset)
            .cloned()
            .ok_or_else(|| TileError::DatasetNotFound(dataset.to_string()))?;
        self.open_handles.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(InMemoryHandle {
            data,
            open_handles: Arc::clone(&self.open_handles),
        }))
    }
}

struct InMemoryHandle {
    data: InMemoryDataset,
    open_handles: Arc<AtomicUsize>,
}

impl Drop for InMemoryHandle {
    fn drop(&mut self) {
        self.open_handles.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Dataset for InMemoryHandle {
    fn id(&self) -> &str {
        &self.data.id
    }

    fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.data.timestamps
    }

    fn depths(&self) -> &[f64] {
        &self.data.depths
    }

    fn has_variable(&self, variable: &str) -> bool {
        self.data.variables.contains_key(variable)
    }

    async fn get_area(
        &self,
        grid: &GeoGrid,
        depth: DepthSelector,
        time_index: usize,
        variable: &str,
        _options: &SamplingOptions,
    ) -> TileResult<ScalarField> {
        let (f, unit) = self
            .data
            .variables
            .get(variable)
            .ok_or_else(|| TileError::VariableNotFound {
                dataset: self.data.id.clone(),
                variable: variable.to_string(),
            })?;
        depth.metres(&self.data.depths)?;
        if time_index >= self.data.timestamps.len() {
            return Err(TileError::SamplingFailed(format!(
                "time index {} out of range for '{}'",
                time_index, self.data.id
            )));
        }

        let values = grid
            .points()
            .map(|(lat, lon)| {
                f(SamplePoint {
                    lat,
                    lon,
                    depth,
                    time_index,
                })
            })
            .collect();
        ScalarField::from_values(grid.width, grid.height, values).map(|field| field.with_unit(unit))
    }
}
