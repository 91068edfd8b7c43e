//! Variable metadata: units, display names, scale factors, climatologies.

use crate::store::DatasetManifest;
use ocean_common::{TileError, TileResult};
use std::collections::HashMap;

/// Metadata for one variable of one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableInfo {
    pub display_name: String,
    pub unit: String,
    pub scale_factor: f64,
}

impl VariableInfo {
    pub fn new(display_name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            unit: unit.into(),
            scale_factor: 1.0,
        }
    }

    pub fn with_scale_factor(mut self, factor: f64) -> Self {
        self.scale_factor = factor;
        self
    }
}

/// Looks up variable metadata by dataset and variable key.
pub trait VariableCatalog: Send + Sync {
    fn variable(&self, dataset: &str, variable: &str) -> TileResult<VariableInfo>;

    /// Id of the climatology dataset paired with `dataset`, if any.
    fn climatology(&self, dataset: &str) -> Option<String>;

    fn unit(&self, dataset: &str, variable: &str) -> TileResult<String> {
        Ok(self.variable(dataset, variable)?.unit)
    }

    fn display_name(&self, dataset: &str, variable: &str) -> TileResult<String> {
        Ok(self.variable(dataset, variable)?.display_name)
    }

    fn scale_factor(&self, dataset: &str, variable: &str) -> TileResult<f64> {
        Ok(self.variable(dataset, variable)?.scale_factor)
    }
}

/// A catalog built once at start-up and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    variables: HashMap<(String, String), VariableInfo>,
    climatologies: HashMap<String, String>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variable(
        mut self,
        dataset: impl Into<String>,
        variable: impl Into<String>,
        info: VariableInfo,
    ) -> Self {
        self.variables
            .insert((dataset.into(), variable.into()), info);
        self
    }

    pub fn with_climatology(
        mut self,
        dataset: impl Into<String>,
        climatology: impl Into<String>,
    ) -> Self {
        self.climatologies
            .insert(dataset.into(), climatology.into());
        self
    }

    /// Catalog every variable listed in a dataset manifest.
    pub fn from_manifest(manifest: &DatasetManifest) -> Self {
        let mut catalog = Self::new();
        for dataset in &manifest.datasets {
            if let Some(climatology) = &dataset.climatology {
                catalog
                    .climatologies
                    .insert(dataset.id.clone(), climatology.clone());
            }
            for variable in &dataset.variables {
                catalog.variables.insert(
                    (dataset.id.clone(), variable.key.clone()),
                    VariableInfo::new(&variable.name, &variable.unit)
                        .with_scale_factor(variable.scale_factor),
                );
            }
        }
        catalog
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

impl VariableCatalog for StaticCatalog {
    fn variable(&self, dataset: &str, variable: &str) -> TileResult<VariableInfo> {
        self.variables
            .get(&(dataset.to_string(), variable.to_string()))
            .cloned()
            .ok_or_else(|| TileError::VariableNotFound {
                dataset: dataset.to_string(),
                variable: variable.to_string(),
            })
    }

    fn climatology(&self, dataset: &str) -> Option<String> {
        self.climatologies.get(dataset).cloned()
    }
}
