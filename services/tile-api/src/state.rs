//! Application state and shared resources.

use metrics_exporter_prometheus::PrometheusHandle;
use ocean_common::TileResult;
use tile_engine::{EngineConfig, RenderContext, SamplingOptions};

/// Shared application state.
pub struct AppState {
    pub ctx: RenderContext,
    /// Sampling used when a request does not override it
    pub sampling: SamplingOptions,
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    /// Open the file-backed stores named by `config`.
    pub fn new(config: &EngineConfig, prometheus: Option<PrometheusHandle>) -> TileResult<Self> {
        Ok(Self {
            ctx: RenderContext::from_config(config)?,
            sampling: config.sampling,
            prometheus,
        })
    }

    /// State around an already built render context.
    pub fn from_context(ctx: RenderContext, sampling: SamplingOptions) -> Self {
        Self {
            ctx,
            sampling,
            prometheus: None,
        }
    }
}
