//! HTTP request handlers.
//!
//! Every tile route takes `/{projection}/{z}/{x}/{y}.png` plus query
//! parameters. Failures are reported as JSON `{"error", "fault"}` with the
//! status code of the underlying [`TileError`].

use axum::{
    extract::{Extension, Path, Query},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use ocean_common::{FaultKind, Projection, TileAddress, TileError, TileResult};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tile_engine::request::shaded_relief;
use tile_engine::{render, PlotRequest, ScaleRequest, TileKind, TileRequest};
use tracing::{debug, error, info, warn};

use crate::metrics;
use crate::state::AppState;

type Params = Query<HashMap<String, String>>;
type TilePath = Path<(String, String, String, String)>;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub fault: &'static str,
}

// ============================================================================
// Tiles
// ============================================================================

/// GET /tiles/raster/{projection}/{z}/{x}/{y}.png
pub async fn raster_tile_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(path): TilePath,
    Query(params): Params,
) -> Response {
    let plot = tile_address(&path).and_then(|tile| {
        let request = TileRequest::from_params(&params, &state.sampling)?;
        Ok(PlotRequest::Filled { tile, request })
    });
    respond(&state, TileKind::Filled, plot).await
}

/// GET /tiles/contour/{projection}/{z}/{x}/{y}.png
pub async fn contour_tile_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(path): TilePath,
    Query(params): Params,
) -> Response {
    let plot = tile_address(&path).and_then(|tile| {
        let request = TileRequest::from_params(&params, &state.sampling)?;
        Ok(PlotRequest::Contour { tile, request })
    });
    respond(&state, TileKind::Contour, plot).await
}

/// GET /tiles/topo/{projection}/{z}/{x}/{y}.png?shaded_relief=
pub async fn topo_tile_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(path): TilePath,
    Query(params): Params,
) -> Response {
    let plot = tile_address(&path).map(|tile| PlotRequest::Topography {
        tile,
        shaded_relief: shaded_relief(&params),
    });
    respond(&state, TileKind::Topography, plot).await
}

/// GET /tiles/bathymetry/{projection}/{z}/{x}/{y}.png
pub async fn bathymetry_tile_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(path): TilePath,
) -> Response {
    let plot = tile_address(&path).map(|tile| PlotRequest::BathymetryContour { tile });
    respond(&state, TileKind::BathymetryContour, plot).await
}

/// GET /scale?dataset=&variable=&scale=
pub async fn scale_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Params,
) -> Response {
    let plot = ScaleRequest::from_params(&params).map(PlotRequest::Legend);
    respond(&state, TileKind::Legend, plot).await
}

/// Parse `{projection}/{z}/{x}/{y}.png` path segments.
fn tile_address((projection, z, x, y): &(String, String, String, String)) -> TileResult<TileAddress> {
    let projection: Projection = projection.parse()?;
    let (y, _) = y.rsplit_once('.').unwrap_or((y.as_str(), "png"));
    TileAddress::new(
        path_number(x, "x")?,
        path_number(y, "y")?,
        path_number(z, "z")?,
        projection,
    )
}

fn path_number(value: &str, name: &str) -> TileResult<u32> {
    value
        .parse()
        .map_err(|_| TileError::invalid_parameter(name, format!("'{}' is not a tile index", value)))
}

async fn respond(state: &AppState, kind: TileKind, plot: TileResult<PlotRequest>) -> Response {
    metrics::record_request(kind);

    let start = Instant::now();
    let result = match plot {
        Ok(plot) => render(&state.ctx, &plot).await,
        Err(e) => Err(e),
    };
    let elapsed = start.elapsed();

    match result {
        Ok(png) => {
            metrics::record_render(kind, elapsed, None);
            debug!(
                kind = %kind,
                bytes = png.len(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Rendered"
            );
            png_response(png)
        }
        Err(err) => {
            metrics::record_render(kind, elapsed, Some(&err));
            match err.kind() {
                FaultKind::Client => info!(kind = %kind, error = %err, "Rejected request"),
                FaultKind::Upstream => warn!(kind = %kind, error = %err, "Upstream failure"),
                FaultKind::Internal => error!(kind = %kind, error = %err, "Render failed"),
            }
            error_response(&err)
        }
    }
}

fn png_response(png: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, "public, max-age=3600"),
        ],
        png,
    )
        .into_response()
}

fn error_response(err: &TileError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = ErrorResponse {
        error: err.to_string(),
        fault: err.kind().as_str(),
    };
    (status, Json(body)).into_response()
}

// ============================================================================
// Health and metrics
// ============================================================================

/// GET /health - Basic health check
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /metrics - Prometheus metrics endpoint
pub async fn metrics_handler(Extension(state): Extension<Arc<AppState>>) -> Response {
    match &state.prometheus {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "metrics recorder not installed").into_response(),
    }
}
