//! Ocean tile HTTP service library.
//!
//! The router is built here so tests can drive it without binding a socket.

pub mod handlers;
pub mod metrics;
pub mod state;

use axum::{extract::Extension, routing::get, Router};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use state::AppState;

/// Build the application router.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        // Map tiles: /tiles/{kind}/{projection}/{z}/{x}/{y}.png
        .route(
            "/tiles/raster/:projection/:z/:x/:y",
            get(handlers::raster_tile_handler),
        )
        .route(
            "/tiles/contour/:projection/:z/:x/:y",
            get(handlers::contour_tile_handler),
        )
        .route(
            "/tiles/topo/:projection/:z/:x/:y",
            get(handlers::topo_tile_handler),
        )
        .route(
            "/tiles/bathymetry/:projection/:z/:x/:y",
            get(handlers::bathymetry_tile_handler),
        )
        // Colour scale legend
        .route("/scale", get(handlers::scale_handler))
        // Health and metrics
        .route("/health", get(handlers::health_handler))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
}
