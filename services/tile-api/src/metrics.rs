//! Request and render metrics.
//!
//! Recorded through the `metrics` facade; the Prometheus recorder installed
//! in `main` renders them on `/metrics`. Without a recorder every call is a
//! no-op.

use metrics::{counter, histogram};
use ocean_common::TileError;
use std::time::Duration;
use tile_engine::TileKind;

pub const REQUESTS_TOTAL: &str = "tile_requests_total";
pub const RENDER_ERRORS_TOTAL: &str = "tile_render_errors_total";
pub const RENDER_SECONDS: &str = "tile_render_seconds";

/// Count an incoming request for a plot kind.
pub fn record_request(kind: TileKind) {
    counter!(REQUESTS_TOTAL, "kind" => kind.as_str()).increment(1);
}

/// Record the outcome of one render.
pub fn record_render(kind: TileKind, elapsed: Duration, error: Option<&TileError>) {
    histogram!(RENDER_SECONDS, "kind" => kind.as_str()).record(elapsed.as_secs_f64());

    if let Some(err) = error {
        counter!(
            RENDER_ERRORS_TOTAL,
            "kind" => kind.as_str(),
            "fault" => err.kind().as_str()
        )
        .increment(1);
    }
}
