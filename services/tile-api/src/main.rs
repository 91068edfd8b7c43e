//! Ocean tile API service.
//!
//! HTTP server rendering map tiles, isobaths, topography and colour scale
//! legends from ocean model fields.

use anyhow::Result;
use clap::Parser;
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tile_engine::EngineConfig;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use tile_api::state::AppState;

#[derive(Parser, Debug)]
#[command(name = "tile-api")]
#[command(about = "Ocean model tile server")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8080", env = "TILE_API_LISTEN")]
    listen: String,

    /// Log level
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,

    /// Engine configuration file (YAML); environment variables override it
    #[arg(short, long, env = "TILE_API_CONFIG")]
    config: Option<PathBuf>,

    /// Number of tokio worker threads (default: number of CPU cores)
    #[arg(long, env = "TOKIO_WORKER_THREADS")]
    worker_threads: Option<usize>,
}

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(threads) = args.worker_threads {
        runtime_builder.worker_threads(threads);
    }

    let runtime = runtime_builder.build()?;
    runtime.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .json()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let prometheus_handle = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;
    info!("Prometheus metrics exporter initialized");

    let config = EngineConfig::load(args.config.as_deref())?;
    info!(
        manifest = %config.dataset_manifest.display(),
        bathymetry = %config.bathymetry_path_template,
        interpolation = %config.sampling.interpolation,
        "Starting tile API server"
    );

    let state = Arc::new(AppState::new(&config, Some(prometheus_handle))?);
    let app = tile_api::app(state);

    let addr: SocketAddr = args.listen.parse()?;
    info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
