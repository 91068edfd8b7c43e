//! Renders through the file-backed manifest, dataset and bathymetry stores.

use ocean_common::{Projection, TileAddress, TileError};
use renderer::ColormapRegistry;
use std::collections::HashMap;
use test_utils::png::{decode_rgba, pixel_at, text_chunk};
use test_utils::{synthetic, OceanFixture};
use tile_engine::{
    render, Dataset, DatasetProvider, DepthSelector, EngineConfig, FileDatasetProvider,
    PlotRequest, RenderContext, SamplingOptions, ScaleRequest, TileRequest, VariableCatalog,
};

// ============================================================================
// Helper functions
// ============================================================================

fn setup() -> (OceanFixture, RenderContext) {
    let fixture = OceanFixture::write().unwrap();
    let config = EngineConfig {
        dataset_manifest: fixture.manifest_path(),
        bathymetry_path_template: fixture.bathymetry_template(),
        ..EngineConfig::default()
    };
    let ctx = RenderContext::from_config(&config).unwrap();
    (fixture, ctx)
}

fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    let mut params: HashMap<String, String> = [("dataset", synthetic::DATASET), ("interp", "nearest")]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    for (k, v) in pairs {
        params.insert(k.to_string(), v.to_string());
    }
    params
}

fn request(pairs: &[(&str, &str)]) -> TileRequest {
    TileRequest::from_params(&params(pairs), &SamplingOptions::default()).unwrap()
}

fn world(projection: Projection) -> TileAddress {
    TileAddress::new(0, 0, 0, projection).unwrap()
}

async fn filled(ctx: &RenderContext, pairs: &[(&str, &str)]) -> Result<Vec<u8>, TileError> {
    render(
        ctx,
        &PlotRequest::Filled {
            tile: world(Projection::WebMercator),
            request: request(pairs),
        },
    )
    .await
}

fn ramp_color(ramp: &str, t: f64) -> [u8; 4] {
    let [r, g, b, _] = ColormapRegistry::builtin().get(ramp).unwrap().rgba8(t);
    [r, g, b, 255]
}

fn centre(png: &[u8]) -> [u8; 4] {
    let (w, _, rgba) = decode_rgba(png);
    pixel_at(&rgba, w, 128, 128)
}

// ============================================================================
// Dataset store
// ============================================================================

#[tokio::test]
async fn test_manifest_datasets_open() {
    let fixture = OceanFixture::write().unwrap();
    let (provider, manifest) = FileDatasetProvider::from_manifest_file(&fixture.manifest_path()).unwrap();
    assert_eq!(manifest.datasets.len(), 2);

    let dataset = provider.open(synthetic::DATASET).await.unwrap();
    assert_eq!(dataset.timestamps().len(), synthetic::TIMESTAMPS.len());
    assert_eq!(dataset.depths(), &synthetic::DEPTHS);
    assert!(dataset.has_variable("votemper"));
    assert!(!dataset.has_variable("vosaline"));

    assert!(matches!(
        provider.open("riops").await,
        Err(TileError::DatasetNotFound(_))
    ));
}

#[tokio::test]
async fn test_bottom_reads_deepest_level() {
    let fixture = OceanFixture::write().unwrap();
    let (provider, _) = FileDatasetProvider::from_manifest_file(&fixture.manifest_path()).unwrap();
    let dataset = provider.open(synthetic::DATASET).await.unwrap();

    let grid = ocean_common::GeoGrid::from_axes(&[10.0, -10.0], &[20.0, 40.0]);
    let options = SamplingOptions {
        interpolation: tile_engine::Interpolation::Bilinear,
        ..SamplingOptions::default()
    };
    let bottom = dataset
        .get_area(&grid, DepthSelector::Bottom, 0, "votemper", &options)
        .await
        .unwrap();
    let expected = synthetic::SURFACE_KELVIN - 2.0 * synthetic::KELVIN_PER_LEVEL;
    for idx in 0..bottom.len() {
        assert!((bottom.value(idx).unwrap() - expected).abs() < 1e-3);
    }
    assert_eq!(bottom.unit, "Kelvin");
}

#[test]
fn test_catalog_built_from_manifest() {
    let (_fixture, ctx) = setup();
    assert_eq!(
        ctx.catalog.display_name(synthetic::DATASET, "votemper").unwrap(),
        "Sea Water Potential Temperature"
    );
    assert_eq!(ctx.catalog.scale_factor(synthetic::DATASET, "sossheig").unwrap(), 1000.0);
    assert_eq!(
        ctx.catalog.climatology(synthetic::DATASET).as_deref(),
        Some(synthetic::CLIMATOLOGY)
    );
}

// ============================================================================
// Filled tiles
// ============================================================================

#[tokio::test]
async fn test_surface_temperature_tile() {
    let (_fixture, ctx) = setup();
    let png = filled(&ctx, &[("variable", "votemper"), ("scale", "0,31")]).await.unwrap();

    // 288.15 K is 15 C
    assert_eq!(centre(&png), ramp_color("thermal", 15.0 / 31.0));

    // The source grid stops at 80 N, the tile reaches 85 N
    let (w, _, rgba) = decode_rgba(&png);
    assert_eq!(pixel_at(&rgba, w, 0, 128)[3], 0);
    assert_eq!(pixel_at(&rgba, w, 255, 128)[3], 0);
}

#[tokio::test]
async fn test_interpolation_modes_agree_on_constant_field() {
    let (_fixture, ctx) = setup();
    let expected = ramp_color("thermal", 15.0 / 31.0);
    for interp in ["nearest", "bilinear", "gaussian", "inverse"] {
        let png = filled(
            &ctx,
            &[
                ("variable", "votemper"),
                ("scale", "0,31"),
                ("interp", interp),
                ("radius", "600"),
            ],
        )
        .await
        .unwrap();
        assert_eq!(centre(&png), expected, "interp={}", interp);
    }
}

#[tokio::test]
async fn test_deeper_levels_are_colder() {
    let (_fixture, ctx) = setup();
    // 1000 m is two levels down: 5 C
    let png = filled(&ctx, &[("variable", "votemper"), ("scale", "0,31"), ("depth", "2")])
        .await
        .unwrap();
    assert_eq!(centre(&png), ramp_color("thermal", 5.0 / 31.0));
}

#[tokio::test]
async fn test_current_speed_tile() {
    let (_fixture, ctx) = setup();
    let png = filled(&ctx, &[("variable", "vozocrtx,vomecrty"), ("scale", "0,1.1")])
        .await
        .unwrap();
    assert_eq!(centre(&png), ramp_color("speed", 0.5 / 1.1));
}

#[tokio::test]
async fn test_temperature_anomaly_tile() {
    let (_fixture, ctx) = setup();
    let png = filled(&ctx, &[("variable", "votemper_anom"), ("scale", "-4,4.5")])
        .await
        .unwrap();
    assert_eq!(centre(&png), ramp_color("anomaly", 6.0 / 8.5));
}

#[tokio::test]
async fn test_time_wraps_modulo_timestamp_count() {
    let (_fixture, ctx) = setup();
    let latest = filled(&ctx, &[("variable", "votemper"), ("scale", "0,31")]).await.unwrap();
    let explicit = filled(&ctx, &[("variable", "votemper"), ("scale", "0,31"), ("time", "2")])
        .await
        .unwrap();
    let wrapped = filled(&ctx, &[("variable", "votemper"), ("scale", "0,31"), ("time", "-4")])
        .await
        .unwrap();
    assert_eq!(latest, explicit);
    assert_eq!(latest, wrapped);
}

#[tokio::test]
async fn test_surface_variable_ignores_depth() {
    let (_fixture, ctx) = setup();
    let surface = filled(&ctx, &[("variable", "sossheig"), ("scale", "-1,1"), ("masked", "1")])
        .await
        .unwrap();
    let deep = filled(
        &ctx,
        &[("variable", "sossheig"), ("scale", "-1,1"), ("masked", "1"), ("depth", "2")],
    )
    .await
    .unwrap();
    assert_eq!(surface, deep);
}

#[tokio::test]
async fn test_input_errors() {
    let (_fixture, ctx) = setup();

    let err = filled(&ctx, &[("variable", "votemper"), ("scale", "0,31"), ("depth", "3")])
        .await
        .unwrap_err();
    assert!(matches!(err, TileError::DepthOutOfRange { index: 3, available: 3 }));
    assert_eq!(err.http_status_code(), 400);

    let err = filled(&ctx, &[("variable", "vosaline"), ("scale", "30,40")])
        .await
        .unwrap_err();
    assert_eq!(err.http_status_code(), 404);
}

// ============================================================================
// Bathymetry
// ============================================================================

#[tokio::test]
async fn test_missing_bathymetry_zoom_is_upstream_fault() {
    let (_fixture, ctx) = setup();
    let tile = TileAddress::new(1, 1, 1, Projection::WebMercator).unwrap();
    let err = render(
        &ctx,
        &PlotRequest::Filled {
            tile,
            request: request(&[("variable", "votemper"), ("scale", "0,31")]),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, TileError::BathymetryUnavailable(_)));
    assert_eq!(err.kind(), ocean_common::FaultKind::Upstream);

    // Without masking the bathymetry is never read
    let png = render(
        &ctx,
        &PlotRequest::Filled {
            tile,
            request: request(&[("variable", "votemper"), ("scale", "0,31"), ("masked", "1")]),
        },
    )
    .await;
    assert!(png.is_ok());
}

#[tokio::test]
async fn test_polar_tile_without_masking() {
    let (_fixture, ctx) = setup();
    let png = render(
        &ctx,
        &PlotRequest::Filled {
            tile: world(Projection::PolarNorth),
            request: request(&[("variable", "votemper"), ("scale", "0,31"), ("masked", "1")]),
        },
    )
    .await
    .unwrap();
    let (w, h, rgba) = decode_rgba(&png);
    assert_eq!((w, h), (256, 256));
    // The pole lies beyond the 80 N edge of the source grid
    assert_eq!(pixel_at(&rgba, w, 128, 128)[3], 0);
    assert!(rgba.chunks_exact(4).any(|p| p[3] == 255));
}

#[tokio::test]
async fn test_topography_from_file() {
    let (_fixture, ctx) = setup();
    let png = render(
        &ctx,
        &PlotRequest::Topography {
            tile: world(Projection::WebMercator),
            shaded_relief: true,
        },
    )
    .await
    .unwrap();
    let (_, _, rgba) = decode_rgba(&png);
    assert!(rgba.chunks_exact(4).all(|p| p[3] == 255));
}

// ============================================================================
// Legend
// ============================================================================

#[tokio::test]
async fn test_legend_from_manifest_metadata() {
    let (_fixture, ctx) = setup();
    let mut p = params(&[("variable", "vozocrtx,vomecrty"), ("scale", "0,2")]);
    p.remove("interp");
    let request = ScaleRequest::from_params(&p).unwrap();
    let png = render(&ctx, &PlotRequest::Legend(request)).await.unwrap();
    assert_eq!(
        text_chunk(&png, "Title").as_deref(),
        Some("Sea Water Velocity (m/s)")
    );
}
