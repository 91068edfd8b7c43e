//! Plot kinds as free functions over a shared [`RenderContext`].
//!
//! Every data render samples everything it needs first (awaiting the
//! dataset and bathymetry reads), drops its handles, then runs the pure
//! transform, mask, colour and encode stages. A render either returns a
//! complete PNG or an error; no partial output is produced.

use crate::bathymetry::{BathymetryStore, FileBathymetryStore};
use crate::config::EngineConfig;
use crate::dataset::{resolve_time_index, Dataset, DatasetProvider};
use crate::mask::{apply_depth_mask, MaskRule};
use crate::metadata::{StaticCatalog, VariableCatalog, VariableInfo};
use crate::pipeline::transform_values;
use crate::request::{ScaleRequest, TileRequest, DEFAULT_CONTOURS};
use crate::store::FileDatasetProvider;
use chrono::Datelike;
use ocean_common::{GeoGrid, ScalarField, TileAddress, TileError, TileResult, TILE_SIZE};
use projection::tile_to_geo;
use renderer::colormap::ColorRamp;
use renderer::contour::{levels_with_norm, points_to_pixels, quantized_levels, TILE_DPI};
use renderer::topo::{render_topography, topography_ramp};
use renderer::{
    colorize, encode_png, encode_png_with_text, legend_title, render_contours, render_scale,
    ColormapConfig, ColormapRegistry,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Number of contour levels drawn across the colour scale.
pub const CONTOUR_LEVELS: usize = 5;
/// Stroke width of data contours, points.
pub const CONTOUR_LINE_POINTS: f32 = 3.0;
/// Stroke width of bathymetry contours, points.
pub const BATHYMETRY_LINE_POINTS: f32 = 1.0;
/// Water depths traced by the bathymetry overlay, metres.
pub const BATHYMETRY_CONTOUR_DEPTHS: [f64; 9] =
    [100.0, 200.0, 500.0, 1000.0, 2000.0, 3000.0, 4000.0, 5000.0, 6000.0];
const BATHYMETRY_NORM_RANGE: (f64, f64) = (1.0, 6000.0);

/// Read-only collaborators shared by every render.
#[derive(Clone)]
pub struct RenderContext {
    pub datasets: Arc<dyn DatasetProvider>,
    pub catalog: Arc<dyn VariableCatalog>,
    pub colormaps: Arc<ColormapRegistry>,
    pub bathymetry: Arc<dyn BathymetryStore>,
}

impl RenderContext {
    pub fn new(
        datasets: Arc<dyn DatasetProvider>,
        catalog: Arc<dyn VariableCatalog>,
        colormaps: Arc<ColormapRegistry>,
        bathymetry: Arc<dyn BathymetryStore>,
    ) -> Self {
        Self {
            datasets,
            catalog,
            colormaps,
            bathymetry,
        }
    }

    /// Build the file-backed collaborators described by `config`.
    pub fn from_config(config: &EngineConfig) -> TileResult<Self> {
        let (datasets, manifest) = FileDatasetProvider::from_manifest_file(&config.dataset_manifest)?;
        let catalog = StaticCatalog::from_manifest(&manifest);

        let colormaps = match &config.colormap_file {
            Some(path) => {
                let json = std::fs::read_to_string(path).map_err(|e| {
                    TileError::ConfigError(format!("cannot read {}: {}", path.display(), e))
                })?;
                ColormapRegistry::with_config(&ColormapConfig::from_json(&json)?)?
            }
            None => ColormapRegistry::builtin(),
        };

        info!(
            variables = catalog.len(),
            colormaps = colormaps.names().len(),
            bathymetry = %config.bathymetry_path_template,
            "Render context ready"
        );

        Ok(Self::new(
            Arc::new(datasets),
            Arc::new(catalog),
            Arc::new(colormaps),
            Arc::new(FileBathymetryStore::new(&config.bathymetry_path_template)),
        ))
    }
}

/// Plot kind, used for logging and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TileKind {
    Filled,
    Contour,
    Topography,
    BathymetryContour,
    Legend,
}

impl TileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TileKind::Filled => "raster",
            TileKind::Contour => "contour",
            TileKind::Topography => "topo",
            TileKind::BathymetryContour => "bathymetry",
            TileKind::Legend => "scale",
        }
    }
}

impl std::fmt::Display for TileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A render to perform.
#[derive(Debug, Clone)]
pub enum PlotRequest {
    /// Colour-mapped data raster
    Filled { tile: TileAddress, request: TileRequest },
    /// Contour lines of the data field
    Contour { tile: TileAddress, request: TileRequest },
    /// Elevation basemap
    Topography { tile: TileAddress, shaded_relief: bool },
    /// Isobath overlay
    BathymetryContour { tile: TileAddress },
    /// Colour bar for a variable and scale
    Legend(ScaleRequest),
}

impl PlotRequest {
    pub fn kind(&self) -> TileKind {
        match self {
            PlotRequest::Filled { .. } => TileKind::Filled,
            PlotRequest::Contour { .. } => TileKind::Contour,
            PlotRequest::Topography { .. } => TileKind::Topography,
            PlotRequest::BathymetryContour { .. } => TileKind::BathymetryContour,
            PlotRequest::Legend(_) => TileKind::Legend,
        }
    }
}

/// Render `plot` to PNG bytes.
pub async fn render(ctx: &RenderContext, plot: &PlotRequest) -> TileResult<Vec<u8>> {
    match plot {
        PlotRequest::Filled { tile, request } | PlotRequest::Contour { tile, request } => debug!(
            kind = %plot.kind(),
            tile = %tile.cache_key(),
            dataset = %request.dataset,
            variables = ?request.variables,
            "Rendering data tile"
        ),
        PlotRequest::Topography { tile, .. } | PlotRequest::BathymetryContour { tile } => debug!(
            kind = %plot.kind(),
            tile = %tile.cache_key(),
            "Rendering bathymetry tile"
        ),
        PlotRequest::Legend(request) => debug!(
            dataset = %request.dataset,
            variables = ?request.variables,
            "Rendering legend"
        ),
    }

    match plot {
        PlotRequest::Filled { tile, request } => render_filled(ctx, tile, request).await,
        PlotRequest::Contour { tile, request } => render_contour(ctx, tile, request).await,
        PlotRequest::Topography {
            tile,
            shaded_relief,
        } => render_topo(ctx, tile, *shaded_relief).await,
        PlotRequest::BathymetryContour { tile } => render_bathymetry_contours(ctx, tile).await,
        PlotRequest::Legend(request) => render_legend(ctx, request),
    }
}

/// Colour-mapped data tile.
pub async fn render_filled(
    ctx: &RenderContext,
    tile: &TileAddress,
    request: &TileRequest,
) -> TileResult<Vec<u8>> {
    let grid = tile_to_geo(tile)?;
    let sampled = sample_request(ctx, &grid, request).await?;
    let elevation = if request.masking_disabled {
        None
    } else {
        Some(read_bathymetry(ctx, tile).await?)
    };

    let mut field = transform_values(sampled.components, sampled.climatology)?;
    if let Some(elevation) = &elevation {
        apply_depth_mask(&mut field, elevation, sampled.depth_m, MaskRule::Raster)?;
    }

    let ramp = match &request.display {
        Some(name) => ctx.colormaps.get(name)?,
        None => default_ramp(
            &ctx.colormaps,
            request.anomaly,
            request.components(),
            &sampled.info.display_name,
        )?,
    };

    debug!(
        ramp = ramp.name(),
        valid = field.valid_count(),
        depth_m = sampled.depth_m,
        "Colouring field"
    );
    encode_png(&colorize(&field, &request.scale, ramp))
}

/// Contour-line tile of the data field.
pub async fn render_contour(
    ctx: &RenderContext,
    tile: &TileAddress,
    request: &TileRequest,
) -> TileResult<Vec<u8>> {
    let grid = tile_to_geo(tile)?;
    let sampled = sample_request(ctx, &grid, request).await?;
    let elevation = if request.masking_disabled {
        None
    } else {
        Some(read_bathymetry(ctx, tile).await?)
    };

    let mut field = transform_values(sampled.components, sampled.climatology)?;
    if let Some(elevation) = &elevation {
        apply_depth_mask(&mut field, elevation, sampled.depth_m, MaskRule::Contour)?;
    }

    let ramp = if request.contours == DEFAULT_CONTOURS {
        default_ramp(
            &ctx.colormaps,
            request.anomaly,
            request.components(),
            first_variable(&request.variables)?,
        )?
    } else {
        ctx.colormaps.get(&request.contours)?
    };

    let levels = quantized_levels(&request.scale, ramp, CONTOUR_LEVELS);
    let raster = render_contours(
        &field,
        request.scale.below_range(),
        &levels,
        points_to_pixels(CONTOUR_LINE_POINTS, TILE_DPI),
    )?;
    encode_png(&raster)
}

/// Elevation basemap tile.
pub async fn render_topo(
    ctx: &RenderContext,
    tile: &TileAddress,
    shaded_relief: bool,
) -> TileResult<Vec<u8>> {
    let elevation = read_bathymetry(ctx, tile).await?;
    let ramp = topography_ramp(&ctx.colormaps)?;
    encode_png(&render_topography(&elevation, &ramp, shaded_relief))
}

/// Isobath overlay tile.
pub async fn render_bathymetry_contours(
    ctx: &RenderContext,
    tile: &TileAddress,
) -> TileResult<Vec<u8>> {
    let mut depth = read_bathymetry(ctx, tile).await?;
    depth.map_valid(|elevation| -elevation);

    let ramp = ctx.colormaps.get("transparent_gray")?;
    let (lo, hi) = BATHYMETRY_NORM_RANGE;
    let levels = levels_with_norm(&BATHYMETRY_CONTOUR_DEPTHS, ramp, |d| {
        ((d.log10() - lo.log10()) / (hi.log10() - lo.log10())).clamp(0.0, 1.0)
    });
    let raster = render_contours(
        &depth,
        0.0,
        &levels,
        points_to_pixels(BATHYMETRY_LINE_POINTS, TILE_DPI),
    )?;
    encode_png(&raster)
}

/// Legend image for a variable and scale, titled in a `tEXt` chunk.
pub fn render_legend(ctx: &RenderContext, request: &ScaleRequest) -> TileResult<Vec<u8>> {
    let info = ctx
        .catalog
        .variable(&request.dataset, first_variable(&request.variables)?)?;
    for variable in &request.variables[1..] {
        ctx.catalog.variable(&request.dataset, variable)?;
    }

    let components = request.variables.len();
    let ramp = default_ramp(&ctx.colormaps, request.anomaly, components, &info.display_name)?;
    let title = legend_title(&info.display_name, &info.unit, components, request.anomaly);
    let legend = render_scale(&request.scale, ramp, &title)?;
    encode_png_with_text(&legend.raster, &[("Title", legend.title.as_str())])
}

/// Ramp for a field when the request names none: anomalies use `anomaly`,
/// vector magnitudes use `speed`, anything else is matched by name.
pub fn default_ramp<'a>(
    colormaps: &'a ColormapRegistry,
    anomaly: bool,
    components: usize,
    variable_name: &str,
) -> TileResult<&'a ColorRamp> {
    if anomaly {
        colormaps.get("anomaly")
    } else if components == 2 {
        colormaps.get("speed")
    } else {
        colormaps.for_variable(variable_name)
    }
}

/// Everything a data tile needs from its datasets.
struct Sampled {
    components: Vec<ScalarField>,
    climatology: Option<Vec<ScalarField>>,
    /// Metadata of the first component
    info: VariableInfo,
    depth_m: f64,
}

async fn sample_request(
    ctx: &RenderContext,
    grid: &GeoGrid,
    request: &TileRequest,
) -> TileResult<Sampled> {
    first_variable(&request.variables)?;
    let dataset = ctx.datasets.open(&request.dataset).await?;
    check_variables(dataset.as_ref(), &request.variables)?;

    let time_index = resolve_time_index(request.time, dataset.timestamps().len(), dataset.id())?;
    let month_index = dataset.timestamps()[time_index].month0();
    let depth_m = request.depth.metres(dataset.depths())?;

    let mut components = Vec::with_capacity(request.variables.len());
    let mut infos = Vec::with_capacity(request.variables.len());
    for variable in &request.variables {
        let info = ctx.catalog.variable(&request.dataset, variable)?;
        let field = dataset
            .get_area(grid, request.depth, time_index, variable, &request.sampling)
            .await?;
        components.push(field.with_unit(&info.unit).with_scale_factor(info.scale_factor));
        infos.push(info);
    }
    drop(dataset);

    let climatology = if request.anomaly {
        Some(sample_climatology(ctx, grid, request, &infos, month_index).await?)
    } else {
        None
    };

    debug!(
        time_index = time_index,
        components = components.len(),
        anomaly = request.anomaly,
        "Sampled request"
    );

    let info = infos.swap_remove(0);
    Ok(Sampled {
        components,
        climatology,
        info,
        depth_m,
    })
}

/// The request's variables from the paired climatology, at `month_index`.
async fn sample_climatology(
    ctx: &RenderContext,
    grid: &GeoGrid,
    request: &TileRequest,
    infos: &[VariableInfo],
    month_index: u32,
) -> TileResult<Vec<ScalarField>> {
    let id = ctx
        .catalog
        .climatology(&request.dataset)
        .ok_or_else(|| TileError::NoClimatology(request.dataset.clone()))?;
    let climatology = ctx.datasets.open(&id).await?;
    check_variables(climatology.as_ref(), &request.variables)?;
    let time_index = resolve_time_index(month_index as i64, climatology.timestamps().len(), &id)?;

    let mut fields = Vec::with_capacity(request.variables.len());
    for (variable, info) in request.variables.iter().zip(infos) {
        // Prefer the climatology's own metadata, fall back to the source's
        let info = ctx
            .catalog
            .variable(&id, variable)
            .unwrap_or_else(|_| info.clone());
        let field = climatology
            .get_area(grid, request.depth, time_index, variable, &request.sampling)
            .await?;
        fields.push(field.with_unit(&info.unit).with_scale_factor(info.scale_factor));
    }
    Ok(fields)
}

fn first_variable(variables: &[String]) -> TileResult<&str> {
    variables
        .first()
        .map(String::as_str)
        .ok_or(TileError::UnsupportedComponents(0))
}

fn check_variables(dataset: &dyn Dataset, variables: &[String]) -> TileResult<()> {
    match variables.iter().find(|v| !dataset.has_variable(v)) {
        Some(missing) => Err(TileError::VariableNotFound {
            dataset: dataset.id().to_string(),
            variable: missing.clone(),
        }),
        None => Ok(()),
    }
}

/// The 256x256 bathymetry window under `tile`, read off the async runtime.
async fn read_bathymetry(ctx: &RenderContext, tile: &TileAddress) -> TileResult<ScalarField> {
    let store = Arc::clone(&ctx.bathymetry);
    let tile = *tile;
    tokio::task::spawn_blocking(move || {
        let mut raster = store.open_raster(tile.projection, tile.zoom)?;
        let (xoff, yoff) = tile.pixel_offset();
        raster.window(xoff, yoff, TILE_SIZE, TILE_SIZE)
    })
    .await
    .map_err(|e| TileError::InternalError(format!("bathymetry task failed: {}", e)))?
}
