//! Pre-tiled bathymetry rasters.
//!
//! One raster per projection and zoom, `256 * 2^zoom` pixels square, so the
//! window for tile `(x, y)` starts at pixel `(256x, 256y)`. Elevations are
//! metres, negative below sea level.

use ocean_common::{Projection, ScalarField, TileError, TileResult, TILE_SIZE};
use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Opens bathymetry rasters by projection and zoom.
pub trait BathymetryStore: Send + Sync {
    fn open_raster(&self, projection: Projection, zoom: u32) -> TileResult<Box<dyn BathymetryRaster>>;
}

/// An open elevation raster.
pub trait BathymetryRaster: Send {
    fn width(&self) -> usize;
    fn height(&self) -> usize;

    /// Read a `width x height` window whose top-left pixel is `(xoff, yoff)`.
    fn window(&mut self, xoff: usize, yoff: usize, width: usize, height: usize)
        -> TileResult<ScalarField>;
}

/// Side length of the raster pre-tiled for `zoom`.
pub fn raster_size(zoom: u32) -> usize {
    TILE_SIZE << zoom
}

/// Byte length of a square f32 raster, `None` when it does not fit in a u64.
fn raster_bytes(size: usize) -> Option<u64> {
    let side = size as u64;
    side.checked_mul(side)?.checked_mul(4)
}

fn check_window(
    raster: &dyn BathymetryRaster,
    xoff: usize,
    yoff: usize,
    width: usize,
    height: usize,
) -> TileResult<()> {
    if xoff + width > raster.width() || yoff + height > raster.height() {
        return Err(TileError::RasterOutOfBounds {
            x: xoff,
            y: yoff,
            width,
            height,
            raster_width: raster.width(),
            raster_height: raster.height(),
        });
    }
    Ok(())
}

// ============================================================================
// In-memory store
// ============================================================================

/// Elevation data held in memory, for tests and small deployments.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBathymetryStore {
    rasters: HashMap<(Projection, u32), Arc<ElevationGrid>>,
    uniform: Option<f64>,
}

#[derive(Debug, Clone)]
struct ElevationGrid {
    width: usize,
    height: usize,
    values: Vec<f64>,
}

impl InMemoryBathymetryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every projection and zoom reads as the same constant elevation.
    pub fn uniform(elevation: f64) -> Self {
        Self {
            rasters: HashMap::new(),
            uniform: Some(elevation),
        }
    }

    /// Register a raster for one projection and zoom.
    pub fn with_raster(
        mut self,
        projection: Projection,
        zoom: u32,
        width: usize,
        height: usize,
        values: Vec<f64>,
    ) -> TileResult<Self> {
        if values.len() != width * height {
            return Err(TileError::ShapeMismatch {
                expected: (height, width),
                actual: (values.len() / width.max(1), width),
            });
        }
        self.rasters.insert(
            (projection, zoom),
            Arc::new(ElevationGrid {
                width,
                height,
                values,
            }),
        );
        Ok(self)
    }
}

impl BathymetryStore for InMemoryBathymetryStore {
    fn open_raster(&self, projection: Projection, zoom: u32) -> TileResult<Box<dyn BathymetryRaster>> {
        if let Some(grid) = self.rasters.get(&(projection, zoom)) {
            return Ok(Box::new(MemoryRaster::Grid(Arc::clone(grid))));
        }
        match self.uniform {
            Some(value) => Ok(Box::new(MemoryRaster::Uniform {
                size: raster_size(zoom),
                value,
            })),
            None => Err(TileError::BathymetryUnavailable(format!(
                "no raster for {} zoom {}",
                projection, zoom
            ))),
        }
    }
}

enum MemoryRaster {
    Grid(Arc<ElevationGrid>),
    Uniform { size: usize, value: f64 },
}

impl BathymetryRaster for MemoryRaster {
    fn width(&self) -> usize {
        match self {
            MemoryRaster::Grid(grid) => grid.width,
            MemoryRaster::Uniform { size, .. } => *size,
        }
    }

    fn height(&self) -> usize {
        match self {
            MemoryRaster::Grid(grid) => grid.height,
            MemoryRaster::Uniform { size, .. } => *size,
        }
    }

    fn window(
        &mut self,
        xoff: usize,
        yoff: usize,
        width: usize,
        height: usize,
    ) -> TileResult<ScalarField> {
        check_window(&*self, xoff, yoff, width, height)?;
        match self {
            MemoryRaster::Uniform { value, .. } => Ok(ScalarField::filled(width, height, *value)),
            MemoryRaster::Grid(grid) => {
                let mut values = Vec::with_capacity(width * height);
                for row in yoff..yoff + height {
                    let start = row * grid.width + xoff;
                    values.extend_from_slice(&grid.values[start..start + width]);
                }
                ScalarField::from_values(width, height, values)
            }
        }
    }
}

// ============================================================================
// File store
// ============================================================================

/// Raw little-endian `f32` rasters located by a path template.
///
/// The template may contain `{projection}` (e.g. `epsg3857`) and `{zoom}`.
#[derive(Debug, Clone)]
pub struct FileBathymetryStore {
    template: String,
}

impl FileBathymetryStore {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn path_for(&self, projection: Projection, zoom: u32) -> PathBuf {
        let code = projection.code().replace(':', "").to_lowercase();
        PathBuf::from(
            self.template
                .replace("{projection}", &code)
                .replace("{zoom}", &zoom.to_string()),
        )
    }
}

impl BathymetryStore for FileBathymetryStore {
    fn open_raster(&self, projection: Projection, zoom: u32) -> TileResult<Box<dyn BathymetryRaster>> {
        let path = self.path_for(projection, zoom);
        let file = File::open(&path).map_err(|e| {
            TileError::BathymetryUnavailable(format!("{}: {}", path.display(), e))
        })?;
        let size = raster_size(zoom);
        let len = file
            .metadata()
            .map_err(|e| TileError::BathymetryUnavailable(e.to_string()))?
            .len();
        let expected = raster_bytes(size).ok_or_else(|| {
            TileError::BathymetryUnavailable(format!(
                "a {}x{} f32 raster at zoom {} is too large",
                size, size, zoom
            ))
        })?;
        if len != expected {
            return Err(TileError::BathymetryUnavailable(format!(
                "{} holds {} bytes, expected a {}x{} f32 raster",
                path.display(),
                len,
                size,
                size
            )));
        }
        debug!(path = %path.display(), size = size, "Opened bathymetry raster");
        Ok(Box::new(FileRaster { file, size }))
    }
}

struct FileRaster {
    file: File,
    size: usize,
}

impl BathymetryRaster for FileRaster {
    fn width(&self) -> usize {
        self.size
    }

    fn height(&self) -> usize {
        self.size
    }

    fn window(
        &mut self,
        xoff: usize,
        yoff: usize,
        width: usize,
        height: usize,
    ) -> TileResult<ScalarField> {
        check_window(&*self, xoff, yoff, width, height)?;
        let mut row_bytes = vec![0u8; width * 4];
        let mut values = Vec::with_capacity(width * height);
        for row in yoff..yoff + height {
            let offset = (row as u64 * self.size as u64 + xoff as u64) * 4;
            self.file
                .seek(SeekFrom::Start(offset))
                .and_then(|_| self.file.read_exact(&mut row_bytes))
                .map_err(|e| TileError::BathymetryUnavailable(e.to_string()))?;
            values.extend(
                row_bytes
                    .chunks_exact(4)
                    .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64),
            );
        }
        ScalarField::from_values(width, height, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_window() {
        let store = InMemoryBathymetryStore::uniform(-500.0);
        let mut raster = store.open_raster(Projection::WebMercator, 1).unwrap();
        assert_eq!(raster.width(), 512);
        let window = raster.window(256, 256, 256, 256).unwrap();
        assert_eq!(window.shape(), (256, 256));
        assert_eq!(window.get(10, 10), Some(-500.0));
    }

    #[test]
    fn test_window_out_of_bounds() {
        let store = InMemoryBathymetryStore::uniform(-500.0);
        let mut raster = store.open_raster(Projection::WebMercator, 0).unwrap();
        let result = raster.window(1, 0, 256, 256);
        assert!(matches!(result, Err(TileError::RasterOutOfBounds { .. })));
    }

    #[test]
    fn test_grid_window_offsets() {
        let values: Vec<f64> = (0..16).map(|v| v as f64).collect();
        let store = InMemoryBathymetryStore::new()
            .with_raster(Projection::PolarNorth, 0, 4, 4, values)
            .unwrap();
        let mut raster = store.open_raster(Projection::PolarNorth, 0).unwrap();
        let window = raster.window(1, 2, 2, 2).unwrap();
        assert_eq!(window.raw_values(), &[9.0, 10.0, 13.0, 14.0]);
        assert!(matches!(
            store.open_raster(Projection::PolarSouth, 0),
            Err(TileError::BathymetryUnavailable(_))
        ));
    }

    #[test]
    fn test_path_template() {
        let store = FileBathymetryStore::new("/data/etopo_{projection}_z{zoom}.f32");
        assert_eq!(
            store.path_for(Projection::PolarSouth, 3),
            PathBuf::from("/data/etopo_epsg3031_z3.f32")
        );
    }

    #[test]
    fn test_file_raster_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("etopo_epsg3857_z0.f32");
        let bytes: Vec<u8> = (0..256 * 256)
            .flat_map(|i| (-((i / 256) as f32)).to_le_bytes())
            .collect();
        std::fs::write(&path, bytes).unwrap();

        let template = format!("{}/etopo_{{projection}}_z{{zoom}}.f32", dir.path().display());
        let store = FileBathymetryStore::new(template);
        let mut raster = store.open_raster(Projection::WebMercator, 0).unwrap();
        let window = raster.window(0, 0, 256, 256).unwrap();
        assert_eq!(window.get(0, 5), Some(0.0));
        assert_eq!(window.get(100, 7), Some(-100.0));

        assert!(matches!(
            store.open_raster(Projection::WebMercator, 1),
            Err(TileError::BathymetryUnavailable(_))
        ));
    }

    #[test]
    fn test_raster_bytes_overflow() {
        assert_eq!(raster_bytes(raster_size(1)), Some(512 * 512 * 4));
        // 2^30 pixels square is 2^62 bytes, one more zoom level overflows
        assert_eq!(raster_bytes(raster_size(22)), Some(1u64 << 62));
        assert_eq!(raster_bytes(raster_size(23)), None);
        assert_eq!(raster_bytes(raster_size(30)), None);
    }

    #[test]
    fn test_deep_zoom_file_is_rejected_not_overflowed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("etopo_z30.f32"), [0u8; 16]).unwrap();

        let template = format!("{}/etopo_z{{zoom}}.f32", dir.path().display());
        let store = FileBathymetryStore::new(template);
        assert!(matches!(
            store.open_raster(Projection::WebMercator, 30),
            Err(TileError::BathymetryUnavailable(_))
        ));
    }
}
