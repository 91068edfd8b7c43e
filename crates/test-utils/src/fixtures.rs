//! On-disk fixtures for the file-backed dataset and bathymetry stores.
//!
//! [`OceanFixture::write`] lays out a temporary directory with:
//! - `datasets.yaml`, a manifest describing two datasets
//! - raw little-endian `f32` arrays for every variable
//! - a zoom-0 Web Mercator bathymetry raster named by the template
//!   `etopo_{projection}_z{zoom}.f32`
//!
//! Everything is removed when the fixture is dropped.

use crate::generators;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Common tile-related constants for tests.
pub mod tiles {
    /// Halifax, Nova Scotia
    pub const HALIFAX: (f64, f64) = (44.6488, -63.5752);

    /// Tile containing Halifax at zoom 10
    pub const HALIFAX_Z10: (u32, u32, u32) = (331, 369, 10);

    pub const EPSG_3857: &str = "EPSG:3857";
    pub const EPSG_32661: &str = "EPSG:32661";
    pub const EPSG_3031: &str = "EPSG:3031";
}

/// Source grid of the synthetic datasets: 5 degree global grid.
pub mod synthetic {
    pub const DATASET: &str = "synthetic";
    pub const CLIMATOLOGY: &str = "synthetic_clim";

    pub const ROWS: usize = 33;
    pub const COLS: usize = 73;
    pub const LAT_MIN: f64 = -80.0;
    pub const LAT_MAX: f64 = 80.0;
    pub const LON_MIN: f64 = -180.0;
    pub const LON_MAX: f64 = 180.0;

    pub const TIMESTAMPS: [&str; 3] = [
        "2024-01-15T00:00:00Z",
        "2024-02-15T00:00:00Z",
        "2024-03-15T00:00:00Z",
    ];
    pub const DEPTHS: [f64; 3] = [0.5, 100.0, 1000.0];

    /// Surface temperature everywhere, Kelvin (15 C).
    pub const SURFACE_KELVIN: f64 = 288.15;
    /// Temperature drop per depth level, Kelvin.
    pub const KELVIN_PER_LEVEL: f64 = 5.0;
    /// Climatology temperature for every month, Kelvin (13 C).
    pub const CLIMATOLOGY_KELVIN: f64 = 286.15;

    /// Constant current components (m/s); speed is 0.5.
    pub const U_CURRENT: f64 = 0.3;
    pub const V_CURRENT: f64 = 0.4;

    /// Constant elevation of the bathymetry raster, metres.
    pub const SEAFLOOR: f64 = -2000.0;
}

/// A temporary directory holding a dataset manifest and bathymetry raster.
pub struct OceanFixture {
    pub dir: tempfile::TempDir,
}

impl OceanFixture {
    /// Write the default fixture set.
    pub fn write() -> io::Result<Self> {
        use synthetic::*;

        let dir = tempfile::Builder::new().prefix("ocean_fixture").tempdir()?;
        let cells = ROWS * COLS;

        // votemper: [time][depth][row][col]
        let mut votemper = Vec::with_capacity(TIMESTAMPS.len() * DEPTHS.len() * cells);
        for _ in TIMESTAMPS {
            for level in 0..DEPTHS.len() {
                let value = SURFACE_KELVIN - KELVIN_PER_LEVEL * level as f64;
                votemper.extend(generators::create_constant_grid(COLS, ROWS, value));
            }
        }
        write_f32_le(&dir.path().join("votemper.f32"), &votemper)?;

        let per_depth = |value: f64| {
            let mut out = Vec::new();
            for _ in 0..TIMESTAMPS.len() * DEPTHS.len() {
                out.extend(generators::create_constant_grid(COLS, ROWS, value));
            }
            out
        };
        write_f32_le(&dir.path().join("vozocrtx.f32"), &per_depth(U_CURRENT))?;
        write_f32_le(&dir.path().join("vomecrty.f32"), &per_depth(V_CURRENT))?;

        // Sea surface height has no depth axis: [time][row][col]
        let mut ssh = Vec::new();
        for _ in TIMESTAMPS {
            ssh.extend(generators::create_test_grid(COLS, ROWS).iter().map(|v| v * 1e-6));
        }
        write_f32_le(&dir.path().join("sossheig.f32"), &ssh)?;

        // Twelve monthly climatology fields
        let mut clim = Vec::new();
        for _ in 0..12 {
            for _ in 0..DEPTHS.len() {
                clim.extend(generators::create_constant_grid(COLS, ROWS, CLIMATOLOGY_KELVIN));
            }
        }
        write_f32_le(&dir.path().join("votemper_clim.f32"), &clim)?;

        let bathymetry = generators::create_constant_grid(256, 256, SEAFLOOR);
        write_f32_le(&dir.path().join("etopo_epsg3857_z0.f32"), &bathymetry)?;

        let mut manifest = fs::File::create(dir.path().join("datasets.yaml"))?;
        manifest.write_all(manifest_yaml().as_bytes())?;

        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.dir.path().join("datasets.yaml")
    }

    /// Path template for the bathymetry rasters in this fixture.
    pub fn bathymetry_template(&self) -> String {
        format!(
            "{}/etopo_{{projection}}_z{{zoom}}.f32",
            self.dir.path().display()
        )
    }
}

fn manifest_yaml() -> String {
    use synthetic::*;

    let grid = format!(
        "    grid:\n      lat_min: {:?}\n      lat_max: {:?}\n      lon_min: {:?}\n      lon_max: {:?}\n      rows: {}\n      cols: {}\n",
        LAT_MIN, LAT_MAX, LON_MIN, LON_MAX, ROWS, COLS
    );
    let depths = format!(
        "    depths: [{}]\n",
        DEPTHS
            .iter()
            .map(|d| format!("{:?}", d))
            .collect::<Vec<_>>()
            .join(", ")
    );
    let timestamps = format!(
        "    timestamps: [{}]\n",
        TIMESTAMPS
            .iter()
            .map(|t| format!("\"{}\"", t))
            .collect::<Vec<_>>()
            .join(", ")
    );
    let months = (1..=12)
        .map(|m| format!("\"2000-{:02}-15T00:00:00Z\"", m))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"datasets:
  - id: {DATASET}
    climatology: {CLIMATOLOGY}
{timestamps}{depths}{grid}    variables:
      - key: votemper
        name: Sea Water Potential Temperature
        unit: Kelvin
        file: votemper.f32
      - key: vozocrtx
        name: Sea Water X Velocity
        unit: m/s
        file: vozocrtx.f32
      - key: vomecrty
        name: Sea Water Y Velocity
        unit: m/s
        file: vomecrty.f32
      - key: sossheig
        name: Sea Surface Height
        unit: m
        scale_factor: 1000.0
        file: sossheig.f32
        depth_dependent: false
  - id: {CLIMATOLOGY}
    timestamps: [{months}]
{depths}{grid}    variables:
      - key: votemper
        name: Sea Water Potential Temperature
        unit: Kelvin
        file: votemper_clim.f32
"#
    )
}

/// Write values as raw little-endian `f32`.
pub fn write_f32_le(path: &Path, values: &[f64]) -> io::Result<()> {
    let mut bytes = Vec::with_capacity(values.len() * 4);
    for v in values {
        bytes.extend_from_slice(&(*v as f32).to_le_bytes());
    }
    fs::write(path, bytes)
}

/// Creates a temporary directory for test output, removed on drop.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::tempdir().expect("Failed to create temporary test directory")
}
