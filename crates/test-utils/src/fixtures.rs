//! Manifest and on-disk site fixtures.
//!
//! The sample site has two variables over two years, laid out the way the
//! tile build writes them: `data/manifest.json` next to
//! `data/<VAR>_<YEAR>.tif`, with raster paths relative to the site root.

use std::path::Path;

use serde_json::{json, Map, Value};
use tempfile::TempDir;

use crate::generators::create_ramp_grid;
use crate::geotiff::GeoTiffBuilder;

/// Sample grid geometry: 4x3 cells of 5 degrees, top-left at (-10, 10).
pub const SAMPLE_WIDTH: usize = 4;
pub const SAMPLE_HEIGHT: usize = 3;
pub const SAMPLE_ORIGIN: (f64, f64) = (-10.0, 10.0);
pub const SAMPLE_CELL: f64 = 5.0;

/// Manifest location inside the sample site, relative to the site root.
pub const SAMPLE_MANIFEST: &str = "data/manifest.json";

/// One manifest row: `(variable, year, tif, min, max)`.
pub type ManifestRow<'a> = (&'a str, &'a str, &'a str, f64, f64);

/// Build manifest JSON from rows.
pub fn manifest_json(rows: &[ManifestRow<'_>]) -> String {
    let mut variables: Vec<&str> = Vec::new();
    let mut years: Vec<&str> = Vec::new();
    let mut data = Map::new();

    for &(variable, year, tif, min, max) in rows {
        if !variables.contains(&variable) {
            variables.push(variable);
        }
        if !years.contains(&year) {
            years.push(year);
        }
        let by_year = data
            .entry(variable.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(by_year) = by_year {
            by_year.insert(
                year.to_string(),
                json!({ "tif": tif, "nc": format!("data/nc/{}.nc", year), "min": min, "max": max }),
            );
        }
    }

    json!({ "variables": variables, "years": years, "data": data }).to_string()
}

/// Location of the sample raster for a key.
pub fn sample_location(variable: &str, year: &str) -> String {
    format!("data/{}_{}.tif", variable, year)
}

/// Manifest for NH3 and CH4 in 2019 and 2020.
///
/// Manifest maxima are 120, 240, 1200 and 2400, slightly above the embedded
/// statistics of the matching [`sample_tiff`] rasters (110, 220, 1100, 2200).
pub fn sample_manifest() -> String {
    let nh3_2019 = sample_location("NH3", "2019");
    let nh3_2020 = sample_location("NH3", "2020");
    let ch4_2019 = sample_location("CH4", "2019");
    let ch4_2020 = sample_location("CH4", "2020");
    manifest_json(&[
        ("NH3", "2019", &nh3_2019, 0.0, 120.0),
        ("NH3", "2020", &nh3_2020, 0.0, 240.0),
        ("CH4", "2019", &ch4_2019, 0.0, 1200.0),
        ("CH4", "2020", &ch4_2020, 0.0, 2400.0),
    ])
}

/// Ramp from 0 to `max` over the sample geometry, with embedded statistics.
///
/// Cell `i` in row-major order holds `i * max / 11`.
pub fn sample_tiff(max: f32) -> Vec<u8> {
    GeoTiffBuilder::new(
        SAMPLE_WIDTH,
        SAMPLE_HEIGHT,
        create_ramp_grid(SAMPLE_WIDTH, SAMPLE_HEIGHT, 0.0, max),
    )
    .origin(SAMPLE_ORIGIN.0, SAMPLE_ORIGIN.1)
    .cell_size(SAMPLE_CELL, SAMPLE_CELL)
    .statistics(0.0, max as f64)
    .build()
}

/// Write the sample manifest and rasters under a temporary directory.
///
/// Returns the site root; the manifest is at [`SAMPLE_MANIFEST`] inside it.
pub fn write_sample_site() -> std::io::Result<TempDir> {
    write_sample_site_at(SAMPLE_MANIFEST)
}

/// [`write_sample_site`] with the manifest at `manifest`, relative to the
/// site root. Raster paths inside it stay relative to the site root.
pub fn write_sample_site_at(manifest: &str) -> std::io::Result<TempDir> {
    let dir = tempfile::tempdir()?;
    std::fs::create_dir_all(dir.path().join("data"))?;
    let manifest_path = dir.path().join(manifest);
    if let Some(parent) = manifest_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(manifest_path, sample_manifest())?;

    for (variable, year, max) in [
        ("NH3", "2019", 110.0),
        ("NH3", "2020", 220.0),
        ("CH4", "2019", 1100.0),
        ("CH4", "2020", 2200.0),
    ] {
        write_file(dir.path(), &sample_location(variable, year), &sample_tiff(max))?;
    }

    Ok(dir)
}

fn write_file(root: &Path, relative: &str, contents: &[u8]) -> std::io::Result<()> {
    std::fs::write(root.join(relative), contents)
}
