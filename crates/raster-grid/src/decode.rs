//! GeoTIFF decoding adapter.
//!
//! Reads single-band (or first-band) GeoTIFFs as produced by GDAL/rasterio:
//! - georeferencing from ModelTiepoint + ModelPixelScale, or a
//!   rotation-free ModelTransformation
//! - no-data from the `GDAL_NODATA` ASCII tag
//! - statistics from `STATISTICS_MINIMUM` / `STATISTICS_MAXIMUM` items in
//!   the `GDAL_METADATA` XML tag
//! - compressed (e.g. DEFLATE with the floating-point predictor) strips or
//!   tiles; only the first IFD is read, trailing overviews are skipped
//!
//! Decoding never scans cell values for extrema. Datasets without embedded
//! statistics report `stats() == None` and the caller supplies bounds.

use std::io::Cursor;
use std::sync::Arc;

use bytes::Bytes;
use serde::Deserialize;
use tiff::decoder::{ChunkType, Decoder, DecodingResult};
use tiff::tags::Tag;
use tracing::{debug, warn};

use crate::config::RasterConfig;
use crate::dataset::{GeoTransform, Grid, RasterDataset, ValueAccessor};
use crate::error::{RasterError, Result};
use crate::tiled::TiledTiffSource;
use crate::types::ValueStats;

pub(crate) const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
pub(crate) const TAG_MODEL_TIEPOINT: u16 = 33922;
pub(crate) const TAG_MODEL_TRANSFORMATION: u16 = 34264;
pub(crate) const TAG_GDAL_METADATA: u16 = 42112;
pub(crate) const TAG_GDAL_NODATA: u16 = 42113;

/// Decode GeoTIFF bytes into a [`RasterDataset`].
///
/// Tiled rasters larger than `config.lazy_threshold_pixels` are returned
/// with a lazy accessor; everything else is materialized.
pub fn decode(bytes: Bytes, config: &RasterConfig) -> Result<RasterDataset> {
    let size = bytes.len();
    let mut decoder = Decoder::new(Cursor::new(bytes))?;

    let (width, height) = decoder.dimensions()?;
    let (width, height) = (width as usize, height as usize);
    let transform = read_geo_transform(&mut decoder)?;
    let no_data = read_no_data(&mut decoder)?;
    let stats = read_statistics(&mut decoder)?;
    let bands = match decoder.find_tag(Tag::SamplesPerPixel)? {
        Some(value) => value.into_u32()? as usize,
        None => 1,
    };
    if bands == 0 {
        return Err(RasterError::decode("SamplesPerPixel is zero"));
    }

    let lazy = matches!(decoder.get_chunk_type(), ChunkType::Tile)
        && width.saturating_mul(height) > config.lazy_threshold_pixels;

    let accessor = if lazy {
        let source = TiledTiffSource::new(
            decoder,
            width,
            height,
            bands,
            no_data,
            config.chunk_cache_size_bytes(),
        )?;
        ValueAccessor::LazyFetchable(Arc::new(source))
    } else {
        let samples = samples_to_f32(decoder.read_image()?)?;
        let expected = width * height * bands;
        if samples.len() < expected {
            return Err(RasterError::decode(format!(
                "expected {} samples for {}x{}x{}, got {}",
                expected,
                width,
                height,
                bands,
                samples.len()
            )));
        }
        let values = select_band(&samples[..expected], bands, no_data);
        ValueAccessor::Materialized(Grid::new(width, height, values)?)
    };

    let mut dataset = RasterDataset::new(width, height, transform, accessor)?;
    if let Some(stats) = stats {
        dataset = dataset.with_stats(stats);
    }
    if let Some(no_data) = no_data {
        dataset = dataset.with_no_data(no_data);
    }

    debug!(
        bytes = size,
        width,
        height,
        bands,
        lazy,
        has_stats = stats.is_some(),
        "Decoded GeoTIFF raster"
    );

    Ok(dataset)
}

fn find_f64_vec<R>(decoder: &mut Decoder<R>, code: u16) -> Result<Option<Vec<f64>>>
where
    R: std::io::Read + std::io::Seek,
{
    match decoder.find_tag(Tag::from_u16_exhaustive(code))? {
        Some(value) => Ok(Some(value.into_f64_vec()?)),
        None => Ok(None),
    }
}

fn find_ascii<R>(decoder: &mut Decoder<R>, code: u16) -> Result<Option<String>>
where
    R: std::io::Read + std::io::Seek,
{
    match decoder.find_tag(Tag::from_u16_exhaustive(code))? {
        Some(value) => Ok(Some(value.into_string()?)),
        None => Ok(None),
    }
}

fn read_geo_transform<R>(decoder: &mut Decoder<R>) -> Result<GeoTransform>
where
    R: std::io::Read + std::io::Seek,
{
    let scale = find_f64_vec(decoder, TAG_MODEL_PIXEL_SCALE)?;
    let tiepoint = find_f64_vec(decoder, TAG_MODEL_TIEPOINT)?;

    if let (Some(scale), Some(tie)) = (scale, tiepoint) {
        if scale.len() < 2 || tie.len() < 6 {
            return Err(RasterError::decode(format!(
                "malformed georeferencing: {} scale values, {} tiepoint values",
                scale.len(),
                tie.len()
            )));
        }
        // Tiepoint ties raster (I, J) to model (X, Y); scale Y is positive for north-up.
        let (i, j, x, y) = (tie[0], tie[1], tie[3], tie[4]);
        return Ok(GeoTransform::new(
            x - i * scale[0],
            y + j * scale[1],
            scale[0],
            scale[1],
        ));
    }

    if let Some(m) = find_f64_vec(decoder, TAG_MODEL_TRANSFORMATION)? {
        if m.len() < 8 {
            return Err(RasterError::decode("malformed ModelTransformation tag"));
        }
        if m[1] != 0.0 || m[4] != 0.0 {
            return Err(RasterError::decode("rotated rasters are not supported"));
        }
        return Ok(GeoTransform::new(m[3], m[7], m[0], -m[5]));
    }

    Err(RasterError::decode(
        "missing georeferencing (no tiepoint/pixel scale or transformation)",
    ))
}

fn read_no_data<R>(decoder: &mut Decoder<R>) -> Result<Option<f64>>
where
    R: std::io::Read + std::io::Seek,
{
    let Some(raw) = find_ascii(decoder, TAG_GDAL_NODATA)? else {
        return Ok(None);
    };
    let text = raw.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    match text.parse::<f64>() {
        Ok(value) => Ok(Some(value)),
        Err(_) => {
            warn!(nodata = %text, "Ignoring unparseable GDAL_NODATA tag");
            Ok(None)
        }
    }
}

fn read_statistics<R>(decoder: &mut Decoder<R>) -> Result<Option<ValueStats>>
where
    R: std::io::Read + std::io::Seek,
{
    let Some(xml) = find_ascii(decoder, TAG_GDAL_METADATA)? else {
        return Ok(None);
    };
    match parse_gdal_statistics(&xml) {
        Ok(stats) => Ok(stats),
        Err(e) => {
            warn!(error = %e, "Ignoring unreadable GDAL_METADATA tag");
            Ok(None)
        }
    }
}

#[derive(Debug, Deserialize)]
struct GdalMetadata {
    #[serde(rename = "Item", default)]
    items: Vec<GdalItem>,
}

#[derive(Debug, Deserialize)]
struct GdalItem {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@sample", default)]
    sample: Option<u32>,
    #[serde(rename = "$text", default)]
    value: String,
}

/// Extract band-0 statistics from a `GDAL_METADATA` XML document.
///
/// Returns `Ok(None)` when either bound is missing.
pub fn parse_gdal_statistics(xml: &str) -> Result<Option<ValueStats>> {
    let xml = xml.trim_end_matches('\0');
    let metadata: GdalMetadata =
        quick_xml::de::from_str(xml).map_err(|e| RasterError::invalid_metadata(e.to_string()))?;

    let find = |name: &str| -> Result<Option<f64>> {
        metadata
            .items
            .iter()
            .filter(|item| item.sample.unwrap_or(0) == 0)
            .find(|item| item.name == name)
            .map(|item| {
                item.value.trim().parse::<f64>().map_err(|_| {
                    RasterError::invalid_metadata(format!("{} is not a number: {}", name, item.value))
                })
            })
            .transpose()
    };

    match (find("STATISTICS_MINIMUM")?, find("STATISTICS_MAXIMUM")?) {
        (Some(min), Some(max)) => Ok(Some(ValueStats::new(min, max))),
        _ => Ok(None),
    }
}

/// Convert any integer or float sample buffer to f32.
pub(crate) fn samples_to_f32(result: DecodingResult) -> Result<Vec<f32>> {
    #[allow(unreachable_patterns)]
    let values = match result {
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f32).collect(),
        _ => {
            return Err(RasterError::UnsupportedSampleFormat(
                "unrecognized sample type".to_string(),
            ))
        }
    };
    Ok(values)
}

/// Keep the first band of interleaved samples and turn no-data into NaN.
pub(crate) fn select_band(samples: &[f32], bands: usize, no_data: Option<f64>) -> Vec<f32> {
    let no_data = no_data.map(|v| v as f32);
    samples
        .iter()
        .step_by(bands.max(1))
        .map(|&v| match no_data {
            Some(nd) if v == nd => f32::NAN,
            _ => v,
        })
        .collect()
}
