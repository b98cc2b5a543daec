//! In-memory GeoTIFF builder for decoder tests.
//!
//! Writes little-endian, single-band float32 TIFFs with the same GeoTIFF and
//! GDAL tags a rasterio-produced file carries: tiepoint, pixel scale (or a
//! model transformation), `GDAL_NODATA` and `GDAL_METADATA` statistics.
//! Images can be stripped or tiled, optionally DEFLATE-compressed with the
//! floating-point predictor, and followed by reduced-resolution overview
//! IFDs the way `build_overviews` appends them.

use std::borrow::Cow;
use std::io::Write;

use bytes::Bytes;
use flate2::write::ZlibEncoder;
use flate2::Compression;

const TYPE_ASCII: u16 = 2;
const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;
const TYPE_DOUBLE: u16 = 12;

const COMPRESSION_NONE: u16 = 1;
const COMPRESSION_DEFLATE: u16 = 8;
const PREDICTOR_FLOATING_POINT: u16 = 3;
const SUBFILE_REDUCED_IMAGE: u32 = 1;

/// Builder for small GeoTIFF fixtures.
///
/// # Example
///
/// ```
/// use test_utils::{create_test_grid, GeoTiffBuilder};
///
/// let tiff = GeoTiffBuilder::new(4, 3, create_test_grid(4, 3))
///     .origin(-10.0, 10.0)
///     .cell_size(0.5, 0.5)
///     .statistics(0.0, 3002.0)
///     .build();
/// assert_eq!(&tiff[0..4], b"II*\0");
/// ```
#[derive(Debug, Clone)]
pub struct GeoTiffBuilder {
    width: usize,
    height: usize,
    values: Vec<f32>,
    origin: (f64, f64),
    cell_size: (f64, f64),
    no_data: Option<f64>,
    statistics: Option<(f64, f64)>,
    tile_size: Option<(usize, usize)>,
    georeferencing: Georeferencing,
    deflate: bool,
    float_predictor: bool,
    overviews: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Georeferencing {
    TiepointScale,
    Transformation,
    Missing,
}

/// One image in the IFD chain: the full-resolution raster or an overview.
struct Level<'a> {
    width: usize,
    height: usize,
    values: Cow<'a, [f32]>,
    overview: bool,
}

impl GeoTiffBuilder {
    /// Start a builder for a `width x height` grid in row-major order.
    ///
    /// Defaults to origin (0, 0) and 1x1 cells.
    pub fn new(width: usize, height: usize, values: Vec<f32>) -> Self {
        assert_eq!(
            values.len(),
            width * height,
            "GeoTiffBuilder needs width * height values"
        );
        Self {
            width,
            height,
            values,
            origin: (0.0, 0.0),
            cell_size: (1.0, 1.0),
            no_data: None,
            statistics: None,
            tile_size: None,
            georeferencing: Georeferencing::TiepointScale,
            deflate: false,
            float_predictor: false,
            overviews: Vec::new(),
        }
    }

    /// Geographic coordinate of the top-left corner.
    pub fn origin(mut self, x: f64, y: f64) -> Self {
        self.origin = (x, y);
        self
    }

    pub fn cell_size(mut self, width: f64, height: f64) -> Self {
        self.cell_size = (width, height);
        self
    }

    /// Write a `GDAL_NODATA` tag.
    pub fn no_data(mut self, value: f64) -> Self {
        self.no_data = Some(value);
        self
    }

    /// Write `STATISTICS_MINIMUM` / `STATISTICS_MAXIMUM` into `GDAL_METADATA`.
    pub fn statistics(mut self, min: f64, max: f64) -> Self {
        self.statistics = Some((min, max));
        self
    }

    /// Lay the image out in tiles instead of a single strip.
    pub fn tiled(mut self, tile_width: usize, tile_height: usize) -> Self {
        self.tile_size = Some((tile_width, tile_height));
        self
    }

    /// Georeference with a ModelTransformation matrix instead of a tiepoint.
    pub fn model_transformation(mut self) -> Self {
        self.georeferencing = Georeferencing::Transformation;
        self
    }

    /// Leave out all georeferencing tags.
    pub fn without_georeferencing(mut self) -> Self {
        self.georeferencing = Georeferencing::Missing;
        self
    }

    /// Compress every strip or tile with zlib (TIFF compression 8).
    pub fn deflate(mut self) -> Self {
        self.deflate = true;
        self
    }

    /// Apply the floating-point predictor (TIFF predictor 3) before
    /// compression.
    pub fn float_predictor(mut self) -> Self {
        self.float_predictor = true;
        self
    }

    /// Append averaged overview IFDs at the given decimation factors, e.g.
    /// `&[2, 4]`. Overviews carry no georeferencing or GDAL tags.
    pub fn overviews(mut self, factors: &[usize]) -> Self {
        assert!(factors.iter().all(|&f| f >= 2), "overview factors must be >= 2");
        self.overviews = factors.to_vec();
        self
    }

    /// Encode to TIFF bytes.
    pub fn build(&self) -> Vec<u8> {
        let mut out = vec![0u8; 8];
        out[0..2].copy_from_slice(b"II");
        out[2..4].copy_from_slice(&42u16.to_le_bytes());

        let full = Level {
            width: self.width,
            height: self.height,
            values: Cow::Borrowed(&self.values[..]),
            overview: false,
        };
        let levels = std::iter::once(full).chain(self.overviews.iter().map(|&f| self.overview(f)));

        // Byte position holding the offset of the next IFD
        let mut next_pointer = 4;
        for level in levels {
            let entries = self.level_entries(&mut out, &level);
            let (ifd_offset, pointer) = write_ifd(&mut out, entries);
            out[next_pointer..next_pointer + 4].copy_from_slice(&ifd_offset.to_le_bytes());
            next_pointer = pointer;
        }
        out
    }

    /// Encode to [`Bytes`], the form the decoder takes.
    pub fn build_bytes(&self) -> Bytes {
        Bytes::from(self.build())
    }

    /// Write one level's pixel data and return its IFD entries.
    fn level_entries(&self, out: &mut Vec<u8>, level: &Level<'_>) -> Vec<IfdEntry> {
        let compression = if self.deflate {
            COMPRESSION_DEFLATE
        } else {
            COMPRESSION_NONE
        };

        let mut entries = vec![
            IfdEntry::long(256, vec![level.width as u32]),
            IfdEntry::long(257, vec![level.height as u32]),
            IfdEntry::short(258, vec![32]),
            IfdEntry::short(259, vec![compression]),
            IfdEntry::short(262, vec![1]),
            IfdEntry::short(277, vec![1]),
            IfdEntry::short(284, vec![1]),
            IfdEntry::short(339, vec![3]),
        ];
        if level.overview {
            entries.push(IfdEntry::long(254, vec![SUBFILE_REDUCED_IMAGE]));
        }
        if self.float_predictor {
            entries.push(IfdEntry::short(317, vec![PREDICTOR_FLOATING_POINT]));
        }

        match self.tile_size {
            Some((tile_width, tile_height)) => {
                let (offsets, counts) = self.write_tiles(out, level, tile_width, tile_height);
                entries.push(IfdEntry::long(322, vec![tile_width as u32]));
                entries.push(IfdEntry::long(323, vec![tile_height as u32]));
                entries.push(IfdEntry::long(324, offsets));
                entries.push(IfdEntry::long(325, counts));
            }
            None => {
                let offset = out.len() as u32;
                let strip = self.encode_chunk(&level.values, level.width);
                out.extend_from_slice(&strip);
                entries.push(IfdEntry::long(273, vec![offset]));
                entries.push(IfdEntry::long(278, vec![level.height as u32]));
                entries.push(IfdEntry::long(279, vec![strip.len() as u32]));
            }
        }

        if level.overview {
            return entries;
        }

        let (x, y) = self.origin;
        let (sx, sy) = self.cell_size;
        match self.georeferencing {
            Georeferencing::TiepointScale => {
                entries.push(IfdEntry::double(33550, vec![sx, sy, 0.0]));
                entries.push(IfdEntry::double(33922, vec![0.0, 0.0, 0.0, x, y, 0.0]));
            }
            Georeferencing::Transformation => {
                entries.push(IfdEntry::double(
                    34264,
                    vec![
                        sx, 0.0, 0.0, x, //
                        0.0, -sy, 0.0, y, //
                        0.0, 0.0, 0.0, 0.0, //
                        0.0, 0.0, 0.0, 1.0,
                    ],
                ));
            }
            Georeferencing::Missing => {}
        }

        if let Some((min, max)) = self.statistics {
            entries.push(IfdEntry::ascii(42112, &gdal_metadata_xml(min, max)));
        }
        if let Some(no_data) = self.no_data {
            entries.push(IfdEntry::ascii(42113, &no_data.to_string()));
        }
        entries
    }

    fn write_tiles(
        &self,
        out: &mut Vec<u8>,
        level: &Level<'_>,
        tile_width: usize,
        tile_height: usize,
    ) -> (Vec<u32>, Vec<u32>) {
        assert!(tile_width > 0 && tile_height > 0, "tile size must be positive");
        let tiles_across = (level.width + tile_width - 1) / tile_width;
        let tiles_down = (level.height + tile_height - 1) / tile_height;
        let pad = self.pad_value();

        let mut offsets = Vec::with_capacity(tiles_across * tiles_down);
        let mut counts = Vec::with_capacity(tiles_across * tiles_down);
        for tile_y in 0..tiles_down {
            for tile_x in 0..tiles_across {
                let mut tile = vec![pad; tile_width * tile_height];
                for r in 0..tile_height {
                    let row = tile_y * tile_height + r;
                    if row >= level.height {
                        break;
                    }
                    for c in 0..tile_width {
                        let col = tile_x * tile_width + c;
                        if col >= level.width {
                            break;
                        }
                        tile[r * tile_width + c] = level.values[row * level.width + col];
                    }
                }
                let encoded = self.encode_chunk(&tile, tile_width);
                offsets.push(out.len() as u32);
                counts.push(encoded.len() as u32);
                out.extend_from_slice(&encoded);
            }
        }
        (offsets, counts)
    }

    /// Serialize one strip or tile whose rows are `row_len` samples long.
    fn encode_chunk(&self, values: &[f32], row_len: usize) -> Vec<u8> {
        let raw: Vec<u8> = if self.float_predictor {
            values
                .chunks(row_len)
                .flat_map(float_predict_row)
                .collect()
        } else {
            values.iter().flat_map(|v| v.to_le_bytes()).collect()
        };
        if !self.deflate {
            return raw;
        }

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&raw).expect("zlib encode");
        encoder.finish().expect("zlib encode")
    }

    /// Block-averaged overview at decimation `factor`, skipping no-data.
    fn overview(&self, factor: usize) -> Level<'_> {
        let width = (self.width + factor - 1) / factor;
        let height = (self.height + factor - 1) / factor;
        let no_data = self.no_data.map(|v| v as f32);
        let pad = self.pad_value();

        let mut values = Vec::with_capacity(width * height);
        for oy in 0..height {
            for ox in 0..width {
                let (mut sum, mut n) = (0.0f64, 0usize);
                for row in oy * factor..((oy + 1) * factor).min(self.height) {
                    for col in ox * factor..((ox + 1) * factor).min(self.width) {
                        let v = self.values[row * self.width + col];
                        if v.is_finite() && Some(v) != no_data {
                            sum += v as f64;
                            n += 1;
                        }
                    }
                }
                values.push(if n == 0 { pad } else { (sum / n as f64) as f32 });
            }
        }

        Level {
            width,
            height,
            values: Cow::Owned(values),
            overview: true,
        }
    }

    fn pad_value(&self) -> f32 {
        self.no_data.map(|v| v as f32).unwrap_or(0.0)
    }
}

/// Floating-point predictor for one row: big-endian sample bytes regrouped
/// by significance (all high bytes first), then byte-wise differenced.
fn float_predict_row(row: &[f32]) -> Vec<u8> {
    let n = row.len();
    let mut bytes = vec![0u8; n * 4];
    for (i, v) in row.iter().enumerate() {
        for (b, byte) in v.to_be_bytes().into_iter().enumerate() {
            bytes[b * n + i] = byte;
        }
    }
    for i in (1..bytes.len()).rev() {
        bytes[i] = bytes[i].wrapping_sub(bytes[i - 1]);
    }
    bytes
}

/// Append a sorted IFD with out-of-line payloads. Returns the IFD offset and
/// the position of its next-IFD pointer.
fn write_ifd(out: &mut Vec<u8>, mut entries: Vec<IfdEntry>) -> (u32, usize) {
    entries.sort_by_key(|e| e.tag);

    let mut value_fields = Vec::with_capacity(entries.len());
    for entry in &entries {
        if entry.payload.len() > 4 {
            align_word(out);
            value_fields.push((out.len() as u32).to_le_bytes());
            out.extend_from_slice(&entry.payload);
        } else {
            let mut inline = [0u8; 4];
            inline[..entry.payload.len()].copy_from_slice(&entry.payload);
            value_fields.push(inline);
        }
    }

    align_word(out);
    let ifd_offset = out.len() as u32;
    out.extend_from_slice(&(entries.len() as u16).to_le_bytes());
    for (entry, field) in entries.iter().zip(&value_fields) {
        out.extend_from_slice(&entry.tag.to_le_bytes());
        out.extend_from_slice(&entry.field_type.to_le_bytes());
        out.extend_from_slice(&entry.count.to_le_bytes());
        out.extend_from_slice(field);
    }
    let next_pointer = out.len();
    out.extend_from_slice(&0u32.to_le_bytes());
    (ifd_offset, next_pointer)
}

/// `GDAL_METADATA` document with band-0 statistics.
pub fn gdal_metadata_xml(min: f64, max: f64) -> String {
    format!(
        "<GDALMetadata>\n  <Item name=\"STATISTICS_MAXIMUM\" sample=\"0\">{}</Item>\n  <Item name=\"STATISTICS_MINIMUM\" sample=\"0\">{}</Item>\n</GDALMetadata>",
        max, min
    )
}

struct IfdEntry {
    tag: u16,
    field_type: u16,
    count: u32,
    payload: Vec<u8>,
}

impl IfdEntry {
    fn short(tag: u16, values: Vec<u16>) -> Self {
        Self {
            tag,
            field_type: TYPE_SHORT,
            count: values.len() as u32,
            payload: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        }
    }

    fn long(tag: u16, values: Vec<u32>) -> Self {
        Self {
            tag,
            field_type: TYPE_LONG,
            count: values.len() as u32,
            payload: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        }
    }

    fn double(tag: u16, values: Vec<f64>) -> Self {
        Self {
            tag,
            field_type: TYPE_DOUBLE,
            count: values.len() as u32,
            payload: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        }
    }

    fn ascii(tag: u16, text: &str) -> Self {
        let mut payload = text.as_bytes().to_vec();
        payload.push(0);
        Self {
            tag,
            field_type: TYPE_ASCII,
            count: payload.len() as u32,
            payload,
        }
    }
}

fn align_word(out: &mut Vec<u8>) {
    if out.len() % 2 == 1 {
        out.push(0);
    }
}
