//! Lazy access to tiled GeoTIFFs.
//!
//! Tiles are decoded the first time a cell inside them is read and kept in
//! a memory-bounded [`ChunkCache`]. Hover queries on large rasters touch one
//! tile instead of decoding the whole image.

use std::io::Cursor;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use tiff::decoder::Decoder;
use tracing::trace;

use crate::cache::ChunkCache;
use crate::dataset::RegionSource;
use crate::decode::{samples_to_f32, select_band};
use crate::error::{RasterError, Result};
use crate::types::CacheStats;

struct TileState {
    decoder: Decoder<Cursor<Bytes>>,
    cache: ChunkCache,
}

/// A [`RegionSource`] over the tiles of an in-memory GeoTIFF.
pub struct TiledTiffSource {
    state: Mutex<TileState>,
    width: usize,
    height: usize,
    tile_width: usize,
    tile_height: usize,
    tiles_across: usize,
    bands: usize,
    no_data: Option<f64>,
}

impl TiledTiffSource {
    pub(crate) fn new(
        decoder: Decoder<Cursor<Bytes>>,
        width: usize,
        height: usize,
        bands: usize,
        no_data: Option<f64>,
        cache_bytes: usize,
    ) -> Result<Self> {
        let (tile_width, tile_height) = decoder.chunk_dimensions();
        let (tile_width, tile_height) = (tile_width as usize, tile_height as usize);
        if tile_width == 0 || tile_height == 0 {
            return Err(RasterError::decode("tile dimensions must be positive"));
        }

        Ok(Self {
            state: Mutex::new(TileState {
                decoder,
                cache: ChunkCache::new(cache_bytes),
            }),
            width,
            height,
            tile_width,
            tile_height,
            tiles_across: (width + tile_width - 1) / tile_width,
            bands,
            no_data,
        })
    }

    /// Tile dimensions (width, height) in cells.
    pub fn tile_size(&self) -> (usize, usize) {
        (self.tile_width, self.tile_height)
    }

    /// Statistics for the decoded-tile cache.
    pub fn cache_stats(&self) -> CacheStats {
        match self.state.lock() {
            Ok(state) => state.cache.stats(),
            Err(_) => CacheStats::default(),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, TileState>> {
        self.state
            .lock()
            .map_err(|_| RasterError::fetch("tile decoder state is poisoned"))
    }

    /// Decode one tile into a full `tile_width * tile_height` buffer (NaN-padded).
    fn decode_tile(
        &self,
        decoder: &mut Decoder<Cursor<Bytes>>,
        tile_x: usize,
        tile_y: usize,
    ) -> Result<Vec<f32>> {
        let index = (tile_y * self.tiles_across + tile_x) as u32;
        let (data_width, data_height) = decoder.chunk_data_dimensions(index);
        let (data_width, data_height) = (data_width as usize, data_height as usize);
        let samples = samples_to_f32(decoder.read_chunk(index)?)?;
        let values = select_band(&samples, self.bands, self.no_data);

        let stride = if values.len() == data_width * data_height {
            data_width
        } else if values.len() == self.tile_width * self.tile_height {
            self.tile_width
        } else {
            return Err(RasterError::fetch(format!(
                "tile {} decoded to {} values, expected {}x{}",
                index,
                values.len(),
                data_width,
                data_height
            )));
        };

        let mut tile = vec![f32::NAN; self.tile_width * self.tile_height];
        for r in 0..data_height.min(self.tile_height) {
            let src = &values[r * stride..r * stride + data_width.min(self.tile_width)];
            let dst = r * self.tile_width;
            tile[dst..dst + src.len()].copy_from_slice(src);
        }

        trace!(tile_x, tile_y, "Decoded raster tile");
        Ok(tile)
    }

    fn read_block(&self, row: usize, col: usize, width: usize, height: usize) -> Result<Vec<f32>> {
        if width == 0
            || height == 0
            || row + height > self.height
            || col + width > self.width
        {
            return Err(RasterError::region_out_of_bounds(
                row,
                col,
                width,
                height,
                (self.width, self.height),
            ));
        }

        let mut out = vec![f32::NAN; width * height];
        let mut guard = self.lock()?;
        let TileState { decoder, cache } = &mut *guard;

        for tile_y in row / self.tile_height..=(row + height - 1) / self.tile_height {
            for tile_x in col / self.tile_width..=(col + width - 1) / self.tile_width {
                let key = (tile_x, tile_y);
                match cache.get(&key) {
                    Some(tile) => self.copy_overlap(tile, tile_x, tile_y, row, col, width, height, &mut out),
                    None => {
                        let tile = self.decode_tile(decoder, tile_x, tile_y)?;
                        self.copy_overlap(&tile, tile_x, tile_y, row, col, width, height, &mut out);
                        cache.insert(key, tile);
                    }
                }
            }
        }

        Ok(out)
    }

    #[allow(clippy::too_many_arguments)]
    fn copy_overlap(
        &self,
        tile: &[f32],
        tile_x: usize,
        tile_y: usize,
        row: usize,
        col: usize,
        width: usize,
        height: usize,
        out: &mut [f32],
    ) {
        let tile_row0 = tile_y * self.tile_height;
        let tile_col0 = tile_x * self.tile_width;
        let r_end = (row + height).min(tile_row0 + self.tile_height);
        let c_end = (col + width).min(tile_col0 + self.tile_width);

        for r in row.max(tile_row0)..r_end {
            for c in col.max(tile_col0)..c_end {
                out[(r - row) * width + (c - col)] =
                    tile[(r - tile_row0) * self.tile_width + (c - tile_col0)];
            }
        }
    }
}

#[async_trait]
impl RegionSource for TiledTiffSource {
    fn value_at(&self, row: usize, col: usize) -> Result<f32> {
        Ok(self.read_block(row, col, 1, 1)?[0])
    }

    async fn fetch_region(
        &self,
        row: usize,
        col: usize,
        width: usize,
        height: usize,
    ) -> Result<Vec<f32>> {
        self.read_block(row, col, width, height)
    }

    fn describe(&self) -> String {
        format!(
            "tiled {}x{} in {}x{} tiles",
            self.width, self.height, self.tile_width, self.tile_height
        )
    }
}
