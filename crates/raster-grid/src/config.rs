//! Configuration for raster decoding.

use serde::{Deserialize, Serialize};

/// Configuration for the decoding adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RasterConfig {
    /// Tiled rasters with more cells than this are decoded lazily, tile by tile.
    pub lazy_threshold_pixels: usize,

    /// Memory budget for decoded tiles of lazy rasters, in megabytes.
    pub chunk_cache_size_mb: usize,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            lazy_threshold_pixels: 2048 * 2048,
            chunk_cache_size_mb: 64,
        }
    }
}

impl RasterConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("RASTER_LAZY_THRESHOLD_PIXELS") {
            if let Ok(pixels) = val.parse() {
                config.lazy_threshold_pixels = pixels;
            }
        }

        if let Ok(val) = std::env::var("RASTER_CHUNK_CACHE_MB") {
            if let Ok(size) = val.parse() {
                config.chunk_cache_size_mb = size;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_cache_size_mb == 0 {
            return Err("chunk_cache_size_mb must be > 0".to_string());
        }

        Ok(())
    }

    /// Get the chunk cache size in bytes.
    pub fn chunk_cache_size_bytes(&self) -> usize {
        self.chunk_cache_size_mb * 1024 * 1024
    }

    /// Force every tiled raster onto the lazy path.
    pub fn always_lazy() -> Self {
        Self {
            lazy_threshold_pixels: 0,
            ..Self::default()
        }
    }
}
