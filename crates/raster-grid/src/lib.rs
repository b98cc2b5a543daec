//! Raster data layer for grid overlays.
//!
//! Decodes GeoTIFF bytes into a [`RasterDataset`] and hides whether the
//! cell values were decoded up front or are fetched lazily per tile:
//!
//! ```text
//! bytes ──► decode() ──► RasterDataset
//!                           │
//!                           ├─► ValueAccessor::Materialized(Grid)
//!                           │
//!                           └─► ValueAccessor::LazyFetchable(TiledTiffSource)
//!                                     │
//!                                     └─► ChunkCache (LRU, memory bounded)
//!
//! (lat, lng) ──► resolve() ──► CellLocation ──► value_at / fetch_region
//! ```
//!
//! # Example
//!
//! ```ignore
//! use raster_grid::{decode, resolve, CellLocation, RasterConfig};
//!
//! let dataset = decode(bytes, &RasterConfig::default())?;
//! if let CellLocation::Cell { row, col } = resolve(&dataset, 35.0, -100.0) {
//!     let value = dataset.value_at(row, col)?;
//! }
//! ```

pub mod cache;
pub mod config;
pub mod dataset;
pub mod decode;
pub mod error;
pub mod resolver;
pub mod tiled;
pub mod types;

pub use cache::ChunkCache;
pub use config::RasterConfig;
pub use dataset::{GeoTransform, Grid, RasterDataset, RegionSource, ValueAccessor};
pub use decode::decode;
pub use error::{RasterError, Result};
pub use resolver::{cell_center, query, resolve, CellLocation, PixelQueryResult};
pub use tiled::TiledTiffSource;
pub use types::{CacheStats, GridRegion, ValueStats};
