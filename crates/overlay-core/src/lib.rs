//! Overlay orchestration for gridded raster datasets on a map.
//!
//! The [`OverlayManager`] resolves a (variable, year) selection through the
//! [`Manifest`], fetches and decodes the raster, seeds a display range from
//! the dataset's statistics and keeps a [`MapSurface`] showing exactly one
//! pixel evaluator and a matching legend.
//!
//! ```text
//! select(key) ──► Manifest::lookup ──► RasterFetcher::fetch ──► decode
//!                                                                 │
//!                    MapSurface ◄── PixelEvaluator + Legend ◄─────┘
//!
//! hover(lat, lng) ──► HoverGuard ──► resolve + fetch_region ──► text
//! ```

pub mod config;
pub mod error;
pub mod fetch;
pub mod hover;
pub mod manager;
pub mod manifest;
pub mod metrics;
pub mod surface;

pub use config::OverlayConfig;
pub use error::{OverlayError, Result};
pub use fetch::{AutoFetcher, FileFetcher, HttpFetcher, RasterFetcher};
pub use hover::{HoverGuard, HoverPermit};
pub use manager::{
    HoverOutcome, LoadFailure, LoadOutcome, LoadStatus, LoadTicket, OverlayManager, OverlayStatus,
    RangeEdit,
};
pub use manifest::{resolve_url, DatasetKey, Manifest, ManifestEntry};
pub use surface::{HeadlessSurface, MapSurface, OverlayLayer};
