//! Error types for the color pipeline.

use raster_grid::RasterError;
use thiserror::Error;

/// A colormap name that is not in the registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColormapError {
    #[error("unknown colormap '{name}' (available: {available})")]
    Unknown { name: String, available: String },
}

/// A display-range edit or initialization that would break `min < max`.
///
/// Always recovered locally: the controller keeps its previous range.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum RangeError {
    /// Dataset statistics with no variation (`min >= max` or non-finite).
    #[error("degenerate range: min {min} is not below max {max}")]
    Degenerate { min: f64, max: f64 },

    /// An edit that would leave `min >= max`.
    #[error("rejected range edit: min {min} would not be below max {max}")]
    Rejected { min: f64, max: f64 },

    /// NaN or infinite input.
    #[error("range bound must be finite, got {0}")]
    NonFinite(f64),

    /// Out-of-statistics value under the clamp-to-stats policy.
    #[error("{value} is outside the dataset range [{stats_min}, {stats_max}]")]
    OutsideStats {
        value: f64,
        stats_min: f64,
        stats_max: f64,
    },
}

/// PNG encoding failures.
#[derive(Error, Debug)]
pub enum PngError {
    #[error("pixel buffer holds {actual} bytes, expected {expected} for {width}x{height}")]
    BufferSize {
        width: usize,
        height: usize,
        expected: usize,
        actual: usize,
    },

    #[error("image dimensions must be positive, got {0}x{1}")]
    EmptyImage(usize, usize),

    #[error("IDAT compression failed: {0}")]
    Compression(#[from] std::io::Error),
}

/// Errors surfaced by rendering entry points.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Colormap(#[from] ColormapError),

    #[error(transparent)]
    Range(#[from] RangeError),

    #[error(transparent)]
    Png(#[from] PngError),

    #[error("failed to read raster values: {0}")]
    Raster(#[from] RasterError),
}

/// Result type for rendering operations.
pub type Result<T> = std::result::Result<T, RenderError>;
