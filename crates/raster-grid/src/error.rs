//! Error types for raster decoding and access.

use thiserror::Error;

/// Errors that can occur while decoding or reading a raster.
#[derive(Error, Debug)]
pub enum RasterError {
    /// The bytes are not a raster this crate can decode.
    #[error("failed to decode raster: {0}")]
    Decode(String),

    /// The raster uses a sample type with no scalar interpretation.
    #[error("unsupported sample format: {0}")]
    UnsupportedSampleFormat(String),

    /// A region request reaches outside the grid.
    #[error("region at row {row}, col {col} ({width}x{height}) is outside the {grid_width}x{grid_height} grid")]
    RegionOutOfBounds {
        row: usize,
        col: usize,
        width: usize,
        height: usize,
        grid_width: usize,
        grid_height: usize,
    },

    /// Reading a lazily decoded region failed.
    #[error("failed to fetch raster region: {0}")]
    Fetch(String),

    /// Embedded metadata is present but unusable.
    #[error("invalid raster metadata: {0}")]
    InvalidMetadata(String),
}

impl RasterError {
    /// Create a Decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a Fetch error.
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Create an InvalidMetadata error.
    pub fn invalid_metadata(msg: impl Into<String>) -> Self {
        Self::InvalidMetadata(msg.into())
    }

    /// Create a RegionOutOfBounds error.
    pub fn region_out_of_bounds(
        row: usize,
        col: usize,
        width: usize,
        height: usize,
        grid: (usize, usize),
    ) -> Self {
        Self::RegionOutOfBounds {
            row,
            col,
            width,
            height,
            grid_width: grid.0,
            grid_height: grid.1,
        }
    }
}

impl From<tiff::TiffError> for RasterError {
    fn from(err: tiff::TiffError) -> Self {
        match err {
            tiff::TiffError::UnsupportedError(e) => Self::UnsupportedSampleFormat(e.to_string()),
            other => Self::Decode(other.to_string()),
        }
    }
}

/// Result type for raster operations.
pub type Result<T> = std::result::Result<T, RasterError>;
