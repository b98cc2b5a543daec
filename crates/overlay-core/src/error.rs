//! Error types for overlay orchestration.

use raster_grid::RasterError;
use renderer::ColormapError;
use thiserror::Error;

use crate::manifest::DatasetKey;

/// Errors surfaced by the overlay manager and its collaborators.
#[derive(Error, Debug)]
pub enum OverlayError {
    /// The manifest has no entry for the requested key. Terminal for that key.
    #[error("no dataset for variable '{variable}' in year '{year}'")]
    ManifestMiss { variable: String, year: String },

    /// Fetching raster or manifest bytes failed.
    #[error("failed to fetch {location}: {message}")]
    Fetch { location: String, message: String },

    /// The fetched bytes are not a usable raster.
    #[error(transparent)]
    Decode(#[from] RasterError),

    #[error(transparent)]
    Colormap(#[from] ColormapError),

    /// The manifest document is malformed.
    #[error("invalid manifest: {0}")]
    Manifest(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl OverlayError {
    /// Create a ManifestMiss error for a key.
    pub fn manifest_miss(key: &DatasetKey) -> Self {
        Self::ManifestMiss {
            variable: key.variable.clone(),
            year: key.year.clone(),
        }
    }

    /// Create a Fetch error.
    pub fn fetch(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Create a Manifest error.
    pub fn manifest(msg: impl Into<String>) -> Self {
        Self::Manifest(msg.into())
    }

    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the caller may reasonably offer a retry.
    ///
    /// Only transient fetch failures qualify; nothing is retried automatically.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Fetch { .. })
    }

    /// Short machine-readable kind, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ManifestMiss { .. } => "manifest_miss",
            Self::Fetch { .. } => "fetch",
            Self::Decode(_) => "decode",
            Self::Colormap(_) => "colormap",
            Self::Manifest(_) => "manifest",
            Self::Config(_) => "config",
        }
    }
}

/// Result type for overlay operations.
pub type Result<T> = std::result::Result<T, OverlayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_fetch_is_retryable() {
        assert!(OverlayError::fetch("a.tif", "timed out").is_retryable());
        assert!(!OverlayError::manifest_miss(&DatasetKey::new("NH3", "2019")).is_retryable());
        assert!(!OverlayError::Decode(RasterError::decode("bad")).is_retryable());
    }

    #[test]
    fn test_messages() {
        let err = OverlayError::manifest_miss(&DatasetKey::new("NH3", "1990"));
        assert_eq!(err.to_string(), "no dataset for variable 'NH3' in year '1990'");
        assert_eq!(err.kind(), "manifest_miss");
    }
}
