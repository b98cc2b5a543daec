//! Configuration for the overlay manager.

use raster_grid::RasterConfig;
use renderer::{colormap, RangePolicy, DEFAULT_COLORMAP, DEFAULT_LEGEND_STEPS};
use serde::{Deserialize, Serialize};

use crate::error::{OverlayError, Result};

/// Configuration for loading and presenting overlays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Colormap applied to newly loaded datasets.
    pub colormap: String,

    /// Number of gradient stops in the legend (at least 2).
    pub legend_steps: usize,

    /// Whether explicit range edits may leave the dataset's reported bounds.
    pub range_policy: RangePolicy,

    /// Timeout for raster and manifest fetches, in seconds.
    pub fetch_timeout_secs: u64,

    /// Prefix for relative `tif` paths in the manifest.
    pub base_url: Option<String>,

    /// Decoding settings.
    pub raster: RasterConfig,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            colormap: DEFAULT_COLORMAP.to_string(),
            legend_steps: DEFAULT_LEGEND_STEPS,
            range_policy: RangePolicy::Unclamped,
            fetch_timeout_secs: 30,
            base_url: None,
            raster: RasterConfig::default(),
        }
    }
}

impl OverlayConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self {
            raster: RasterConfig::from_env(),
            ..Self::default()
        };

        if let Ok(val) = std::env::var("OVERLAY_COLORMAP") {
            if !val.trim().is_empty() {
                config.colormap = val.trim().to_string();
            }
        }

        if let Ok(val) = std::env::var("OVERLAY_LEGEND_STEPS") {
            if let Ok(steps) = val.parse() {
                config.legend_steps = steps;
            }
        }

        if let Ok(val) = std::env::var("OVERLAY_RANGE_POLICY") {
            if let Ok(policy) = val.parse() {
                config.range_policy = policy;
            }
        }

        if let Ok(val) = std::env::var("OVERLAY_FETCH_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                config.fetch_timeout_secs = secs;
            }
        }

        if let Ok(val) = std::env::var("OVERLAY_BASE_URL") {
            if !val.trim().is_empty() {
                config.base_url = Some(val.trim().to_string());
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        colormap(&self.colormap)?;

        if self.legend_steps < 2 {
            return Err(OverlayError::config("legend_steps must be >= 2"));
        }

        if self.fetch_timeout_secs == 0 {
            return Err(OverlayError::config("fetch_timeout_secs must be > 0"));
        }

        self.raster.validate().map_err(OverlayError::config)?;

        Ok(())
    }
}
