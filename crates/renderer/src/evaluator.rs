//! Pixel evaluation hook for the map's overlay renderer.
//!
//! A [`PixelEvaluator`] captures one range snapshot and one colormap. It is
//! never edited: a range or colormap change produces a new evaluator with
//! the next version number, and the map surface swaps it in.

use overlay_common::Color;
use raster_grid::RasterDataset;
use rayon::prelude::*;
use tracing::debug;

use crate::colormap::Colormap;
use crate::error::Result;
use crate::range::{Normalized, RangeSnapshot};

/// Minimum cells before rasterization fans out across threads.
const PARALLEL_THRESHOLD: usize = 4096;

/// Pure `raw values -> color | none` function for one (range, colormap) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelEvaluator {
    version: u64,
    range: RangeSnapshot,
    colormap: &'static Colormap,
}

impl PixelEvaluator {
    pub fn new(version: u64, range: RangeSnapshot, colormap: &'static Colormap) -> Self {
        Self {
            version,
            range,
            colormap,
        }
    }

    /// Monotonic issue number; a newer evaluator always has a larger one.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn range(&self) -> RangeSnapshot {
        self.range
    }

    pub fn colormap(&self) -> &'static Colormap {
        self.colormap
    }

    /// Evaluate the raw band values under one pixel. Only the first band is
    /// colored; empty input and no-data give `None`.
    pub fn evaluate(&self, raw: &[f32]) -> Option<Color> {
        raw.first().and_then(|&v| self.color_for(v))
    }

    /// Color for a single raw value.
    pub fn color_for(&self, value: f32) -> Option<Color> {
        match self.range.normalize(value as f64) {
            Normalized::Mapped(t) => Some(self.colormap.color_at(t)),
            Normalized::Unmapped => None,
        }
    }
}

/// Rasterize a whole dataset at native resolution into RGBA bytes.
///
/// No-data cells are fully transparent. Lazily decoded datasets are read
/// through the region accessor.
pub async fn render_rgba(dataset: &RasterDataset, evaluator: &PixelEvaluator) -> Result<Vec<u8>> {
    let (width, height) = (dataset.width(), dataset.height());
    let region = dataset.fetch_region(0, 0, width, height).await?;

    let mut pixels = vec![0u8; width * height * 4];
    let paint = |(pixel, &value): (&mut [u8], &f32)| {
        let color = evaluator.color_for(value).unwrap_or(Color::transparent());
        pixel.copy_from_slice(&color.to_array());
    };

    if region.values.len() >= PARALLEL_THRESHOLD {
        pixels
            .par_chunks_mut(4)
            .zip(region.values.par_iter())
            .for_each(paint);
    } else {
        pixels.chunks_mut(4).zip(region.values.iter()).for_each(paint);
    }

    debug!(
        width,
        height,
        version = evaluator.version(),
        colormap = evaluator.colormap().name(),
        "Rasterized overlay"
    );
    Ok(pixels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colormap::colormap;
    use crate::range::{DisplayRangeController, RangePolicy};
    use raster_grid::{GeoTransform, Grid};

    fn evaluator() -> PixelEvaluator {
        let controller = DisplayRangeController::initialize(0.0, 10.0, RangePolicy::Unclamped).unwrap();
        PixelEvaluator::new(1, controller.snapshot(), colormap("greys").unwrap())
    }

    #[test]
    fn test_evaluate_first_band() {
        let e = evaluator();
        assert_eq!(e.evaluate(&[0.0, 10.0]), Some(Color::rgb(255, 255, 255)));
        assert_eq!(e.evaluate(&[10.0]), Some(Color::rgb(0, 0, 0)));
    }

    #[test]
    fn test_evaluate_no_data() {
        let e = evaluator();
        assert_eq!(e.evaluate(&[]), None);
        assert_eq!(e.evaluate(&[f32::NAN]), None);
    }

    #[test]
    fn test_evaluate_clamps_outliers() {
        let e = evaluator();
        assert_eq!(e.evaluate(&[-5.0]), e.evaluate(&[0.0]));
        assert_eq!(e.evaluate(&[1e9]), e.evaluate(&[10.0]));
    }

    #[tokio::test]
    async fn test_render_rgba() {
        let grid = Grid::new(2, 1, vec![5.0, f32::NAN]).unwrap();
        let ds = RasterDataset::materialized(grid, GeoTransform::new(0.0, 1.0, 1.0, 1.0)).unwrap();
        let pixels = render_rgba(&ds, &evaluator()).await.unwrap();
        assert_eq!(pixels, vec![128, 128, 128, 255, 0, 0, 0, 0]);
    }
}
