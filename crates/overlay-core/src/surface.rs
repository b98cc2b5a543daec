//! The map collaborator that displays overlays and legends.

use std::sync::Arc;

use overlay_common::BoundingBox;
use raster_grid::RasterDataset;
use renderer::{Legend, PixelEvaluator};

use crate::manager::LoadFailure;
use crate::manifest::DatasetKey;

/// Everything the map needs to draw one raster overlay.
#[derive(Debug, Clone)]
pub struct OverlayLayer {
    pub key: DatasetKey,
    pub dataset: Arc<RasterDataset>,
    /// Geographic placement of the image.
    pub bounds: BoundingBox,
    /// Pixel hook; replaced, never mutated, when the range or colormap changes.
    pub evaluator: PixelEvaluator,
}

/// Map-side operations driven by the overlay manager.
///
/// The manager calls `remove_overlay` before every `install_overlay` that
/// replaces a visible layer, so at most one evaluator is registered at a time.
pub trait MapSurface {
    fn install_overlay(&mut self, layer: OverlayLayer);

    fn remove_overlay(&mut self);

    fn show_legend(&mut self, legend: &Legend);

    fn hide_legend(&mut self);

    /// A load ended without an overlay; `failure` is suitable for display.
    fn report_failure(&mut self, failure: &LoadFailure);
}

/// A surface that keeps only the current layer and legend.
///
/// Used for offline rendering, where the installed layer is rasterized
/// after loading instead of being drawn by a map.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    layer: Option<OverlayLayer>,
    legend: Option<Legend>,
    failure: Option<LoadFailure>,
}

impl HeadlessSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layer(&self) -> Option<&OverlayLayer> {
        self.layer.as_ref()
    }

    pub fn legend(&self) -> Option<&Legend> {
        self.legend.as_ref()
    }

    pub fn failure(&self) -> Option<&LoadFailure> {
        self.failure.as_ref()
    }
}

impl MapSurface for HeadlessSurface {
    fn install_overlay(&mut self, layer: OverlayLayer) {
        self.failure = None;
        self.layer = Some(layer);
    }

    fn remove_overlay(&mut self) {
        self.layer = None;
    }

    fn show_legend(&mut self, legend: &Legend) {
        self.legend = Some(legend.clone());
    }

    fn hide_legend(&mut self) {
        self.legend = None;
    }

    fn report_failure(&mut self, failure: &LoadFailure) {
        self.failure = Some(failure.clone());
    }
}
