//! A [`MapSurface`] that records every call for assertions.

use overlay_core::{DatasetKey, LoadFailure, MapSurface, OverlayLayer};
use renderer::Legend;

/// One call made on the surface.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    Installed { key: DatasetKey, version: u64 },
    Removed,
    LegendShown { min_label: String, max_label: String },
    LegendHidden,
    Failure(LoadFailure),
}

/// Records install/remove/legend calls and tracks how many evaluators are
/// registered at once.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    events: Vec<SurfaceEvent>,
    installed: usize,
    max_installed: usize,
    layer: Option<OverlayLayer>,
    legend: Option<Legend>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[SurfaceEvent] {
        &self.events
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Evaluators currently registered.
    pub fn installed(&self) -> usize {
        self.installed
    }

    /// Highest number of evaluators ever registered at the same time.
    pub fn max_installed(&self) -> usize {
        self.max_installed
    }

    pub fn layer(&self) -> Option<&OverlayLayer> {
        self.layer.as_ref()
    }

    pub fn legend(&self) -> Option<&Legend> {
        self.legend.as_ref()
    }

    /// Evaluator versions in install order.
    pub fn installed_versions(&self) -> Vec<u64> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SurfaceEvent::Installed { version, .. } => Some(*version),
                _ => None,
            })
            .collect()
    }

    pub fn failures(&self) -> Vec<&LoadFailure> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SurfaceEvent::Failure(failure) => Some(failure),
                _ => None,
            })
            .collect()
    }
}

impl MapSurface for RecordingSurface {
    fn install_overlay(&mut self, layer: OverlayLayer) {
        self.installed += 1;
        self.max_installed = self.max_installed.max(self.installed);
        self.events.push(SurfaceEvent::Installed {
            key: layer.key.clone(),
            version: layer.evaluator.version(),
        });
        self.layer = Some(layer);
    }

    fn remove_overlay(&mut self) {
        self.installed = self.installed.saturating_sub(1);
        self.layer = None;
        self.events.push(SurfaceEvent::Removed);
    }

    fn show_legend(&mut self, legend: &Legend) {
        self.events.push(SurfaceEvent::LegendShown {
            min_label: legend.min_label.clone(),
            max_label: legend.max_label.clone(),
        });
        self.legend = Some(legend.clone());
    }

    fn hide_legend(&mut self) {
        self.legend = None;
        self.events.push(SurfaceEvent::LegendHidden);
    }

    fn report_failure(&mut self, failure: &LoadFailure) {
        self.events.push(SurfaceEvent::Failure(failure.clone()));
    }
}
