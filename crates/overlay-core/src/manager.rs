//! Overlay lifecycle: load, replace, range editing and hover queries.
//!
//! ```text
//!            begin_load                 complete_load (current generation)
//!   Empty ─────────────► Loading ─────────────────────────────► Ready
//!     ▲                   │  ▲                                   │
//!     │  failure / clear  │  └────────── begin_load ─────────────┘
//!     └───────────────────┴──────────────── clear ───────────────┘
//! ```
//!
//! Every `begin_load` and `clear` bumps a generation counter. A load outcome
//! is only installed when its generation is still the current one, so of
//! several overlapping loads only the most recently issued can ever reach
//! `Ready`, whatever order their fetches finish in.

use std::sync::Arc;
use std::time::Instant;

use raster_grid::{decode, query, PixelQueryResult, RasterConfig, RasterDataset};
use renderer::{
    build_legend, colormap, format_cell, Colormap, DisplayRange, DisplayRangeController, Legend,
    PixelEvaluator, RangeError, NO_DATA,
};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::config::OverlayConfig;
use crate::error::{OverlayError, Result};
use crate::fetch::RasterFetcher;
use crate::hover::HoverGuard;
use crate::manifest::{resolve_url, DatasetKey, Manifest};
use crate::metrics;
use crate::surface::{MapSurface, OverlayLayer};

/// Why the most recent load produced no overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadFailure {
    pub key: DatasetKey,
    /// Short error kind, e.g. `manifest_miss` or `decode`.
    pub kind: &'static str,
    pub message: String,
    /// The caller may offer a retry. Nothing is retried automatically.
    pub retryable: bool,
}

impl LoadFailure {
    fn new(key: DatasetKey, error: &OverlayError) -> Self {
        Self {
            key,
            kind: error.kind(),
            message: error.to_string(),
            retryable: error.is_retryable(),
        }
    }
}

/// Observable manager state, for collaborators.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OverlayStatus {
    Empty {
        last_failure: Option<LoadFailure>,
    },
    Loading {
        key: DatasetKey,
    },
    Ready {
        key: DatasetKey,
        /// `None` for a dataset without variation.
        range: Option<DisplayRange>,
        flat: bool,
        evaluator_version: u64,
    },
}

/// How a finished load was handled.
#[derive(Debug)]
pub enum LoadStatus {
    Installed,
    /// A newer load or a clear was issued first. Not a failure.
    Superseded,
    Failed(OverlayError),
}

impl LoadStatus {
    pub fn is_installed(&self) -> bool {
        matches!(self, Self::Installed)
    }
}

/// Result of a range edit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeEdit {
    Applied(DisplayRange),
    /// The edit was refused; `current` is the unchanged range a control
    /// should snap back to.
    Rejected {
        current: Option<DisplayRange>,
        reason: RangeError,
    },
    /// No dataset is loaded.
    NotReady,
}

/// Result of a hover query.
#[derive(Debug, Clone, PartialEq)]
pub enum HoverOutcome {
    Value {
        value: f32,
        row: usize,
        col: usize,
        text: String,
    },
    /// No dataset, outside the grid, or a no-data cell.
    NoData,
    /// Another hover query was still in flight.
    Dropped,
}

impl HoverOutcome {
    /// Tooltip text, or `None` when the event was dropped and the tooltip
    /// should stay as it is.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Value { text, .. } => Some(text),
            Self::NoData => Some(NO_DATA),
            Self::Dropped => None,
        }
    }
}

/// A load that has been issued but not yet fetched.
///
/// Owns everything the fetch and decode need, so it can be awaited while
/// the manager keeps serving other calls.
pub struct LoadTicket<F: ?Sized> {
    fetcher: Arc<F>,
    raster: RasterConfig,
    key: DatasetKey,
    generation: u64,
    location: String,
    manifest_bounds: (f64, f64),
    started: Instant,
}

impl<F: RasterFetcher + ?Sized> LoadTicket<F> {
    pub fn key(&self) -> &DatasetKey {
        &self.key
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Fetch and decode the raster.
    pub async fn run(self) -> LoadOutcome {
        debug!(key = %self.key, generation = self.generation, location = %self.location, "Fetching raster");
        let result = match self.fetcher.fetch(&self.location).await {
            Ok(bytes) => decode(bytes, &self.raster).map_err(OverlayError::from),
            Err(e) => Err(e),
        };

        LoadOutcome {
            key: self.key,
            generation: self.generation,
            manifest_bounds: self.manifest_bounds,
            started: self.started,
            result,
        }
    }
}

/// A finished fetch and decode, waiting to be installed or discarded.
#[derive(Debug)]
pub struct LoadOutcome {
    key: DatasetKey,
    generation: u64,
    manifest_bounds: (f64, f64),
    started: Instant,
    result: Result<RasterDataset>,
}

impl LoadOutcome {
    pub fn key(&self) -> &DatasetKey {
        &self.key
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

struct ActiveOverlay {
    key: DatasetKey,
    dataset: Arc<RasterDataset>,
    controller: DisplayRangeController,
    evaluator: PixelEvaluator,
}

enum OverlayState {
    Empty,
    Loading { key: DatasetKey, generation: u64 },
    Ready(Box<ActiveOverlay>),
}

/// Owns the active dataset and its display range, and keeps the map
/// surface in step with them.
pub struct OverlayManager<F: ?Sized, S> {
    config: OverlayConfig,
    manifest: Manifest,
    fetcher: Arc<F>,
    surface: S,
    state: OverlayState,
    colormap: &'static Colormap,
    generation: u64,
    evaluator_version: u64,
    hover_guard: HoverGuard,
    last_failure: Option<LoadFailure>,
}

impl<F, S> OverlayManager<F, S>
where
    F: RasterFetcher + ?Sized,
    S: MapSurface,
{
    /// Create a manager in the `Empty` state.
    pub fn new(config: OverlayConfig, manifest: Manifest, fetcher: Arc<F>, surface: S) -> Result<Self> {
        config.validate()?;
        let colormap = colormap(&config.colormap)?;

        Ok(Self {
            config,
            manifest,
            fetcher,
            surface,
            state: OverlayState::Empty,
            colormap,
            generation: 0,
            evaluator_version: 0,
            hover_guard: HoverGuard::new(),
            last_failure: None,
        })
    }

    /// Fetch, decode and install `key` in one step.
    ///
    /// Returns `Err` only for a manifest miss; fetch and decode failures are
    /// reported through [`LoadStatus::Failed`].
    pub async fn load(&mut self, key: DatasetKey) -> Result<LoadStatus> {
        let ticket = self.begin_load(key)?;
        let outcome = ticket.run().await;
        Ok(self.complete_load(outcome))
    }

    /// Issue a load for `key`, superseding any load already in flight.
    ///
    /// The visible overlay and legend are removed immediately. A manifest
    /// miss moves the manager to `Empty` and is not retried.
    pub fn begin_load(&mut self, key: DatasetKey) -> Result<LoadTicket<F>> {
        self.generation += 1;
        self.detach();

        let entry = match self.manifest.lookup(&key) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(key = %key, "No manifest entry");
                metrics::record_load("failed", std::time::Duration::ZERO);
                self.fail(key, &err);
                return Err(err);
            }
        };

        let location = resolve_url(&entry.tif, self.config.base_url.as_deref());
        let manifest_bounds = (entry.min, entry.max);

        info!(
            variable = %key.variable,
            year = %key.year,
            generation = self.generation,
            location = %location,
            "Loading dataset"
        );

        self.last_failure = None;
        self.state = OverlayState::Loading {
            key: key.clone(),
            generation: self.generation,
        };

        Ok(LoadTicket {
            fetcher: Arc::clone(&self.fetcher),
            raster: self.config.raster.clone(),
            key,
            generation: self.generation,
            location,
            manifest_bounds,
            started: Instant::now(),
        })
    }

    /// Install a finished load if it is still the most recent one.
    pub fn complete_load(&mut self, outcome: LoadOutcome) -> LoadStatus {
        let elapsed = outcome.started.elapsed();
        let current = matches!(
            &self.state,
            OverlayState::Loading { generation, .. } if *generation == outcome.generation
        );
        if !current {
            debug!(
                key = %outcome.key,
                generation = outcome.generation,
                current_generation = self.generation,
                "Discarding superseded load"
            );
            metrics::record_load("superseded", elapsed);
            return LoadStatus::Superseded;
        }

        let dataset = match outcome.result {
            Ok(dataset) => dataset,
            Err(err) => {
                warn!(key = %outcome.key, error = %err, kind = err.kind(), "Dataset load failed");
                metrics::record_load("failed", elapsed);
                self.fail(outcome.key, &err);
                return LoadStatus::Failed(err);
            }
        };

        let controller = self.controller_for(&dataset, outcome.manifest_bounds);
        self.install(outcome.key, Arc::new(dataset), controller);
        metrics::record_load("ready", elapsed);
        LoadStatus::Installed
    }

    /// Remove the overlay and discard any load in flight.
    pub fn clear(&mut self) {
        self.generation += 1;
        self.detach();
        self.state = OverlayState::Empty;
        self.last_failure = None;
        info!(generation = self.generation, "Overlay cleared");
    }

    pub fn set_range_min(&mut self, value: f64) -> RangeEdit {
        self.edit_range(|c| c.set_min(value))
    }

    pub fn set_range_max(&mut self, value: f64) -> RangeEdit {
        self.edit_range(|c| c.set_max(value))
    }

    pub fn set_range(&mut self, min: f64, max: f64) -> RangeEdit {
        self.edit_range(|c| c.set_range(min, max))
    }

    /// Slider input: place `max` at `fraction` of the dataset bounds.
    pub fn set_range_fraction(&mut self, fraction: f64) -> RangeEdit {
        self.edit_range(|c| c.set_max_from_fraction(fraction))
    }

    /// Restore the dataset bounds. Returns the restored range, which is
    /// `None` for a flat dataset.
    pub fn reset_range(&mut self) -> Option<DisplayRange> {
        let OverlayState::Ready(active) = &mut self.state else {
            return None;
        };
        active.controller.reset();
        let range = active.controller.range();
        debug!(key = %active.key, "Display range reset");
        self.reissue();
        range
    }

    /// Switch colormaps. Unknown names fail and leave the current one in use.
    pub fn set_colormap(&mut self, name: &str) -> Result<()> {
        let map = colormap(name)?;
        self.colormap = map;
        self.config.colormap = map.name().to_string();
        debug!(colormap = map.name(), "Colormap changed");
        self.reissue();
        Ok(())
    }

    /// Raw value under a map position.
    ///
    /// At most one query runs at a time; a query issued while another is
    /// pending returns [`HoverOutcome::Dropped`] without touching the data.
    pub async fn hover(&self, lat: f64, lng: f64) -> HoverOutcome {
        let Some(_permit) = self.hover_guard.try_acquire() else {
            trace!(lat, lng, "Hover dropped, query in flight");
            metrics::record_hover("dropped");
            return HoverOutcome::Dropped;
        };

        let OverlayState::Ready(active) = &self.state else {
            metrics::record_hover("no_data");
            return HoverOutcome::NoData;
        };
        let dataset = Arc::clone(&active.dataset);

        let outcome = match query(&dataset, lat, lng).await {
            Ok(PixelQueryResult::Value { value, row, col }) => HoverOutcome::Value {
                value,
                row,
                col,
                text: format_cell(value),
            },
            Ok(PixelQueryResult::NoData { .. }) | Ok(PixelQueryResult::OutsideGrid) => {
                HoverOutcome::NoData
            }
            Err(e) => {
                warn!(lat, lng, error = %e, "Hover query failed");
                HoverOutcome::NoData
            }
        };

        trace!(lat, lng, ?outcome, "Hover query");
        metrics::record_hover(match outcome {
            HoverOutcome::Value { .. } => "value",
            _ => "no_data",
        });
        outcome
    }

    /// Tooltip text for a position, or `None` if the event was dropped.
    pub async fn hover_text(&self, lat: f64, lng: f64) -> Option<String> {
        self.hover(lat, lng).await.text().map(str::to_string)
    }

    /// Legend for the current range and colormap; `None` unless `Ready`.
    pub fn legend(&self) -> Option<Legend> {
        match &self.state {
            OverlayState::Ready(active) => Some(build_legend(
                &active.controller,
                self.colormap,
                self.config.legend_steps,
            )),
            _ => None,
        }
    }

    pub fn status(&self) -> OverlayStatus {
        match &self.state {
            OverlayState::Empty => OverlayStatus::Empty {
                last_failure: self.last_failure.clone(),
            },
            OverlayState::Loading { key, .. } => OverlayStatus::Loading { key: key.clone() },
            OverlayState::Ready(active) => OverlayStatus::Ready {
                key: active.key.clone(),
                range: active.controller.range(),
                flat: !active.controller.has_variation(),
                evaluator_version: active.evaluator.version(),
            },
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, OverlayState::Ready(_))
    }

    pub fn active_key(&self) -> Option<&DatasetKey> {
        match &self.state {
            OverlayState::Ready(active) => Some(&active.key),
            _ => None,
        }
    }

    pub fn dataset(&self) -> Option<Arc<RasterDataset>> {
        match &self.state {
            OverlayState::Ready(active) => Some(Arc::clone(&active.dataset)),
            _ => None,
        }
    }

    /// The currently installed pixel hook.
    pub fn evaluator(&self) -> Option<PixelEvaluator> {
        match &self.state {
            OverlayState::Ready(active) => Some(active.evaluator),
            _ => None,
        }
    }

    pub fn controller(&self) -> Option<&DisplayRangeController> {
        match &self.state {
            OverlayState::Ready(active) => Some(&active.controller),
            _ => None,
        }
    }

    pub fn range(&self) -> Option<DisplayRange> {
        self.controller().and_then(DisplayRangeController::range)
    }

    /// Range to slider position, in `[0, 1]`.
    pub fn position_fraction(&self) -> Option<f64> {
        self.controller().map(DisplayRangeController::position_fraction)
    }

    pub fn colormap(&self) -> &'static Colormap {
        self.colormap
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn last_failure(&self) -> Option<&LoadFailure> {
        self.last_failure.as_ref()
    }

    pub fn hover_guard(&self) -> &HoverGuard {
        &self.hover_guard
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Embedded statistics win; the manifest bounds are the fallback.
    fn controller_for(&self, dataset: &RasterDataset, manifest_bounds: (f64, f64)) -> DisplayRangeController {
        let policy = self.config.range_policy;
        let (min, max) = dataset
            .stats()
            .map(|s| (s.min, s.max))
            .unwrap_or(manifest_bounds);

        DisplayRangeController::initialize(min, max, policy).unwrap_or_else(|e| {
            warn!(min, max, error = %e, "Dataset has no variation, rendering flat");
            DisplayRangeController::flat(min, policy)
        })
    }

    fn install(&mut self, key: DatasetKey, dataset: Arc<RasterDataset>, controller: DisplayRangeController) {
        self.detach();
        self.evaluator_version += 1;
        let evaluator = PixelEvaluator::new(self.evaluator_version, controller.snapshot(), self.colormap);
        let legend = build_legend(&controller, self.colormap, self.config.legend_steps);

        self.surface.install_overlay(OverlayLayer {
            key: key.clone(),
            bounds: dataset.bounds(),
            dataset: Arc::clone(&dataset),
            evaluator,
        });
        self.surface.show_legend(&legend);

        info!(
            variable = %key.variable,
            year = %key.year,
            generation = self.generation,
            flat = !controller.has_variation(),
            lazy = dataset.is_lazy(),
            "Overlay installed"
        );

        self.state = OverlayState::Ready(Box::new(ActiveOverlay {
            key,
            dataset,
            controller,
            evaluator,
        }));
    }

    /// Replace the installed evaluator and legend after a range or colormap
    /// change. Runs before the edit returns, so the surface never shows a
    /// range other than the controller's.
    fn reissue(&mut self) {
        let OverlayState::Ready(active) = &mut self.state else {
            return;
        };

        self.evaluator_version += 1;
        active.evaluator = PixelEvaluator::new(
            self.evaluator_version,
            active.controller.snapshot(),
            self.colormap,
        );
        let legend = build_legend(&active.controller, self.colormap, self.config.legend_steps);

        self.surface.remove_overlay();
        self.surface.install_overlay(OverlayLayer {
            key: active.key.clone(),
            bounds: active.dataset.bounds(),
            dataset: Arc::clone(&active.dataset),
            evaluator: active.evaluator,
        });
        self.surface.show_legend(&legend);
    }

    fn edit_range<E>(&mut self, edit: E) -> RangeEdit
    where
        E: FnOnce(&mut DisplayRangeController) -> std::result::Result<DisplayRange, RangeError>,
    {
        let OverlayState::Ready(active) = &mut self.state else {
            return RangeEdit::NotReady;
        };

        match edit(&mut active.controller) {
            Ok(range) => {
                debug!(min = range.min(), max = range.max(), "Display range applied");
                metrics::record_range_edit("applied");
                self.reissue();
                RangeEdit::Applied(range)
            }
            Err(reason) => {
                debug!(error = %reason, "Display range edit rejected");
                metrics::record_range_edit("rejected");
                RangeEdit::Rejected {
                    current: active.controller.range(),
                    reason,
                }
            }
        }
    }

    /// Take down the visible overlay and legend, if any.
    fn detach(&mut self) {
        if matches!(self.state, OverlayState::Ready(_)) {
            self.surface.remove_overlay();
            self.surface.hide_legend();
            self.state = OverlayState::Empty;
        }
    }

    fn fail(&mut self, key: DatasetKey, error: &OverlayError) {
        let failure = LoadFailure::new(key, error);
        self.surface.report_failure(&failure);
        self.state = OverlayState::Empty;
        self.last_failure = Some(failure);
    }
}
