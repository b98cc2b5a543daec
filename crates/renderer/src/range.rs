//! User-adjustable display range.
//!
//! The controller owns the `(min, max)` window used to normalize raw cell
//! values before color lookup. Every mutation either keeps `min < max` or
//! is rejected and leaves the previous state in place.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RangeError;

/// Whether explicit range edits may leave the dataset's reported bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RangePolicy {
    /// Any finite value is accepted as long as `min < max` holds.
    #[default]
    Unclamped,
    /// Values outside `[stats_min, stats_max]` are rejected.
    ClampToStats,
}

impl FromStr for RangePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unclamped" => Ok(Self::Unclamped),
            "clamp_to_stats" | "clamp-to-stats" | "clamp" => Ok(Self::ClampToStats),
            other => Err(format!("unknown range policy: {}", other)),
        }
    }
}

impl fmt::Display for RangePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unclamped => write!(f, "unclamped"),
            Self::ClampToStats => write!(f, "clamp_to_stats"),
        }
    }
}

/// A finite `(min, max)` pair with `min < max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DisplayRange {
    min: f64,
    max: f64,
}

impl DisplayRange {
    pub fn new(min: f64, max: f64) -> Result<Self, RangeError> {
        if !min.is_finite() {
            return Err(RangeError::NonFinite(min));
        }
        if !max.is_finite() {
            return Err(RangeError::NonFinite(max));
        }
        if min >= max {
            return Err(RangeError::Degenerate { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// Result of normalizing a raw value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Normalized {
    /// Position in `[0, 1]`.
    Mapped(f64),
    /// No data: render transparent.
    Unmapped,
}

impl Normalized {
    pub fn value(self) -> Option<f64> {
        match self {
            Self::Mapped(t) => Some(t),
            Self::Unmapped => None,
        }
    }
}

/// Immutable copy of a controller's normalization state.
///
/// Captured into each pixel evaluator so later edits never reach an
/// evaluator that is already installed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RangeSnapshot {
    min: f64,
    max: f64,
}

impl RangeSnapshot {
    /// The range, or `None` for a flat dataset.
    pub fn range(&self) -> Option<DisplayRange> {
        DisplayRange::new(self.min, self.max).ok()
    }

    pub fn is_flat(&self) -> bool {
        !(self.min < self.max)
    }

    /// `clamp((value - min) / (max - min), 0, 1)`; NaN is [`Normalized::Unmapped`].
    ///
    /// Flat snapshots map every valid value to 0.
    pub fn normalize(&self, value: f64) -> Normalized {
        if value.is_nan() {
            return Normalized::Unmapped;
        }
        if self.is_flat() {
            return Normalized::Mapped(0.0);
        }
        let mut t = (value - self.min) / (self.max - self.min);
        // A span wider than f64::MAX overflows to infinity; halve and retry.
        if !(self.max - self.min).is_finite() {
            t = (value / 2.0 - self.min / 2.0) / (self.max / 2.0 - self.min / 2.0);
        }
        if t.is_nan() {
            return Normalized::Unmapped;
        }
        Normalized::Mapped(t.clamp(0.0, 1.0))
    }
}

/// Owns the current display range for one dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayRangeController {
    stats_min: f64,
    stats_max: f64,
    min: f64,
    max: f64,
    policy: RangePolicy,
}

impl DisplayRangeController {
    /// Start from the dataset's reported bounds.
    ///
    /// Fails with [`RangeError::Degenerate`] when the bounds have no
    /// variation; use [`DisplayRangeController::flat`] for such datasets.
    pub fn initialize(stats_min: f64, stats_max: f64, policy: RangePolicy) -> Result<Self, RangeError> {
        if !(stats_min.is_finite() && stats_max.is_finite() && stats_min < stats_max) {
            return Err(RangeError::Degenerate {
                min: stats_min,
                max: stats_max,
            });
        }
        Ok(Self {
            stats_min,
            stats_max,
            min: stats_min,
            max: stats_max,
            policy,
        })
    }

    /// A controller with no variation, pinned at `value`.
    ///
    /// Normalizes every valid value to 0. Under [`RangePolicy::Unclamped`] a
    /// later `set_min` below or `set_max` above `value` establishes a range.
    pub fn flat(value: f64, policy: RangePolicy) -> Self {
        let value = if value.is_finite() { value } else { 0.0 };
        Self {
            stats_min: value,
            stats_max: value,
            min: value,
            max: value,
            policy,
        }
    }

    pub fn policy(&self) -> RangePolicy {
        self.policy
    }

    pub fn stats(&self) -> (f64, f64) {
        (self.stats_min, self.stats_max)
    }

    /// Current bounds, which may be equal for a flat controller.
    pub fn bounds(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    /// The current range, or `None` while the controller is flat.
    pub fn range(&self) -> Option<DisplayRange> {
        DisplayRange::new(self.min, self.max).ok()
    }

    pub fn has_variation(&self) -> bool {
        self.min < self.max
    }

    pub fn set_min(&mut self, value: f64) -> Result<DisplayRange, RangeError> {
        self.check_bound(value)?;
        let range = DisplayRange::new(value, self.max).map_err(|_| RangeError::Rejected {
            min: value,
            max: self.max,
        })?;
        self.apply(range);
        Ok(range)
    }

    pub fn set_max(&mut self, value: f64) -> Result<DisplayRange, RangeError> {
        self.check_bound(value)?;
        let range = DisplayRange::new(self.min, value).map_err(|_| RangeError::Rejected {
            min: self.min,
            max: value,
        })?;
        self.apply(range);
        Ok(range)
    }

    /// Replace both bounds at once.
    pub fn set_range(&mut self, min: f64, max: f64) -> Result<DisplayRange, RangeError> {
        self.check_bound(min)?;
        self.check_bound(max)?;
        let range = DisplayRange::new(min, max).map_err(|_| RangeError::Rejected { min, max })?;
        self.apply(range);
        Ok(range)
    }

    /// Slider to range: set `max` at `fraction` of the way through the
    /// dataset bounds.
    pub fn set_max_from_fraction(&mut self, fraction: f64) -> Result<DisplayRange, RangeError> {
        if !fraction.is_finite() {
            return Err(RangeError::NonFinite(fraction));
        }
        let value = self.stats_min + fraction * (self.stats_max - self.stats_min);
        self.set_max(value)
    }

    /// Range to slider: current `max` as a fraction of the dataset bounds,
    /// clamped to `[0, 1]`. Flat datasets report 0.
    pub fn position_fraction(&self) -> f64 {
        let span = self.stats_max - self.stats_min;
        if !(span > 0.0) {
            return 0.0;
        }
        ((self.max - self.stats_min) / span).clamp(0.0, 1.0)
    }

    /// Restore the dataset bounds.
    pub fn reset(&mut self) {
        self.min = self.stats_min;
        self.max = self.stats_max;
    }

    pub fn normalize(&self, value: f64) -> Normalized {
        self.snapshot().normalize(value)
    }

    pub fn snapshot(&self) -> RangeSnapshot {
        RangeSnapshot {
            min: self.min,
            max: self.max,
        }
    }

    fn check_bound(&self, value: f64) -> Result<(), RangeError> {
        if !value.is_finite() {
            return Err(RangeError::NonFinite(value));
        }
        if self.policy == RangePolicy::ClampToStats
            && (value < self.stats_min || value > self.stats_max)
        {
            return Err(RangeError::OutsideStats {
                value,
                stats_min: self.stats_min,
                stats_max: self.stats_max,
            });
        }
        Ok(())
    }

    fn apply(&mut self, range: DisplayRange) {
        self.min = range.min;
        self.max = range.max;
    }
}
