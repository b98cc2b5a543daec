//! Color pipeline for raster overlays.
//!
//! Turns raw cell values into colors and describes the mapping for a legend:
//! - colormap registry and the shared `t -> color` function
//! - display range controller (user-adjustable normalization window)
//! - pixel evaluator (versioned, immutable evaluation hook)
//! - legend rendering with magnitude-adaptive labels
//! - PNG encoding for rasterized overlays

pub mod colormap;
pub mod error;
pub mod evaluator;
pub mod legend;
pub mod numbers;
pub mod png;
pub mod range;

pub use colormap::{available, color_at, colormap, Colormap, DEFAULT_COLORMAP};
pub use error::{ColormapError, PngError, RangeError, RenderError, Result};
pub use evaluator::{render_rgba, PixelEvaluator};
pub use legend::{build_legend, render_legend, Legend, DEFAULT_LEGEND_STEPS};
pub use numbers::{format_cell, format_value, NO_DATA};
pub use range::{DisplayRange, DisplayRangeController, Normalized, RangePolicy, RangeSnapshot};
