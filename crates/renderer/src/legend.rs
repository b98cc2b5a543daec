//! Legend rendering from display-range state.

use overlay_common::Color;
use serde::Serialize;

use crate::colormap::{colormap, Colormap};
use crate::error::ColormapError;
use crate::numbers::format_value;
use crate::range::DisplayRangeController;

/// Default number of gradient stops.
pub const DEFAULT_LEGEND_STEPS: usize = 40;

/// A horizontal color-bar legend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub colormap: String,
    /// Colors from the low end (`t = 0`) to the high end (`t = 1`).
    pub gradient_stops: Vec<Color>,
    pub min_label: String,
    pub max_label: String,
    /// The dataset has no variation and renders as a single color.
    pub flat: bool,
}

impl Legend {
    /// CSS `linear-gradient` for a DOM color bar.
    pub fn css_gradient(&self) -> String {
        let stops: Vec<String> = match self.gradient_stops.as_slice() {
            [only] => vec![only.to_css(), only.to_css()],
            stops => stops.iter().map(Color::to_css).collect(),
        };
        format!("linear-gradient(to right, {})", stops.join(", "))
    }
}

/// Build the legend for the controller's current range.
///
/// Stops come from the same [`Colormap::color_at`] used for pixels, so
/// `gradient_stops[i]` equals the pixel color at `t = i / (steps - 1)`.
pub fn render_legend(
    controller: &DisplayRangeController,
    colormap_name: &str,
    steps: usize,
) -> Result<Legend, ColormapError> {
    Ok(build_legend(controller, colormap(colormap_name)?, steps))
}

/// [`render_legend`] for an already resolved colormap.
pub fn build_legend(controller: &DisplayRangeController, map: &Colormap, steps: usize) -> Legend {
    let (min, max) = controller.bounds();
    let flat = !controller.has_variation();
    let gradient_stops = if flat {
        vec![map.color_at(0.0)]
    } else {
        map.sample(steps)
    };

    Legend {
        colormap: map.name().to_string(),
        gradient_stops,
        min_label: format_value(min),
        max_label: format_value(max),
        flat,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::range::RangePolicy;

    #[test]
    fn test_legend_labels_follow_range() {
        let mut c = DisplayRangeController::initialize(0.0, 2500.0, RangePolicy::Unclamped).unwrap();
        let legend = render_legend(&c, "viridis", 40).unwrap();
        assert_eq!(legend.gradient_stops.len(), 40);
        assert_eq!(legend.min_label, "0");
        assert_eq!(legend.max_label, "2,500");
        assert!(!legend.flat);

        c.set_max(0.5).unwrap();
        let legend = render_legend(&c, "viridis", 40).unwrap();
        assert_eq!(legend.max_label, "0.500");
    }

    #[test]
    fn test_flat_legend() {
        let c = DisplayRangeController::flat(7.0, RangePolicy::Unclamped);
        let legend = render_legend(&c, "magma", 40).unwrap();
        assert!(legend.flat);
        assert_eq!(legend.gradient_stops.len(), 1);
        assert_eq!(legend.min_label, legend.max_label);
    }

    #[test]
    fn test_unknown_colormap() {
        let c = DisplayRangeController::initialize(0.0, 1.0, RangePolicy::Unclamped).unwrap();
        assert!(render_legend(&c, "rainbow", 40).is_err());
    }

    #[test]
    fn test_css_gradient() {
        let c = DisplayRangeController::initialize(0.0, 1.0, RangePolicy::Unclamped).unwrap();
        let legend = render_legend(&c, "greys", 2).unwrap();
        assert_eq!(
            legend.css_gradient(),
            "linear-gradient(to right, rgba(255, 255, 255, 1), rgba(0, 0, 0, 1))"
        );
    }
}
