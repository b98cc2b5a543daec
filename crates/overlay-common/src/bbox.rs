//! Geographic extent of a raster overlay.

use serde::{Deserialize, Serialize};

/// A geographic bounding box.
///
/// Coordinates are in degrees (x = longitude, y = latitude). The top-left
/// corner of a north-up raster is `(min_x, max_y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Build the extent of a north-up grid from its top-left origin and cell size.
    pub fn from_origin(
        origin_x: f64,
        origin_y: f64,
        cell_width: f64,
        cell_height: f64,
        width: usize,
        height: usize,
    ) -> Self {
        Self {
            min_x: origin_x,
            min_y: origin_y - cell_height * height as f64,
            max_x: origin_x + cell_width * width as f64,
            max_y: origin_y,
        }
    }

    /// Width of the bounding box in degrees.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in degrees.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}
