//! Core value types for raster access.

use serde::{Deserialize, Serialize};

/// Value bounds reported by a dataset's own metadata.
///
/// These may differ from the extrema actually present in the cells; they
/// seed the initial display range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueStats {
    pub min: f64,
    pub max: f64,
}

impl ValueStats {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// True when `min < max` and both are finite.
    pub fn has_variation(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min < self.max
    }
}

/// A rectangular block of cell values.
#[derive(Debug, Clone, PartialEq)]
pub struct GridRegion {
    /// Row of the block's top-left cell in the full grid.
    pub row: usize,
    /// Column of the block's top-left cell in the full grid.
    pub col: usize,
    /// Width of the block in cells.
    pub width: usize,
    /// Height of the block in cells.
    pub height: usize,
    /// Values in row-major order, top-to-bottom. No-data cells are NaN.
    pub values: Vec<f32>,
}

impl GridRegion {
    /// Create a new grid region.
    pub fn new(row: usize, col: usize, width: usize, height: usize, values: Vec<f32>) -> Self {
        Self {
            row,
            col,
            width,
            height,
            values,
        }
    }

    /// Get a value by position relative to the block's top-left cell.
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.values.get(row * self.width + col).copied()
    }

    /// Get the total number of cells.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the region is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Statistics about the tile cache of a lazy raster.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub memory_bytes: u64,
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 - 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_region_get() {
        let values: Vec<f32> = (0..6).map(|i| i as f32).collect();
        let region = GridRegion::new(4, 7, 3, 2, values);

        assert_eq!(region.get(0, 0), Some(0.0));
        assert_eq!(region.get(1, 2), Some(5.0));
        assert_eq!(region.get(0, 3), None);
        assert_eq!(region.get(2, 0), None);
        assert_eq!(region.len(), 6);
    }

    #[test]
    fn test_value_stats_variation() {
        assert!(ValueStats::new(0.0, 1.0).has_variation());
        assert!(!ValueStats::new(1.0, 1.0).has_variation());
        assert!(!ValueStats::new(2.0, 1.0).has_variation());
        assert!(!ValueStats::new(f64::NAN, 1.0).has_variation());
    }

    #[test]
    fn test_cache_stats_hit_rate() {
        let mut stats = CacheStats::default();
        assert!((stats.hit_rate() - 0.0).abs() < f64::EPSILON);

        stats.hits = 80;
        stats.misses = 20;
        assert!((stats.hit_rate() - 0.8).abs() < f64::EPSILON);
    }
}
