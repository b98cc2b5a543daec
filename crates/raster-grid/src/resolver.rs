//! Geographic coordinate to raster cell resolution.
//!
//! Point sampling only: a coordinate maps to the cell that encloses it.
//! Rows grow southward from the north-most origin row.

use serde::Serialize;

use crate::dataset::RasterDataset;
use crate::error::Result;

/// Where a coordinate lands on a raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CellLocation {
    Cell { row: usize, col: usize },
    OutOfBounds,
}

impl CellLocation {
    pub fn is_in_bounds(&self) -> bool {
        matches!(self, Self::Cell { .. })
    }
}

/// Outcome of a point query against the active raster.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum PixelQueryResult {
    Value { value: f32, row: usize, col: usize },
    NoData { row: usize, col: usize },
    OutsideGrid,
}

/// Map `(lat, lng)` to the enclosing cell.
///
/// Never fails: pointer positions routinely fall off the grid, and
/// non-finite coordinates are simply out of bounds.
pub fn resolve(dataset: &RasterDataset, lat: f64, lng: f64) -> CellLocation {
    let col = ((lng - dataset.origin_x()) / dataset.cell_width()).floor();
    let row = ((dataset.origin_y() - lat) / dataset.cell_height()).floor();

    // NaN fails every comparison, so it lands here too.
    let in_bounds = col >= 0.0
        && row >= 0.0
        && col < dataset.width() as f64
        && row < dataset.height() as f64;
    if !in_bounds {
        return CellLocation::OutOfBounds;
    }

    CellLocation::Cell {
        row: row as usize,
        col: col as usize,
    }
}

/// Geographic centre `(lat, lng)` of a cell, or `None` outside the grid.
pub fn cell_center(dataset: &RasterDataset, row: usize, col: usize) -> Option<(f64, f64)> {
    if row >= dataset.height() || col >= dataset.width() {
        return None;
    }
    let lng = dataset.origin_x() + (col as f64 + 0.5) * dataset.cell_width();
    let lat = dataset.origin_y() - (row as f64 + 0.5) * dataset.cell_height();
    Some((lat, lng))
}

/// Resolve a coordinate and read the raw value beneath it.
///
/// Goes through the region accessor so lazily decoded rasters only touch
/// the tile that holds the cell.
pub async fn query(dataset: &RasterDataset, lat: f64, lng: f64) -> Result<PixelQueryResult> {
    let (row, col) = match resolve(dataset, lat, lng) {
        CellLocation::Cell { row, col } => (row, col),
        CellLocation::OutOfBounds => return Ok(PixelQueryResult::OutsideGrid),
    };

    let region = dataset.fetch_region(row, col, 1, 1).await?;
    match region.get(0, 0) {
        Some(value) if !value.is_nan() => Ok(PixelQueryResult::Value { value, row, col }),
        _ => Ok(PixelQueryResult::NoData { row, col }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{GeoTransform, Grid};

    fn two_by_two() -> RasterDataset {
        let grid = Grid::new(2, 2, vec![1.0, 2.0, 3.0, f32::NAN]).unwrap();
        RasterDataset::materialized(grid, GeoTransform::new(-10.0, 10.0, 5.0, 5.0)).unwrap()
    }

    #[test]
    fn test_resolve_top_left() {
        let ds = two_by_two();
        assert_eq!(resolve(&ds, 8.0, -9.0), CellLocation::Cell { row: 0, col: 0 });
    }

    #[test]
    fn test_resolve_second_column() {
        let ds = two_by_two();
        assert_eq!(resolve(&ds, 8.0, -1.0), CellLocation::Cell { row: 0, col: 1 });
    }

    #[test]
    fn test_resolve_south_of_grid() {
        let ds = two_by_two();
        assert_eq!(resolve(&ds, -1.0, 0.0), CellLocation::OutOfBounds);
    }

    #[test]
    fn test_resolve_origin_corner_is_inside() {
        let ds = two_by_two();
        assert_eq!(resolve(&ds, 10.0, -10.0), CellLocation::Cell { row: 0, col: 0 });
    }

    #[test]
    fn test_resolve_far_edges_are_outside() {
        let ds = two_by_two();
        // East edge at lng 0, south edge at lat 0
        assert_eq!(resolve(&ds, 5.0, 0.0), CellLocation::OutOfBounds);
        assert_eq!(resolve(&ds, 0.0, -5.0), CellLocation::OutOfBounds);
        assert_eq!(resolve(&ds, 0.5, -0.5), CellLocation::Cell { row: 1, col: 1 });
    }

    #[test]
    fn test_resolve_non_finite() {
        let ds = two_by_two();
        assert_eq!(resolve(&ds, f64::NAN, -5.0), CellLocation::OutOfBounds);
        assert_eq!(resolve(&ds, 5.0, f64::INFINITY), CellLocation::OutOfBounds);
        assert!(!resolve(&ds, f64::NEG_INFINITY, -5.0).is_in_bounds());
    }

    #[test]
    fn test_cell_center() {
        let ds = two_by_two();
        assert_eq!(cell_center(&ds, 0, 0), Some((7.5, -7.5)));
        assert_eq!(cell_center(&ds, 1, 1), Some((2.5, -2.5)));
        assert_eq!(cell_center(&ds, 2, 0), None);
    }

    #[test]
    fn test_cell_center_resolves_back() {
        let ds = two_by_two();
        for row in 0..2 {
            for col in 0..2 {
                let (lat, lng) = cell_center(&ds, row, col).unwrap();
                assert_eq!(resolve(&ds, lat, lng), CellLocation::Cell { row, col });
            }
        }
    }

    #[tokio::test]
    async fn test_query() {
        let ds = two_by_two();
        assert_eq!(
            query(&ds, 8.0, -1.0).await.unwrap(),
            PixelQueryResult::Value {
                value: 2.0,
                row: 0,
                col: 1
            }
        );
        assert_eq!(
            query(&ds, 2.0, -2.0).await.unwrap(),
            PixelQueryResult::NoData { row: 1, col: 1 }
        );
        assert_eq!(
            query(&ds, 20.0, 0.0).await.unwrap(),
            PixelQueryResult::OutsideGrid
        );
    }
}
