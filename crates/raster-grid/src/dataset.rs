//! Decoded raster grid plus georeferencing.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use overlay_common::BoundingBox;

use crate::error::{RasterError, Result};
use crate::types::{GridRegion, ValueStats};

/// Affine placement of a north-up grid: top-left origin and cell size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    pub origin_x: f64,
    pub origin_y: f64,
    pub cell_width: f64,
    pub cell_height: f64,
}

impl GeoTransform {
    pub fn new(origin_x: f64, origin_y: f64, cell_width: f64, cell_height: f64) -> Self {
        Self {
            origin_x,
            origin_y,
            cell_width,
            cell_height,
        }
    }
}

/// A fully materialized grid of scalars in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub width: usize,
    pub height: usize,
    pub values: Vec<f32>,
}

impl Grid {
    pub fn new(width: usize, height: usize, values: Vec<f32>) -> Result<Self> {
        if values.len() != width * height {
            return Err(RasterError::decode(format!(
                "grid of {}x{} needs {} values, got {}",
                width,
                height,
                width * height,
                values.len()
            )));
        }
        Ok(Self {
            width,
            height,
            values,
        })
    }

    fn region(&self, row: usize, col: usize, width: usize, height: usize) -> Vec<f32> {
        let mut out = Vec::with_capacity(width * height);
        for r in row..row + height {
            let start = r * self.width + col;
            out.extend_from_slice(&self.values[start..start + width]);
        }
        out
    }
}

/// Capability to read blocks of a raster that is decoded on demand.
#[async_trait]
pub trait RegionSource: Send + Sync {
    /// Read one cell, decoding whatever backs it if needed.
    fn value_at(&self, row: usize, col: usize) -> Result<f32>;

    /// Read a block of cells. Callers have already bounds-checked the block.
    async fn fetch_region(&self, row: usize, col: usize, width: usize, height: usize)
        -> Result<Vec<f32>>;

    /// Short label for logs.
    fn describe(&self) -> String;
}

/// How cell values are reached. Chosen once at decode time.
#[derive(Clone)]
pub enum ValueAccessor {
    Materialized(Grid),
    LazyFetchable(Arc<dyn RegionSource>),
}

impl fmt::Debug for ValueAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Materialized(grid) => write!(f, "Materialized({}x{})", grid.width, grid.height),
            Self::LazyFetchable(source) => write!(f, "LazyFetchable({})", source.describe()),
        }
    }
}

/// A decoded raster: dimensions, georeferencing, reported statistics and
/// a uniform way to reach its cell values.
///
/// Never mutated after construction; a new selection replaces it wholesale.
#[derive(Debug, Clone)]
pub struct RasterDataset {
    width: usize,
    height: usize,
    transform: GeoTransform,
    stats: Option<ValueStats>,
    no_data: Option<f64>,
    accessor: ValueAccessor,
}

impl RasterDataset {
    /// Build a dataset, enforcing positive dimensions and cell sizes.
    pub fn new(
        width: usize,
        height: usize,
        transform: GeoTransform,
        accessor: ValueAccessor,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RasterError::decode(format!(
                "raster dimensions must be positive, got {}x{}",
                width, height
            )));
        }
        let cell_ok = |v: f64| v.is_finite() && v > 0.0;
        if !cell_ok(transform.cell_width) || !cell_ok(transform.cell_height) {
            return Err(RasterError::decode(format!(
                "cell size must be positive, got {} x {}",
                transform.cell_width, transform.cell_height
            )));
        }
        if !transform.origin_x.is_finite() || !transform.origin_y.is_finite() {
            return Err(RasterError::decode("raster origin is not finite"));
        }
        if let ValueAccessor::Materialized(grid) = &accessor {
            if grid.width != width || grid.height != height {
                return Err(RasterError::decode(format!(
                    "grid is {}x{} but raster is {}x{}",
                    grid.width, grid.height, width, height
                )));
            }
        }

        Ok(Self {
            width,
            height,
            transform,
            stats: None,
            no_data: None,
            accessor,
        })
    }

    /// Convenience constructor for an in-memory grid.
    pub fn materialized(grid: Grid, transform: GeoTransform) -> Result<Self> {
        let (width, height) = (grid.width, grid.height);
        Self::new(width, height, transform, ValueAccessor::Materialized(grid))
    }

    pub fn with_stats(mut self, stats: ValueStats) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn with_no_data(mut self, no_data: f64) -> Self {
        self.no_data = Some(no_data);
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn origin_x(&self) -> f64 {
        self.transform.origin_x
    }

    pub fn origin_y(&self) -> f64 {
        self.transform.origin_y
    }

    pub fn cell_width(&self) -> f64 {
        self.transform.cell_width
    }

    pub fn cell_height(&self) -> f64 {
        self.transform.cell_height
    }

    pub fn transform(&self) -> GeoTransform {
        self.transform
    }

    /// Statistics from embedded metadata, if the source carried any.
    pub fn stats(&self) -> Option<ValueStats> {
        self.stats
    }

    /// The source's declared no-data value. Such cells already read back as NaN.
    pub fn no_data(&self) -> Option<f64> {
        self.no_data
    }

    pub fn accessor(&self) -> &ValueAccessor {
        &self.accessor
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self.accessor, ValueAccessor::LazyFetchable(_))
    }

    /// Geographic extent, for placing the image overlay.
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::from_origin(
            self.transform.origin_x,
            self.transform.origin_y,
            self.transform.cell_width,
            self.transform.cell_height,
            self.width,
            self.height,
        )
    }

    /// Read one cell. No-data cells come back as NaN.
    pub fn value_at(&self, row: usize, col: usize) -> Result<f32> {
        self.check_region(row, col, 1, 1)?;
        match &self.accessor {
            ValueAccessor::Materialized(grid) => Ok(grid.values[row * grid.width + col]),
            ValueAccessor::LazyFetchable(source) => source.value_at(row, col),
        }
    }

    /// Read a block of cells.
    pub async fn fetch_region(
        &self,
        row: usize,
        col: usize,
        width: usize,
        height: usize,
    ) -> Result<GridRegion> {
        self.check_region(row, col, width, height)?;
        let values = match &self.accessor {
            ValueAccessor::Materialized(grid) => grid.region(row, col, width, height),
            ValueAccessor::LazyFetchable(source) => {
                source.fetch_region(row, col, width, height).await?
            }
        };
        Ok(GridRegion::new(row, col, width, height, values))
    }

    fn check_region(&self, row: usize, col: usize, width: usize, height: usize) -> Result<()> {
        let fits = width > 0
            && height > 0
            && row.checked_add(height).map_or(false, |end| end <= self.height)
            && col.checked_add(width).map_or(false, |end| end <= self.width);
        if fits {
            Ok(())
        } else {
            Err(RasterError::region_out_of_bounds(
                row,
                col,
                width,
                height,
                (self.width, self.height),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_by_two() -> RasterDataset {
        let grid = Grid::new(2, 2, vec![1.0, 2.0, 3.0, f32::NAN]).unwrap();
        RasterDataset::materialized(grid, GeoTransform::new(-10.0, 10.0, 5.0, 5.0)).unwrap()
    }

    #[test]
    fn test_rejects_zero_dimensions() {
        let err = RasterDataset::new(
            0,
            2,
            GeoTransform::new(0.0, 0.0, 1.0, 1.0),
            ValueAccessor::Materialized(Grid::new(0, 2, vec![]).unwrap()),
        );
        assert!(matches!(err, Err(RasterError::Decode(_))));
    }

    #[test]
    fn test_rejects_non_positive_cells() {
        let grid = Grid::new(1, 1, vec![0.0]).unwrap();
        let err = RasterDataset::materialized(grid, GeoTransform::new(0.0, 0.0, 1.0, -1.0));
        assert!(err.is_err());
    }

    #[test]
    fn test_grid_length_mismatch() {
        assert!(Grid::new(2, 2, vec![0.0; 3]).is_err());
    }

    #[test]
    fn test_value_at() {
        let ds = two_by_two();
        assert_eq!(ds.value_at(0, 1).unwrap(), 2.0);
        assert_eq!(ds.value_at(1, 0).unwrap(), 3.0);
        assert!(ds.value_at(1, 1).unwrap().is_nan());
        assert!(matches!(
            ds.value_at(2, 0),
            Err(RasterError::RegionOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_bounds() {
        let bounds = two_by_two().bounds();
        assert_eq!(bounds, BoundingBox::new(-10.0, 0.0, 0.0, 10.0));
    }

    #[tokio::test]
    async fn test_fetch_region_materialized() {
        let ds = two_by_two();
        let region = ds.fetch_region(0, 0, 2, 1).await.unwrap();
        assert_eq!(region.values, vec![1.0, 2.0]);
        assert!(ds.fetch_region(1, 1, 2, 1).await.is_err());
        assert!(ds.fetch_region(0, 0, 0, 1).await.is_err());
    }
}
