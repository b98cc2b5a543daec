//! Synthetic grid generators.
//!
//! These create predictable, verifiable value patterns that can be used
//! across the test suite.

/// Creates a test grid with predictable values.
///
/// Each cell value is calculated as: `col * 1000 + row`
///
/// This makes it easy to verify that data is being read correctly by
/// checking that `grid[row * width + col] == col * 1000 + row`.
///
/// # Example
///
/// ```
/// use test_utils::create_test_grid;
///
/// let grid = create_test_grid(10, 5);
/// assert_eq!(grid.len(), 50);
/// assert_eq!(grid[0], 0.0);    // col=0, row=0
/// assert_eq!(grid[1], 1000.0); // col=1, row=0
/// assert_eq!(grid[10], 1.0);   // col=0, row=1
/// ```
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}

/// Creates a grid that ramps linearly from `min` (first cell) to `max`
/// (last cell) in row-major order.
///
/// # Example
///
/// ```
/// use test_utils::create_ramp_grid;
///
/// let grid = create_ramp_grid(3, 3, 0.0, 80.0);
/// assert_eq!(grid[0], 0.0);
/// assert_eq!(grid[4], 40.0);
/// assert_eq!(grid[8], 80.0);
/// ```
pub fn create_ramp_grid(width: usize, height: usize, min: f32, max: f32) -> Vec<f32> {
    let n = width * height;
    if n <= 1 {
        return vec![min; n];
    }
    let step = (max - min) / (n - 1) as f32;
    (0..n).map(|i| min + step * i as f32).collect()
}

/// Creates an emission-like grid: mostly tiny values with a few hot cells.
///
/// Values fall in roughly `[0, 1e-9]`, except cells on the main diagonal
/// which are `1e-7`. Useful for exercising small-magnitude label formatting.
pub fn create_emission_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            if row == col {
                data.push(1e-7);
            } else {
                let x = col as f32 / width.max(1) as f32;
                let y = row as f32 / height.max(1) as f32;
                data.push((x + y) * 0.5e-9);
            }
        }
    }
    data
}

/// Replace the listed `(row, col)` cells with `value` (typically a no-data
/// sentinel or NaN).
pub fn with_cells(
    mut data: Vec<f32>,
    width: usize,
    cells: &[(usize, usize)],
    value: f32,
) -> Vec<f32> {
    for &(row, col) in cells {
        data[row * width + col] = value;
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_grid() {
        let grid = create_test_grid(10, 5);
        assert_eq!(grid.len(), 50);
        assert_eq!(grid[3 * 10 + 7], 7003.0);
    }

    #[test]
    fn test_create_ramp_grid() {
        let grid = create_ramp_grid(2, 3, 10.0, 20.0);
        assert_eq!(grid.len(), 6);
        assert_eq!(grid[0], 10.0);
        assert_eq!(grid[5], 20.0);
        assert!(grid.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_create_ramp_grid_single_cell() {
        assert_eq!(create_ramp_grid(1, 1, 5.0, 9.0), vec![5.0]);
    }

    #[test]
    fn test_create_emission_grid() {
        let grid = create_emission_grid(4, 4);
        assert_eq!(grid[0], 1e-7);
        assert!(grid[1] > 0.0 && grid[1] < 1e-9);
    }

    #[test]
    fn test_with_cells() {
        let grid = with_cells(vec![1.0; 4], 2, &[(1, 0)], -9999.0);
        assert_eq!(grid, vec![1.0, 1.0, -9999.0, 1.0]);
    }
}
