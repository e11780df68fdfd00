//! Uniform spatial grid over the active viewport
//!
//! The grid spans the viewport only, not the whole dataset. Points are
//! culled against the viewport before they are bucketed, so every indexed
//! point is visible by construction.

use crate::{EngineError, Result, Viewport, tiers};
use smallvec::SmallVec;

/// Index of a point in its [`PointSet`](crate::PointSet)
pub type PointRef = usize;

/// Most cells hold a handful of points at the sampled densities
type Cell = SmallVec<[PointRef; 4]>;

/// `size x size` grid of point references covering a viewport
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    viewport: Viewport,
    /// Cells per axis (0 for a degenerate viewport)
    size: usize,
    lat_step: f64,
    lon_step: f64,
    /// Row-major cells, rows running south to north
    cells: Vec<Cell>,
    len: usize,
}

impl SpatialGrid {
    /// Create an empty grid sized for a dataset of `total_points`
    ///
    /// Fails with [`EngineError::ResourceExhaustion`] if the cell table
    /// cannot be allocated.
    pub fn new(viewport: Viewport, total_points: usize) -> Result<Self> {
        if viewport.is_degenerate() {
            return Ok(Self::empty(viewport));
        }

        let size = tiers::grid_size(total_points);
        let mut cells: Vec<Cell> = Vec::new();
        cells
            .try_reserve_exact(size * size)
            .map_err(|e| EngineError::ResourceExhaustion {
                stage: "allocating grid cells",
                reason: e.to_string(),
            })?;
        cells.resize_with(size * size, Cell::new);

        Ok(Self {
            viewport,
            size,
            lat_step: viewport.height() / size as f64,
            lon_step: viewport.width() / size as f64,
            cells,
            len: 0,
        })
    }

    fn empty(viewport: Viewport) -> Self {
        Self {
            viewport,
            size: 0,
            lat_step: 0.0,
            lon_step: 0.0,
            cells: Vec::new(),
            len: 0,
        }
    }

    /// Cell (row, column) for a position, or `None` when it lies outside the viewport
    #[inline]
    pub fn cell_of(&self, lat: f64, lon: f64) -> Option<(usize, usize)> {
        if self.size == 0 || !self.viewport.contains(lat, lon) {
            return None;
        }
        let last = self.size - 1;
        let row = (((lat - self.viewport.lat_south) / self.lat_step) as usize).min(last);
        let col = (((lon - self.viewport.lon_west) / self.lon_step) as usize).min(last);
        Some((row, col))
    }

    /// Bucket a point; returns false (and stores nothing) if it is outside the viewport
    #[inline]
    pub fn insert(&mut self, point: PointRef, lat: f64, lon: f64) -> bool {
        match self.cell_of(lat, lon) {
            Some((row, col)) => {
                self.cells[row * self.size + col].push(point);
                self.len += 1;
                true
            }
            None => false,
        }
    }

    /// Cells per axis
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of indexed points
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// All indexed points, cell by cell in row-major order
    pub fn iter(&self) -> impl Iterator<Item = PointRef> + '_ {
        self.cells.iter().flat_map(|cell| cell.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_viewport() -> Viewport {
        Viewport::new(0.0, 1.0, 0.0, 1.0)
    }

    #[test]
    fn test_grid_sized_by_point_count() {
        assert_eq!(SpatialGrid::new(unit_viewport(), 10).unwrap().size(), 20);
        assert_eq!(SpatialGrid::new(unit_viewport(), 500_000).unwrap().size(), 50);
    }

    #[test]
    fn test_degenerate_viewport_yields_empty_grid() {
        let mut grid = SpatialGrid::new(Viewport::new(1.0, 1.0, 0.0, 1.0), 10).unwrap();
        assert_eq!(grid.size(), 0);
        assert!(!grid.insert(0, 1.0, 0.5));
        assert!(grid.is_empty());
        assert_eq!(grid.iter().count(), 0);
    }

    #[test]
    fn test_outside_points_excluded() {
        let mut grid = SpatialGrid::new(unit_viewport(), 10).unwrap();
        assert!(!grid.insert(0, 1.5, 0.5));
        assert!(!grid.insert(1, 0.5, -0.1));
        assert!(grid.insert(2, 0.5, 0.5));
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.iter().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn test_cell_assignment_clamped_at_north_east_edge() {
        let grid = SpatialGrid::new(unit_viewport(), 10).unwrap();
        assert_eq!(grid.cell_of(0.0, 0.0), Some((0, 0)));
        assert_eq!(grid.cell_of(1.0, 1.0), Some((19, 19)));
        assert_eq!(grid.cell_of(0.06, 0.99), Some((1, 19)));
    }

    #[test]
    fn test_each_point_in_exactly_one_cell() {
        let mut grid = SpatialGrid::new(unit_viewport(), 1_000).unwrap();
        for i in 0..1_000 {
            let t = i as f64 / 1_000.0;
            grid.insert(i, t, (t * 7.0).fract());
        }
        let mut seen: Vec<PointRef> = grid.iter().collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..1_000).collect::<Vec<_>>());

        let per_cell: usize = grid.cells.iter().map(|cell| cell.len()).sum();
        assert_eq!(per_cell, 1_000);
    }

    #[test]
    fn test_iteration_is_row_major_south_first() {
        let mut grid = SpatialGrid::new(unit_viewport(), 10).unwrap();
        grid.insert(0, 0.95, 0.05); // north-west
        grid.insert(1, 0.05, 0.95); // south-east
        grid.insert(2, 0.05, 0.05); // south-west
        assert_eq!(grid.iter().collect::<Vec<_>>(), vec![2, 1, 0]);
        assert_eq!(grid.cells.iter().filter(|cell| !cell.is_empty()).count(), 3);
    }
}
