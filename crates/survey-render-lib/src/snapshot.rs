//! Viewport snapshots and the pipeline that builds them
//!
//! A snapshot is the immutable result of one sampling + indexing + density
//! pass for a given viewport and zoom. Building one happens in two phases so
//! the async driver can yield (and observe cancellation) in between:
//!
//! 1. [`index_phase`]: stride sampling with viewport culling into a [`SpatialGrid`]
//! 2. [`select_phase`]: drain the grid through a [`DensityFilter`] up to the budget

use crate::dedup::DensityFilter;
use crate::grid::{PointRef, SpatialGrid};
use crate::sampler::{self, SampleParams};
use crate::{DeviceClass, EngineError, PointSet, Result, ViewState, Viewport, tiers};
use tokio_util::sync::CancellationToken;

/// Points scanned between cancellation checks
pub const CANCEL_CHECK_INTERVAL: usize = 1 << 16;

/// How a snapshot was produced
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotMode {
    /// Full sampling, grid indexing, and density culling
    Indexed,
    /// Small point set: visible points without a grid or sampling, density culled within the budget
    Individual,
    /// Fallback after a failed build: visible points up to a small cap and the budget
    Degraded,
}

/// A selected point, kept in geographic form until a frame projects it
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SnapshotPoint {
    /// Index into the source [`PointSet`]
    pub index: PointRef,
    pub latitude: f64,
    pub longitude: f64,
    pub highlighted: bool,
}

/// Counters describing one build
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SnapshotStats {
    pub total_points: usize,
    pub stride: usize,
    /// Points visited by the sampler
    pub scanned: usize,
    /// Sampled points that fell inside the viewport
    pub indexed: usize,
    /// Indexed points rejected by density culling
    pub suppressed: usize,
}

/// Immutable published result for one viewport/zoom epoch
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub view: ViewState,
    /// Request generation that produced this snapshot
    pub generation: u64,
    pub mode: SnapshotMode,
    /// Render budget the snapshot was built against
    pub budget: usize,
    pub points: Vec<SnapshotPoint>,
    /// Whether zooming in would reveal points this snapshot left out
    pub has_more_on_zoom: bool,
    pub stats: SnapshotStats,
}

/// Knobs the pipeline needs from the engine configuration
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BuildOptions {
    pub device: DeviceClass,
    /// Maximum number of points the grid may hold before the build gives up
    pub index_capacity: usize,
    /// Cap for degraded snapshots
    pub degraded_cap: usize,
}

/// Output of the indexing phase
#[derive(Debug)]
pub struct IndexedPoints {
    pub grid: SpatialGrid,
    pub budget: usize,
    pub stride: usize,
    pub scanned: usize,
}

impl Snapshot {
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn viewport(&self) -> &Viewport {
        &self.view.viewport
    }

    #[inline]
    pub fn zoom(&self) -> f64 {
        self.view.zoom
    }

    /// Snapshot with nothing to draw
    pub fn empty(view: ViewState, generation: u64, mode: SnapshotMode) -> Self {
        Self {
            view,
            generation,
            mode,
            budget: 0,
            points: Vec::new(),
            has_more_on_zoom: false,
            stats: SnapshotStats::default(),
        }
    }
}

fn snapshot_point(points: &PointSet, index: PointRef) -> Option<SnapshotPoint> {
    points.get(index).map(|point| SnapshotPoint {
        index,
        latitude: point.latitude(),
        longitude: point.longitude(),
        highlighted: point.highlighted(),
    })
}

fn check_cancelled(token: &CancellationToken) -> Result<()> {
    if token.is_cancelled() {
        Err(EngineError::Cancelled)
    } else {
        Ok(())
    }
}

/// Sample every `stride`-th point and bucket the visible ones
pub fn index_phase(
    points: &PointSet,
    view: &ViewState,
    options: &BuildOptions,
    token: &CancellationToken,
) -> Result<IndexedPoints> {
    #[cfg(feature = "profiling")]
    profiling::scope!("snapshot::index_phase");

    let total = points.len();
    let budget = tiers::render_budget(view.zoom, total, options.device);
    let stride = sampler::sample_stride(SampleParams {
        total_points: total,
        viewport_area: view.viewport.area(),
        render_budget: budget,
        zoom: view.zoom,
        device: options.device,
    });

    let mut grid = SpatialGrid::new(view.viewport, total)?;
    let mut scanned = 0;

    for (index, point) in points.points().iter().enumerate().step_by(stride) {
        if scanned % CANCEL_CHECK_INTERVAL == 0 {
            check_cancelled(token)?;
        }
        scanned += 1;

        if grid.insert(index, point.latitude(), point.longitude())
            && grid.len() > options.index_capacity
        {
            return Err(EngineError::ResourceExhaustion {
                stage: "indexing sampled points",
                reason: format!("index capacity of {} points exceeded", options.index_capacity),
            });
        }
    }

    Ok(IndexedPoints {
        grid,
        budget,
        stride,
        scanned,
    })
}

/// Drain the grid through density culling until the budget is reached
pub fn select_phase(
    points: &PointSet,
    view: &ViewState,
    indexed: IndexedPoints,
    generation: u64,
    token: &CancellationToken,
) -> Result<Snapshot> {
    #[cfg(feature = "profiling")]
    profiling::scope!("snapshot::select_phase");

    check_cancelled(token)?;

    let IndexedPoints {
        grid,
        budget,
        stride,
        scanned,
    } = indexed;

    let mut filter = DensityFilter::for_view(points.len(), view.zoom, view.viewport.extent());
    let mut selected = Vec::new();
    selected
        .try_reserve_exact(budget.min(grid.len()))
        .map_err(|e| EngineError::ResourceExhaustion {
            stage: "allocating snapshot",
            reason: e.to_string(),
        })?;

    let mut budget_reached = false;
    for index in grid.iter() {
        if selected.len() >= budget {
            budget_reached = true;
            break;
        }
        let Some(point) = snapshot_point(points, index) else {
            continue;
        };
        if filter.accept(point.latitude, point.longitude) {
            selected.push(point);
        }
    }

    let stats = SnapshotStats {
        total_points: points.len(),
        stride,
        scanned,
        indexed: grid.len(),
        suppressed: filter.rejected(),
    };

    Ok(Snapshot {
        view: *view,
        generation,
        mode: SnapshotMode::Indexed,
        budget,
        points: selected,
        has_more_on_zoom: stride > 1 || budget_reached || filter.rejected() > 0,
        stats,
    })
}

/// Visible points in input order, density culled, without a grid
///
/// Used both for small point sets and as the degraded fallback. The output
/// never exceeds the render budget for the view; degraded snapshots are further
/// held to `options.degraded_cap`.
pub fn build_unindexed(
    points: &PointSet,
    view: &ViewState,
    options: &BuildOptions,
    generation: u64,
    mode: SnapshotMode,
) -> Snapshot {
    let total = points.len();
    let cap = match mode {
        SnapshotMode::Degraded => options.degraded_cap,
        SnapshotMode::Indexed | SnapshotMode::Individual => total,
    };
    let budget = cap.min(tiers::render_budget(view.zoom, total, options.device));

    let mut filter = DensityFilter::for_view(total, view.zoom, view.viewport.extent());
    let mut selected = Vec::with_capacity(budget);
    let mut visible = 0;

    for (index, point) in points.points().iter().enumerate() {
        if !view.viewport.contains(point.latitude(), point.longitude()) {
            continue;
        }
        visible += 1;
        if selected.len() >= budget {
            continue;
        }
        if filter.accept(point.latitude(), point.longitude()) {
            if let Some(p) = snapshot_point(points, index) {
                selected.push(p);
            }
        }
    }

    Snapshot {
        view: *view,
        generation,
        mode,
        budget,
        has_more_on_zoom: visible > selected.len(),
        stats: SnapshotStats {
            total_points: total,
            stride: 1,
            scanned: total,
            indexed: visible,
            suppressed: filter.rejected(),
        },
        points: selected,
    }
}

/// Run the whole pipeline synchronously
///
/// The async cache runs the same phases with a yield in between.
pub fn build_snapshot(
    points: &PointSet,
    view: &ViewState,
    options: &BuildOptions,
    generation: u64,
    token: &CancellationToken,
) -> Result<Snapshot> {
    if let Some(snapshot) = build_trivial(points, view, options, generation) {
        return Ok(snapshot);
    }
    let indexed = index_phase(points, view, options, token)?;
    select_phase(points, view, indexed, generation, token)
}

/// Snapshots that need no indexing: degenerate viewports and small point sets
pub fn build_trivial(
    points: &PointSet,
    view: &ViewState,
    options: &BuildOptions,
    generation: u64,
) -> Option<Snapshot> {
    if view.viewport.is_degenerate() {
        return Some(Snapshot::empty(*view, generation, SnapshotMode::Indexed));
    }
    if points.len() < tiers::INDIVIDUAL_MODE_THRESHOLD {
        return Some(build_unindexed(
            points,
            view,
            options,
            generation,
            SnapshotMode::Individual,
        ));
    }
    None
}
