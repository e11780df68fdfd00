//! RenderEngine - top-level facade tying data, snapshots and frames together
//!
//! The host feeds camera changes through [`RenderEngine::update_view`] and asks
//! for points to paint once per frame through [`RenderEngine::draw_frame`].
//! Snapshot computation runs on the tokio runtime; drawing never waits for it.

use crate::cache::{Published, SnapshotCache};
use crate::line::{self, ScreenPolyline, SurveyLine};
use crate::projection::Projector;
use crate::scheduler::{FrameInput, FrameOutcome, FrameScheduler};
use crate::snapshot::{BuildOptions, Snapshot};
use crate::{DeviceClass, Point, PointSet, ViewState, Viewport, tiers};
use instant::Instant;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Engine configuration
///
/// Defaults reproduce the tuning of the mobile survey client: a 30 fps draw
/// throttle, 100/150 point frame caps, and a 0.2 degree staleness tolerance.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineConfig {
    /// Device class of the host surface
    pub device: DeviceClass,
    /// Physical pixels per logical pixel, scales point radius
    pub display_density: f64,
    /// Minimum time between two draws (default: 33 ms)
    pub min_draw_interval: Duration,
    /// Datasets above this size skip every `frame_skip_period`-th draw
    pub frame_skip_threshold: usize,
    pub frame_skip_period: u64,
    /// Viewport edge drift (degrees) beyond which a snapshot is not drawn
    pub stale_viewport_tolerance_deg: f64,
    /// Zoom drift beyond which a snapshot is not drawn
    pub stale_zoom_tolerance: f64,
    /// Points drawn per frame on constrained devices
    pub frame_cap_constrained: usize,
    /// Points drawn per frame on unconstrained devices
    pub frame_cap_unconstrained: usize,
    /// Datasets above this size draw every second snapshot point
    pub stride_high_water: usize,
    /// Pixels a point may overhang the screen edge and still be drawn
    pub offscreen_margin_px: f64,
    /// Points kept in a degraded snapshot
    pub degraded_cap: usize,
    /// Sampled points the grid may hold before a build fails
    pub index_capacity: usize,
    /// Wait for the camera to settle before recomputing large datasets
    pub debounce_refresh: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            device: DeviceClass::default(),
            display_density: 1.0,
            min_draw_interval: Duration::from_millis(33),
            frame_skip_threshold: 10_000,
            frame_skip_period: 3,
            stale_viewport_tolerance_deg: 0.2,
            stale_zoom_tolerance: 0.3,
            frame_cap_constrained: 100,
            frame_cap_unconstrained: 150,
            stride_high_water: 5_000,
            offscreen_margin_px: 50.0,
            degraded_cap: 100,
            index_capacity: 1_000_000,
            debounce_refresh: true,
        }
    }
}

impl EngineConfig {
    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            device: self.device,
            index_capacity: self.index_capacity,
            degraded_cap: self.degraded_cap,
        }
    }
}

/// Summary of the engine state
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineInfo {
    pub total_points: usize,
    pub highlighted_points: usize,
    pub line_count: usize,
    /// Generation of the newest snapshot request
    pub generation: u64,
    /// Points in the published snapshot, if any
    pub snapshot_points: Option<usize>,
    pub computing: bool,
}

#[derive(Debug, Clone, Copy)]
struct PendingView {
    view: ViewState,
    since: Instant,
}

/// Adaptive point renderer for one map surface
pub struct RenderEngine {
    config: EngineConfig,
    points: PointSet,
    lines: Vec<SurveyLine>,
    cache: SnapshotCache,
    scheduler: FrameScheduler,
    /// View of the newest snapshot request
    requested: Option<ViewState>,
    /// Newest camera position waiting for the debounce period to elapse
    pending: Option<PendingView>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl RenderEngine {
    /// Create an engine whose computations run on `runtime`
    pub fn new(config: EngineConfig, runtime: Handle) -> Self {
        let cache = SnapshotCache::new(runtime, config.build_options());
        Self {
            config,
            points: PointSet::default(),
            lines: Vec::new(),
            cache,
            scheduler: FrameScheduler::new(),
            requested: None,
            pending: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn points(&self) -> &PointSet {
        &self.points
    }

    pub fn lines(&self) -> &[SurveyLine] {
        &self.lines
    }

    /// Replace the whole point set
    pub fn replace_points(&mut self, points: Vec<Point>) {
        self.replace_point_set(PointSet::new(points));
    }

    /// Replace the whole point set, invalidating the published snapshot
    ///
    /// The last requested view is recomputed right away.
    pub fn replace_point_set(&mut self, points: PointSet) {
        tracing::info!(
            points = points.len(),
            highlighted = points.highlighted_count(),
            "Replacing point set"
        );
        self.points = points;
        self.cache.invalidate();
        self.scheduler.reset();

        let view = self.pending.take().map(|p| p.view).or(self.requested);
        if let Some(view) = view {
            self.request(view);
        }
    }

    /// Remove all points and lines
    pub fn clear(&mut self) {
        self.lines.clear();
        self.replace_point_set(PointSet::default());
    }

    pub fn set_lines(&mut self, lines: Vec<SurveyLine>) {
        tracing::debug!(lines = lines.len(), "Survey lines replaced");
        self.lines = lines;
    }

    /// Report a camera change
    ///
    /// Returns true when a computation was started immediately. Otherwise the
    /// newest view is kept pending until the debounce period has passed since
    /// the first unhandled move; [`draw_frame`](Self::draw_frame) starts it then.
    pub fn update_view(&mut self, view: ViewState, now: Instant) -> bool {
        if self.requested == Some(view) {
            self.pending = None;
            return false;
        }
        if self.requested.is_none() || self.debounce().is_zero() {
            self.request(view);
            return true;
        }
        let since = self.pending.map_or(now, |pending| pending.since);
        self.pending = Some(PendingView { view, since });
        false
    }

    /// Start the pending computation once its debounce period has passed
    pub fn poll(&mut self, now: Instant) -> bool {
        let Some(pending) = self.pending else {
            return false;
        };
        if now.saturating_duration_since(pending.since) < self.debounce() {
            return false;
        }
        self.request(pending.view);
        true
    }

    fn debounce(&self) -> Duration {
        if self.config.debounce_refresh {
            tiers::refresh_debounce(self.config.device, self.points.len())
        } else {
            Duration::ZERO
        }
    }

    fn request(&mut self, view: ViewState) {
        self.pending = None;
        self.requested = Some(view);
        self.cache.request(self.points.clone(), view);
    }

    /// Points to paint this frame
    pub fn draw_frame(
        &mut self,
        frame: &FrameInput,
        projector: &dyn Projector,
        now: Instant,
    ) -> FrameOutcome {
        self.poll(now);
        let snapshot = self.cache.latest();
        self.scheduler
            .draw(&self.config, snapshot.as_deref(), frame, projector, now)
    }

    /// Projected survey lines with at least one vertex in `viewport`
    pub fn draw_lines(&self, viewport: &Viewport, projector: &dyn Projector) -> Vec<ScreenPolyline> {
        line::visible_lines(&self.lines, viewport)
            .filter_map(|l| line::project_line(l, projector))
            .collect()
    }

    pub fn latest_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.cache.latest()
    }

    /// Receiver notified whenever a snapshot is published or invalidated
    pub fn subscribe(&self) -> watch::Receiver<Published> {
        self.cache.subscribe()
    }

    /// Wait for the newest computation to finish
    pub async fn settle(&mut self) {
        self.cache.settle().await;
    }

    /// Whether the host should draw point labels at `zoom`
    pub fn show_labels(&self, zoom: f64) -> bool {
        tiers::show_labels(zoom, self.points.len())
    }

    pub fn info(&self) -> EngineInfo {
        EngineInfo {
            total_points: self.points.len(),
            highlighted_points: self.points.highlighted_count(),
            line_count: self.lines.len(),
            generation: self.cache.generation(),
            snapshot_points: self.cache.latest().map(|s| s.len()),
            computing: self.cache.is_computing(),
        }
    }
}
