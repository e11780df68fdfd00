//! Per-frame draw scheduling
//!
//! Runs synchronously inside the host's frame callback. It never waits for a
//! computation: with no usable snapshot it simply draws nothing this frame.

use crate::projection::Projector;
use crate::snapshot::Snapshot;
use crate::{DeviceClass, EngineConfig, ScreenSize, ViewState, tiers};
use instant::Instant;

/// What the host is about to paint
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameInput {
    pub view: ViewState,
    pub screen: ScreenSize,
}

/// A point ready to paint
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawablePoint {
    pub screen_x: f64,
    pub screen_y: f64,
    pub highlighted: bool,
    /// Radius in physical pixels
    pub radius: f64,
}

/// Points to paint for one frame, plus culling counters
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameDraw {
    pub points: Vec<DrawablePoint>,
    /// Snapshot points outside the current viewport
    pub culled_geographic: usize,
    /// Projected points beyond the screen margin
    pub culled_screen: usize,
    /// Points the projector could not place
    pub projection_failures: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Nothing has been published yet
    NoSnapshot,
    /// The snapshot holds no points
    Empty,
    /// Too soon after the previous draw
    Throttled,
    /// Periodic skip for very large datasets
    FrameSkip,
    /// The view moved too far from the snapshot's view
    Stale,
}

#[derive(Clone, Debug, PartialEq)]
pub enum FrameOutcome {
    Drawn(FrameDraw),
    Skipped(SkipReason),
}

impl FrameOutcome {
    /// Drawn points, empty when the frame was skipped
    pub fn points(&self) -> &[DrawablePoint] {
        match self {
            FrameOutcome::Drawn(draw) => &draw.points,
            FrameOutcome::Skipped(_) => &[],
        }
    }

    pub fn is_drawn(&self) -> bool {
        matches!(self, FrameOutcome::Drawn(_))
    }
}

/// Throttle state carried across frames
#[derive(Debug, Default)]
pub struct FrameScheduler {
    last_draw: Option<Instant>,
    draw_calls: u64,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw calls that passed the temporal throttle
    pub fn draw_calls(&self) -> u64 {
        self.draw_calls
    }

    /// Forget throttle state, e.g. after the point set was replaced
    pub fn reset(&mut self) {
        self.last_draw = None;
        self.draw_calls = 0;
    }

    /// Select and project the points to paint this frame
    pub fn draw(
        &mut self,
        config: &EngineConfig,
        snapshot: Option<&Snapshot>,
        frame: &FrameInput,
        projector: &dyn Projector,
        now: Instant,
    ) -> FrameOutcome {
        let Some(snapshot) = snapshot else {
            return FrameOutcome::Skipped(SkipReason::NoSnapshot);
        };
        if snapshot.is_empty() {
            return FrameOutcome::Skipped(SkipReason::Empty);
        }

        if let Some(last) = self.last_draw {
            if now.saturating_duration_since(last) < config.min_draw_interval {
                return FrameOutcome::Skipped(SkipReason::Throttled);
            }
        }
        self.last_draw = Some(now);
        self.draw_calls += 1;

        let total = snapshot.stats.total_points;
        if total > config.frame_skip_threshold
            && config.frame_skip_period > 0
            && self.draw_calls % config.frame_skip_period == 0
        {
            return FrameOutcome::Skipped(SkipReason::FrameSkip);
        }

        if frame.view.drifted_from(
            &snapshot.view,
            config.stale_viewport_tolerance_deg,
            config.stale_zoom_tolerance,
        ) {
            return FrameOutcome::Skipped(SkipReason::Stale);
        }

        FrameOutcome::Drawn(select_drawable(config, snapshot, frame, projector))
    }
}

/// Per-frame cap: device cap, never above the snapshot's size or budget
///
/// The frame may sit in a lower zoom band than the snapshot it reuses, so the
/// budget for the frame's own zoom applies too.
pub fn frame_cap(config: &EngineConfig, snapshot: &Snapshot, frame: &FrameInput) -> usize {
    let device_cap = match config.device {
        DeviceClass::Constrained => config.frame_cap_constrained,
        DeviceClass::Unconstrained => config.frame_cap_unconstrained,
    };
    let frame_budget =
        tiers::render_budget(frame.view.zoom, snapshot.stats.total_points, config.device);
    device_cap
        .min(snapshot.budget)
        .min(frame_budget)
        .min(snapshot.len())
}

fn select_drawable(
    config: &EngineConfig,
    snapshot: &Snapshot,
    frame: &FrameInput,
    projector: &dyn Projector,
) -> FrameDraw {
    #[cfg(feature = "profiling")]
    profiling::scope!("scheduler::select_drawable");

    let cap = frame_cap(config, snapshot, frame);
    let step = if snapshot.stats.total_points > config.stride_high_water {
        2
    } else {
        1
    };
    let radius = tiers::point_radius(frame.view.zoom) * config.display_density;
    let viewport = &frame.view.viewport;

    let mut draw = FrameDraw {
        points: Vec::with_capacity(cap),
        ..Default::default()
    };
    for point in snapshot.points.iter().step_by(step) {
        if draw.points.len() >= cap {
            break;
        }
        if !viewport.contains(point.latitude, point.longitude) {
            draw.culled_geographic += 1;
            continue;
        }
        let Some(screen) = projector.project(point.latitude, point.longitude) else {
            draw.projection_failures += 1;
            continue;
        };
        if !frame
            .screen
            .contains_with_margin(screen.x, screen.y, config.offscreen_margin_px)
        {
            draw.culled_screen += 1;
            continue;
        }
        draw.points.push(DrawablePoint {
            screen_x: screen.x,
            screen_y: screen.y,
            highlighted: point.highlighted,
            radius,
        });
    }
    draw
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::ScreenCoord;
    use crate::snapshot::{SnapshotMode, SnapshotPoint, SnapshotStats};
    use crate::{Viewport, WebMercatorProjector};
    use std::time::Duration;

    fn view() -> ViewState {
        ViewState::new(Viewport::new(10.0, 11.0, 20.0, 21.0), 12.0)
    }

    fn frame() -> FrameInput {
        FrameInput {
            view: view(),
            screen: ScreenSize::new(1000.0, 1000.0),
        }
    }

    /// Linear projector mapping the unit viewport onto 1000x1000 px
    fn linear(lat: f64, lon: f64) -> Option<ScreenCoord> {
        Some(ScreenCoord::new((lon - 20.0) * 1000.0, (11.0 - lat) * 1000.0))
    }

    fn snapshot_with(n: usize, total_points: usize) -> Snapshot {
        let side = (n as f64).sqrt().ceil() as usize;
        let points = (0..n)
            .map(|i| SnapshotPoint {
                index: i,
                latitude: 10.0 + (i / side) as f64 / side as f64,
                longitude: 20.0 + (i % side) as f64 / side as f64,
                highlighted: i % 2 == 0,
            })
            .collect();
        Snapshot {
            view: view(),
            generation: 1,
            mode: SnapshotMode::Indexed,
            budget: 500,
            points,
            has_more_on_zoom: false,
            stats: SnapshotStats {
                total_points,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_no_snapshot_draws_nothing() {
        let mut scheduler = FrameScheduler::new();
        let outcome = scheduler.draw(&EngineConfig::default(), None, &frame(), &linear, Instant::now());
        assert_eq!(outcome, FrameOutcome::Skipped(SkipReason::NoSnapshot));
        assert!(outcome.points().is_empty());
    }

    #[test]
    fn test_frame_cap_by_device() {
        // Street-level zoom: the device cap is tighter than either budget
        let mut snapshot = snapshot_with(400, 1_000);
        snapshot.view.zoom = 15.0;
        let mut street = frame();
        street.view.zoom = 15.0;

        let mut config = EngineConfig::default();
        let outcome = FrameScheduler::new().draw(&config, Some(&snapshot), &street, &linear, Instant::now());
        assert_eq!(outcome.points().len(), 150);

        config.device = DeviceClass::Constrained;
        let outcome = FrameScheduler::new().draw(&config, Some(&snapshot), &street, &linear, Instant::now());
        assert_eq!(outcome.points().len(), 100);
    }

    #[test]
    fn test_frame_cap_never_above_budget() {
        let config = EngineConfig::default();
        let mut snapshot = snapshot_with(400, 1_000);
        snapshot.budget = 20;
        assert_eq!(frame_cap(&config, &snapshot, &frame()), 20);
        let small = snapshot_with(7, 7);
        assert_eq!(frame_cap(&config, &small, &frame()), 7);

        // Constrained budget at zoom 12 is below the device cap
        let constrained = EngineConfig {
            device: DeviceClass::Constrained,
            ..Default::default()
        };
        let snapshot = snapshot_with(400, 1_000);
        assert_eq!(frame_cap(&constrained, &snapshot, &frame()), 90);
    }

    #[test]
    fn test_zooming_out_into_lower_band_shrinks_frame() {
        // Built at 6.1 (budget 50); drawn at 5.85, inside the staleness tolerance
        let mut snapshot = snapshot_with(50, 1_000);
        snapshot.view.zoom = 6.1;
        snapshot.budget = tiers::render_budget(6.1, 1_000, DeviceClass::Unconstrained);
        assert_eq!(snapshot.budget, 50);

        let mut zoomed_out = frame();
        zoomed_out.view.zoom = 5.85;
        let outcome = FrameScheduler::new().draw(
            &EngineConfig::default(),
            Some(&snapshot),
            &zoomed_out,
            &linear,
            Instant::now(),
        );
        assert!(outcome.is_drawn());
        assert_eq!(
            outcome.points().len(),
            tiers::render_budget(5.85, 1_000, DeviceClass::Unconstrained)
        );
        assert_eq!(outcome.points().len(), 20);
    }

    #[test]
    fn test_throttle_between_draws() {
        let snapshot = snapshot_with(50, 50);
        let config = EngineConfig::default();
        let mut scheduler = FrameScheduler::new();
        let start = Instant::now();

        assert!(scheduler.draw(&config, Some(&snapshot), &frame(), &linear, start).is_drawn());
        let early = start + Duration::from_millis(10);
        assert_eq!(
            scheduler.draw(&config, Some(&snapshot), &frame(), &linear, early),
            FrameOutcome::Skipped(SkipReason::Throttled)
        );
        let later = start + Duration::from_millis(40);
        assert!(scheduler.draw(&config, Some(&snapshot), &frame(), &linear, later).is_drawn());
        assert_eq!(scheduler.draw_calls(), 2);
    }

    #[test]
    fn test_every_third_draw_skipped_for_large_sets() {
        let snapshot = snapshot_with(100, 50_000);
        let config = EngineConfig::default();
        let mut scheduler = FrameScheduler::new();
        let start = Instant::now();

        let outcomes: Vec<bool> = (0..6)
            .map(|i| {
                let now = start + Duration::from_millis(50 * i);
                scheduler
                    .draw(&config, Some(&snapshot), &frame(), &linear, now)
                    .is_drawn()
            })
            .collect();
        assert_eq!(outcomes, vec![true, true, false, true, true, false]);
    }

    #[test]
    fn test_stale_snapshot_not_drawn() {
        let snapshot = snapshot_with(50, 50);
        let config = EngineConfig::default();

        let mut panned = frame();
        panned.view.viewport = Viewport::new(10.3, 11.3, 20.0, 21.0);
        let outcome = FrameScheduler::new().draw(&config, Some(&snapshot), &panned, &linear, Instant::now());
        assert_eq!(outcome, FrameOutcome::Skipped(SkipReason::Stale));

        let mut zoomed = frame();
        zoomed.view.zoom = 12.5;
        let outcome = FrameScheduler::new().draw(&config, Some(&snapshot), &zoomed, &linear, Instant::now());
        assert_eq!(outcome, FrameOutcome::Skipped(SkipReason::Stale));

        // Small drift is tolerated
        let mut nudged = frame();
        nudged.view.viewport = Viewport::new(10.1, 11.1, 20.0, 21.0);
        nudged.view.zoom = 12.2;
        let outcome = FrameScheduler::new().draw(&config, Some(&snapshot), &nudged, &linear, Instant::now());
        assert!(outcome.is_drawn());
    }

    #[test]
    fn test_offscreen_and_projection_failures_skipped() {
        let snapshot = snapshot_with(100, 100);
        let config = EngineConfig::default();

        // Viewport shrunk within tolerance: the northern strip is culled geographically
        let mut nudged = frame();
        nudged.view.viewport = Viewport::new(10.0, 10.85, 20.0, 21.0);

        // Projector failing for the western half, placing the rest far to the right
        let projector = |lat: f64, lon: f64| {
            if lon < 20.5 {
                None
            } else if lon >= 20.8 {
                Some(ScreenCoord::new(5_000.0, (11.0 - lat) * 1000.0))
            } else {
                linear(lat, lon)
            }
        };
        let outcome = FrameScheduler::new().draw(&config, Some(&snapshot), &nudged, &projector, Instant::now());
        let FrameOutcome::Drawn(draw) = outcome else {
            panic!("expected a drawn frame");
        };
        assert!(draw.culled_geographic > 0);
        assert!(draw.projection_failures > 0);
        assert!(draw.culled_screen > 0);
        assert_eq!(
            draw.points.len() + draw.culled_geographic + draw.culled_screen + draw.projection_failures,
            100
        );
        for p in &draw.points {
            assert!(p.screen_x >= -50.0 && p.screen_x <= 1050.0);
        }
    }

    #[test]
    fn test_high_water_draws_every_second_point() {
        let snapshot = snapshot_with(100, 8_000);
        let config = EngineConfig::default();
        let outcome = FrameScheduler::new().draw(&config, Some(&snapshot), &frame(), &linear, Instant::now());
        assert_eq!(outcome.points().len(), 50);
    }

    #[test]
    fn test_radius_scales_with_density() {
        let snapshot = snapshot_with(4, 4);
        let config = EngineConfig {
            display_density: 2.0,
            ..Default::default()
        };
        let outcome = FrameScheduler::new().draw(&config, Some(&snapshot), &frame(), &linear, Instant::now());
        assert!(outcome.points().iter().all(|p| p.radius == 5.0));
    }

    #[test]
    fn test_web_mercator_projection_draws_visible_points() {
        let snapshot = snapshot_with(100, 100);
        let frame = frame();
        let projector = WebMercatorProjector::new(&frame.view.viewport, frame.view.zoom);
        let outcome = FrameScheduler::new().draw(
            &EngineConfig::default(),
            Some(&snapshot),
            &frame,
            &projector,
            Instant::now(),
        );
        assert!(outcome.is_drawn());
        assert!(!outcome.points().is_empty());
    }
}
