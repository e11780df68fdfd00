//! Simulated pan/zoom session
//!
//! Replays a camera path frame by frame against a [`RenderEngine`]: the camera
//! zooms linearly from the start to the end level while circling the center.
//! Frames are paced with real sleeps so snapshot computations progress on the
//! tokio runtime between them the way they would behind a display.

use crate::settings::Settings;
use instant::Instant;
use serde::Serialize;
use std::collections::BTreeMap;
use std::f64::consts::TAU;
use survey_render_lib::{
    EngineInfo, FrameInput, FrameOutcome, RenderEngine, ScreenSize, SnapshotMode, ViewState,
    WebMercatorProjector, utils,
};

/// Share of the viewport height the camera circles at
const PAN_RADIUS: f64 = 0.25;

/// Full circles over the whole session
const PAN_TURNS: f64 = 2.0;

#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionReport {
    pub frames: usize,
    pub drawn_frames: usize,
    /// Skipped frames by reason
    pub skipped: BTreeMap<String, usize>,
    pub points_drawn: usize,
    pub max_points_per_frame: usize,
    pub lines_drawn: usize,
    pub culled_geographic: usize,
    pub culled_screen: usize,
    pub projection_failures: usize,
    pub snapshots_published: usize,
    pub degraded_snapshots: usize,
    pub engine: EngineInfo,
}

impl SessionReport {
    fn record(&mut self, outcome: FrameOutcome) {
        self.frames += 1;
        match outcome {
            FrameOutcome::Drawn(draw) => {
                self.drawn_frames += 1;
                self.points_drawn += draw.points.len();
                self.max_points_per_frame = self.max_points_per_frame.max(draw.points.len());
                self.culled_geographic += draw.culled_geographic;
                self.culled_screen += draw.culled_screen;
                self.projection_failures += draw.projection_failures;
            }
            FrameOutcome::Skipped(reason) => {
                *self.skipped.entry(format!("{reason:?}")).or_default() += 1;
            }
        }
    }
}

/// Camera for frame `index` of `frames`
fn camera(settings: &Settings, center: (f64, f64), index: usize) -> ViewState {
    let t = if settings.frames > 1 {
        index as f64 / (settings.frames - 1) as f64
    } else {
        0.0
    };
    let zoom = settings.zoom_start + (settings.zoom_end - settings.zoom_start) * t;
    let (width, height) = (settings.screen_width as f64, settings.screen_height as f64);

    let span = utils::viewport_around(center.0, center.1, zoom, width, height).height();
    let angle = TAU * PAN_TURNS * t;
    let lat = center.0 + span * PAN_RADIUS * angle.sin();
    let lon = center.1 + span * PAN_RADIUS * angle.cos();
    ViewState::new(utils::viewport_around(lat, lon, zoom, width, height), zoom)
}

/// Replay the session and collect statistics
pub async fn replay(engine: &mut RenderEngine, settings: &Settings, center: (f64, f64)) -> SessionReport {
    let mut report = SessionReport::default();
    let mut published = engine.subscribe();
    let screen = ScreenSize::new(settings.screen_width as f64, settings.screen_height as f64);
    let start = Instant::now();

    let mut count_published = |report: &mut SessionReport| {
        if published.has_changed().unwrap_or(false) {
            if let Some(snapshot) = published.borrow_and_update().as_ref() {
                report.snapshots_published += 1;
                if snapshot.mode == SnapshotMode::Degraded {
                    report.degraded_snapshots += 1;
                }
            }
        }
    };

    for index in 0..settings.frames {
        let now = start + settings.frame_interval() * index as u32;
        let view = camera(settings, center, index);
        engine.update_view(view, now);

        tokio::time::sleep(settings.frame_interval()).await;

        let projector = WebMercatorProjector::new(&view.viewport, view.zoom);
        let outcome = engine.draw_frame(&FrameInput { view, screen }, &projector, now);
        if outcome.is_drawn() {
            report.lines_drawn += engine.draw_lines(&view.viewport, &projector).len();
        }
        report.record(outcome);
        count_published(&mut report);

        if index % 60 == 0 {
            tracing::debug!(frame = index, zoom = view.zoom, "Session progress");
        }
    }

    engine.settle().await;
    count_published(&mut report);
    report.engine = engine.info();
    report
}
