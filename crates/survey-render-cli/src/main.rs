mod import;
mod session;
mod settings;

use clap::Parser;
use settings::Settings;
use std::process::ExitCode;
use survey_render_lib::generate::{self, GenerateOptions};
use survey_render_lib::{EngineError, Point, RenderEngine, SurveyLine};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GPX parsing error: {0}")]
    GpxParse(#[from] gpx::errors::GpxError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Report serialization error: {0}")]
    Report(#[from] serde_json::Error),

    #[error("No survey points to render")]
    NoPoints,
}

fn setup_logging() {
    let default = if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_survey(settings: &Settings) -> Result<(Vec<Point>, Vec<SurveyLine>), CliError> {
    if !settings.gpx_files.is_empty() {
        let points = import::load_gpx_files(&settings.gpx_files)?;
        return Ok((points, Vec::new()));
    }

    let (base_lat, base_lon) = generate::DEFAULT_BASE;
    let options = GenerateOptions {
        count: settings.points,
        seed: settings.seed,
        center_lat: settings.lat.unwrap_or(base_lat),
        center_lon: settings.lon.unwrap_or(base_lon),
        ..Default::default()
    };
    let (points, line) = generate::generate_survey(&options)?;
    Ok((points, vec![line]))
}

async fn run(settings: Settings) -> Result<(), CliError> {
    let (points, lines) = load_survey(&settings)?;
    if points.is_empty() {
        return Err(CliError::NoPoints);
    }

    let mut engine = RenderEngine::new(settings.engine_config(), tokio::runtime::Handle::current());
    engine.replace_points(points);
    engine.set_lines(lines);

    let center = match (settings.lat, settings.lon) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => engine.points().center().unwrap_or(generate::DEFAULT_BASE),
    };
    tracing::info!(
        points = engine.points().len(),
        frames = settings.frames,
        device = ?engine.config().device,
        "Starting session at ({:.5}, {:.5})",
        center.0,
        center.1
    );

    let report = session::replay(&mut engine, &settings, center).await;
    tracing::info!(
        drawn = report.drawn_frames,
        skipped = ?report.skipped,
        max_points = report.max_points_per_frame,
        snapshots = report.snapshots_published,
        degraded = report.degraded_snapshots,
        "Session finished after {} frames",
        report.frames
    );

    if let Some(path) = &settings.report {
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
        tracing::info!(file = %path.display(), "Report written");
    }
    Ok(())
}

fn main() -> ExitCode {
    setup_logging();
    let settings = Settings::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(settings)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
