use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use survey_render_lib::{DeviceClass, EngineConfig};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DeviceArg {
    Constrained,
    Unconstrained,
}

impl From<DeviceArg> for DeviceClass {
    fn from(arg: DeviceArg) -> Self {
        match arg {
            DeviceArg::Constrained => DeviceClass::Constrained,
            DeviceArg::Unconstrained => DeviceClass::Unconstrained,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Survey Render - replay a pan/zoom session against a generated or imported survey
pub struct Settings {
    /// GPX files to import (waypoints and track points become survey points)
    #[clap(short, long, value_name = "FILE")]
    pub gpx_files: Vec<PathBuf>,

    /// Number of points to generate when no GPX file is given
    #[clap(short, long, default_value = "100000")]
    pub points: usize,

    /// Seed for point generation
    #[clap(long, default_value = "42")]
    pub seed: u64,

    /// Device class to emulate
    #[clap(long, value_enum, default_value = "unconstrained")]
    pub device: DeviceArg,

    /// Number of frames to simulate
    #[clap(short, long, default_value = "600")]
    pub frames: usize,

    /// Simulated time between frames in milliseconds
    #[clap(long, default_value = "16")]
    pub frame_interval_ms: u64,

    /// Zoom level of the first frame
    #[clap(long, default_value = "4.0")]
    pub zoom_start: f64,

    /// Zoom level of the last frame
    #[clap(long, default_value = "18.0")]
    pub zoom_end: f64,

    /// Screen width in physical pixels
    #[clap(long, default_value = "1080")]
    pub screen_width: u32,

    /// Screen height in physical pixels
    #[clap(long, default_value = "1920")]
    pub screen_height: u32,

    /// Physical pixels per logical pixel
    #[clap(long, default_value = "2.75")]
    pub density: f64,

    /// Latitude to center the session on (default: survey center)
    #[clap(long, allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude to center the session on (default: survey center)
    #[clap(long, allow_negative_numbers = true)]
    pub lon: Option<f64>,

    /// Recompute on every camera move instead of waiting for it to settle
    #[clap(long, default_value = "false")]
    pub no_debounce: bool,

    /// Write a JSON report of the session to this file
    #[clap(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

impl Settings {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            device: self.device.into(),
            display_density: self.density,
            debounce_refresh: !self.no_debounce,
            ..Default::default()
        }
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::parse_from(["survey-render"]);
        assert_eq!(settings.points, 100_000);
        assert_eq!(settings.device, DeviceArg::Unconstrained);
        assert!(settings.gpx_files.is_empty());
        let config = settings.engine_config();
        assert!(config.debounce_refresh);
        assert_eq!(config.display_density, 2.75);
    }

    #[test]
    fn test_constrained_device_flag() {
        let settings = Settings::parse_from([
            "survey-render",
            "--device",
            "constrained",
            "--no-debounce",
            "--lat",
            "-33.9",
        ]);
        let config = settings.engine_config();
        assert_eq!(config.device, DeviceClass::Constrained);
        assert!(!config.debounce_refresh);
        assert_eq!(settings.lat, Some(-33.9));
    }
}
