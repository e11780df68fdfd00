//! Zoom and device tier tables
//!
//! Every magic number the engine uses to scale its work with zoom level,
//! dataset size, and device class lives here as a named constant behind a
//! pure step function. Zoom bands are half-open: a band named `< 8` covers
//! every zoom strictly below 8.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Device class reported by the host surface
///
/// Constrained devices get smaller render budgets and more aggressive sampling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DeviceClass {
    Constrained,
    #[default]
    Unconstrained,
}

// --- Grid size by dataset size ---

pub const GRID_SIZE_SMALL: usize = 20;
pub const GRID_SIZE_MEDIUM: usize = 30;
pub const GRID_SIZE_LARGE: usize = 40;
pub const GRID_SIZE_HUGE: usize = 50;

pub const SMALL_DATASET: usize = 1_000;
pub const MEDIUM_DATASET: usize = 10_000;
pub const LARGE_DATASET: usize = 100_000;

/// Point sets below this size skip sampling and the grid
pub const INDIVIDUAL_MODE_THRESHOLD: usize = 100;

/// Point sets at or above this size use the spatial hash deduplicator
pub const SPATIAL_HASH_THRESHOLD: usize = MEDIUM_DATASET;

/// Number of grid cells per axis for a dataset of `total_points`
///
/// Larger datasets get a coarser grid so the per-cell lists stay short.
pub fn grid_size(total_points: usize) -> usize {
    if total_points < SMALL_DATASET {
        GRID_SIZE_SMALL
    } else if total_points < MEDIUM_DATASET {
        GRID_SIZE_MEDIUM
    } else if total_points < LARGE_DATASET {
        GRID_SIZE_LARGE
    } else {
        GRID_SIZE_HUGE
    }
}

// --- Render budget ---

/// Budget scale applied on constrained devices
pub const CONSTRAINED_BUDGET_SCALE: f64 = 0.3;

/// Unscaled points-per-snapshot cap for a zoom level
pub fn base_render_budget(zoom: f64) -> usize {
    if zoom < 6.0 {
        20
    } else if zoom < 8.0 {
        50
    } else if zoom < 10.0 {
        100
    } else if zoom < 12.0 {
        200
    } else if zoom < 14.0 {
        300
    } else {
        500
    }
}

/// Maximum number of points a snapshot may hold
///
/// Non-decreasing in `zoom` for a fixed `point_count`, and never more than
/// `point_count` itself.
pub fn render_budget(zoom: f64, point_count: usize, device: DeviceClass) -> usize {
    let base = base_render_budget(zoom);
    let cap = match device {
        DeviceClass::Unconstrained => base,
        DeviceClass::Constrained => (base as f64 * CONSTRAINED_BUDGET_SCALE).round() as usize,
    };
    cap.min(point_count)
}

// --- Sampling aggressiveness ---

/// Extra thinning multiplier for the sampling stride
///
/// Low zoom shows more geography, so sampling is more aggressive there.
pub fn zoom_factor(zoom: f64) -> f64 {
    if zoom < 6.0 {
        10.0
    } else if zoom < 8.0 {
        5.0
    } else if zoom < 10.0 {
        2.5
    } else if zoom < 12.0 {
        1.5
    } else if zoom < 14.0 {
        1.2
    } else {
        1.0
    }
}

/// Extra thinning multiplier for constrained devices
pub fn device_factor(device: DeviceClass, total_points: usize) -> f64 {
    match device {
        DeviceClass::Unconstrained => 1.0,
        DeviceClass::Constrained => {
            if total_points > LARGE_DATASET {
                5.0
            } else if total_points > MEDIUM_DATASET {
                4.0
            } else if total_points > SMALL_DATASET {
                3.0
            } else {
                2.0
            }
        }
    }
}

// --- Density culling distance ---

/// Upper clamp for the density culling distance, in degrees
pub const MAX_MIN_DISTANCE_DEG: f64 = 1e-2;

/// Lower clamp for the density culling distance up to [`FLOOR_RELAX_ZOOM`], in degrees
pub const MIN_DISTANCE_FLOOR_DEG: f64 = 1e-4;

/// Past this zoom the lower clamp halves with every zoom level
pub const FLOOR_RELAX_ZOOM: f64 = 14.0;

/// Divisor applied to the viewport extent to get the culling distance
pub fn min_distance_divisor(zoom: f64) -> f64 {
    if zoom < 8.0 {
        50.0
    } else if zoom < 10.0 {
        100.0
    } else if zoom < 12.0 {
        200.0
    } else if zoom < 14.0 {
        400.0
    } else if zoom < 17.0 {
        800.0
    } else {
        1600.0
    }
}

/// Lower clamp for the culling distance at `zoom`
///
/// Follows the map's ground resolution past street level so that points a
/// few metres apart stay distinct when fully zoomed in.
pub fn min_distance_floor(zoom: f64) -> f64 {
    if zoom > FLOOR_RELAX_ZOOM {
        MIN_DISTANCE_FLOOR_DEG * (FLOOR_RELAX_ZOOM - zoom).exp2()
    } else {
        MIN_DISTANCE_FLOOR_DEG
    }
}

/// Density culling distance in degrees for a viewport whose larger side spans `extent_deg`
pub fn min_distance(zoom: f64, extent_deg: f64) -> f64 {
    let floor = min_distance_floor(zoom);
    let raw = extent_deg / min_distance_divisor(zoom);
    if raw.is_nan() {
        return floor;
    }
    raw.clamp(floor, MAX_MIN_DISTANCE_DEG)
}

// --- Visual weight ---

/// Point radius in logical pixels (multiply by display density)
pub fn point_radius(zoom: f64) -> f64 {
    if zoom < 8.0 {
        1.0
    } else if zoom < 10.0 {
        1.5
    } else if zoom < 12.0 {
        2.0
    } else if zoom < 14.0 {
        2.5
    } else {
        3.0
    }
}

/// Whether the host should draw point labels
pub fn show_labels(zoom: f64, total_points: usize) -> bool {
    if total_points < INDIVIDUAL_MODE_THRESHOLD {
        zoom >= 12.0
    } else if total_points < SMALL_DATASET {
        zoom >= 14.0
    } else if total_points < MEDIUM_DATASET {
        zoom >= 15.0
    } else {
        false
    }
}

// --- Refresh debounce ---

/// Quiet period after the last camera move before a snapshot is recomputed
///
/// Small datasets refresh immediately.
pub fn refresh_debounce(device: DeviceClass, total_points: usize) -> Duration {
    let millis = if total_points <= INDIVIDUAL_MODE_THRESHOLD {
        0
    } else {
        match device {
            DeviceClass::Unconstrained => 500,
            DeviceClass::Constrained if total_points > MEDIUM_DATASET => 1_000,
            DeviceClass::Constrained if total_points > SMALL_DATASET => 800,
            DeviceClass::Constrained => 600,
        }
    };
    Duration::from_millis(millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_size_bands() {
        assert_eq!(grid_size(0), 20);
        assert_eq!(grid_size(999), 20);
        assert_eq!(grid_size(1_000), 30);
        assert_eq!(grid_size(9_999), 30);
        assert_eq!(grid_size(10_000), 40);
        assert_eq!(grid_size(99_999), 40);
        assert_eq!(grid_size(100_000), 50);
        assert_eq!(grid_size(10_000_000), 50);
    }

    #[test]
    fn test_base_budget_band_edges() {
        assert_eq!(base_render_budget(5.999), 20);
        assert_eq!(base_render_budget(6.0), 50);
        assert_eq!(base_render_budget(8.0), 100);
        assert_eq!(base_render_budget(10.0), 200);
        assert_eq!(base_render_budget(12.0), 300);
        assert_eq!(base_render_budget(14.0), 500);
        assert_eq!(base_render_budget(22.0), 500);
    }

    #[test]
    fn test_render_budget_constrained() {
        assert_eq!(render_budget(5.0, 1_000_000, DeviceClass::Unconstrained), 20);
        assert_eq!(render_budget(5.0, 1_000_000, DeviceClass::Constrained), 6);
        assert_eq!(render_budget(18.0, 1_000_000, DeviceClass::Constrained), 150);
    }

    #[test]
    fn test_render_budget_capped_by_point_count() {
        assert_eq!(render_budget(18.0, 50, DeviceClass::Unconstrained), 50);
        assert_eq!(render_budget(18.0, 0, DeviceClass::Unconstrained), 0);
    }

    #[test]
    fn test_render_budget_monotonic_in_zoom() {
        for device in [DeviceClass::Constrained, DeviceClass::Unconstrained] {
            for n in [10, 1_000, 1_000_000] {
                let mut previous = 0;
                for step in 0..=88 {
                    let zoom = step as f64 * 0.25;
                    let budget = render_budget(zoom, n, device);
                    assert!(budget >= previous, "budget dropped at zoom {zoom}");
                    previous = budget;
                }
            }
        }
    }

    #[test]
    fn test_zoom_factor_bands() {
        assert_eq!(zoom_factor(0.0), 10.0);
        assert_eq!(zoom_factor(6.0), 5.0);
        assert_eq!(zoom_factor(8.0), 2.5);
        assert_eq!(zoom_factor(10.0), 1.5);
        assert_eq!(zoom_factor(12.0), 1.2);
        assert_eq!(zoom_factor(14.0), 1.0);
    }

    #[test]
    fn test_device_factor_bands() {
        assert_eq!(device_factor(DeviceClass::Unconstrained, 10_000_000), 1.0);
        assert_eq!(device_factor(DeviceClass::Constrained, 1_000), 2.0);
        assert_eq!(device_factor(DeviceClass::Constrained, 1_001), 3.0);
        assert_eq!(device_factor(DeviceClass::Constrained, 10_001), 4.0);
        assert_eq!(device_factor(DeviceClass::Constrained, 100_001), 5.0);
    }

    #[test]
    fn test_min_distance_clamped() {
        // Whole-world view at low zoom hits the upper clamp
        assert_eq!(min_distance(2.0, 360.0), MAX_MIN_DISTANCE_DEG);
        // Tiny view at moderate zoom hits the lower clamp
        assert_eq!(min_distance(12.0, 0.001), MIN_DISTANCE_FLOOR_DEG);
        // In between the divisor applies
        let d = min_distance(9.0, 0.5);
        assert!((d - 0.005).abs() < 1e-12);
    }

    #[test]
    fn test_min_distance_floor_relaxes_past_street_level() {
        assert_eq!(min_distance_floor(14.0), MIN_DISTANCE_FLOOR_DEG);
        assert!((min_distance_floor(15.0) - 5e-5).abs() < 1e-15);
        assert!((min_distance_floor(18.0) - 6.25e-6).abs() < 1e-15);
    }

    #[test]
    fn test_min_distance_divisor_bands() {
        assert_eq!(min_distance_divisor(4.0), 50.0);
        assert_eq!(min_distance_divisor(8.0), 100.0);
        assert_eq!(min_distance_divisor(10.0), 200.0);
        assert_eq!(min_distance_divisor(12.0), 400.0);
        assert_eq!(min_distance_divisor(16.9), 800.0);
        assert_eq!(min_distance_divisor(17.0), 1600.0);
    }

    #[test]
    fn test_meter_apart_points_distinct_on_phone_at_zoom_18() {
        // A 1080x1920 screen at zoom 18 spans about 0.009 degrees vertically
        let one_meter = 1.0 / crate::utils::METERS_PER_DEGREE_LAT;
        assert!(min_distance(18.0, 0.009) < one_meter);
        assert!(min_distance(4.0, 40.0) > one_meter);
    }

    #[test]
    fn test_min_distance_nan_extent() {
        assert_eq!(min_distance(10.0, f64::NAN), MIN_DISTANCE_FLOOR_DEG);
    }

    #[test]
    fn test_point_radius_grows_with_zoom() {
        assert_eq!(point_radius(4.0), 1.0);
        assert_eq!(point_radius(9.0), 1.5);
        assert_eq!(point_radius(11.0), 2.0);
        assert_eq!(point_radius(13.0), 2.5);
        assert_eq!(point_radius(19.0), 3.0);
    }

    #[test]
    fn test_show_labels() {
        assert!(show_labels(12.0, 50));
        assert!(!show_labels(11.9, 50));
        assert!(show_labels(14.0, 500));
        assert!(!show_labels(14.0, 5_000));
        assert!(show_labels(15.0, 5_000));
        assert!(!show_labels(20.0, 50_000));
    }

    #[test]
    fn test_refresh_debounce_tiers() {
        assert_eq!(refresh_debounce(DeviceClass::Constrained, 100), Duration::ZERO);
        assert_eq!(refresh_debounce(DeviceClass::Unconstrained, 101), Duration::from_millis(500));
        assert_eq!(refresh_debounce(DeviceClass::Constrained, 1_000), Duration::from_millis(600));
        assert_eq!(refresh_debounce(DeviceClass::Constrained, 10_000), Duration::from_millis(800));
        assert_eq!(refresh_debounce(DeviceClass::Constrained, 10_001), Duration::from_millis(1_000));
    }
}
