//! Zoom-adaptive sampling stride
//!
//! The stride is an O(1) estimate: it never looks at the points themselves.
//! It assumes the viewport holds roughly `viewport_area / 180` of the data and
//! thins harder at low zoom and on constrained devices.

use crate::{DeviceClass, tiers};

/// Lower bound for the safety factor
const MIN_SAFETY_FACTOR: f64 = 2.0;

/// Reference area (square degrees) at which the whole dataset is assumed visible
const FULL_VISIBILITY_AREA: f64 = 180.0;

/// Smallest visible ratio the estimate will assume
const MIN_VISIBLE_RATIO: f64 = 0.01;

/// Inputs to the stride estimate
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampleParams {
    pub total_points: usize,
    /// Viewport area in square degrees
    pub viewport_area: f64,
    pub render_budget: usize,
    pub zoom: f64,
    pub device: DeviceClass,
}

/// Compensation for the share of points expected to fall outside the viewport
pub fn safety_factor(viewport_area: f64) -> f64 {
    let ratio = if viewport_area.is_nan() {
        MIN_VISIBLE_RATIO
    } else {
        (viewport_area / FULL_VISIBILITY_AREA).clamp(MIN_VISIBLE_RATIO, 1.0)
    };
    MIN_SAFETY_FACTOR.max(1.0 / ratio)
}

/// Keep-one-in-N stride, always at least 1
///
/// Returns 1 whenever the whole dataset fits in the budget.
pub fn sample_stride(params: SampleParams) -> usize {
    if params.total_points <= params.render_budget {
        return 1;
    }
    let budget = params.render_budget.max(1) as f64;
    let stride = params.total_points as f64 / (budget * safety_factor(params.viewport_area))
        * tiers::zoom_factor(params.zoom)
        * tiers::device_factor(params.device, params.total_points);
    (stride.round() as usize).max(1)
}
