//! Geographic to screen projection seam
//!
//! The host map surface owns the real camera; the engine only needs a way to
//! turn a WGS84 position into a pixel. Any closure of the right shape is a
//! [`Projector`], and [`WebMercatorProjector`] covers hosts that use standard
//! 256 px Web Mercator tiles.

use crate::{Viewport, utils};

/// Screen position in pixels, origin at the top-left corner
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenCoord {
    pub x: f64,
    pub y: f64,
}

/// Projects a geographic coordinate onto the screen
///
/// Returning `None` signals a projection failure for that coordinate only;
/// the caller skips the point and carries on with the batch.
pub trait Projector {
    fn project(&self, latitude: f64, longitude: f64) -> Option<ScreenCoord>;
}

impl<F> Projector for F
where
    F: Fn(f64, f64) -> Option<ScreenCoord>,
{
    #[inline]
    fn project(&self, latitude: f64, longitude: f64) -> Option<ScreenCoord> {
        self(latitude, longitude)
    }
}

/// Web Mercator projection anchored at the north-west corner of a viewport
#[derive(Clone, Copy, Debug)]
pub struct WebMercatorProjector {
    /// Mercator x of the screen's left edge
    origin_x: f64,
    /// Mercator y of the screen's top edge
    origin_y: f64,
    /// Pixels per mercator meter at the current zoom
    scale: f64,
}

impl ScreenCoord {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl WebMercatorProjector {
    /// Projector for a screen showing `viewport` at `zoom`
    pub fn new(viewport: &Viewport, zoom: f64) -> Self {
        let origin = utils::wgs84_to_mercator(viewport.lat_north, viewport.lon_west);
        Self {
            origin_x: origin.x(),
            origin_y: origin.y(),
            scale: utils::pixels_per_meter(zoom),
        }
    }
}

impl Projector for WebMercatorProjector {
    fn project(&self, latitude: f64, longitude: f64) -> Option<ScreenCoord> {
        if !latitude.is_finite()
            || !longitude.is_finite()
            || latitude.abs() > utils::MAX_LATITUDE
        {
            return None;
        }
        let mercator = utils::wgs84_to_mercator(latitude, longitude);
        Some(ScreenCoord {
            x: (mercator.x() - self.origin_x) * self.scale,
            y: (self.origin_y - mercator.y()) * self.scale,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_north_west_corner_is_origin() {
        let viewport = Viewport::new(28.0, 29.0, 77.0, 78.0);
        let projector = WebMercatorProjector::new(&viewport, 10.0);
        let corner = projector.project(29.0, 77.0).unwrap();
        assert!(corner.x.abs() < 1e-6);
        assert!(corner.y.abs() < 1e-6);
    }

    #[test]
    fn test_screen_axes() {
        let viewport = Viewport::new(28.0, 29.0, 77.0, 78.0);
        let projector = WebMercatorProjector::new(&viewport, 10.0);
        let south_east = projector.project(28.0, 78.0).unwrap();
        // East is right, south is down
        assert!(south_east.x > 0.0);
        assert!(south_east.y > 0.0);
    }

    #[test]
    fn test_projection_failure_on_bad_input() {
        let viewport = Viewport::new(28.0, 29.0, 77.0, 78.0);
        let projector = WebMercatorProjector::new(&viewport, 10.0);
        assert!(projector.project(f64::NAN, 77.5).is_none());
        assert!(projector.project(89.9, 77.5).is_none());
    }

    #[test]
    fn test_closure_projector() {
        let projector = |lat: f64, lon: f64| Some(ScreenCoord::new(lon * 10.0, lat * 10.0));
        let coord = projector.project(1.0, 2.0).unwrap();
        assert_eq!(coord, ScreenCoord::new(20.0, 10.0));
    }
}
