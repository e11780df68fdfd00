//! Geographic viewport and view state supplied by the host map surface

use geo::{Coord, Rect};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Geographic bounding box currently visible on screen
///
/// Bounds are inclusive. A viewport whose south edge is not strictly below
/// its north edge (or west not strictly left of east) is *degenerate*: it
/// has zero area and contains nothing.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Viewport {
    pub lat_south: f64,
    pub lat_north: f64,
    pub lon_west: f64,
    pub lon_east: f64,
}

/// Screen size in physical pixels
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ScreenSize {
    pub width: f64,
    pub height: f64,
}

/// A viewport together with the zoom level it was captured at
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ViewState {
    pub viewport: Viewport,
    pub zoom: f64,
}

impl Viewport {
    pub fn new(lat_south: f64, lat_north: f64, lon_west: f64, lon_east: f64) -> Self {
        Self {
            lat_south,
            lat_north,
            lon_west,
            lon_east,
        }
    }

    /// Build a viewport from a rectangle whose x axis is longitude and y axis latitude
    pub fn from_rect(rect: Rect<f64>) -> Self {
        Self::new(rect.min().y, rect.max().y, rect.min().x, rect.max().x)
    }

    /// The viewport as a lon/lat rectangle
    ///
    /// `Rect::new` normalizes corners, so only call this on non-degenerate viewports
    /// when the orientation matters.
    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            Coord {
                x: self.lon_west,
                y: self.lat_south,
            },
            Coord {
                x: self.lon_east,
                y: self.lat_north,
            },
        )
    }

    /// True when the bounds do not describe a positive area
    pub fn is_degenerate(&self) -> bool {
        !(self.lat_south < self.lat_north && self.lon_west < self.lon_east)
    }

    #[inline]
    pub fn width(&self) -> f64 {
        (self.lon_east - self.lon_west).max(0.0)
    }

    #[inline]
    pub fn height(&self) -> f64 {
        (self.lat_north - self.lat_south).max(0.0)
    }

    /// Area in square degrees (zero for degenerate viewports)
    #[inline]
    pub fn area(&self) -> f64 {
        if self.is_degenerate() {
            0.0
        } else {
            self.width() * self.height()
        }
    }

    /// Span of the larger side in degrees
    #[inline]
    pub fn extent(&self) -> f64 {
        self.width().max(self.height())
    }

    #[inline]
    pub fn center(&self) -> (f64, f64) {
        (
            (self.lat_south + self.lat_north) / 2.0,
            (self.lon_west + self.lon_east) / 2.0,
        )
    }

    /// Inclusive containment test; always false for degenerate viewports
    #[inline]
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        !self.is_degenerate()
            && lat >= self.lat_south
            && lat <= self.lat_north
            && lon >= self.lon_west
            && lon <= self.lon_east
    }

    /// Whether any edge moved by more than `tolerance_deg` relative to `other`
    pub fn drifted_from(&self, other: &Viewport, tolerance_deg: f64) -> bool {
        (self.lat_north - other.lat_north).abs() > tolerance_deg
            || (self.lat_south - other.lat_south).abs() > tolerance_deg
            || (self.lon_east - other.lon_east).abs() > tolerance_deg
            || (self.lon_west - other.lon_west).abs() > tolerance_deg
    }
}

impl ViewState {
    pub fn new(viewport: Viewport, zoom: f64) -> Self {
        Self { viewport, zoom }
    }

    /// Whether this view moved beyond the given tolerances relative to `other`
    pub fn drifted_from(&self, other: &ViewState, tolerance_deg: f64, zoom_tolerance: f64) -> bool {
        self.viewport.drifted_from(&other.viewport, tolerance_deg)
            || (self.zoom - other.zoom).abs() > zoom_tolerance
    }
}

impl ScreenSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Whether a pixel position lies on screen, allowing `margin` pixels of overhang
    #[inline]
    pub fn contains_with_margin(&self, x: f64, y: f64, margin: f64) -> bool {
        x >= -margin && x <= self.width + margin && y >= -margin && y <= self.height + margin
    }
}
