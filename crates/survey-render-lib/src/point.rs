//! Survey point storage
//!
//! This module provides the immutable [`Point`] value and the shared
//! [`PointSet`] the engine reads during a computation. Point sets are only
//! ever replaced wholesale, never mutated in place.

use geo::{Coord, Rect};
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single geo-referenced survey point
///
/// Identity is by `id`; the position never changes after creation.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point {
    id: String,
    latitude: f64,
    longitude: f64,
    highlighted: bool,
    /// Display name (labels only)
    name: String,
    /// Survey feature code (labels only)
    code: String,
}

impl Point {
    pub fn new(id: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.into(),
            latitude,
            longitude,
            highlighted: false,
            name: String::new(),
            code: String::new(),
        }
    }

    pub fn with_highlighted(mut self, highlighted: bool) -> Self {
        self.highlighted = highlighted;
        self
    }

    pub fn with_label(mut self, name: impl Into<String>, code: impl Into<String>) -> Self {
        self.name = name.into();
        self.code = code.into();
        self
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    #[inline]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    #[inline]
    pub fn highlighted(&self) -> bool {
        self.highlighted
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Label text: the name, or the code when the point has no name
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.code
        } else {
            &self.name
        }
    }

    /// Position as a lon/lat coordinate
    #[inline]
    pub fn coord(&self) -> Coord<f64> {
        Coord {
            x: self.longitude,
            y: self.latitude,
        }
    }
}

/// Immutable, cheaply clonable collection of points with precomputed metadata
#[derive(Clone, Debug, Default)]
pub struct PointSet {
    points: Arc<[Point]>,
    /// Bounding box in lon/lat (None if empty or no finite point)
    bounding_box: Option<Rect<f64>>,
    /// Cached number of highlighted points
    highlighted: usize,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl PointSet {
    /// Create a point set, computing all metadata in a single pass
    pub fn new(points: Vec<Point>) -> Self {
        #[cfg(feature = "profiling")]
        profiling::scope!("point_set::new");

        let mut min_x = f64::INFINITY;
        let mut min_y = f64::INFINITY;
        let mut max_x = f64::NEG_INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        let mut found_valid_point = false;
        let mut highlighted = 0;

        for point in &points {
            if point.highlighted {
                highlighted += 1;
            }
            if !point.latitude.is_finite() || !point.longitude.is_finite() {
                continue;
            }
            found_valid_point = true;
            min_x = min_x.min(point.longitude);
            min_y = min_y.min(point.latitude);
            max_x = max_x.max(point.longitude);
            max_y = max_y.max(point.latitude);
        }

        let bounding_box = found_valid_point.then(|| {
            Rect::new(Coord { x: min_x, y: min_y }, Coord { x: max_x, y: max_y })
        });

        Self {
            points: points.into(),
            bounding_box,
            highlighted,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Point> {
        self.points.get(index)
    }

    #[inline]
    pub fn highlighted_count(&self) -> usize {
        self.highlighted
    }

    /// Bounding box in lon/lat coordinates
    #[inline]
    pub fn bounding_box(&self) -> Option<Rect<f64>> {
        self.bounding_box
    }

    /// Center of the bounding box as (lat, lon)
    pub fn center(&self) -> Option<(f64, f64)> {
        self.bounding_box.map(|bbox| {
            let center = bbox.center();
            (center.y, center.x)
        })
    }

    /// Whether two handles share the same underlying storage
    #[inline]
    pub fn ptr_eq(&self, other: &PointSet) -> bool {
        Arc::ptr_eq(&self.points, &other.points)
    }
}

impl From<Vec<Point>> for PointSet {
    fn from(points: Vec<Point>) -> Self {
        Self::new(points)
    }
}
