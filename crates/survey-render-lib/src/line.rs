//! Survey lines: polylines and polygons drawn under the points

use crate::projection::{Projector, ScreenCoord};
use crate::{Point, Viewport};
use geo::{Coord, LineString};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A named polyline through survey points; closed lines form a polygon
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SurveyLine {
    pub id: String,
    pub name: String,
    pub code: String,
    pub points: Vec<Point>,
    pub closed: bool,
}

/// A projected line ready to stroke
#[derive(Clone, Debug, PartialEq)]
pub struct ScreenPolyline {
    pub id: String,
    pub vertices: Vec<ScreenCoord>,
    pub closed: bool,
}

impl SurveyLine {
    pub fn new(id: impl Into<String>, points: Vec<Point>, closed: bool) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            code: String::new(),
            points,
            closed,
        }
    }

    pub fn with_label(mut self, name: impl Into<String>, code: impl Into<String>) -> Self {
        self.name = name.into();
        self.code = code.into();
        self
    }

    /// Vertices as (lat, lon); a closed line repeats its first vertex at the end
    pub fn vertices(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        let closing = self
            .closed
            .then(|| self.points.first())
            .flatten()
            .filter(|_| self.points.len() > 1);
        self.points
            .iter()
            .chain(closing)
            .map(|p| (p.latitude(), p.longitude()))
    }

    /// Visible when any vertex lies inside the viewport
    pub fn is_visible(&self, viewport: &Viewport) -> bool {
        self.points
            .iter()
            .any(|p| viewport.contains(p.latitude(), p.longitude()))
    }

    /// Geometry in lon/lat order
    pub fn to_line_string(&self) -> LineString<f64> {
        self.vertices()
            .map(|(lat, lon)| Coord { x: lon, y: lat })
            .collect()
    }
}

/// Lines with at least one vertex in view
pub fn visible_lines<'a>(
    lines: &'a [SurveyLine],
    viewport: &'a Viewport,
) -> impl Iterator<Item = &'a SurveyLine> + 'a {
    lines.iter().filter(move |line| line.is_visible(viewport))
}

/// Project a line; vertices that fail to project are dropped
///
/// Returns `None` when fewer than two vertices remain.
pub fn project_line(line: &SurveyLine, projector: &dyn Projector) -> Option<ScreenPolyline> {
    let vertices: Vec<ScreenCoord> = line
        .vertices()
        .filter_map(|(lat, lon)| projector.project(lat, lon))
        .collect();
    (vertices.len() >= 2).then(|| ScreenPolyline {
        id: line.id.clone(),
        vertices,
        closed: line.closed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(closed: bool) -> SurveyLine {
        let points = vec![
            Point::new("A", 0.0, 0.0),
            Point::new("B", 0.0, 1.0),
            Point::new("C", 1.0, 1.0),
            Point::new("D", 1.0, 0.0),
        ];
        SurveyLine::new("L1", points, closed)
    }

    fn identity(lat: f64, lon: f64) -> Option<ScreenCoord> {
        Some(ScreenCoord::new(lon, lat))
    }

    #[test]
    fn test_closed_line_repeats_first_vertex() {
        let open: Vec<_> = square(false).vertices().collect();
        assert_eq!(open.len(), 4);
        let closed: Vec<_> = square(true).vertices().collect();
        assert_eq!(closed.len(), 5);
        assert_eq!(closed.first(), closed.last());
        assert_eq!(square(true).to_line_string().0.len(), 5);
    }

    #[test]
    fn test_single_point_closed_line_not_doubled() {
        let line = SurveyLine::new("L", vec![Point::new("A", 0.0, 0.0)], true);
        assert_eq!(line.vertices().count(), 1);
        assert!(project_line(&line, &identity).is_none());
    }

    #[test]
    fn test_visibility() {
        let lines = vec![square(true), {
            let far = vec![Point::new("X", 50.0, 50.0), Point::new("Y", 51.0, 51.0)];
            SurveyLine::new("far", far, false)
        }];
        let viewport = Viewport::new(0.5, 1.5, 0.5, 1.5);
        let visible: Vec<_> = visible_lines(&lines, &viewport).map(|l| l.id.as_str()).collect();
        assert_eq!(visible, vec!["L1"]);
    }

    #[test]
    fn test_projection_drops_failed_vertices() {
        let projector = |lat: f64, lon: f64| (lat < 0.5).then(|| ScreenCoord::new(lon, lat));
        let projected = project_line(&square(false), &projector).unwrap();
        assert_eq!(projected.vertices.len(), 2);

        let nothing = |_: f64, _: f64| -> Option<ScreenCoord> { None };
        assert!(project_line(&square(true), &nothing).is_none());
    }

    #[test]
    fn test_default_label() {
        let line = square(true);
        assert_eq!(line.name, "L1");
        let labelled = line.with_label("Boundary", "BLD1");
        assert_eq!(labelled.code, "BLD1");
    }
}
