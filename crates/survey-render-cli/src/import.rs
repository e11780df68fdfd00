//! GPX import: waypoints and track points become survey points

use crate::CliError;
use rayon::prelude::*;
use std::path::Path;
use survey_render_lib::Point;

/// Code given to points imported from track logs
const TRACK_CODE: &str = "TRK";

/// Code given to imported waypoints
const WAYPOINT_CODE: &str = "WPT";

/// Convert one parsed GPX document; ids are prefixed with `source`
pub fn points_from_gpx(source: &str, gpx: &gpx::Gpx) -> Vec<Point> {
    let mut points = Vec::new();

    for (i, waypoint) in gpx.waypoints.iter().enumerate() {
        let position = waypoint.point();
        let id = format!("{source}-W{}", i + 1);
        let name = waypoint.name.clone().unwrap_or_else(|| id.clone());
        points.push(
            Point::new(id, position.y(), position.x())
                .with_highlighted(true)
                .with_label(name, WAYPOINT_CODE),
        );
    }

    let track_points = gpx
        .tracks
        .iter()
        .flat_map(|track| &track.segments)
        .flat_map(|segment| &segment.points);
    for (i, waypoint) in track_points.enumerate() {
        let position = waypoint.point();
        let id = format!("{source}-T{}", i + 1);
        points.push(Point::new(id.clone(), position.y(), position.x()).with_label(id, TRACK_CODE));
    }

    points
}

/// Load GPX files in parallel and concatenate their points in file order
pub fn load_gpx_files<P: AsRef<Path> + Sync>(paths: &[P]) -> Result<Vec<Point>, CliError> {
    let per_file: Result<Vec<Vec<Point>>, CliError> = paths
        .par_iter()
        .map(|path| {
            let path = path.as_ref();
            let file = std::fs::File::open(path)?;
            let gpx = gpx::read(std::io::BufReader::new(file))?;
            let source = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "gpx".to_string());
            let points = points_from_gpx(&source, &gpx);
            tracing::info!(file = %path.display(), points = points.len(), "Imported GPX file");
            Ok(points)
        })
        .collect();

    Ok(per_file?.into_iter().flatten().collect())
}
