//! Seeded synthetic survey data
//!
//! Scatters points uniformly in a square around a base coordinate and links
//! them with a closed polygon line. Output depends only on the options, so the
//! same seed always yields the same survey regardless of thread count.

use crate::line::SurveyLine;
use crate::{EngineError, Point, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

/// Fewest points that still form a polygon
pub const MIN_GENERATED_POINTS: usize = 3;

/// Fallback base coordinate (lat, lon)
pub const DEFAULT_BASE: (f64, f64) = (28.7041, 77.1025);

/// Feature code given to generated points and lines
pub const GENERATED_CODE: &str = "BLD1";

/// Points generated per RNG stream
const CHUNK_SIZE: usize = 1 << 16;

/// Options for [`generate_points`]
#[derive(Clone, Debug, PartialEq)]
pub struct GenerateOptions {
    pub count: usize,
    pub center_lat: f64,
    pub center_lon: f64,
    /// Half-width of the scatter square, in degrees (~330 m by default)
    pub spread_deg: f64,
    /// Share of points to highlight; at least one is always highlighted
    pub highlight_ratio: f64,
    pub seed: u64,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            count: 1_000,
            center_lat: DEFAULT_BASE.0,
            center_lon: DEFAULT_BASE.1,
            spread_deg: 0.003,
            highlight_ratio: 0.3,
            seed: 0,
        }
    }
}

/// Independent stream per chunk so chunks can be generated in parallel
fn chunk_rng(seed: u64, chunk: usize) -> StdRng {
    StdRng::seed_from_u64(seed ^ (chunk as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

fn highlight_flags(options: &GenerateOptions) -> Vec<bool> {
    let wanted = ((options.count as f64 * options.highlight_ratio) as usize)
        .max(1)
        .min(options.count);
    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut flags = vec![false; options.count];
    for index in rand::seq::index::sample(&mut rng, options.count, wanted) {
        flags[index] = true;
    }
    flags
}

/// Generate `options.count` points named `P1..PN`
pub fn generate_points(options: &GenerateOptions) -> Result<Vec<Point>> {
    #[cfg(feature = "profiling")]
    profiling::scope!("generate::generate_points");

    if options.count < MIN_GENERATED_POINTS {
        return Err(EngineError::TooFewPoints {
            requested: options.count,
            minimum: MIN_GENERATED_POINTS,
        });
    }

    let flags = highlight_flags(options);
    let spread = options.spread_deg.abs();
    let chunks = options.count.div_ceil(CHUNK_SIZE);

    let points = (0..chunks)
        .into_par_iter()
        .flat_map_iter(|chunk| {
            let mut rng = chunk_rng(options.seed, chunk);
            let start = chunk * CHUNK_SIZE;
            let end = (start + CHUNK_SIZE).min(options.count);
            let flags = &flags;
            (start..end).map(move |i| {
                let (lat_offset, lon_offset) = if spread > 0.0 {
                    (
                        rng.random_range(-spread..spread),
                        rng.random_range(-spread..spread),
                    )
                } else {
                    (0.0, 0.0)
                };
                let id = format!("P{}", i + 1);
                Point::new(
                    id.clone(),
                    options.center_lat + lat_offset,
                    options.center_lon + lon_offset,
                )
                .with_highlighted(flags[i])
                .with_label(id, GENERATED_CODE)
            })
        })
        .collect();

    Ok(points)
}

/// Closed polygon through `points` in order
pub fn polygon_line(points: &[Point]) -> SurveyLine {
    SurveyLine::new(format!("LINE_P1_P{}", points.len()), points.to_vec(), true)
        .with_label("Polygon Line", GENERATED_CODE)
}

/// Points plus the polygon connecting them
pub fn generate_survey(options: &GenerateOptions) -> Result<(Vec<Point>, SurveyLine)> {
    let points = generate_points(options)?;
    let line = polygon_line(&points);
    tracing::info!(
        points = points.len(),
        seed = options.seed,
        "Generated synthetic survey"
    );
    Ok((points, line))
}
