//! Density culling of points that would overlap on screen
//!
//! Two interchangeable strategies share one accept/reject contract:
//!
//! - **Bounded window**: each candidate is compared with the most recently
//!   accepted points only. Amortized O(1); distant duplicates can slip through.
//! - **Spatial hash**: accepted points occupy a `min_distance`-sized bucket;
//!   a candidate landing in an occupied bucket is rejected. The table is
//!   cleared once it grows past a fixed number of buckets, so memory stays
//!   bounded at the cost of a few extra acceptances right after a clear.
//!
//! Distances are compared per axis in degrees: a candidate is a duplicate
//! when both its latitude and longitude differences are below the threshold.

use crate::tiers;
use std::collections::{HashSet, VecDeque};

/// Accepted points compared against per candidate (window strategy)
pub const WINDOW_COMPARE: usize = 50;

/// Accepted points retained (window strategy)
pub const WINDOW_RETAIN: usize = 200;

/// Live bucket count above which the hash is cleared
pub const HASH_CLEAR_THRESHOLD: usize = 1_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DensityStrategy {
    BoundedWindow,
    SpatialHash,
}

impl DensityStrategy {
    /// Strategy for a dataset of `total_points`
    pub fn for_point_count(total_points: usize) -> Self {
        if total_points >= tiers::SPATIAL_HASH_THRESHOLD {
            Self::SpatialHash
        } else {
            Self::BoundedWindow
        }
    }
}

#[derive(Debug)]
enum FilterState {
    Window(VecDeque<(f64, f64)>),
    Hash(HashSet<(i64, i64)>),
}

/// Stateful accept/reject filter for one snapshot computation
#[derive(Debug)]
pub struct DensityFilter {
    min_distance: f64,
    state: FilterState,
    accepted: usize,
    rejected: usize,
    clears: usize,
}

impl DensityFilter {
    /// Create a filter suppressing points closer than `min_distance` degrees
    pub fn new(strategy: DensityStrategy, min_distance: f64) -> Self {
        let state = match strategy {
            DensityStrategy::BoundedWindow => {
                FilterState::Window(VecDeque::with_capacity(WINDOW_RETAIN + 1))
            }
            DensityStrategy::SpatialHash => FilterState::Hash(HashSet::new()),
        };
        Self {
            min_distance,
            state,
            accepted: 0,
            rejected: 0,
            clears: 0,
        }
    }

    /// Filter for a dataset size, zoom, and viewport extent
    pub fn for_view(total_points: usize, zoom: f64, viewport_extent: f64) -> Self {
        Self::new(
            DensityStrategy::for_point_count(total_points),
            tiers::min_distance(zoom, viewport_extent),
        )
    }

    pub fn strategy(&self) -> DensityStrategy {
        match self.state {
            FilterState::Window(_) => DensityStrategy::BoundedWindow,
            FilterState::Hash(_) => DensityStrategy::SpatialHash,
        }
    }

    #[inline]
    pub fn min_distance(&self) -> f64 {
        self.min_distance
    }

    /// Decide whether a candidate is kept; accepted candidates are remembered
    pub fn accept(&mut self, lat: f64, lon: f64) -> bool {
        let keep = match &mut self.state {
            FilterState::Window(recent) => {
                let d = self.min_distance;
                let duplicate = recent
                    .iter()
                    .rev()
                    .take(WINDOW_COMPARE)
                    .any(|&(a_lat, a_lon)| (lat - a_lat).abs() < d && (lon - a_lon).abs() < d);
                if !duplicate {
                    recent.push_back((lat, lon));
                    if recent.len() > WINDOW_RETAIN {
                        recent.pop_front();
                    }
                }
                !duplicate
            }
            FilterState::Hash(buckets) => {
                let key = bucket_key(lat, lon, self.min_distance);
                let fresh = buckets.insert(key);
                if fresh && buckets.len() > HASH_CLEAR_THRESHOLD {
                    buckets.clear();
                    self.clears += 1;
                }
                fresh
            }
        };

        if keep {
            self.accepted += 1;
        } else {
            self.rejected += 1;
        }
        keep
    }

    pub fn accepted(&self) -> usize {
        self.accepted
    }

    pub fn rejected(&self) -> usize {
        self.rejected
    }

    /// How many times the spatial hash was reset
    pub fn clears(&self) -> usize {
        self.clears
    }
}

#[inline]
fn bucket_key(lat: f64, lon: f64, cell: f64) -> (i64, i64) {
    ((lat / cell).floor() as i64, (lon / cell).floor() as i64)
}
