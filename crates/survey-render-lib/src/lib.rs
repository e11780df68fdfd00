//! Survey Render Library - Adaptive point rendering for large survey datasets
//!
//! This library decides which of up to millions of geo-referenced survey points
//! to draw for the current map viewport, keeping every frame within a fixed
//! budget regardless of dataset size, zoom level, or device class.
//!
//! # Architecture
//!
//! - **[`PointSet`]**: Immutable, shared storage for the survey points
//! - **[`grid::SpatialGrid`]**: Uniform grid over the viewport, built per snapshot
//! - **[`sampler`]**: O(1) zoom-adaptive stride estimate
//! - **[`dedup::DensityFilter`]**: Suppresses points that would overlap on screen
//! - **[`Snapshot`]**: Immutable result of one sampling + indexing + density pass
//! - **[`cache::SnapshotCache`]**: Coalescing, cancellable background computation
//! - **[`scheduler::FrameScheduler`]**: Per-frame throttle, staleness check and culling
//! - **[`RenderEngine`]**: High-level facade for a map surface
//!
//! # Performance Characteristics
//!
//! - **Snapshot build**: O(N / stride) sampled points, O(budget) output
//! - **Frame draw**: O(frame cap), never waits on a computation
//! - **Memory**: O(N) for the points + O(grid² + N / stride) per snapshot

pub mod cache;
pub mod dedup;
mod engine;
pub mod generate;
pub mod grid;
pub mod line;
mod point;
pub mod projection;
pub mod sampler;
pub mod scheduler;
pub mod snapshot;
pub mod tiers;
pub mod utils;
mod viewport;

// Public API exports
pub use engine::{EngineConfig, EngineInfo, RenderEngine};
pub use line::{ScreenPolyline, SurveyLine};
pub use point::{Point, PointSet};
pub use projection::{Projector, ScreenCoord, WebMercatorProjector};
pub use scheduler::{DrawablePoint, FrameDraw, FrameInput, FrameOutcome, SkipReason};
pub use snapshot::{Snapshot, SnapshotMode};
pub use tiers::DeviceClass;
pub use viewport::{ScreenSize, ViewState, Viewport};

/// Error types for the engine
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The computation was superseded or cancelled; never surfaced to readers
    #[error("Computation cancelled")]
    Cancelled,

    #[error("Resource exhaustion while {stage}: {reason}")]
    ResourceExhaustion { stage: &'static str, reason: String },

    #[error("Snapshot computation panicked")]
    ComputationPanicked,

    #[error("Need at least {minimum} points, got {requested}")]
    TooFewPoints { requested: usize, minimum: usize },
}

pub type Result<T> = std::result::Result<T, EngineError>;
