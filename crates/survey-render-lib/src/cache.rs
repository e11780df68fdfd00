//! Snapshot cache with coalescing, cancellation and atomic publish
//!
//! Every [`SnapshotCache::request`] bumps a generation counter and cancels the
//! computation still in flight. A finished computation is published only if
//! its generation is still the newest; the check happens inside the
//! `watch` channel's write lock so publishing is last-write-wins.
//!
//! Each computation runs in two tasks: the compute task itself and a
//! supervisor awaiting its `JoinHandle`. The supervisor turns failures and
//! panics into a degraded snapshot so readers are never left without one.

use crate::snapshot::{self, BuildOptions, Snapshot, SnapshotMode};
use crate::{EngineError, PointSet, Result, ViewState};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Published value: `None` until a computation completes or after invalidation
pub type Published = Option<Arc<Snapshot>>;

struct InFlight {
    generation: u64,
    token: CancellationToken,
    /// Taken once awaited
    supervisor: Option<JoinHandle<()>>,
}

/// Owner of the current snapshot and the (single) in-flight computation
pub struct SnapshotCache {
    runtime: Handle,
    options: BuildOptions,
    latest_generation: Arc<AtomicU64>,
    publisher: Arc<watch::Sender<Published>>,
    in_flight: Option<InFlight>,
}

/// Everything a supervisor needs to publish its result
struct PublishContext {
    publisher: Arc<watch::Sender<Published>>,
    latest_generation: Arc<AtomicU64>,
    generation: u64,
    token: CancellationToken,
    points: PointSet,
    view: ViewState,
    options: BuildOptions,
}

impl PublishContext {
    fn is_current(&self) -> bool {
        self.latest_generation.load(Ordering::SeqCst) == self.generation
    }

    /// Publish if still the newest generation; returns whether it was stored
    fn publish(&self, snapshot: Snapshot) -> bool {
        let snapshot = Arc::new(snapshot);
        self.publisher.send_if_modified(|slot| {
            if self.is_current() {
                *slot = Some(snapshot);
                true
            } else {
                false
            }
        })
    }

    fn publish_degraded(&self) {
        if self.token.is_cancelled() || !self.is_current() {
            return;
        }
        let snapshot = snapshot::build_unindexed(
            &self.points,
            &self.view,
            &self.options,
            self.generation,
            SnapshotMode::Degraded,
        );
        tracing::warn!(
            generation = self.generation,
            points = snapshot.len(),
            "Publishing degraded snapshot"
        );
        self.publish(snapshot);
    }
}

impl SnapshotCache {
    pub fn new(runtime: Handle, options: BuildOptions) -> Self {
        let (publisher, _) = watch::channel(None);
        Self {
            runtime,
            options,
            latest_generation: Arc::new(AtomicU64::new(0)),
            publisher: Arc::new(publisher),
            in_flight: None,
        }
    }

    /// Start computing a snapshot, superseding any computation in flight
    ///
    /// Returns the generation assigned to the request.
    pub fn request(&mut self, points: PointSet, view: ViewState) -> u64 {
        let generation = self.latest_generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.cancel_in_flight();

        let token = CancellationToken::new();
        let options = self.options;
        tracing::debug!(
            generation,
            points = points.len(),
            zoom = view.zoom,
            "Snapshot computation requested"
        );

        let compute = self.runtime.spawn(compute(
            points.clone(),
            view,
            options,
            generation,
            token.clone(),
        ));
        let context = PublishContext {
            publisher: Arc::clone(&self.publisher),
            latest_generation: Arc::clone(&self.latest_generation),
            generation,
            token: token.clone(),
            points,
            view,
            options,
        };
        let supervisor = self.runtime.spawn(supervise(compute, context));

        self.in_flight = Some(InFlight {
            generation,
            token,
            supervisor: Some(supervisor),
        });
        generation
    }

    /// Most recently published snapshot
    pub fn latest(&self) -> Published {
        self.publisher.borrow().clone()
    }

    /// Receiver notified on every publish and invalidation
    pub fn subscribe(&self) -> watch::Receiver<Published> {
        self.publisher.subscribe()
    }

    /// Drop the published snapshot and abandon any computation in flight
    pub fn invalidate(&mut self) {
        self.latest_generation.fetch_add(1, Ordering::SeqCst);
        self.cancel_in_flight();
        self.publisher.send_replace(None);
        tracing::debug!("Snapshot cache invalidated");
    }

    /// Cancel the computation in flight, keeping the published snapshot
    pub fn cancel(&mut self) {
        self.latest_generation.fetch_add(1, Ordering::SeqCst);
        self.cancel_in_flight();
    }

    fn cancel_in_flight(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            if in_flight.supervisor.as_ref().is_some_and(|s| !s.is_finished()) {
                tracing::debug!(
                    generation = in_flight.generation,
                    "Cancelling in-flight snapshot computation"
                );
            }
            in_flight.token.cancel();
        }
    }

    /// Whether a computation is still running
    pub fn is_computing(&self) -> bool {
        self.in_flight
            .as_ref()
            .and_then(|in_flight| in_flight.supervisor.as_ref())
            .is_some_and(|supervisor| !supervisor.is_finished())
    }

    /// Generation of the newest request
    pub fn generation(&self) -> u64 {
        self.latest_generation.load(Ordering::SeqCst)
    }

    /// Wait until the newest computation has published (or given up)
    pub async fn settle(&mut self) {
        let supervisor = self
            .in_flight
            .as_mut()
            .and_then(|in_flight| in_flight.supervisor.take());
        if let Some(supervisor) = supervisor {
            if let Err(e) = supervisor.await {
                tracing::warn!("Snapshot supervisor failed: {e}");
            }
        }
    }
}

impl Drop for SnapshotCache {
    fn drop(&mut self) {
        self.cancel_in_flight();
    }
}

async fn compute(
    points: PointSet,
    view: ViewState,
    options: BuildOptions,
    generation: u64,
    token: CancellationToken,
) -> Result<Snapshot> {
    if let Some(snapshot) = snapshot::build_trivial(&points, &view, &options, generation) {
        return Ok(snapshot);
    }
    let indexed = snapshot::index_phase(&points, &view, &options, &token)?;
    tokio::task::yield_now().await;
    snapshot::select_phase(&points, &view, indexed, generation, &token)
}

async fn supervise(task: JoinHandle<Result<Snapshot>>, context: PublishContext) {
    match task.await {
        Ok(Ok(snapshot)) => {
            let points = snapshot.len();
            if context.publish(snapshot) {
                tracing::debug!(generation = context.generation, points, "Snapshot published");
            } else {
                tracing::debug!(generation = context.generation, "Superseded snapshot discarded");
            }
        }
        Ok(Err(EngineError::Cancelled)) => {
            tracing::debug!(generation = context.generation, "Snapshot computation cancelled");
        }
        Ok(Err(e)) => {
            tracing::warn!(generation = context.generation, "Snapshot computation failed: {e}");
            context.publish_degraded();
        }
        Err(e) if e.is_cancelled() => {
            tracing::debug!(generation = context.generation, "Snapshot task aborted");
        }
        Err(e) => {
            tracing::warn!(
                generation = context.generation,
                "{}: {e}",
                EngineError::ComputationPanicked
            );
            context.publish_degraded();
        }
    }
}
