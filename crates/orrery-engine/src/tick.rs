//! Tick engine: one synchronous tick at a time.
//!
//! [`TickEngine`] owns the body table, the worker pool and the writing
//! side of the [`SnapshotStore`]. Each [`step()`](TickEngine::step) fans
//! the movable bodies out to the pool, waits at the join barrier, and
//! commits the complete write buffer as the next snapshot.
//!
//! # Lockstep use
//!
//! The engine has no background thread of its own. Call `step()` directly
//! for deterministic runs, or hand it to a [`Scheduler`](crate::Scheduler),
//! which moves it onto the tick thread and paces it.

use std::sync::Arc;
use std::time::Instant;

use orrery_core::{Position, TickId};
use tracing::{trace, warn};

use crate::config::{ConfigError, EngineConfig};
use crate::metrics::TickMetrics;
use crate::pool::{BodyJob, WorkerPool};
use crate::publisher::{BodyWarning, Frame};
use crate::store::{Snapshot, SnapshotStore};
use crate::system::BodySystem;

// ── TickOutcome ────────────────────────────────────────────────────

/// Result of one committed tick.
#[derive(Clone, Debug)]
pub struct TickOutcome {
    /// The tick just committed.
    pub tick: TickId,
    /// Snapshot committed by this tick.
    pub snapshot: Arc<Snapshot>,
    /// Snapshot the tick read from.
    pub previous: Arc<Snapshot>,
    /// Bodies that kept their previous position this tick.
    pub warnings: Vec<BodyWarning>,
    /// Timing for this tick.
    pub metrics: TickMetrics,
}

impl From<TickOutcome> for Frame {
    fn from(outcome: TickOutcome) -> Self {
        Frame {
            tick: outcome.tick,
            snapshot: outcome.snapshot,
            previous: outcome.previous,
            warnings: outcome.warnings,
            metrics: outcome.metrics,
        }
    }
}

// ── TickEngine ─────────────────────────────────────────────────────

/// Executes ticks against a validated [`BodySystem`].
pub struct TickEngine {
    system: BodySystem,
    store: Arc<SnapshotStore>,
    pool: WorkerPool,
    origin: Position,
    current_tick: TickId,
    fault_events: u64,
    last_metrics: TickMetrics,
}

impl TickEngine {
    /// Validate `config`, seed the store with the initial layout as tick 0,
    /// and start the worker pool.
    pub fn new(system: BodySystem, config: &EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let seed = Snapshot::new(TickId(0), system.initial_positions(config.origin));
        let store = Arc::new(SnapshotStore::new(config.history_capacity, seed));
        let pool = WorkerPool::new(config.resolved_worker_count())?;
        Ok(Self {
            system,
            store,
            pool,
            origin: config.origin,
            current_tick: TickId(0),
            fault_events: 0,
            last_metrics: TickMetrics::default(),
        })
    }

    /// Execute one tick: dispatch, join, commit.
    ///
    /// A body whose update fails keeps its previous position and angle;
    /// the failure is returned as a warning and never aborts the tick.
    pub fn step(&mut self) -> TickOutcome {
        let tick_start = Instant::now();
        let previous = self.store.latest();
        let tick = self.current_tick.next();

        // Zero-speed roots under the default rule cannot move.
        let jobs: Vec<BodyJob> = self
            .system
            .iter()
            .filter(|b| !b.is_static())
            .map(|b| BodyJob {
                id: b.id(),
                owner: b.owner(),
                angle: b.angle(),
                speed: b.speed(),
                radius: b.radius(),
                rule: Arc::clone(b.rule()),
            })
            .collect();
        let dispatched = jobs.len();

        let buffer = self.pool.dispatch(&previous, self.origin, jobs).join();
        let compute_us = tick_start.elapsed().as_micros() as u64;

        let commit_start = Instant::now();
        let mut positions = previous.positions().clone();
        let bodies = self.system.bodies_mut();
        for (id, motion) in buffer.motions() {
            positions.insert(id, motion.position);
            if let Some(body) = bodies.get_mut(id.index()) {
                body.set_angle(motion.angle);
            }
        }
        let snapshot = self.store.commit(Snapshot::new(tick, positions));
        let commit_us = commit_start.elapsed().as_micros() as u64;

        let warnings: Vec<BodyWarning> = buffer
            .faults()
            .iter()
            .map(|(body, fault)| {
                warn!(body = %body, tick = %tick, fault = %fault, "body update failed");
                BodyWarning {
                    body: *body,
                    tick,
                    fault: fault.clone(),
                }
            })
            .collect();
        self.fault_events += warnings.len() as u64;

        let metrics = TickMetrics {
            tick,
            total_us: tick_start.elapsed().as_micros() as u64,
            compute_us,
            commit_us,
            bodies_dispatched: dispatched,
            bodies_faulted: warnings.len(),
        };
        trace!(
            tick = %tick,
            total_us = metrics.total_us,
            compute_us,
            commit_us,
            dispatched,
            "tick committed"
        );

        self.current_tick = tick;
        self.last_metrics = metrics.clone();
        TickOutcome {
            tick,
            snapshot,
            previous,
            warnings,
            metrics,
        }
    }

    /// The last committed tick. `TickId(0)` before the first step.
    pub fn current_tick(&self) -> TickId {
        self.current_tick
    }

    /// Shared read handle to the snapshot store.
    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// The body table, with angles as of the last committed tick.
    pub fn system(&self) -> &BodySystem {
        &self.system
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.pool.size()
    }

    /// Body faults recorded since construction.
    pub fn fault_events(&self) -> u64 {
        self.fault_events
    }

    /// Metrics from the most recent tick.
    pub fn last_metrics(&self) -> &TickMetrics {
        &self.last_metrics
    }

    /// Join the worker pool. Later steps fault every body with
    /// [`BodyFault::WorkerLost`](orrery_core::BodyFault::WorkerLost).
    pub fn shutdown_workers(&mut self) -> usize {
        self.pool.shutdown()
    }
}

impl std::fmt::Debug for TickEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickEngine")
            .field("bodies", &self.system.len())
            .field("current_tick", &self.current_tick)
            .field("pool", &self.pool)
            .finish()
    }
}
