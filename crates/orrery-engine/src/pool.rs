//! Worker pool for per-body updates.
//!
//! Each worker receives one [`BodyJob`] at a time over a shared bounded
//! crossbeam channel, reads the body's owner from the previous committed
//! snapshot carried with the task, evaluates the body's [`MotionRule`],
//! and sends the outcome back on the per-tick reply channel.
//!
//! Workers never touch the [`SnapshotStore`](crate::SnapshotStore). All
//! results land in a [`WriteBuffer`] that the tick engine commits in one
//! step after [`PendingTick::join`] returns.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use indexmap::IndexMap;
use orrery_core::{BodyFault, BodyId, Motion, MotionInput, MotionRule, Position};
use smallvec::SmallVec;
use tracing::debug;

use crate::config::ConfigError;
use crate::store::Snapshot;

/// Kinematic state and rule of one body, as handed to a worker.
#[derive(Clone)]
pub struct BodyJob {
    /// Body being updated.
    pub id: BodyId,
    /// Owner to read from the previous snapshot; `None` for roots.
    pub owner: Option<BodyId>,
    /// Angle before this tick.
    pub angle: f64,
    /// Angular speed.
    pub speed: f64,
    /// Orbit radius.
    pub radius: f64,
    /// Update formula.
    pub rule: Arc<dyn MotionRule>,
}

impl std::fmt::Debug for BodyJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyJob")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("angle", &self.angle)
            .field("speed", &self.speed)
            .field("radius", &self.radius)
            .field("rule", &self.rule.name())
            .finish()
    }
}

type Reply = (usize, Result<Motion, BodyFault>);

struct Task {
    slot: usize,
    job: BodyJob,
    previous: Arc<Snapshot>,
    origin: Position,
    reply: Sender<Reply>,
}

// ── WriteBuffer ────────────────────────────────────────────────────

/// Results of one tick's compute phase, keyed by body.
#[derive(Clone, Debug, Default)]
pub struct WriteBuffer {
    motions: IndexMap<BodyId, Motion>,
    faults: SmallVec<[(BodyId, BodyFault); 4]>,
}

impl WriteBuffer {
    /// Successful result for `id`, if it produced one.
    pub fn get(&self, id: BodyId) -> Option<&Motion> {
        self.motions.get(&id)
    }

    /// Successful results in dispatch order.
    pub fn motions(&self) -> impl Iterator<Item = (BodyId, &Motion)> {
        self.motions.iter().map(|(id, m)| (*id, m))
    }

    /// Failed bodies in dispatch order.
    pub fn faults(&self) -> &[(BodyId, BodyFault)] {
        &self.faults
    }

    /// Number of successful results.
    pub fn len(&self) -> usize {
        self.motions.len()
    }

    /// Whether no body produced a result.
    pub fn is_empty(&self) -> bool {
        self.motions.is_empty()
    }
}

// ── PendingTick ────────────────────────────────────────────────────

/// Handle to a dispatched tick. [`join`](Self::join) is the barrier.
#[must_use = "a dispatched tick must be joined to collect its results"]
pub struct PendingTick {
    ids: Vec<BodyId>,
    reply_rx: Receiver<Reply>,
}

impl PendingTick {
    /// Number of bodies dispatched.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nothing was dispatched.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Block until every dispatched body has finished or failed.
    ///
    /// Bodies whose worker disappeared without replying are reported as
    /// [`BodyFault::WorkerLost`].
    pub fn join(self) -> WriteBuffer {
        let mut outcomes: Vec<Option<Result<Motion, BodyFault>>> = vec![None; self.ids.len()];
        let mut received = 0;
        while received < outcomes.len() {
            // Disconnected once every task (and its sender clone) is gone.
            let Ok((slot, outcome)) = self.reply_rx.recv() else {
                break;
            };
            if let Some(entry) = outcomes.get_mut(slot) {
                if entry.is_none() {
                    received += 1;
                }
                *entry = Some(outcome);
            }
        }

        let mut buffer = WriteBuffer {
            motions: IndexMap::with_capacity(outcomes.len()),
            faults: SmallVec::new(),
        };
        for (id, outcome) in self.ids.into_iter().zip(outcomes) {
            match outcome.unwrap_or(Err(BodyFault::WorkerLost)) {
                Ok(motion) => {
                    buffer.motions.insert(id, motion);
                }
                Err(fault) => buffer.faults.push((id, fault)),
            }
        }
        buffer
    }
}

// ── WorkerPool ─────────────────────────────────────────────────────

/// A fixed set of persistent worker threads, reused across ticks.
pub struct WorkerPool {
    task_tx: Option<Sender<Task>>,
    workers: Vec<JoinHandle<()>>,
    size: usize,
}

impl WorkerPool {
    /// Spawn `size` workers (at least one).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ThreadSpawnFailed`] if the OS refuses a
    /// thread. Workers spawned before the failure are joined.
    pub fn new(size: usize) -> Result<Self, ConfigError> {
        let size = size.max(1);
        let (task_tx, task_rx) = crossbeam_channel::bounded(size * 4);
        let mut pool = Self {
            task_tx: Some(task_tx),
            workers: Vec::with_capacity(size),
            size,
        };
        for i in 0..size {
            let task_rx = task_rx.clone();
            let handle = thread::Builder::new()
                .name(format!("orrery-worker-{i}"))
                .spawn(move || worker_loop(task_rx))
                .map_err(|e| ConfigError::ThreadSpawnFailed {
                    reason: format!("worker {i}: {e}"),
                })?;
            pool.workers.push(handle);
        }
        debug!(workers = size, "worker pool started");
        Ok(pool)
    }

    /// Number of worker threads.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Queue one task per job against `previous` and return the barrier.
    ///
    /// Every job reads owner positions from `previous` only.
    pub fn dispatch(
        &self,
        previous: &Arc<Snapshot>,
        origin: Position,
        jobs: Vec<BodyJob>,
    ) -> PendingTick {
        let ids: Vec<BodyId> = jobs.iter().map(|j| j.id).collect();
        // Room for every reply, so workers never block on send.
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(jobs.len().max(1));

        if let Some(task_tx) = &self.task_tx {
            for (slot, job) in jobs.into_iter().enumerate() {
                let task = Task {
                    slot,
                    job,
                    previous: Arc::clone(previous),
                    origin,
                    reply: reply_tx.clone(),
                };
                if task_tx.send(task).is_err() {
                    // No workers left; remaining slots report WorkerLost.
                    break;
                }
            }
        }
        drop(reply_tx);

        PendingTick { ids, reply_rx }
    }

    /// Close the task channel and join every worker.
    ///
    /// Returns the number of workers that exited cleanly. Calling this
    /// twice returns 0 the second time.
    pub fn shutdown(&mut self) -> usize {
        self.task_tx.take();
        let mut joined = 0;
        for handle in self.workers.drain(..) {
            if handle.join().is_ok() {
                joined += 1;
            }
        }
        if joined > 0 {
            debug!(joined, "worker pool stopped");
        }
        joined
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("size", &self.size)
            .field("running", &self.workers.len())
            .finish()
    }
}

// ── Worker ─────────────────────────────────────────────────────────

fn worker_loop(task_rx: Receiver<Task>) {
    while let Ok(task) = task_rx.recv() {
        let outcome = evaluate(&task);
        let _ = task.reply.send((task.slot, outcome));
    }
    // Channel closed: worker exits cleanly.
}

fn evaluate(task: &Task) -> Result<Motion, BodyFault> {
    let job = &task.job;
    let owner = match job.owner {
        Some(owner) => Some(task.previous.get(owner).ok_or_else(|| BodyFault::Rejected {
            reason: format!("owner {owner} missing from snapshot {}", task.previous.tick()),
        })?),
        None => None,
    };
    let input = MotionInput {
        owner,
        previous: task.previous.get(job.id).unwrap_or(task.origin),
        origin: task.origin,
        angle: job.angle,
        speed: job.speed,
        radius: job.radius,
    };

    let motion = panic::catch_unwind(AssertUnwindSafe(|| job.rule.advance(&input)))
        .map_err(|payload| BodyFault::Panicked {
            message: panic_message(payload.as_ref()),
        })??;

    if !motion.angle.is_finite() || !motion.position.is_finite() {
        return Err(BodyFault::NonFinite {
            angle: motion.angle,
            x: motion.position.x,
            y: motion.position.y,
        });
    }
    Ok(motion)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
