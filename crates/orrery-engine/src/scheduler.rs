//! Background scheduler: paced ticks on a dedicated thread.
//!
//! [`Scheduler`] moves a [`TickEngine`] onto the `orrery-tick` thread and
//! delivers every committed tick to an [`Observer`] on the
//! `orrery-publisher` thread. Readers on any thread sample positions
//! through [`Scheduler::store`].
//!
//! # Lifecycle
//!
//! ```text
//!  Idle --start()--> Running --request_stop()--> Stopping --tick drained--> Stopped
//!    |                  |                                                   ^
//!    |                  +------------------ max_ticks reached --------------+
//!    +------------------------------ request_stop() ------------------------+
//! ```
//!
//! `Stopped` is terminal. A stop request never interrupts a tick that is
//! already in flight; it only prevents the next one from starting.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use orrery_core::BodySpec;
use thiserror::Error;
use tracing::info;

use crate::config::{validate_interval, ConfigError, EngineConfig};
use crate::publisher::{Observer, Publisher};
use crate::store::SnapshotStore;
use crate::system::BodySystem;
use crate::tick::TickEngine;
use crate::tick_thread::{Control, TickThread, TickThreadExit};

// ── SchedulerState ─────────────────────────────────────────────────

/// Lifecycle state of a [`Scheduler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SchedulerState {
    /// Constructed, not started.
    Idle = 0,
    /// Ticking.
    Running = 1,
    /// Stop requested; the in-flight tick is finishing.
    Stopping = 2,
    /// Terminal. No further ticks will run.
    Stopped = 3,
}

impl SchedulerState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Running,
            2 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

// ── SchedulerError ─────────────────────────────────────────────────

/// Errors from scheduler lifecycle calls.
#[derive(Debug, PartialEq, Error)]
pub enum SchedulerError {
    /// `start` was called on a scheduler that is not idle.
    #[error("scheduler already started")]
    AlreadyStarted,
    /// `await_stopped` was called on a scheduler that never started.
    #[error("scheduler not started")]
    NotStarted,
    /// The requested interval or another setting is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The tick or publisher thread could not be spawned.
    #[error("thread spawn failed: {reason}")]
    ThreadSpawnFailed {
        /// Description of which thread failed.
        reason: String,
    },
    /// The tick thread panicked, so the engine could not be recovered.
    #[error("tick thread panicked; engine lost")]
    EngineRecoveryFailed,
}

// ── StopReport ─────────────────────────────────────────────────────

/// Summary returned by [`Scheduler::await_stopped`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StopReport {
    /// Ticks committed before the loop exited.
    pub ticks_completed: u64,
    /// Time spent waiting in `await_stopped`.
    pub total_ms: u64,
    /// Whether the tick thread was joined successfully.
    pub tick_joined: bool,
    /// Number of worker threads joined.
    pub workers_joined: usize,
    /// Whether the publisher thread was joined successfully.
    pub publisher_joined: bool,
    /// Body faults recorded over the run.
    pub body_fault_events: u64,
    /// Ticks whose compute ran past the target interval.
    pub overrun_events: u64,
}

// ── StopHandle ─────────────────────────────────────────────────────

/// Cloneable handle that can stop a [`Scheduler`] from any thread.
///
/// The owning thread may be blocked in
/// [`await_stopped`](Scheduler::await_stopped) while another thread
/// (a UI or signal handler, say) calls [`request_stop`](Self::request_stop).
#[derive(Clone, Debug)]
pub struct StopHandle {
    control: Arc<Control>,
}

// Compile-time assertion: StopHandle must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<StopHandle>();
};

impl StopHandle {
    /// Same as [`Scheduler::request_stop`].
    pub fn request_stop(&self) {
        self.control.stop();
    }

    /// Current lifecycle state of the scheduler.
    pub fn state(&self) -> SchedulerState {
        self.control.state()
    }
}

// ── Scheduler ──────────────────────────────────────────────────────

/// Runs a body system on a background thread at a target tick rate.
///
/// ```no_run
/// use std::time::Duration;
/// use orrery_core::{BodyId, BodySpec};
/// use orrery_engine::{EngineConfig, Frame, Scheduler};
///
/// let specs = vec![
///     BodySpec::root(0.0, 0.0, 0.0).named("sun"),
///     BodySpec::root(0.03, 130.0, 0.0).named("earth"),
///     BodySpec::satellite(BodyId(1), 0.1, 25.0, 0.0).named("moon"),
/// ];
/// let mut scheduler = Scheduler::new(specs, EngineConfig::default(), |frame: &Frame| {
///     println!("tick {} moved {}", frame.tick, frame.delta().count());
/// })?;
/// scheduler.start_with_interval(Duration::from_millis(20))?;
/// std::thread::sleep(Duration::from_millis(200));
/// scheduler.request_stop();
/// let report = scheduler.await_stopped()?;
/// assert!(report.tick_joined);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Scheduler {
    engine: Option<TickEngine>,
    observer: Option<Box<dyn Observer>>,
    store: Arc<SnapshotStore>,
    control: Arc<Control>,
    config: EngineConfig,
    tick_thread: Option<JoinHandle<TickThreadExit>>,
    report: Option<StopReport>,
}

// Compile-time assertion: Scheduler must be Send.
const _: fn() = || {
    fn assert<T: Send>() {}
    assert::<Scheduler>();
};

impl Scheduler {
    /// Validate `specs` and `config`, seed the store, and spawn the worker
    /// pool. No tick runs until [`start`](Self::start).
    pub fn new(
        specs: Vec<BodySpec>,
        config: EngineConfig,
        observer: impl Observer,
    ) -> Result<Self, ConfigError> {
        let system = BodySystem::new(specs)?;
        let engine = TickEngine::new(system, &config)?;
        Ok(Self {
            store: Arc::clone(engine.store()),
            engine: Some(engine),
            observer: Some(Box::new(observer)),
            control: Arc::new(Control::new()),
            config,
            tick_thread: None,
            report: None,
        })
    }

    /// Start ticking at the configured target interval.
    pub fn start(&mut self) -> Result<(), SchedulerError> {
        self.start_with_interval(self.config.target_interval)
    }

    /// Start ticking at `interval`.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::AlreadyStarted`] unless the scheduler is idle;
    /// [`SchedulerError::Config`] for a zero interval. If a thread cannot
    /// be spawned the scheduler moves to `Stopped`.
    pub fn start_with_interval(&mut self, interval: Duration) -> Result<(), SchedulerError> {
        if self.control.state() != SchedulerState::Idle {
            return Err(SchedulerError::AlreadyStarted);
        }
        validate_interval(interval)?;
        let (Some(engine), Some(observer)) = (self.engine.take(), self.observer.take()) else {
            return Err(SchedulerError::AlreadyStarted);
        };
        if !self
            .control
            .transition(SchedulerState::Idle, SchedulerState::Running)
        {
            self.engine = Some(engine);
            self.observer = Some(observer);
            return Err(SchedulerError::AlreadyStarted);
        }

        let publisher = match Publisher::spawn(observer, self.config.publish_queue) {
            Ok(p) => p,
            Err(e) => {
                self.engine = Some(engine);
                self.control.set_state(SchedulerState::Stopped);
                return Err(SchedulerError::ThreadSpawnFailed {
                    reason: e.to_string(),
                });
            }
        };

        let bodies = engine.system().len();
        let workers = engine.worker_count();
        let tick_thread = TickThread::new(
            engine,
            publisher,
            Arc::clone(&self.control),
            interval,
            self.config.max_ticks,
        );
        let handle = thread::Builder::new()
            .name("orrery-tick".into())
            .spawn(move || tick_thread.run())
            .map_err(|e| {
                self.control.set_state(SchedulerState::Stopped);
                SchedulerError::ThreadSpawnFailed {
                    reason: format!("tick thread: {e}"),
                }
            })?;
        self.control.set_tick_thread(handle.thread().clone());
        // A stop raised from a StopHandle before registration found
        // nothing to wake.
        if self.control.stop_requested() {
            handle.thread().unpark();
        }
        self.tick_thread = Some(handle);

        info!(
            bodies,
            workers,
            interval_ms = interval.as_secs_f64() * 1000.0,
            "scheduler started"
        );
        Ok(())
    }

    /// Ask the loop to stop after the in-flight tick. Never blocks.
    ///
    /// On an idle scheduler this moves straight to `Stopped`. Repeated
    /// calls are no-ops.
    pub fn request_stop(&self) {
        self.control.stop();
    }

    /// A handle that can request a stop from another thread.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            control: Arc::clone(&self.control),
        }
    }

    /// Block until the loop has exited and every thread is joined.
    ///
    /// Without a prior [`request_stop`](Self::request_stop) this waits for
    /// `max_ticks`, which may be never. Calling it again returns the same
    /// report.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::NotStarted`] on an idle scheduler.
    pub fn await_stopped(&mut self) -> Result<StopReport, SchedulerError> {
        if let Some(report) = &self.report {
            return Ok(report.clone());
        }
        if self.control.state() == SchedulerState::Idle {
            return Err(SchedulerError::NotStarted);
        }

        let start = Instant::now();
        let mut report = StopReport {
            tick_joined: true,
            publisher_joined: true,
            ..StopReport::default()
        };

        match self.tick_thread.take() {
            Some(handle) => match handle.join() {
                Ok(exit) => {
                    report.workers_joined = exit.workers_joined;
                    report.publisher_joined = exit.publisher_joined;
                    report.overrun_events = exit.overrun_events;
                    report.body_fault_events = exit.engine.fault_events();
                    self.engine = Some(exit.engine);
                }
                Err(_) => {
                    report.tick_joined = false;
                    report.publisher_joined = false;
                }
            },
            // Stopped without ever starting.
            None => {
                if let Some(engine) = self.engine.as_mut() {
                    report.workers_joined = engine.shutdown_workers();
                }
                self.observer.take();
            }
        }
        self.control.set_state(SchedulerState::Stopped);

        report.ticks_completed = self.control.ticks();
        report.total_ms = start.elapsed().as_millis() as u64;
        info!(
            ticks = report.ticks_completed,
            total_ms = report.total_ms,
            body_faults = report.body_fault_events,
            overruns = report.overrun_events,
            "scheduler stopped"
        );
        self.report = Some(report.clone());
        Ok(report)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SchedulerState {
        self.control.state()
    }

    /// Shared read-only handle to the snapshot store.
    pub fn store(&self) -> Arc<SnapshotStore> {
        Arc::clone(&self.store)
    }

    /// Ticks committed so far.
    pub fn ticks_completed(&self) -> u64 {
        self.control.ticks()
    }

    /// Stop (if needed) and hand back the engine for inspection or
    /// lockstep continuation.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::EngineRecoveryFailed`] if the tick thread panicked.
    pub fn into_engine(mut self) -> Result<TickEngine, SchedulerError> {
        if self.tick_thread.is_some() {
            self.request_stop();
            self.await_stopped()?;
        }
        self.engine
            .take()
            .ok_or(SchedulerError::EngineRecoveryFailed)
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if self.tick_thread.is_some() {
            self.request_stop();
            let _ = self.await_stopped();
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("state", &self.state())
            .field("ticks_completed", &self.ticks_completed())
            .field("store", &self.store)
            .finish()
    }
}
