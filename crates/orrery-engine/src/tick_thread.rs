//! The paced tick loop run on the `orrery-tick` thread.
//!
//! The tick thread owns [`TickEngine`] exclusively (moved in at spawn)
//! and the sending side of the [`Publisher`]. The only state it shares
//! with the [`Scheduler`](crate::Scheduler) is [`Control`]: a stop flag,
//! the lifecycle state and the tick counter, all atomics.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, Thread};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::publisher::Publisher;
use crate::scheduler::SchedulerState;
use crate::tick::TickEngine;

/// Lock-free state shared between the scheduler handle and the tick thread.
#[derive(Debug)]
pub(crate) struct Control {
    state: AtomicU8,
    stop: AtomicBool,
    ticks: AtomicU64,
    tick_thread: OnceLock<Thread>,
}

impl Control {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(SchedulerState::Idle as u8),
            stop: AtomicBool::new(false),
            ticks: AtomicU64::new(0),
            tick_thread: OnceLock::new(),
        }
    }

    pub(crate) fn state(&self) -> SchedulerState {
        SchedulerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: SchedulerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Atomically move `from → to`. Returns whether the swap happened.
    pub(crate) fn transition(&self, from: SchedulerState, to: SchedulerState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Full stop request: `Idle → Stopped`, or raise the flag, move
    /// `Running → Stopping` and wake the tick thread. Never blocks.
    pub(crate) fn stop(&self) {
        if self.transition(SchedulerState::Idle, SchedulerState::Stopped) {
            return;
        }
        self.request_stop();
        self.transition(SchedulerState::Running, SchedulerState::Stopping);
        // Wake the tick thread if it is parked in a pacing sleep.
        if let Some(thread) = self.tick_thread.get() {
            thread.unpark();
        }
    }

    /// Record the tick thread so [`stop`](Self::stop) can wake it.
    pub(crate) fn set_tick_thread(&self, thread: Thread) {
        let _ = self.tick_thread.set(thread);
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub(crate) fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }
}

/// Everything the tick thread hands back when it exits.
pub(crate) struct TickThreadExit {
    pub engine: TickEngine,
    pub workers_joined: usize,
    pub publisher_joined: bool,
    pub overrun_events: u64,
}

/// State held by the tick thread's main loop.
pub(crate) struct TickThread {
    engine: TickEngine,
    publisher: Publisher,
    control: Arc<Control>,
    interval: Duration,
    max_ticks: Option<u64>,
    overrun_events: u64,
}

impl TickThread {
    pub(crate) fn new(
        engine: TickEngine,
        publisher: Publisher,
        control: Arc<Control>,
        interval: Duration,
        max_ticks: Option<u64>,
    ) -> Self {
        Self {
            engine,
            publisher,
            control,
            interval,
            max_ticks,
            overrun_events: 0,
        }
    }

    /// Main tick loop. Runs until a stop is requested or `max_ticks` is
    /// reached, then drains the publisher and joins the workers.
    ///
    /// Consumes self and returns the engine so the scheduler can recover
    /// it via `JoinHandle<TickThreadExit>`.
    pub(crate) fn run(mut self) -> TickThreadExit {
        let mut publisher_alive = true;
        loop {
            if self.control.stop_requested() || self.limit_reached() {
                break;
            }

            let tick_start = Instant::now();

            // 1-4. Dispatch, join, commit.
            let outcome = self.engine.step();
            self.control.ticks.store(outcome.tick.0, Ordering::Release);

            // 5. Publish. Blocks while the observer is behind, unless a
            // stop is requested.
            let published = self
                .publisher
                .publish(outcome.into(), || self.control.stop_requested());
            if !published && publisher_alive {
                warn!("publisher thread exited; later frames are not delivered");
                publisher_alive = false;
            }

            if self.limit_reached() {
                break;
            }

            // 6. Pace. An overrun proceeds immediately with no catch-up.
            // An interval past the end of the clock parks until stopped.
            let deadline = tick_start.checked_add(self.interval);
            if deadline.is_some_and(|d| Instant::now() >= d) {
                self.overrun_events += 1;
                continue;
            }
            self.park_until(deadline);
        }

        let publisher_joined = self.publisher.close(self.control.stop_requested());
        let workers_joined = self.engine.shutdown_workers();
        debug!(
            ticks = self.engine.current_tick().0,
            workers_joined, publisher_joined, "tick thread exiting"
        );
        self.control.set_state(SchedulerState::Stopped);

        TickThreadExit {
            engine: self.engine,
            workers_joined,
            publisher_joined,
            overrun_events: self.overrun_events,
        }
    }

    fn limit_reached(&self) -> bool {
        self.max_ticks
            .is_some_and(|max| self.engine.current_tick().0 >= max)
    }

    /// Sleep until `deadline` (or until stopped, if `None`), waking early
    /// on `unpark` from a stop request. Spurious wake-ups re-check both.
    fn park_until(&self, deadline: Option<Instant>) {
        loop {
            if self.control.stop_requested() {
                return;
            }
            let Some(deadline) = deadline else {
                thread::park();
                continue;
            };
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                return;
            };
            if remaining.is_zero() {
                return;
            }
            thread::park_timeout(remaining);
        }
    }
}
