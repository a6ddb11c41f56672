//! Frame delivery to a single observer on a dedicated thread.
//!
//! The tick thread hands each committed tick to the publisher as a
//! [`Frame`]. Frames travel over a bounded channel to the
//! `orrery-publisher` thread, which calls [`Observer::on_frame`] for each
//! one in tick order. The observer never runs concurrently with itself.
//! While running, a full queue blocks the tick thread, so no frame is
//! dropped. Once a stop is requested the wait gives way: frames queued
//! behind the newest one are discarded and only the newest is delivered.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{SendTimeoutError, Sender};
use orrery_core::{BodyFault, BodyId, Position, TickId};
use tracing::{debug, warn};

use crate::config::ConfigError;
use crate::metrics::TickMetrics;
use crate::store::Snapshot;

/// A body update that failed during a tick.
#[derive(Clone, Debug, PartialEq)]
pub struct BodyWarning {
    /// The body that kept its previous position.
    pub body: BodyId,
    /// The tick in which the update failed.
    pub tick: TickId,
    /// What went wrong.
    pub fault: BodyFault,
}

/// Everything the observer learns about one tick.
#[derive(Clone, Debug)]
pub struct Frame {
    /// The tick just committed.
    pub tick: TickId,
    /// Positions committed by this tick.
    pub snapshot: Arc<Snapshot>,
    /// Positions committed by the tick before.
    pub previous: Arc<Snapshot>,
    /// Per-body failures during this tick.
    pub warnings: Vec<BodyWarning>,
    /// Timing for this tick.
    pub metrics: TickMetrics,
}

impl Frame {
    /// `(id, position)` for every body, in registration order.
    pub fn bodies(&self) -> impl Iterator<Item = (BodyId, Position)> + '_ {
        self.snapshot.iter()
    }

    /// Bodies whose position changed since the previous snapshot.
    pub fn delta(&self) -> impl Iterator<Item = (BodyId, Position)> + '_ {
        self.snapshot
            .iter()
            .filter(|(id, p)| self.previous.get(*id) != Some(*p))
    }
}

/// Receives one [`Frame`] per committed tick.
///
/// Called only from the publisher thread, in tick order.
///
/// Any `FnMut(&Frame) + Send + 'static` closure is an observer.
pub trait Observer: Send + 'static {
    /// Handle one committed tick.
    fn on_frame(&mut self, frame: &Frame);

    /// Called once after the last frame, with the last tick delivered
    /// (`TickId(0)` if the scheduler never ticked).
    fn on_stop(&mut self, last_tick: TickId) {
        let _ = last_tick;
    }
}

impl<F> Observer for F
where
    F: FnMut(&Frame) + Send + 'static,
{
    fn on_frame(&mut self, frame: &Frame) {
        self(frame)
    }
}

// ── Publisher ──────────────────────────────────────────────────────

/// How long a blocked publish waits before re-checking for a stop.
const STOP_POLL: Duration = Duration::from_millis(2);

/// Owns the publisher thread and the sending half of its queue.
pub(crate) struct Publisher {
    frame_tx: Option<Sender<Frame>>,
    skip_backlog: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Publisher {
    /// Spawn the publisher thread with a queue of `capacity` frames.
    pub(crate) fn spawn(
        mut observer: Box<dyn Observer>,
        capacity: usize,
    ) -> Result<Self, ConfigError> {
        let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Frame>(capacity.max(1));
        let skip_backlog = Arc::new(AtomicBool::new(false));
        let skip = Arc::clone(&skip_backlog);
        let thread = thread::Builder::new()
            .name("orrery-publisher".into())
            .spawn(move || {
                let mut last_tick = TickId::default();
                let mut skipped = 0u64;
                while let Ok(frame) = frame_rx.recv() {
                    // Stopping: only the newest queued frame is delivered.
                    if skip.load(Ordering::Acquire) && !frame_rx.is_empty() {
                        skipped += 1;
                        continue;
                    }
                    last_tick = frame.tick;
                    let delivered =
                        panic::catch_unwind(AssertUnwindSafe(|| observer.on_frame(&frame)));
                    if delivered.is_err() {
                        warn!(tick = %frame.tick, "observer panicked; frame skipped");
                    }
                }
                if panic::catch_unwind(AssertUnwindSafe(|| observer.on_stop(last_tick))).is_err() {
                    warn!(tick = %last_tick, "observer panicked in on_stop");
                }
                debug!(last_tick = %last_tick, skipped, "publisher drained");
            })
            .map_err(|e| ConfigError::ThreadSpawnFailed {
                reason: format!("publisher: {e}"),
            })?;
        Ok(Self {
            frame_tx: Some(frame_tx),
            skip_backlog,
            thread: Some(thread),
        })
    }

    /// Queue a frame, blocking while the queue is full.
    ///
    /// While blocked, `stopping` is polled. Once it returns `true` the
    /// observer starts discarding older queued frames, so this frame gets
    /// a slot after at most the observer call already in progress.
    ///
    /// Returns `false` if the publisher thread is gone.
    pub(crate) fn publish(&self, frame: Frame, stopping: impl Fn() -> bool) -> bool {
        let Some(tx) = &self.frame_tx else {
            return false;
        };
        let mut frame = frame;
        loop {
            match tx.send_timeout(frame, STOP_POLL) {
                Ok(()) => return true,
                Err(SendTimeoutError::Disconnected(_)) => return false,
                Err(SendTimeoutError::Timeout(back)) => {
                    if stopping() {
                        self.skip_backlog.store(true, Ordering::Release);
                    }
                    frame = back;
                }
            }
        }
    }

    /// Close the queue and join the thread.
    ///
    /// With `skip_backlog` the observer receives only the newest queued
    /// frame; otherwise it drains every queued frame. Returns whether the
    /// thread was joined cleanly.
    pub(crate) fn close(&mut self, skip_backlog: bool) -> bool {
        if skip_backlog {
            self.skip_backlog.store(true, Ordering::Release);
        }
        self.frame_tx.take();
        match self.thread.take() {
            Some(handle) => handle.join().is_ok(),
            None => true,
        }
    }
}

impl Drop for Publisher {
    fn drop(&mut self) {
        self.close(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use std::sync::Mutex;

    fn snapshot(tick: u64, xs: &[f64]) -> Arc<Snapshot> {
        let positions: IndexMap<BodyId, Position> = xs
            .iter()
            .enumerate()
            .map(|(i, x)| (BodyId(i as u32), Position::new(*x, 0.0)))
            .collect();
        Arc::new(Snapshot::new(TickId(tick), positions))
    }

    fn frame(tick: u64) -> Frame {
        Frame {
            tick: TickId(tick),
            snapshot: snapshot(tick, &[0.0, tick as f64]),
            previous: snapshot(tick - 1, &[0.0, (tick - 1) as f64]),
            warnings: Vec::new(),
            metrics: TickMetrics::default(),
        }
    }

    #[test]
    fn delta_lists_only_moved_bodies() {
        let f = frame(3);
        let moved: Vec<BodyId> = f.delta().map(|(id, _)| id).collect();
        assert_eq!(moved, vec![BodyId(1)]);
        assert_eq!(f.bodies().count(), 2);
    }

    #[test]
    fn frames_arrive_in_order_and_on_stop_sees_last_tick() {
        struct Recorder {
            ticks: Arc<Mutex<Vec<TickId>>>,
            stopped: Arc<Mutex<Option<TickId>>>,
        }
        impl Observer for Recorder {
            fn on_frame(&mut self, frame: &Frame) {
                self.ticks.lock().unwrap().push(frame.tick);
            }
            fn on_stop(&mut self, last_tick: TickId) {
                *self.stopped.lock().unwrap() = Some(last_tick);
            }
        }

        let ticks = Arc::new(Mutex::new(Vec::new()));
        let stopped = Arc::new(Mutex::new(None));
        let mut publisher = Publisher::spawn(
            Box::new(Recorder {
                ticks: Arc::clone(&ticks),
                stopped: Arc::clone(&stopped),
            }),
            1,
        )
        .unwrap();

        for t in 1..=20 {
            assert!(publisher.publish(frame(t), || false));
        }
        assert!(publisher.close(false));

        let seen = ticks.lock().unwrap().clone();
        assert_eq!(seen, (1..=20).map(TickId).collect::<Vec<_>>());
        assert_eq!(*stopped.lock().unwrap(), Some(TickId(20)));
    }

    #[test]
    fn panicking_observer_keeps_receiving() {
        let count = Arc::new(Mutex::new(0u32));
        let c = Arc::clone(&count);
        let mut publisher = Publisher::spawn(
            Box::new(move |frame: &Frame| {
                *c.lock().unwrap() += 1;
                if frame.tick == TickId(2) {
                    panic!("observer failure");
                }
            }),
            4,
        )
        .unwrap();

        for t in 1..=4 {
            publisher.publish(frame(t), || false);
        }
        assert!(publisher.close(false));
        assert_eq!(*count.lock().unwrap(), 4);
    }

    #[test]
    fn publish_after_close_fails() {
        let mut publisher = Publisher::spawn(Box::new(|_: &Frame| {}), 1).unwrap();
        assert!(publisher.close(false));
        assert!(!publisher.publish(frame(1), || false));
    }

    #[test]
    fn closing_with_skip_delivers_only_the_newest_backlog_frame() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut publisher = Publisher::spawn(
            Box::new(move |frame: &Frame| {
                std::thread::sleep(Duration::from_millis(30));
                sink.lock().unwrap().push(frame.tick.0);
            }),
            4,
        )
        .unwrap();

        for t in 1..=8 {
            assert!(publisher.publish(frame(t), || false));
        }
        assert!(publisher.close(true));

        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen.last(), Some(&8));
        assert!(seen.len() < 8, "backlog was drained: {seen:?}");
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn blocked_publish_gives_way_once_stopping() {
        // The observer blocks until `release` is dropped.
        let (release, gate) = crossbeam_channel::bounded::<()>(0);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut publisher = Publisher::spawn(
            Box::new(move |frame: &Frame| {
                let _ = gate.recv();
                sink.lock().unwrap().push(frame.tick.0);
            }),
            2,
        )
        .unwrap();

        // Frame 1 is held in the observer; 2 and 3 fill the queue.
        for t in 1..=3 {
            assert!(publisher.publish(frame(t), || false));
        }
        let releaser = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            drop(release);
        });
        assert!(publisher.publish(frame(4), || true));
        releaser.join().unwrap();
        assert!(publisher.close(true));

        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen.first(), Some(&1));
        assert_eq!(seen.last(), Some(&4));
        assert!(!seen.contains(&2));
    }
}
