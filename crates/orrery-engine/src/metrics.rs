//! Per-tick timing metrics.
//!
//! [`TickMetrics`] is filled in by [`TickEngine::step`](crate::TickEngine::step)
//! and attached to every published [`Frame`](crate::Frame).

use orrery_core::TickId;

/// Timing and work counts collected during a single tick.
///
/// All durations are in microseconds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickMetrics {
    /// The tick these metrics describe.
    pub tick: TickId,
    /// Wall-clock time for the whole tick, in microseconds.
    pub total_us: u64,
    /// Time from dispatch until the join barrier released, in microseconds.
    pub compute_us: u64,
    /// Time spent building and committing the snapshot, in microseconds.
    pub commit_us: u64,
    /// Bodies handed to the worker pool this tick.
    pub bodies_dispatched: usize,
    /// Bodies whose update failed this tick.
    pub bodies_faulted: usize,
}

impl TickMetrics {
    /// Whether every dispatched body updated cleanly.
    pub fn is_clean(&self) -> bool {
        self.bodies_faulted == 0
    }
}
