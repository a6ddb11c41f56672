//! Engine configuration, validation, and error types.
//!
//! [`EngineConfig`] is the tuning input for constructing a
//! [`TickEngine`](crate::tick::TickEngine) or
//! [`Scheduler`](crate::scheduler::Scheduler).
//! [`validate()`](EngineConfig::validate) checks structural invariants
//! at startup, before any thread is spawned.

use std::time::Duration;

use orrery_core::{ConstructionError, Position};
use thiserror::Error;

/// Default pacing target: roughly 60 ticks per second.
pub const DEFAULT_TARGET_INTERVAL: Duration = Duration::from_millis(16);

/// Upper bound on worker threads, whether requested or auto-detected.
pub const MAX_WORKERS: usize = 64;

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while building an engine or scheduler.
#[derive(Debug, PartialEq, Error)]
pub enum ConfigError {
    /// The body system failed validation.
    #[error("construction: {0}")]
    Construction(#[from] ConstructionError),
    /// The target interval is zero.
    #[error("target interval must be positive, got {interval:?}")]
    InvalidInterval {
        /// The rejected interval.
        interval: Duration,
    },
    /// Snapshot history is below the minimum of 2.
    #[error("history_capacity {configured} is below minimum of 2")]
    HistoryTooSmall {
        /// The configured size that was too small.
        configured: usize,
    },
    /// The publish queue has zero capacity.
    #[error("publish_queue must be at least 1")]
    PublishQueueZero,
    /// The system origin has a NaN or infinite coordinate.
    #[error("origin must be finite, got ({x}, {y})")]
    NonFiniteOrigin {
        /// Configured x.
        x: f64,
        /// Configured y.
        y: f64,
    },
    /// A background thread could not be spawned.
    #[error("thread spawn failed: {reason}")]
    ThreadSpawnFailed {
        /// Description of which thread failed.
        reason: String,
    },
}

// ── EngineConfig ───────────────────────────────────────────────────

/// Complete tuning surface for the tick engine and scheduler.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Pacing target between tick starts. Default: 16 ms.
    pub target_interval: Duration,
    /// Number of worker threads. `None` = available hardware parallelism,
    /// capped at [`MAX_WORKERS`] like an explicit value.
    pub worker_count: Option<usize>,
    /// Number of committed snapshots retained by the store. Default: 8. Minimum: 2.
    pub history_capacity: usize,
    /// Frames buffered between the tick thread and the observer. Default: 4.
    pub publish_queue: usize,
    /// Point that root bodies orbit. Default: `(0, 0)`.
    pub origin: Position,
    /// Stop on its own after this many ticks. Default: run until stopped.
    pub max_ticks: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            target_interval: DEFAULT_TARGET_INTERVAL,
            worker_count: None,
            history_capacity: 8,
            publish_queue: 4,
            origin: Position::ORIGIN,
            max_ticks: None,
        }
    }
}

impl EngineConfig {
    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_interval(self.target_interval)?;
        if self.history_capacity < 2 {
            return Err(ConfigError::HistoryTooSmall {
                configured: self.history_capacity,
            });
        }
        if self.publish_queue == 0 {
            return Err(ConfigError::PublishQueueZero);
        }
        if !self.origin.is_finite() {
            return Err(ConfigError::NonFiniteOrigin {
                x: self.origin.x,
                y: self.origin.y,
            });
        }
        Ok(())
    }

    /// Resolve the actual worker count, applying auto-detection if `None`.
    ///
    /// Both explicit and detected values are clamped to
    /// `[1, MAX_WORKERS]`. A pool with no workers could never finish a tick.
    pub fn resolved_worker_count(&self) -> usize {
        match self.worker_count {
            Some(n) => n.clamp(1, MAX_WORKERS),
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
                .clamp(1, MAX_WORKERS),
        }
    }
}

/// Reject a zero pacing interval.
pub(crate) fn validate_interval(interval: Duration) -> Result<(), ConfigError> {
    if interval.is_zero() {
        return Err(ConfigError::InvalidInterval { interval });
    }
    Ok(())
}
