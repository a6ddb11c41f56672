//! Concurrent tick scheduler for Orrery body systems.
//!
//! Provides the [`Scheduler`] that owns the simulation loop on a
//! background thread, the [`TickEngine`] that executes exactly one tick
//! (usable synchronously for lockstep runs), the [`SnapshotStore`]
//! through which committed positions are shared, the [`WorkerPool`]
//! that evaluates bodies in parallel, and the publisher that delivers
//! frames to a single [`Observer`].
//!
//! # Tick pipeline
//!
//! ```text
//! Tick Thread                 Worker Pool (N)            Publisher Thread
//!     |                           |                          |
//!     | store.latest() (tick N-1) |                          |
//!     |--dispatch(one task/body)->| read owner from N-1      |
//!     |                           | rule.advance()           |
//!     |<--(slot, outcome)---------| catch_unwind             |
//!     | join (barrier)            |                          |
//!     | store.commit(tick N)      |                          |
//!     |--Frame--------------------------------------------->| observer.on_frame()
//!     | park_timeout(interval - elapsed)                     |
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod metrics;
pub mod pool;
pub mod publisher;
pub mod scheduler;
pub mod store;
pub mod system;
pub mod tick;
mod tick_thread;

pub use config::{ConfigError, EngineConfig};
pub use metrics::TickMetrics;
pub use pool::{BodyJob, PendingTick, WorkerPool, WriteBuffer};
pub use publisher::{BodyWarning, Frame, Observer};
pub use scheduler::{Scheduler, SchedulerError, SchedulerState, StopHandle, StopReport};
pub use store::{Snapshot, SnapshotStore};
pub use system::{Body, BodySystem};
pub use tick::{TickEngine, TickOutcome};
