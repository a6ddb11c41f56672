//! Orrery: a concurrent tick scheduler for systems of orbiting bodies.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the Orrery sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use std::f64::consts::FRAC_PI_2;
//! use orrery::prelude::*;
//!
//! let system = BodySystem::new(vec![
//!     BodySpec::root(0.0, 0.0, 0.0).named("hub"),
//!     BodySpec::satellite(BodyId(0), FRAC_PI_2, 10.0, 0.0).named("rim"),
//! ])
//! .unwrap();
//! let config = EngineConfig {
//!     worker_count: Some(2),
//!     ..EngineConfig::default()
//! };
//! let mut engine = TickEngine::new(system, &config).unwrap();
//!
//! let outcome = engine.step();
//! let rim = outcome.snapshot.get(BodyId(1)).unwrap();
//! assert!(rim.x.abs() < 1e-9 && (rim.y - 10.0).abs() < 1e-9);
//! assert_eq!(outcome.tick, TickId(1));
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `orrery-core` | IDs, geometry, body specs, motion rules, errors |
//! | [`engine`] | `orrery-engine` | Snapshot store, worker pool, tick engine, scheduler |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and IDs (`orrery-core`).
///
/// Contains [`types::BodySpec`], the [`types::MotionRule`] trait and the
/// error types raised during construction and ticking.
pub use orrery_core as types;

/// Tick engine and scheduler (`orrery-engine`).
///
/// [`engine::TickEngine`] for synchronous stepping,
/// [`engine::Scheduler`] for paced background ticking.
pub use orrery_engine as engine;

/// Common imports for typical Orrery usage.
///
/// ```rust
/// use orrery::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use orrery_core::{
        Anchor, BodyId, BodySpec, CircularOrbit, Motion, MotionInput, MotionRule, Position,
        TickId,
    };

    // Errors
    pub use orrery_core::{BodyFault, ConstructionError};

    // Engine
    pub use orrery_engine::{
        BodySystem, ConfigError, EngineConfig, Frame, Observer, Scheduler, SchedulerError,
        SchedulerState, Snapshot, SnapshotStore, StopHandle, StopReport, TickEngine, TickMetrics,
    };
}
