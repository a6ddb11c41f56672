//! Core types and traits for the Orrery tick scheduler.
//!
//! This is the leaf crate with no internal dependencies. It defines the
//! vocabulary shared by the rest of the workspace: body and tick
//! identifiers, positions, body specifications, the [`MotionRule`] seam
//! and the error types raised at construction and per-body update time.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod body;
pub mod error;
pub mod geometry;
pub mod id;

pub use body::{Anchor, BodySpec, CircularOrbit, Motion, MotionInput, MotionRule};
pub use error::{BodyFault, ConstructionError, SpecField};
pub use geometry::{wrap_angle, Position, FULL_TURN};
pub use id::{BodyId, TickId};
