//! Error types for the Orrery workspace.
//!
//! Two families: [`ConstructionError`] is raised synchronously while a
//! body system is being built and is fatal to that construction call;
//! [`BodyFault`] is recorded against a single body during a tick and is
//! never fatal to the loop.

use std::fmt;

use thiserror::Error;

use crate::id::BodyId;

/// A numeric field of a body specification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpecField {
    /// Angular speed in radians per tick.
    Speed,
    /// Orbit radius.
    Radius,
    /// Visual diameter.
    Diameter,
    /// Initial angle in radians.
    InitialAngle,
}

impl fmt::Display for SpecField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Speed => "speed",
            Self::Radius => "radius",
            Self::Diameter => "diameter",
            Self::InitialAngle => "initial_angle",
        };
        f.write_str(name)
    }
}

/// Errors detected while validating a list of body specifications.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConstructionError {
    /// No bodies were registered.
    #[error("body system has no bodies")]
    Empty,
    /// More bodies than fit in a [`BodyId`].
    #[error("body count {count} exceeds u32::MAX")]
    TooManyBodies {
        /// The number of specifications supplied.
        count: usize,
    },
    /// A body names itself as its owner.
    #[error("body {body} cannot own itself")]
    SelfOwnership {
        /// The offending body.
        body: BodyId,
    },
    /// The owner is not registered before this body.
    ///
    /// Owners must precede their satellites, which also rules out cycles.
    #[error("body {body} references owner {owner}, which is not registered before it")]
    UnknownOwner {
        /// The satellite.
        body: BodyId,
        /// The unresolvable owner reference.
        owner: BodyId,
    },
    /// The owner is itself a satellite (ownership depth would exceed 2).
    #[error("body {body} references owner {owner}, which is itself a satellite")]
    OwnerIsSatellite {
        /// The satellite.
        body: BodyId,
        /// The owner that already has an owner.
        owner: BodyId,
    },
    /// A numeric field is NaN or infinite.
    #[error("body {body} has non-finite {field}")]
    NonFinite {
        /// The offending body.
        body: BodyId,
        /// Which field was non-finite.
        field: SpecField,
    },
    /// Orbit radius is negative.
    #[error("body {body} has negative radius {radius}")]
    NegativeRadius {
        /// The offending body.
        body: BodyId,
        /// The rejected radius.
        radius: f64,
    },
    /// Diameter is negative.
    #[error("body {body} has negative diameter {diameter}")]
    NegativeDiameter {
        /// The offending body.
        body: BodyId,
        /// The rejected diameter.
        diameter: f64,
    },
}

/// A per-body update failure recorded during a tick.
///
/// The engine keeps the body's previous committed position and angle
/// for the tick in which the fault occurred and reports the fault to the
/// observer as a warning.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum BodyFault {
    /// The motion rule refused to produce a result.
    #[error("motion rule rejected update: {reason}")]
    Rejected {
        /// Human-readable description from the rule.
        reason: String,
    },
    /// The motion rule produced a non-finite angle or position.
    #[error("motion rule produced non-finite output (angle={angle}, x={x}, y={y})")]
    NonFinite {
        /// The angle returned by the rule.
        angle: f64,
        /// The x coordinate returned by the rule.
        x: f64,
        /// The y coordinate returned by the rule.
        y: f64,
    },
    /// The motion rule panicked; the panic was caught at the task boundary.
    #[error("motion rule panicked: {message}")]
    Panicked {
        /// The panic payload, if it was a string.
        message: String,
    },
    /// The worker executing the update went away before replying.
    #[error("worker lost before reporting a result")]
    WorkerLost,
}
