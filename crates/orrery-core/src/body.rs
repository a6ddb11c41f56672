//! Body specifications and the [`MotionRule`] seam.
//!
//! A body is either anchored at the system origin (a root) or at the
//! centre of another body (a satellite). The anchor is a tagged variant;
//! the formula that turns an anchor plus kinematic state into a new
//! position is a [`MotionRule`], which defaults to [`CircularOrbit`].

use std::fmt;
use std::sync::Arc;

use crate::error::BodyFault;
use crate::geometry::{wrap_angle, Position};
use crate::id::BodyId;

/// What a body orbits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Anchor {
    /// A root body, orbiting the configured system origin.
    Origin,
    /// A satellite, orbiting the centre of the given owner.
    Owner(BodyId),
}

impl Anchor {
    /// The owner, if this is a satellite.
    pub fn owner(self) -> Option<BodyId> {
        match self {
            Self::Origin => None,
            Self::Owner(id) => Some(id),
        }
    }
}

/// Inputs to one evaluation of a [`MotionRule`].
///
/// `owner` is the owner's position as committed at the end of the
/// previous tick, never a value computed in the current tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionInput {
    /// Owner position from the previous committed snapshot; `None` for roots.
    pub owner: Option<Position>,
    /// This body's own position from the previous committed snapshot.
    pub previous: Position,
    /// System origin, used as the anchor for roots.
    pub origin: Position,
    /// Current angle in radians, in `[0, 2π)`.
    pub angle: f64,
    /// Angular speed in radians per tick.
    pub speed: f64,
    /// Orbit radius.
    pub radius: f64,
}

impl MotionInput {
    /// The point this body orbits.
    pub fn anchor(&self) -> Position {
        self.owner.unwrap_or(self.origin)
    }
}

/// Output of one evaluation of a [`MotionRule`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Motion {
    /// New angle in radians.
    pub angle: f64,
    /// New body centre.
    pub position: Position,
}

/// The per-body update formula.
///
/// # Contract
///
/// - `advance()` MUST be a pure function of its input: no shared mutable
///   state is read or written. The engine evaluates many bodies
///   concurrently on different threads with no coordination.
/// - The same input MUST produce a bit-identical output on every thread.
///
/// Returning `Err` (or panicking) isolates the failure to this body for
/// the current tick.
pub trait MotionRule: Send + Sync + 'static {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Compute the next angle and position.
    fn advance(&self, input: &MotionInput) -> Result<Motion, BodyFault>;

    /// Position of a body before the first tick.
    ///
    /// Default: the anchor offset by `radius` in direction `angle`.
    fn initial_position(&self, anchor: Position, angle: f64, radius: f64) -> Position {
        anchor.offset_polar(radius, angle)
    }
}

/// Uniform circular motion around the anchor.
///
/// Each tick advances the angle by `speed` (wrapped to a full turn) and
/// places the body `radius` away from its anchor at the new angle. A
/// radius of zero degenerates to the anchor itself.
#[derive(Clone, Copy, Debug, Default)]
pub struct CircularOrbit;

impl MotionRule for CircularOrbit {
    fn name(&self) -> &str {
        "circular_orbit"
    }

    fn advance(&self, input: &MotionInput) -> Result<Motion, BodyFault> {
        let angle = wrap_angle(input.angle + input.speed);
        Ok(Motion {
            angle,
            position: input.anchor().offset_polar(input.radius, angle),
        })
    }
}

/// Construction input for one body.
///
/// ```
/// use orrery_core::{BodyId, BodySpec};
///
/// let sun = BodySpec::root(0.0, 0.0, 0.0).named("sun").with_diameter(80.0);
/// let earth = BodySpec::satellite(BodyId(0), 0.03, 130.0, 0.0).named("earth");
/// assert_eq!(earth.anchor.owner(), Some(BodyId(0)));
/// assert!(sun.anchor.owner().is_none());
/// ```
#[derive(Clone)]
pub struct BodySpec {
    /// Optional label, used only in log fields.
    pub name: Option<String>,
    /// Angular speed in radians per tick. Zero for a stationary body.
    pub speed: f64,
    /// Orbit radius. Must be finite and non-negative.
    pub radius: f64,
    /// Visual diameter. Only used for bounding-box helpers.
    pub diameter: f64,
    /// Initial angle in radians. Wrapped into `[0, 2π)` at construction.
    pub initial_angle: f64,
    /// Root or satellite.
    pub anchor: Anchor,
    /// Update formula; `None` selects [`CircularOrbit`].
    pub rule: Option<Arc<dyn MotionRule>>,
}

impl BodySpec {
    /// A root body orbiting the system origin.
    pub fn root(speed: f64, radius: f64, initial_angle: f64) -> Self {
        Self {
            name: None,
            speed,
            radius,
            diameter: 0.0,
            initial_angle,
            anchor: Anchor::Origin,
            rule: None,
        }
    }

    /// A satellite orbiting `owner`.
    pub fn satellite(owner: BodyId, speed: f64, radius: f64, initial_angle: f64) -> Self {
        Self {
            anchor: Anchor::Owner(owner),
            ..Self::root(speed, radius, initial_angle)
        }
    }

    /// Attach a label.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the visual diameter.
    pub fn with_diameter(mut self, diameter: f64) -> Self {
        self.diameter = diameter;
        self
    }

    /// Replace the default [`CircularOrbit`] rule.
    pub fn with_rule(mut self, rule: Arc<dyn MotionRule>) -> Self {
        self.rule = Some(rule);
        self
    }
}

impl fmt::Debug for BodySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodySpec")
            .field("name", &self.name)
            .field("speed", &self.speed)
            .field("radius", &self.radius)
            .field("diameter", &self.diameter)
            .field("initial_angle", &self.initial_angle)
            .field("anchor", &self.anchor)
            .field("rule", &self.rule.as_ref().map(|r| r.name().to_string()))
            .finish()
    }
}
