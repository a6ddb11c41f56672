//! Validated body table.
//!
//! [`BodySystem::new`] turns an ordered list of [`BodySpec`]s into a flat
//! table of [`Body`] records, rejecting any ownership graph that is not a
//! forest of depth two. After construction the table only changes through
//! the tick engine, which updates each body's angle at commit time.

use std::sync::Arc;

use indexmap::IndexMap;
use orrery_core::{
    wrap_angle, Anchor, BodyId, BodySpec, CircularOrbit, ConstructionError, MotionRule, Position,
    SpecField,
};

/// A registered body: identity, kinematic state, and update rule.
#[derive(Clone)]
pub struct Body {
    id: BodyId,
    name: Option<String>,
    anchor: Anchor,
    speed: f64,
    radius: f64,
    diameter: f64,
    angle: f64,
    rule: Arc<dyn MotionRule>,
    default_rule: bool,
}

impl Body {
    /// Stable identity.
    pub fn id(&self) -> BodyId {
        self.id
    }

    /// Optional label.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Root or satellite.
    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    /// Owner, for satellites.
    pub fn owner(&self) -> Option<BodyId> {
        self.anchor.owner()
    }

    /// Angular speed in radians per tick.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Orbit radius.
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Visual diameter.
    pub fn diameter(&self) -> f64 {
        self.diameter
    }

    /// Current angle in radians, in `[0, 2π)`.
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Name of the motion rule driving this body.
    pub fn rule_name(&self) -> &str {
        self.rule.name()
    }

    pub(crate) fn rule(&self) -> &Arc<dyn MotionRule> {
        &self.rule
    }

    pub(crate) fn set_angle(&mut self, angle: f64) {
        self.angle = wrap_angle(angle);
    }

    /// A root with zero speed under the default rule never moves, so the
    /// engine can skip dispatching it.
    pub fn is_static(&self) -> bool {
        self.default_rule && self.anchor == Anchor::Origin && self.speed == 0.0
    }
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Body")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("anchor", &self.anchor)
            .field("speed", &self.speed)
            .field("radius", &self.radius)
            .field("angle", &self.angle)
            .field("rule", &self.rule.name())
            .finish()
    }
}

/// An ordered, validated set of bodies.
#[derive(Clone, Debug)]
pub struct BodySystem {
    bodies: Vec<Body>,
}

impl BodySystem {
    /// Validate `specs` and build the body table.
    ///
    /// Body `i` in `specs` receives `BodyId(i)`. Owners must be registered
    /// before their satellites, which makes forward references (and so
    /// cycles) unrepresentable.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConstructionError`] found, scanning in
    /// registration order.
    pub fn new(specs: Vec<BodySpec>) -> Result<Self, ConstructionError> {
        if specs.is_empty() {
            return Err(ConstructionError::Empty);
        }
        if u32::try_from(specs.len()).is_err() {
            return Err(ConstructionError::TooManyBodies { count: specs.len() });
        }

        let default_rule: Arc<dyn MotionRule> = Arc::new(CircularOrbit);
        let mut bodies: Vec<Body> = Vec::with_capacity(specs.len());

        for (index, spec) in specs.into_iter().enumerate() {
            // Length checked above.
            let id = BodyId(index as u32);
            validate_numbers(id, &spec)?;

            if let Anchor::Owner(owner) = spec.anchor {
                if owner == id {
                    return Err(ConstructionError::SelfOwnership { body: id });
                }
                let Some(owner_body) = bodies.get(owner.index()) else {
                    return Err(ConstructionError::UnknownOwner { body: id, owner });
                };
                if owner_body.anchor != Anchor::Origin {
                    return Err(ConstructionError::OwnerIsSatellite { body: id, owner });
                }
            }

            let (rule, is_default) = match spec.rule {
                Some(rule) => (rule, false),
                None => (Arc::clone(&default_rule), true),
            };

            bodies.push(Body {
                id,
                name: spec.name,
                anchor: spec.anchor,
                speed: spec.speed,
                radius: spec.radius,
                diameter: spec.diameter,
                angle: wrap_angle(spec.initial_angle),
                rule,
                default_rule: is_default,
            });
        }

        Ok(Self { bodies })
    }

    /// Number of bodies.
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Whether the system has no bodies. Always `false` after validation.
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Look up a body by identity.
    pub fn get(&self, id: BodyId) -> Option<&Body> {
        self.bodies.get(id.index())
    }

    /// Bodies in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Body> {
        self.bodies.iter()
    }

    /// Root bodies in registration order.
    pub fn roots(&self) -> impl Iterator<Item = &Body> {
        self.bodies.iter().filter(|b| b.anchor == Anchor::Origin)
    }

    /// Satellites of `owner` in registration order.
    pub fn satellites_of(&self, owner: BodyId) -> impl Iterator<Item = &Body> {
        self.bodies
            .iter()
            .filter(move |b| b.anchor == Anchor::Owner(owner))
    }

    pub(crate) fn bodies_mut(&mut self) -> &mut [Body] {
        &mut self.bodies
    }

    /// Initial positions, in registration order.
    ///
    /// Owners precede satellites, so each satellite's anchor is already
    /// placed when it is reached.
    pub fn initial_positions(&self, origin: Position) -> IndexMap<BodyId, Position> {
        let mut positions: IndexMap<BodyId, Position> = IndexMap::with_capacity(self.bodies.len());
        for body in &self.bodies {
            let anchor = match body.anchor {
                Anchor::Origin => origin,
                Anchor::Owner(owner) => positions.get(&owner).copied().unwrap_or(origin),
            };
            let position = body.rule.initial_position(anchor, body.angle, body.radius);
            positions.insert(body.id, position);
        }
        positions
    }
}

fn validate_numbers(id: BodyId, spec: &BodySpec) -> Result<(), ConstructionError> {
    let fields = [
        (SpecField::Speed, spec.speed),
        (SpecField::Radius, spec.radius),
        (SpecField::Diameter, spec.diameter),
        (SpecField::InitialAngle, spec.initial_angle),
    ];
    for (field, value) in fields {
        if !value.is_finite() {
            return Err(ConstructionError::NonFinite { body: id, field });
        }
    }
    if spec.radius < 0.0 {
        return Err(ConstructionError::NegativeRadius {
            body: id,
            radius: spec.radius,
        });
    }
    if spec.diameter < 0.0 {
        return Err(ConstructionError::NegativeDiameter {
            body: id,
            diameter: spec.diameter,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn sun_earth_moon() -> Vec<BodySpec> {
        vec![
            BodySpec::root(0.0, 0.0, 0.0).named("sun"),
            BodySpec::root(0.03, 130.0, 0.0).named("earth"),
            BodySpec::satellite(BodyId(1), 0.1, 25.0, FRAC_PI_2).named("moon"),
        ]
    }

    #[test]
    fn ids_follow_registration_order() {
        let system = BodySystem::new(sun_earth_moon()).unwrap();
        let ids: Vec<BodyId> = system.iter().map(|b| b.id()).collect();
        assert_eq!(ids, vec![BodyId(0), BodyId(1), BodyId(2)]);
        assert_eq!(system.get(BodyId(2)).unwrap().name(), Some("moon"));
        assert_eq!(system.roots().count(), 2);
        assert_eq!(system.satellites_of(BodyId(1)).count(), 1);
    }

    #[test]
    fn empty_rejected() {
        assert_eq!(BodySystem::new(vec![]).unwrap_err(), ConstructionError::Empty);
    }

    #[test]
    fn self_ownership_rejected() {
        let specs = vec![
            BodySpec::root(0.0, 0.0, 0.0),
            BodySpec::satellite(BodyId(1), 0.1, 5.0, 0.0),
        ];
        assert_eq!(
            BodySystem::new(specs).unwrap_err(),
            ConstructionError::SelfOwnership { body: BodyId(1) }
        );
    }

    #[test]
    fn forward_reference_rejected() {
        // Satellite registered before its owner: also how a cycle would
        // have to be expressed, so cycles are rejected here too.
        let specs = vec![
            BodySpec::satellite(BodyId(1), 0.1, 5.0, 0.0),
            BodySpec::satellite(BodyId(0), 0.1, 5.0, 0.0),
        ];
        assert_eq!(
            BodySystem::new(specs).unwrap_err(),
            ConstructionError::UnknownOwner {
                body: BodyId(0),
                owner: BodyId(1)
            }
        );
    }

    #[test]
    fn unregistered_owner_rejected() {
        let specs = vec![
            BodySpec::root(0.0, 0.0, 0.0),
            BodySpec::satellite(BodyId(42), 0.1, 5.0, 0.0),
        ];
        assert!(matches!(
            BodySystem::new(specs),
            Err(ConstructionError::UnknownOwner {
                owner: BodyId(42),
                ..
            })
        ));
    }

    #[test]
    fn satellite_of_satellite_rejected() {
        let mut specs = sun_earth_moon();
        specs.push(BodySpec::satellite(BodyId(2), 0.2, 3.0, 0.0));
        assert_eq!(
            BodySystem::new(specs).unwrap_err(),
            ConstructionError::OwnerIsSatellite {
                body: BodyId(3),
                owner: BodyId(2)
            }
        );
    }

    #[test]
    fn non_finite_and_negative_rejected() {
        let specs = vec![BodySpec::root(f64::NAN, 1.0, 0.0)];
        assert_eq!(
            BodySystem::new(specs).unwrap_err(),
            ConstructionError::NonFinite {
                body: BodyId(0),
                field: SpecField::Speed
            }
        );

        let specs = vec![BodySpec::root(0.1, -1.0, 0.0)];
        assert!(matches!(
            BodySystem::new(specs),
            Err(ConstructionError::NegativeRadius { .. })
        ));

        let specs = vec![BodySpec::root(0.1, 1.0, 0.0).with_diameter(-2.0)];
        assert!(matches!(
            BodySystem::new(specs),
            Err(ConstructionError::NegativeDiameter { .. })
        ));
    }

    #[test]
    fn initial_angle_wrapped() {
        let system = BodySystem::new(vec![BodySpec::root(0.1, 1.0, 3.0 * PI)]).unwrap();
        let angle = system.get(BodyId(0)).unwrap().angle();
        assert!((angle - PI).abs() < 1e-12);
    }

    #[test]
    fn initial_positions_place_satellites_on_owner() {
        let system = BodySystem::new(sun_earth_moon()).unwrap();
        let positions = system.initial_positions(Position::ORIGIN);
        assert_eq!(positions[&BodyId(0)], Position::ORIGIN);
        assert_eq!(positions[&BodyId(1)], Position::new(130.0, 0.0));
        let moon = positions[&BodyId(2)];
        assert!((moon.x - 130.0).abs() < 1e-9);
        assert!((moon.y - 25.0).abs() < 1e-9);
    }

    #[test]
    fn static_detection() {
        let system = BodySystem::new(sun_earth_moon()).unwrap();
        assert!(system.get(BodyId(0)).unwrap().is_static());
        assert!(!system.get(BodyId(1)).unwrap().is_static());
        assert!(!system.get(BodyId(2)).unwrap().is_static());
    }
}
