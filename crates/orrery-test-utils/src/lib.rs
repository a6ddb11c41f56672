//! Test utilities and fixtures for Orrery development.
//!
//! Provides misbehaving and deterministic [`MotionRule`](orrery_core::MotionRule)
//! implementations (see [`fixtures`]) and a handful of canned body lists
//! used across the engine's unit and integration tests.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{
    DriftRule, FaultAfterRule, NanRule, PanickingRule, RejectingRule, SlowRule,
};

use std::f64::consts::FRAC_PI_2;
use std::sync::Arc;

use orrery_core::{BodyId, BodySpec, MotionRule, Position};

/// A stationary root at the origin and one satellite at radius 10 turning a
/// quarter per tick, starting at angle 0.
///
/// After tick 1 the satellite sits at `(0, 10)`; after tick 2 at `(-10, 0)`.
pub fn quarter_turn_pair() -> Vec<BodySpec> {
    vec![
        BodySpec::root(0.0, 0.0, 0.0).named("hub"),
        BodySpec::satellite(BodyId(0), FRAC_PI_2, 10.0, 0.0).named("rim"),
    ]
}

/// `roots` drifting roots, each followed by `moons_per_root` zero-radius
/// satellites.
///
/// Every root moves by `(1, 0)` per tick from the origin. A zero-radius,
/// zero-speed satellite sits exactly on its owner's previous position, so
/// at tick N each satellite must be at `(N - 1, 0)`.
pub fn drifting_families(roots: u32, moons_per_root: u32) -> Vec<BodySpec> {
    let drift: Arc<dyn MotionRule> = Arc::new(DriftRule::new(Position::new(1.0, 0.0)));
    let mut specs = Vec::new();
    for r in 0..roots {
        let owner = BodyId(specs.len() as u32);
        specs.push(
            BodySpec::root(0.0, 0.0, 0.0)
                .named(format!("root-{r}"))
                .with_rule(Arc::clone(&drift)),
        );
        for m in 0..moons_per_root {
            specs.push(BodySpec::satellite(owner, 0.0, 0.0, 0.0).named(format!("moon-{r}-{m}")));
        }
    }
    specs
}

/// Every body drifts by `(1, 1)` per tick from the origin, so at tick N
/// every coordinate equals N. Used to detect torn reads.
pub fn uniform_drift(bodies: u32) -> Vec<BodySpec> {
    let drift: Arc<dyn MotionRule> = Arc::new(DriftRule::new(Position::new(1.0, 1.0)));
    (0..bodies)
        .map(|_| BodySpec::root(0.0, 0.0, 0.0).with_rule(Arc::clone(&drift)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_core::Anchor;

    #[test]
    fn families_register_owner_first() {
        let specs = drifting_families(3, 2);
        assert_eq!(specs.len(), 9);
        assert_eq!(specs[1].anchor, Anchor::Owner(BodyId(0)));
        assert_eq!(specs[4].anchor, Anchor::Owner(BodyId(3)));
        assert_eq!(specs[6].anchor, Anchor::Origin);
    }

    #[test]
    fn quarter_turn_pair_shape() {
        let specs = quarter_turn_pair();
        assert_eq!(specs[1].anchor.owner(), Some(BodyId(0)));
        assert_eq!(specs[1].radius, 10.0);
    }
}
