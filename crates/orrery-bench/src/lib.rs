//! Reference body systems for benchmarks, examples and integration tests.
//!
//! - [`reference_system`]: a stationary sun, eight planets and three moons
//! - [`ringed_system`]: the reference system plus a seeded ring of small
//!   satellites around the ringed planet
//! - [`init_ring`]: the ring alone, deterministic per seed

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use orrery_core::{BodyId, BodySpec, FULL_TURN};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Body id of the ringed planet in [`reference_system`].
pub const RINGED_PLANET: BodyId = BodyId(6);

/// `(name, diameter, speed, radius, initial angle in degrees)`.
const PLANETS: [(&str, f64, f64, f64, f64); 8] = [
    ("mercury", 12.0, 0.05, 50.0, 0.0),
    ("venus", 18.0, 0.04, 90.0, 40.0),
    ("earth", 20.0, 0.03, 130.0, 80.0),
    ("mars", 16.0, 0.025, 170.0, 120.0),
    ("jupiter", 45.0, 0.015, 210.0, 160.0),
    ("saturn", 40.0, 0.012, 250.0, 200.0),
    ("uranus", 30.0, 0.009, 300.0, 240.0),
    ("neptune", 30.0, 0.007, 360.0, 280.0),
];

/// `(name, owner, diameter, speed, radius, initial angle in degrees)`.
const MOONS: [(&str, u32, f64, f64, f64, f64); 3] = [
    ("moon", 3, 6.0, 0.1, 25.0, 0.0),
    ("io", 5, 4.0, 0.08, 30.0, 0.0),
    ("europa", 5, 5.0, 0.06, 35.0, 180.0),
];

/// Build the reference system: nine roots and three satellites.
///
/// Body 0 is a stationary sun of diameter 80. Speeds are radians per
/// tick; initial angles are given in degrees and converted here.
pub fn reference_system() -> Vec<BodySpec> {
    let mut specs = Vec::with_capacity(1 + PLANETS.len() + MOONS.len());
    specs.push(BodySpec::root(0.0, 0.0, 0.0).named("sun").with_diameter(80.0));
    for (name, diameter, speed, radius, degrees) in PLANETS {
        specs.push(
            BodySpec::root(speed, radius, degrees.to_radians())
                .named(name)
                .with_diameter(diameter),
        );
    }
    for (name, owner, diameter, speed, radius, degrees) in MOONS {
        specs.push(
            BodySpec::satellite(BodyId(owner), speed, radius, degrees.to_radians())
                .named(name)
                .with_diameter(diameter),
        );
    }
    specs
}

/// [`reference_system`] followed by `rocks` ring particles.
pub fn ringed_system(seed: u64, rocks: usize) -> Vec<BodySpec> {
    let mut specs = reference_system();
    specs.extend(init_ring(rocks, seed));
    specs
}

/// Generate `rocks` satellites of [`RINGED_PLANET`] with diameter 2,
/// speed in `[0.012, 0.05)`, radius in `[30, 50)` and a uniformly random
/// initial angle. The same seed always yields the same ring.
pub fn init_ring(rocks: usize, seed: u64) -> Vec<BodySpec> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..rocks)
        .map(|i| {
            let speed = rng.random_range(0.012..0.05);
            let radius = rng.random_range(30.0..50.0);
            let angle = rng.random::<f64>() * FULL_TURN;
            BodySpec::satellite(RINGED_PLANET, speed, radius, angle)
                .named(format!("rock-{i}"))
                .with_diameter(2.0)
        })
        .collect()
}
