//! Planar positions and angle wrapping.

use std::f64::consts::TAU;

/// One full turn in radians.
pub const FULL_TURN: f64 = TAU;

/// A point in the simulation plane.
///
/// Positions published by the engine are body centres.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Position {
    /// The plane origin `(0, 0)`.
    pub const ORIGIN: Position = Position { x: 0.0, y: 0.0 };

    /// Construct a position from its coordinates.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// The point `radius` away from `self` in direction `angle`.
    pub fn offset_polar(self, radius: f64, angle: f64) -> Self {
        Self {
            x: self.x + radius * angle.cos(),
            y: self.y + radius * angle.sin(),
        }
    }

    /// Upper-left corner of the square bounding box of a body with the
    /// given diameter centred on `self`.
    pub fn top_left(self, diameter: f64) -> Self {
        let half = diameter / 2.0;
        Self {
            x: self.x - half,
            y: self.y - half,
        }
    }

    /// Whether both coordinates are finite.
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Euclidean distance to `other`.
    pub fn distance(self, other: Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Wrap an angle into `[0, 2π)`.
///
/// Non-finite input is returned unchanged so callers can detect it.
pub fn wrap_angle(angle: f64) -> f64 {
    if !angle.is_finite() {
        return angle;
    }
    let wrapped = angle.rem_euclid(FULL_TURN);
    // rem_euclid can round up to exactly TAU for tiny negative inputs.
    if wrapped >= FULL_TURN {
        0.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn offset_polar_quarter_turn() {
        let p = Position::ORIGIN.offset_polar(10.0, FRAC_PI_2);
        assert!(p.x.abs() < 1e-9);
        assert!((p.y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn zero_radius_stays_on_anchor() {
        let anchor = Position::new(3.0, -4.0);
        assert_eq!(anchor.offset_polar(0.0, 1.234), anchor);
    }

    #[test]
    fn top_left_subtracts_half_diameter() {
        let p = Position::new(400.0, 400.0).top_left(80.0);
        assert_eq!(p, Position::new(360.0, 360.0));
    }

    #[test]
    fn wrap_handles_negative_and_large() {
        assert!((wrap_angle(-FRAC_PI_2) - 3.0 * FRAC_PI_2).abs() < 1e-12);
        assert!((wrap_angle(5.0 * PI) - PI).abs() < 1e-12);
        assert_eq!(wrap_angle(FULL_TURN), 0.0);
        assert!(wrap_angle(f64::NAN).is_nan());
    }

    #[test]
    fn distance_is_euclidean() {
        let d = Position::new(0.0, 0.0).distance(Position::new(3.0, 4.0));
        assert!((d - 5.0).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn wrapped_angle_in_range(angle in -1.0e6f64..1.0e6) {
            let w = wrap_angle(angle);
            prop_assert!((0.0..FULL_TURN).contains(&w));
        }
    }
}
