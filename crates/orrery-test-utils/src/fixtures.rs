//! Reusable motion-rule fixtures.
//!
//! - [`DriftRule`]: moves by a fixed step from the body's own previous position.
//! - [`RejectingRule`]: always returns [`BodyFault::Rejected`].
//! - [`FaultAfterRule`]: circular orbit for N calls, then rejects.
//! - [`PanickingRule`]: panics on every call.
//! - [`NanRule`]: returns a NaN position.
//! - [`SlowRule`]: circular orbit after a fixed delay.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use orrery_core::{BodyFault, CircularOrbit, Motion, MotionInput, MotionRule, Position};

/// Adds `step` to the body's previous position every tick.
///
/// The angle is left unchanged. Useful for making positions a direct
/// function of the tick number.
#[derive(Clone, Copy, Debug)]
pub struct DriftRule {
    pub step: Position,
}

impl DriftRule {
    pub fn new(step: Position) -> Self {
        Self { step }
    }
}

impl MotionRule for DriftRule {
    fn name(&self) -> &str {
        "drift"
    }

    fn advance(&self, input: &MotionInput) -> Result<Motion, BodyFault> {
        Ok(Motion {
            angle: input.angle,
            position: Position::new(
                input.previous.x + self.step.x,
                input.previous.y + self.step.y,
            ),
        })
    }
}

/// Rejects every update.
#[derive(Clone, Copy, Debug, Default)]
pub struct RejectingRule;

impl MotionRule for RejectingRule {
    fn name(&self) -> &str {
        "rejecting"
    }

    fn advance(&self, _input: &MotionInput) -> Result<Motion, BodyFault> {
        Err(BodyFault::Rejected {
            reason: "rejected by fixture".into(),
        })
    }
}

/// Behaves like [`CircularOrbit`] for `succeed_count` calls, then rejects.
#[derive(Debug)]
pub struct FaultAfterRule {
    pub succeed_count: usize,
    call_count: AtomicUsize,
}

impl FaultAfterRule {
    /// Create a rule that succeeds `succeed_count` times then fails.
    pub fn new(succeed_count: usize) -> Self {
        Self {
            succeed_count,
            call_count: AtomicUsize::new(0),
        }
    }

    /// How many times `advance()` has been called.
    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }
}

impl MotionRule for FaultAfterRule {
    fn name(&self) -> &str {
        "fault_after"
    }

    fn advance(&self, input: &MotionInput) -> Result<Motion, BodyFault> {
        let n = self.call_count.fetch_add(1, Ordering::Relaxed);
        if n >= self.succeed_count {
            return Err(BodyFault::Rejected {
                reason: format!("fault_after: call {n} exceeds {}", self.succeed_count),
            });
        }
        CircularOrbit.advance(input)
    }
}

/// Panics on every call.
#[derive(Clone, Copy, Debug, Default)]
pub struct PanickingRule;

impl MotionRule for PanickingRule {
    fn name(&self) -> &str {
        "panicking"
    }

    fn advance(&self, _input: &MotionInput) -> Result<Motion, BodyFault> {
        panic!("fixture panic");
    }
}

/// Produces a NaN position.
#[derive(Clone, Copy, Debug, Default)]
pub struct NanRule;

impl MotionRule for NanRule {
    fn name(&self) -> &str {
        "nan"
    }

    fn advance(&self, input: &MotionInput) -> Result<Motion, BodyFault> {
        Ok(Motion {
            angle: input.angle,
            position: Position::new(f64::NAN, 0.0),
        })
    }
}

/// Sleeps for `delay`, then behaves like [`CircularOrbit`].
///
/// Stretches a tick's compute phase for pacing and cancellation tests.
#[derive(Clone, Copy, Debug)]
pub struct SlowRule {
    pub delay: Duration,
}

impl SlowRule {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl MotionRule for SlowRule {
    fn name(&self) -> &str {
        "slow"
    }

    fn advance(&self, input: &MotionInput) -> Result<Motion, BodyFault> {
        std::thread::sleep(self.delay);
        CircularOrbit.advance(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> MotionInput {
        MotionInput {
            owner: None,
            previous: Position::new(2.0, 3.0),
            origin: Position::ORIGIN,
            angle: 0.5,
            speed: 0.1,
            radius: 1.0,
        }
    }

    #[test]
    fn drift_adds_step_to_previous() {
        let m = DriftRule::new(Position::new(1.0, -1.0))
            .advance(&input())
            .unwrap();
        assert_eq!(m.position, Position::new(3.0, 2.0));
        assert_eq!(m.angle, 0.5);
    }

    #[test]
    fn fault_after_counts_calls() {
        let rule = FaultAfterRule::new(2);
        assert!(rule.advance(&input()).is_ok());
        assert!(rule.advance(&input()).is_ok());
        assert!(matches!(
            rule.advance(&input()),
            Err(BodyFault::Rejected { .. })
        ));
        assert_eq!(rule.calls(), 3);
    }

    #[test]
    fn nan_rule_output_is_not_finite() {
        let m = NanRule.advance(&input()).unwrap();
        assert!(!m.position.is_finite());
    }
}
