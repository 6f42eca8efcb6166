use super::constants::{PAYOFF_A, PAYOFF_B, PAYOFF_C, PAYOFF_D};
use super::currency::Points;
use crate::error::{ExperimentError, Result};
use serde::{Deserialize, Serialize};

/// The 2x2 payoff table, keyed by (own decision, other's decision).
///
/// | own       | other     | payoff |
/// |-----------|-----------|--------|
/// | defect    | cooperate | `a`    |
/// | cooperate | cooperate | `b`    |
/// | defect    | defect    | `c`    |
/// | cooperate | defect    | `d`    |
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy)]
pub struct PayoffMatrix {
    pub a: Points,
    pub b: Points,
    pub c: Points,
    pub d: Points,
}

impl Default for PayoffMatrix {
    fn default() -> Self {
        Self {
            a: Points::new(PAYOFF_A),
            b: Points::new(PAYOFF_B),
            c: Points::new(PAYOFF_C),
            d: Points::new(PAYOFF_D),
        }
    }
}

impl PayoffMatrix {
    /// Looks up the payoff for a player given both decisions.
    ///
    /// Every defined key is listed; anything else is an error, never a default.
    pub fn lookup(&self, own: Option<bool>, other: Option<bool>) -> Result<Points> {
        match (own, other) {
            (Some(false), Some(true)) => Ok(self.a),
            (Some(true), Some(true)) => Ok(self.b),
            (Some(false), Some(false)) => Ok(self.c),
            (Some(true), Some(false)) => Ok(self.d),
            (own, other) => Err(ExperimentError::precondition(format!(
                "payoff lookup needs both decisions, got ({:?}, {:?})",
                own, other
            ))),
        }
    }

    /// Checks that `a` is the highest entry and `d` the lowest, with no negatives.
    pub fn validate(&self) -> Result<()> {
        if [self.a, self.b, self.c, self.d]
            .iter()
            .any(Points::is_negative)
        {
            return Err(ExperimentError::config("payoffs must not be negative"));
        }
        if !(self.a >= self.b && self.b >= self.c && self.c >= self.d) {
            return Err(ExperimentError::config(format!(
                "payoffs must satisfy a >= b >= c >= d, got a={} b={} c={} d={}",
                self.a, self.b, self.c, self.d
            )));
        }
        Ok(())
    }
}
