//! Fixed parameters of the two-round Prisoner's Dilemma.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub const PLAYERS_PER_GROUP: usize = 2;
pub const NUM_ROUNDS: u32 = 2;

/// The round that shows the Introduction page.
pub const INTRODUCTION_ROUND: u32 = 1;
/// The round with a response deadline, its own instructions page and the
/// forced "defect" default on timeout.
pub const TIMED_ROUND: u32 = 2;
pub const DECISION_TIMEOUT_SECS: u64 = 120;

/// Defect against a cooperator.
pub const PAYOFF_A: Decimal = dec!(400);
/// Mutual cooperation.
pub const PAYOFF_B: Decimal = dec!(200);
/// Mutual defection.
pub const PAYOFF_C: Decimal = dec!(100);
/// Cooperate against a defector.
pub const PAYOFF_D: Decimal = dec!(0);

pub const ROUND2_MESSAGE: &str = "In round 2 you can communicate with the other player through chat.\n\
The basic structure of the game is the same as in round 1.\n\
Please note that a time limit applies.";
