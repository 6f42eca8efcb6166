use super::currency::Points;
use super::player::ParticipantId;
use serde::{Deserialize, Serialize};

/// A person taking part in the session. Outlives the per-round player records.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Participant {
    pub id: ParticipantId,
    /// Running total of every round's payoff.
    pub payoff: Points,
}

impl Participant {
    pub fn new(id: ParticipantId) -> Self {
        Self {
            id,
            payoff: Points::ZERO,
        }
    }

    pub fn accumulate(&mut self, round_payoff: Points) {
        self.payoff += round_payoff;
    }
}
