use crate::domain::decision::Response;
use crate::domain::player::ParticipantId;
use crate::error::{ExperimentError, Result};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// How every participant answers the Decision page in every round.
///
/// A round without an entry means the participant never answers.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DecisionScript {
    responses: BTreeMap<ParticipantId, HashMap<u32, Response>>,
}

impl DecisionScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a response. A second response for the same round is ignored.
    pub fn insert(&mut self, participant: ParticipantId, round: u32, response: Response) {
        let rounds = self.responses.entry(participant).or_default();
        if rounds.contains_key(&round) {
            warn!(%participant, round, "Duplicate response ignored");
            return;
        }
        rounds.insert(round, response);
    }

    pub fn participants(&self) -> Vec<ParticipantId> {
        self.responses.keys().copied().collect()
    }

    pub fn responses_for(&self, participant: ParticipantId) -> HashMap<u32, Response> {
        self.responses
            .get(&participant)
            .cloned()
            .unwrap_or_default()
    }

    /// Rejects scripts that would leave a participant waiting forever in a
    /// round without a deadline, or that answer rounds that do not exist.
    pub fn check(&self, num_rounds: u32, is_timed: impl Fn(u32) -> bool) -> Result<()> {
        for (participant, rounds) in &self.responses {
            if let Some(round) = rounds.keys().find(|r| **r == 0 || **r > num_rounds) {
                return Err(ExperimentError::config(format!(
                    "participant {} answers round {}, but the session has {} rounds",
                    participant, round, num_rounds
                )));
            }
            for round in (1..=num_rounds).filter(|r| !is_timed(*r)) {
                let answered = rounds
                    .get(&round)
                    .is_some_and(|response| response.choice.is_some());
                if !answered {
                    return Err(ExperimentError::precondition(format!(
                        "participant {} never answers round {}, which has no deadline",
                        participant, round
                    )));
                }
            }
        }
        Ok(())
    }
}
