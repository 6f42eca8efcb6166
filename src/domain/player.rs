use super::currency::Points;
use super::decision::Choice;
use crate::error::{ExperimentError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a participant, stable across rounds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ParticipantId(pub u32);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a group, unique within a round.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct GroupId(pub u32);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A player record is one participant in one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerKey {
    pub participant: ParticipantId,
    pub round: u32,
}

impl PlayerKey {
    pub fn new(participant: ParticipantId, round: u32) -> Self {
        Self { participant, round }
    }
}

impl fmt::Display for PlayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "participant {} round {}", self.participant, self.round)
    }
}

/// Where a player stands within its round. Transitions only move forward.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    #[default]
    Unanswered,
    Answered,
    PayoffComputed,
    Displayed,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Player {
    pub participant: ParticipantId,
    pub round_number: u32,
    pub group: GroupId,
    /// The player's decision. `None` until answered.
    pub cooperate: Option<bool>,
    /// Set when the decision was forced because the deadline elapsed.
    pub timed_out: bool,
    pub payoff: Option<Points>,
    pub status: RoundStatus,
}

impl Player {
    pub fn new(participant: ParticipantId, round_number: u32, group: GroupId) -> Self {
        Self {
            participant,
            round_number,
            group,
            cooperate: None,
            timed_out: false,
            payoff: None,
            status: RoundStatus::Unanswered,
        }
    }

    pub fn key(&self) -> PlayerKey {
        PlayerKey::new(self.participant, self.round_number)
    }

    pub fn choice(&self) -> Option<Choice> {
        self.cooperate.map(Choice::from_cooperate)
    }

    pub fn is_answered(&self) -> bool {
        self.cooperate.is_some()
    }

    /// Writes the decision. The field is written at most once.
    pub fn record_decision(&mut self, cooperate: bool) -> Result<()> {
        if self.status != RoundStatus::Unanswered || self.cooperate.is_some() {
            return Err(ExperimentError::precondition(format!(
                "{} already answered",
                self.key()
            )));
        }
        self.cooperate = Some(cooperate);
        self.status = RoundStatus::Answered;
        Ok(())
    }

    /// Writes the payoff. Only valid once, after the decision is recorded.
    pub fn set_payoff(&mut self, payoff: Points) -> Result<()> {
        if self.status != RoundStatus::Answered || self.cooperate.is_none() {
            return Err(ExperimentError::precondition(format!(
                "cannot set payoff for {} in state {:?}",
                self.key(),
                self.status
            )));
        }
        self.payoff = Some(payoff);
        self.status = RoundStatus::PayoffComputed;
        Ok(())
    }

    pub fn mark_displayed(&mut self) -> Result<()> {
        if self.status != RoundStatus::PayoffComputed {
            return Err(ExperimentError::precondition(format!(
                "results for {} shown before payoffs were computed",
                self.key()
            )));
        }
        self.status = RoundStatus::Displayed;
        Ok(())
    }
}
