use crate::config::ExperimentConfig;
use crate::domain::constants::{PLAYERS_PER_GROUP, TIMED_ROUND};
use crate::domain::currency::Points;
use crate::domain::decision::{Choice, DecisionOutcome};
use crate::domain::group::Group;
use crate::domain::pages::ResultsView;
use crate::domain::payoff::PayoffMatrix;
use crate::domain::player::{ParticipantId, Player, RoundStatus};
use crate::error::{ExperimentError, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// The decision and payoff rules of the experiment.
///
/// `PayoffEngine` is pure with respect to storage: it reads and writes the
/// `Player` values it is handed and leaves persistence and synchronization to
/// the session.
#[derive(Debug, Clone)]
pub struct PayoffEngine {
    matrix: PayoffMatrix,
    num_rounds: u32,
    decision_timeout: Duration,
}

impl Default for PayoffEngine {
    fn default() -> Self {
        Self::new(&ExperimentConfig::default())
    }
}

impl PayoffEngine {
    pub fn new(config: &ExperimentConfig) -> Self {
        Self {
            matrix: config.payoffs,
            num_rounds: config.num_rounds,
            decision_timeout: config.decision_timeout(),
        }
    }

    pub fn num_rounds(&self) -> u32 {
        self.num_rounds
    }

    /// The Decision page deadline. Only the timed round has one.
    pub fn decision_timeout(&self, round_number: u32) -> Option<Duration> {
        (round_number == TIMED_ROUND).then_some(self.decision_timeout)
    }

    /// Computes and writes the payoff of both players of `group`.
    ///
    /// Nothing is written unless both payoffs could be computed.
    pub fn compute_group_payoffs(
        &self,
        group: &Group,
        players: &mut [Player],
    ) -> Result<Vec<(ParticipantId, Points)>> {
        if players.len() != PLAYERS_PER_GROUP {
            return Err(ExperimentError::invariant(format!(
                "group {} has {} players, expected {}",
                group.id,
                players.len(),
                PLAYERS_PER_GROUP
            )));
        }
        for player in players.iter() {
            if player.group != group.id
                || player.round_number != group.round_number
                || !group.contains(player.participant)
            {
                return Err(ExperimentError::invariant(format!(
                    "{} does not belong to group {} in round {}",
                    player.key(),
                    group.id,
                    group.round_number
                )));
            }
            if !player.is_answered() {
                return Err(ExperimentError::precondition(format!(
                    "{} has not decided yet",
                    player.key()
                )));
            }
            if player.status != RoundStatus::Answered {
                return Err(ExperimentError::precondition(format!(
                    "payoff of {} was already computed",
                    player.key()
                )));
            }
        }

        let mut payoffs = Vec::with_capacity(players.len());
        for player in players.iter() {
            let other_id = group.other_member(player.participant)?;
            let candidates: Vec<&Player> = players
                .iter()
                .filter(|p| p.participant == other_id)
                .collect();
            let other = match candidates.as_slice() {
                [other] => *other,
                _ => {
                    return Err(ExperimentError::invariant(format!(
                        "found {} records for the partner of {}",
                        candidates.len(),
                        player.key()
                    )));
                }
            };
            let payoff = self.matrix.lookup(player.cooperate, other.cooperate)?;
            payoffs.push((player.participant, payoff));
        }

        for (player, (_, payoff)) in players.iter_mut().zip(&payoffs) {
            player.set_payoff(*payoff)?;
        }
        info!(
            round = group.round_number,
            group = %group.id,
            ?payoffs,
            "Payoffs computed"
        );
        Ok(payoffs)
    }

    /// Forces "defect" when the timed round's deadline elapsed unanswered.
    ///
    /// No-op in any other situation, and idempotent.
    pub fn resolve_timeout_decision(
        &self,
        player: &mut Player,
        round_number: u32,
        timeout_occurred: bool,
    ) -> Result<()> {
        if round_number == TIMED_ROUND && timeout_occurred && player.cooperate.is_none() {
            player.record_decision(false)?;
            player.timed_out = true;
            info!(player = %player.key(), "Decision timed out, defaulting to defect");
        }
        Ok(())
    }

    /// Applies the result of the Decision page to the player.
    pub fn apply_decision(&self, player: &mut Player, outcome: DecisionOutcome) -> Result<()> {
        match outcome {
            DecisionOutcome::AnsweredInTime(cooperate) => {
                player.record_decision(cooperate)?;
                debug!(player = %player.key(), cooperate, "Decision recorded");
                Ok(())
            }
            DecisionOutcome::TimedOut => {
                self.resolve_timeout_decision(player, player.round_number, true)
            }
        }
    }

    /// Waits for the participant's answer, bounded by the round's deadline.
    pub async fn collect_decision<F>(&self, round_number: u32, response: F) -> DecisionOutcome
    where
        F: Future<Output = bool>,
    {
        match self.decision_timeout(round_number) {
            Some(limit) => match tokio::time::timeout(limit, response).await {
                Ok(cooperate) => DecisionOutcome::AnsweredInTime(cooperate),
                Err(_) => DecisionOutcome::TimedOut,
            },
            None => DecisionOutcome::AnsweredInTime(response.await),
        }
    }

    /// Builds the Results page data for `player` facing `other`.
    pub fn compute_results_view(&self, player: &Player, other: &Player) -> Result<ResultsView> {
        if player.group != other.group
            || player.round_number != other.round_number
            || player.participant == other.participant
        {
            return Err(ExperimentError::invariant(format!(
                "{} and {} are not partners",
                player.key(),
                other.key()
            )));
        }
        let (Some(mine), Some(theirs)) = (player.cooperate, other.cooperate) else {
            return Err(ExperimentError::precondition(format!(
                "results for {} requested before both decisions were final",
                player.key()
            )));
        };
        Ok(ResultsView {
            opponent: other.participant,
            same_choice: mine == theirs,
            my_decision: Choice::from_cooperate(mine).label(),
            opponent_decision: Choice::from_cooperate(theirs).label(),
        })
    }
}
