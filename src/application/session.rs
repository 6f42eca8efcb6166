use super::engine::PayoffEngine;
use super::script::DecisionScript;
use crate::config::ExperimentConfig;
use crate::domain::constants::ROUND2_MESSAGE;
use crate::domain::currency::Points;
use crate::domain::decision::{DecisionOutcome, Response};
use crate::domain::group::{Group, group_in_order};
use crate::domain::pages::{Page, PageView, ResultsView, should_show_final_results_screen};
use crate::domain::participant::Participant;
use crate::domain::player::{GroupId, ParticipantId, Player, PlayerKey};
use crate::domain::ports::{
    BarrierKey, ParticipantStoreBox, PlayerStoreBox, WaitPageBox,
};
use crate::error::{ExperimentError, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// A page a participant saw, in the order they saw it.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct PageVisit {
    pub round: u32,
    pub view: PageView,
}

#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct Transcript {
    pub participant: ParticipantId,
    pub visits: Vec<PageVisit>,
}

impl Transcript {
    fn new(participant: ParticipantId) -> Self {
        Self {
            participant,
            visits: Vec::new(),
        }
    }

    /// The cumulative payoff shown on the final results page, if it was reached.
    pub fn final_total(&self) -> Option<Points> {
        self.visits.iter().find_map(|visit| match visit.view {
            PageView::FinalResults { total_payoff } => Some(total_payoff),
            _ => None,
        })
    }

    pub fn results(&self, round: u32) -> Option<&ResultsView> {
        self.visits.iter().find_map(|visit| match &visit.view {
            PageView::Results(view) if visit.round == round => Some(view),
            _ => None,
        })
    }
}

/// One participant's outcome in one round.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct RoundSummary {
    pub participant: ParticipantId,
    pub round: u32,
    pub group: GroupId,
    pub decision: &'static str,
    pub opponent_decision: &'static str,
    pub same_choice: bool,
    pub timed_out: bool,
    pub payoff: Points,
    /// Cumulative payoff, only on the final round.
    pub total: Option<Points>,
}

/// Runs the page sequence of every round for a fixed set of participants.
///
/// All player and group records are created up front. Each participant is
/// driven by its own task; the wait page is the only point where they meet.
pub struct ExperimentSession {
    engine: PayoffEngine,
    participants: Vec<ParticipantId>,
    groups: HashMap<PlayerKey, Group>,
    player_store: PlayerStoreBox,
    participant_store: ParticipantStoreBox,
    wait_page: WaitPageBox,
}

impl ExperimentSession {
    /// Creates the session and its player, group and participant records.
    ///
    /// # Arguments
    ///
    /// * `config` - Payoffs, number of rounds and the Decision deadline.
    /// * `participants` - Who takes part. Paired in id order every round.
    /// * `player_store` - Per-round player records.
    /// * `participant_store` - Participants and their running payoff.
    /// * `wait_page` - Synchronization in front of the Results page.
    pub async fn create(
        config: &ExperimentConfig,
        participants: &[ParticipantId],
        player_store: PlayerStoreBox,
        participant_store: ParticipantStoreBox,
        wait_page: WaitPageBox,
    ) -> Result<Self> {
        config.validate()?;
        let engine = PayoffEngine::new(config);

        let mut groups = HashMap::new();
        for round in 1..=config.num_rounds {
            for group in group_in_order(round, participants)? {
                for member in group.members() {
                    player_store
                        .store(Player::new(*member, round, group.id))
                        .await?;
                    groups.insert(PlayerKey::new(*member, round), group.clone());
                }
            }
        }
        for id in participants {
            participant_store.store(Participant::new(*id)).await?;
        }

        let mut participants = participants.to_vec();
        participants.sort();
        info!(
            participants = participants.len(),
            rounds = config.num_rounds,
            "Session created"
        );

        Ok(Self {
            engine,
            participants,
            groups,
            player_store,
            participant_store,
            wait_page,
        })
    }

    pub fn participants(&self) -> &[ParticipantId] {
        &self.participants
    }

    /// Plays the whole session, one task per participant.
    ///
    /// The first failing participant aborts every other task, since its
    /// partner would otherwise wait at the wait page forever.
    pub async fn run(self: &Arc<Self>, script: &DecisionScript) -> Result<Vec<Transcript>> {
        if script.participants() != self.participants {
            return Err(ExperimentError::config(format!(
                "script covers participants {:?}, session has {:?}",
                script.participants(),
                self.participants
            )));
        }
        script.check(self.engine.num_rounds(), |round| {
            self.engine.decision_timeout(round).is_some()
        })?;

        let mut tasks = JoinSet::new();
        for participant in script.participants() {
            let session = Arc::clone(self);
            let responses = script.responses_for(participant);
            tasks.spawn(async move { session.play(participant, &responses).await });
        }

        let mut transcripts = Vec::with_capacity(self.participants.len());
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined
                .map_err(|e| ExperimentError::RoundAborted(e.to_string()))
                .and_then(|played| played);
            match outcome {
                Ok(transcript) => transcripts.push(transcript),
                Err(e) => {
                    warn!(error = %e, "Aborting session");
                    tasks.abort_all();
                    return Err(e);
                }
            }
        }
        transcripts.sort_by_key(|t| t.participant);
        Ok(transcripts)
    }

    /// Walks one participant through every round's page sequence.
    ///
    /// `responses` maps a round to the participant's answer; a missing round
    /// means the participant never answers.
    pub async fn play(
        &self,
        participant: ParticipantId,
        responses: &HashMap<u32, Response>,
    ) -> Result<Transcript> {
        let num_rounds = self.engine.num_rounds();
        let mut transcript = Transcript::new(participant);

        for round in 1..=num_rounds {
            let key = PlayerKey::new(participant, round);
            let group = self.group_of(key)?;

            for page in Page::SEQUENCE {
                if !page.is_displayed(round, num_rounds) {
                    continue;
                }
                debug!(%participant, round, ?page, "Page");
                let view = match page {
                    Page::Introduction => Some(PageView::Introduction),
                    Page::Round2Instructions => Some(PageView::Instructions {
                        message: ROUND2_MESSAGE.to_string(),
                    }),
                    Page::Decision => {
                        let response = responses.get(&round).copied().unwrap_or_default();
                        let decision = self.decide(key, response).await?;
                        Some(PageView::Decision { decision })
                    }
                    Page::ResultsWaitPage => {
                        self.wait_for_group(group).await?;
                        None
                    }
                    Page::Results => Some(PageView::Results(self.show_results(key, group).await?)),
                    Page::FinalResults => Some(PageView::FinalResults {
                        total_payoff: self.participant(participant).await?.payoff,
                    }),
                };
                if let Some(view) = view {
                    transcript.visits.push(PageVisit { round, view });
                }
            }
        }

        info!(%participant, "Participant finished");
        Ok(transcript)
    }

    async fn decide(&self, key: PlayerKey, response: Response) -> Result<DecisionOutcome> {
        if response.choice.is_none() && self.engine.decision_timeout(key.round).is_none() {
            return Err(ExperimentError::precondition(format!(
                "{} would never leave the Decision page",
                key
            )));
        }
        let answer = async move {
            tokio::time::sleep(response.after).await;
            match response.choice {
                Some(choice) => choice.cooperate(),
                None => std::future::pending().await,
            }
        };
        let outcome = self.engine.collect_decision(key.round, answer).await;

        let mut player = self.player(key).await?;
        self.engine.apply_decision(&mut player, outcome)?;
        self.player_store.store(player).await?;
        Ok(outcome)
    }

    async fn wait_for_group(&self, group: &Group) -> Result<()> {
        let key = BarrierKey {
            round: group.round_number,
            group: group.id,
        };
        self.wait_page
            .run_after_all_arrive(key, group.members().len(), Box::pin(self.set_payoffs(group)))
            .await
    }

    /// Runs once per group and round, after both members arrived.
    async fn set_payoffs(&self, group: &Group) -> Result<()> {
        let mut players = Vec::with_capacity(group.members().len());
        for member in group.members() {
            players.push(self.player(PlayerKey::new(*member, group.round_number)).await?);
        }

        let payoffs = self.engine.compute_group_payoffs(group, &mut players)?;

        for player in players {
            self.player_store.store(player).await?;
        }
        for (id, payoff) in payoffs {
            let mut participant = self.participant(id).await?;
            participant.accumulate(payoff);
            self.participant_store.store(participant).await?;
        }
        Ok(())
    }

    async fn show_results(&self, key: PlayerKey, group: &Group) -> Result<ResultsView> {
        let mut player = self.player(key).await?;
        let other_id = group.other_member(key.participant)?;
        let other = self.player(PlayerKey::new(other_id, key.round)).await?;

        let view = self.engine.compute_results_view(&player, &other)?;
        player.mark_displayed()?;
        self.player_store.store(player).await?;
        Ok(view)
    }

    /// Per-round outcomes of every participant, ordered by round then participant.
    pub async fn summaries(&self) -> Result<Vec<RoundSummary>> {
        let num_rounds = self.engine.num_rounds();
        let totals: HashMap<ParticipantId, Points> = self
            .participant_store
            .get_all()
            .await?
            .into_iter()
            .map(|participant| (participant.id, participant.payoff))
            .collect();

        let mut rows = Vec::new();
        for round in 1..=num_rounds {
            let mut players = self.player_store.players_in_round(round).await?;
            players.sort_by_key(|p| p.participant);
            for player in players {
                let group = self.group_of(player.key())?;
                let other_id = group.other_member(player.participant)?;
                let other = self.player(PlayerKey::new(other_id, round)).await?;
                let view = self.engine.compute_results_view(&player, &other)?;
                let payoff = player.payoff.ok_or_else(|| {
                    ExperimentError::precondition(format!("{} has no payoff", player.key()))
                })?;
                let total = if should_show_final_results_screen(round, num_rounds) {
                    let total = totals.get(&player.participant).copied().ok_or_else(|| {
                        ExperimentError::invariant(format!(
                            "unknown participant {}",
                            player.participant
                        ))
                    })?;
                    Some(total)
                } else {
                    None
                };
                rows.push(RoundSummary {
                    participant: player.participant,
                    round,
                    group: group.id,
                    decision: view.my_decision,
                    opponent_decision: view.opponent_decision,
                    same_choice: view.same_choice,
                    timed_out: player.timed_out,
                    payoff,
                    total,
                });
            }
        }
        Ok(rows)
    }

    pub async fn player(&self, key: PlayerKey) -> Result<Player> {
        self.player_store
            .get(key)
            .await?
            .ok_or_else(|| ExperimentError::invariant(format!("no player record for {}", key)))
    }

    pub async fn participant(&self, id: ParticipantId) -> Result<Participant> {
        self.participant_store
            .get(id)
            .await?
            .ok_or_else(|| ExperimentError::invariant(format!("unknown participant {}", id)))
    }

    fn group_of(&self, key: PlayerKey) -> Result<&Group> {
        self.groups
            .get(&key)
            .ok_or_else(|| ExperimentError::invariant(format!("{} has no group", key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::decision::Choice;
    use crate::domain::player::RoundStatus;
    use crate::infrastructure::in_memory::{InMemoryParticipantStore, InMemoryPlayerStore};
    use crate::infrastructure::wait_page::InMemoryWaitPage;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    async fn session(participants: &[u32]) -> Arc<ExperimentSession> {
        let ids: Vec<ParticipantId> = participants.iter().copied().map(ParticipantId).collect();
        let session = ExperimentSession::create(
            &ExperimentConfig::default(),
            &ids,
            Box::new(InMemoryPlayerStore::new()),
            Box::new(InMemoryParticipantStore::new()),
            Box::new(InMemoryWaitPage::new()),
        )
        .await
        .unwrap();
        Arc::new(session)
    }

    fn script(rows: &[(u32, u32, Response)]) -> DecisionScript {
        let mut script = DecisionScript::new();
        for (participant, round, response) in rows {
            script.insert(ParticipantId(*participant), *round, *response);
        }
        script
    }

    #[tokio::test]
    async fn test_create_builds_records_for_every_round() {
        let session = session(&[1, 2, 3, 4]).await;
        for round in 1..=2 {
            let player = session
                .player(PlayerKey::new(ParticipantId(3), round))
                .await
                .unwrap();
            assert_eq!(player.group, GroupId(2));
            assert_eq!(player.status, RoundStatus::Unanswered);
        }
        assert_eq!(
            session.participant(ParticipantId(4)).await.unwrap().payoff,
            Points::ZERO
        );
    }

    #[tokio::test]
    async fn test_create_rejects_odd_participant_count() {
        let result = ExperimentSession::create(
            &ExperimentConfig::default(),
            &[ParticipantId(1), ParticipantId(2), ParticipantId(3)],
            Box::new(InMemoryPlayerStore::new()),
            Box::new(InMemoryParticipantStore::new()),
            Box::new(InMemoryWaitPage::new()),
        )
        .await;
        assert!(matches!(result, Err(ExperimentError::Config(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_round_two_timeout_forces_defect() {
        let session = session(&[1, 2]).await;
        let script = script(&[
            (1, 1, Response::answer(Choice::Cooperate)),
            (2, 1, Response::answer(Choice::Cooperate)),
            (1, 2, Response::silent()),
            (2, 2, Response::answer(Choice::Cooperate)),
        ]);

        let transcripts = session.run(&script).await.unwrap();

        let first = session
            .player(PlayerKey::new(ParticipantId(1), 2))
            .await
            .unwrap();
        assert_eq!(first.cooperate, Some(false));
        assert!(first.timed_out);
        assert_eq!(first.payoff, Some(Points::new(dec!(400))));

        let second = session
            .player(PlayerKey::new(ParticipantId(2), 2))
            .await
            .unwrap();
        assert_eq!(second.payoff, Some(Points::new(dec!(0))));

        // 200 + 400 and 200 + 0
        assert_eq!(transcripts[0].final_total(), Some(Points::new(dec!(600))));
        assert_eq!(transcripts[1].final_total(), Some(Points::new(dec!(200))));
        assert!(transcripts[0].visits.iter().any(|v| matches!(
            v.view,
            PageView::Decision {
                decision: DecisionOutcome::TimedOut
            }
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_answer_counts_as_timeout() {
        let session = session(&[1, 2]).await;
        let script = script(&[
            (1, 1, Response::answer(Choice::Defect)),
            (2, 1, Response::answer(Choice::Defect)),
            (
                1,
                2,
                Response::answer_after(Choice::Cooperate, Duration::from_secs(121)),
            ),
            (
                2,
                2,
                Response::answer_after(Choice::Cooperate, Duration::from_secs(119)),
            ),
        ]);

        let transcripts = session.run(&script).await.unwrap();
        let view = transcripts[0].results(2).unwrap();
        assert_eq!(view.my_decision, "Defect");
        assert_eq!(view.opponent_decision, "Cooperate");
        assert!(!view.same_choice);
        assert_eq!(transcripts[0].final_total(), Some(Points::new(dec!(500))));
    }

    #[tokio::test]
    async fn test_page_order_per_round() {
        let session = session(&[1, 2]).await;
        let script = script(&[
            (1, 1, Response::answer(Choice::Cooperate)),
            (2, 1, Response::answer(Choice::Defect)),
            (1, 2, Response::answer(Choice::Cooperate)),
            (2, 2, Response::answer(Choice::Defect)),
        ]);
        let transcripts = session.run(&script).await.unwrap();

        let pages: Vec<(u32, &str)> = transcripts[0]
            .visits
            .iter()
            .map(|v| {
                let name = match v.view {
                    PageView::Introduction => "introduction",
                    PageView::Instructions { .. } => "instructions",
                    PageView::Decision { .. } => "decision",
                    PageView::Results(_) => "results",
                    PageView::FinalResults { .. } => "final_results",
                };
                (v.round, name)
            })
            .collect();
        assert_eq!(
            pages,
            vec![
                (1, "introduction"),
                (1, "decision"),
                (1, "results"),
                (2, "instructions"),
                (2, "decision"),
                (2, "results"),
                (2, "final_results"),
            ]
        );
    }

    #[tokio::test]
    async fn test_round_two_instructions_are_plain_text() {
        let session = session(&[1, 2]).await;
        let script = script(&[
            (1, 1, Response::answer(Choice::Cooperate)),
            (2, 1, Response::answer(Choice::Cooperate)),
            (1, 2, Response::answer(Choice::Cooperate)),
            (2, 2, Response::answer(Choice::Cooperate)),
        ]);
        let transcripts = session.run(&script).await.unwrap();

        let message = transcripts[0]
            .visits
            .iter()
            .find_map(|v| match &v.view {
                PageView::Instructions { message } => Some(message.clone()),
                _ => None,
            })
            .unwrap();
        assert!(!message.contains('<'));
        assert_eq!(message.lines().count(), 3);
        assert!(message.lines().last().unwrap().contains("time limit"));
    }

    #[tokio::test]
    async fn test_players_end_displayed_and_summaries() {
        let session = session(&[1, 2]).await;
        let script = script(&[
            (1, 1, Response::answer(Choice::Defect)),
            (2, 1, Response::answer(Choice::Cooperate)),
            (1, 2, Response::answer(Choice::Defect)),
            (2, 2, Response::answer(Choice::Defect)),
        ]);
        session.run(&script).await.unwrap();

        let summaries = session.summaries().await.unwrap();
        assert_eq!(summaries.len(), 4);
        assert_eq!(summaries[0].participant, ParticipantId(1));
        assert_eq!(summaries[0].payoff, Points::new(dec!(400)));
        assert_eq!(summaries[0].total, None);
        assert_eq!(summaries[2].round, 2);
        assert_eq!(summaries[2].total, Some(Points::new(dec!(500))));
        assert_eq!(summaries[3].total, Some(Points::new(dec!(100))));

        for round in 1..=2 {
            for participant in [1, 2] {
                let player = session
                    .player(PlayerKey::new(ParticipantId(participant), round))
                    .await
                    .unwrap();
                assert_eq!(player.status, RoundStatus::Displayed);
            }
        }
    }

    /// Lists a round's players in descending participant order.
    #[derive(Default)]
    struct DescendingPlayerStore(InMemoryPlayerStore);

    #[async_trait::async_trait]
    impl crate::domain::ports::PlayerStore for DescendingPlayerStore {
        async fn store(&self, player: Player) -> Result<()> {
            self.0.store(player).await
        }

        async fn get(&self, key: PlayerKey) -> Result<Option<Player>> {
            self.0.get(key).await
        }

        async fn players_in_round(&self, round: u32) -> Result<Vec<Player>> {
            let mut players = self.0.players_in_round(round).await?;
            players.reverse();
            Ok(players)
        }
    }

    #[tokio::test]
    async fn test_summaries_ordered_regardless_of_store_order() {
        let ids = [ParticipantId(1), ParticipantId(2), ParticipantId(3), ParticipantId(4)];
        let session = Arc::new(
            ExperimentSession::create(
                &ExperimentConfig::default(),
                &ids,
                Box::new(DescendingPlayerStore::default()),
                Box::new(InMemoryParticipantStore::new()),
                Box::new(InMemoryWaitPage::new()),
            )
            .await
            .unwrap(),
        );
        let mut rows = Vec::new();
        for participant in 1..=4 {
            for round in 1..=2 {
                rows.push((participant, round, Response::answer(Choice::Cooperate)));
            }
        }
        session.run(&script(&rows)).await.unwrap();

        let order: Vec<(u32, u32)> = session
            .summaries()
            .await
            .unwrap()
            .iter()
            .map(|row| (row.round, row.participant.0))
            .collect();
        assert_eq!(
            order,
            vec![(1, 1), (1, 2), (1, 3), (1, 4), (2, 1), (2, 2), (2, 3), (2, 4)]
        );
    }

    #[tokio::test]
    async fn test_run_rejects_silence_in_untimed_round() {
        let session = session(&[1, 2]).await;
        let script = script(&[
            (1, 1, Response::silent()),
            (2, 1, Response::answer(Choice::Cooperate)),
        ]);
        assert!(matches!(
            session.run(&script).await,
            Err(ExperimentError::PreconditionNotMet(_))
        ));
    }

    #[tokio::test]
    async fn test_run_rejects_unknown_participants() {
        let session = session(&[1, 2]).await;
        let script = script(&[
            (1, 1, Response::answer(Choice::Cooperate)),
            (3, 1, Response::answer(Choice::Cooperate)),
        ]);
        assert!(matches!(
            session.run(&script).await,
            Err(ExperimentError::Config(_))
        ));
    }
}
