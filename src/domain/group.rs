use super::constants::PLAYERS_PER_GROUP;
use super::player::{GroupId, ParticipantId};
use crate::error::{ExperimentError, Result};
use serde::{Deserialize, Serialize};

/// The two players matched in one round.
///
/// Only membership is stored; "the other player" is always answered by a
/// query over the members rather than a stored reference.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Group {
    pub id: GroupId,
    pub round_number: u32,
    members: Vec<ParticipantId>,
}

impl Group {
    pub fn new(id: GroupId, round_number: u32, members: Vec<ParticipantId>) -> Result<Self> {
        if members.len() != PLAYERS_PER_GROUP {
            return Err(ExperimentError::invariant(format!(
                "group {} in round {} has {} players, expected {}",
                id,
                round_number,
                members.len(),
                PLAYERS_PER_GROUP
            )));
        }
        if members[0] == members[1] {
            return Err(ExperimentError::invariant(format!(
                "group {} in round {} lists participant {} twice",
                id, round_number, members[0]
            )));
        }
        Ok(Self {
            id,
            round_number,
            members,
        })
    }

    pub fn members(&self) -> &[ParticipantId] {
        &self.members
    }

    pub fn contains(&self, participant: ParticipantId) -> bool {
        self.members.contains(&participant)
    }

    /// The unique other member of this group.
    pub fn other_member(&self, participant: ParticipantId) -> Result<ParticipantId> {
        if !self.contains(participant) {
            return Err(ExperimentError::invariant(format!(
                "participant {} is not a member of group {}",
                participant, self.id
            )));
        }
        let others: Vec<ParticipantId> = self
            .members
            .iter()
            .copied()
            .filter(|member| *member != participant)
            .collect();
        match others.as_slice() {
            [other] => Ok(*other),
            _ => Err(ExperimentError::invariant(format!(
                "participant {} has {} partners in group {}",
                participant,
                others.len(),
                self.id
            ))),
        }
    }
}

/// Matches participants for a round: consecutive pairs in id order.
///
/// The same pairs are formed every round.
pub fn group_in_order(round_number: u32, participants: &[ParticipantId]) -> Result<Vec<Group>> {
    if participants.len() < PLAYERS_PER_GROUP || participants.len() % PLAYERS_PER_GROUP != 0 {
        return Err(ExperimentError::config(format!(
            "{} participants cannot be split into groups of {}",
            participants.len(),
            PLAYERS_PER_GROUP
        )));
    }
    let mut ordered = participants.to_vec();
    ordered.sort();
    ordered.dedup();
    if ordered.len() != participants.len() {
        return Err(ExperimentError::config("duplicate participant ids"));
    }

    ordered
        .chunks(PLAYERS_PER_GROUP)
        .zip(1u32..)
        .map(|(pair, id)| Group::new(GroupId(id), round_number, pair.to_vec()))
        .collect()
}
