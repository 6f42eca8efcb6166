use crate::domain::participant::Participant;
use crate::domain::player::{ParticipantId, Player, PlayerKey};
use crate::domain::ports::{ParticipantStore, PlayerStore};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for per-round player records.
///
/// Uses `Arc<RwLock<HashMap<PlayerKey, Player>>>` so every participant task can
/// share it.
#[derive(Default, Clone)]
pub struct InMemoryPlayerStore {
    players: Arc<RwLock<HashMap<PlayerKey, Player>>>,
}

impl InMemoryPlayerStore {
    /// Creates a new, empty in-memory player store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlayerStore for InMemoryPlayerStore {
    async fn store(&self, player: Player) -> Result<()> {
        let mut players = self.players.write().await;
        players.insert(player.key(), player);
        Ok(())
    }

    async fn get(&self, key: PlayerKey) -> Result<Option<Player>> {
        let players = self.players.read().await;
        Ok(players.get(&key).cloned())
    }

    async fn players_in_round(&self, round: u32) -> Result<Vec<Player>> {
        let players = self.players.read().await;
        let mut in_round: Vec<Player> = players
            .values()
            .filter(|p| p.round_number == round)
            .cloned()
            .collect();
        in_round.sort_by_key(|p| p.participant);
        Ok(in_round)
    }
}

/// A thread-safe in-memory store for participants and their running payoff.
#[derive(Default, Clone)]
pub struct InMemoryParticipantStore {
    participants: Arc<RwLock<HashMap<ParticipantId, Participant>>>,
}

impl InMemoryParticipantStore {
    /// Creates a new, empty in-memory participant store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ParticipantStore for InMemoryParticipantStore {
    async fn store(&self, participant: Participant) -> Result<()> {
        let mut participants = self.participants.write().await;
        participants.insert(participant.id, participant);
        Ok(())
    }

    async fn get(&self, id: ParticipantId) -> Result<Option<Participant>> {
        let participants = self.participants.read().await;
        Ok(participants.get(&id).cloned())
    }

    async fn get_all(&self) -> Result<Vec<Participant>> {
        let participants = self.participants.read().await;
        let mut all: Vec<Participant> = participants.values().cloned().collect();
        all.sort_by_key(|p| p.id);
        Ok(all)
    }
}
