use super::participant::Participant;
use super::player::{GroupId, ParticipantId, Player, PlayerKey};
use crate::error::Result;
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[async_trait]
pub trait PlayerStore: Send + Sync {
    async fn store(&self, player: Player) -> Result<()>;
    async fn get(&self, key: PlayerKey) -> Result<Option<Player>>;
    /// Every player record of `round`, ordered by participant id.
    async fn players_in_round(&self, round: u32) -> Result<Vec<Player>>;
}

#[async_trait]
pub trait ParticipantStore: Send + Sync {
    async fn store(&self, participant: Participant) -> Result<()>;
    async fn get(&self, id: ParticipantId) -> Result<Option<Participant>>;
    /// Every participant, ordered by id.
    async fn get_all(&self) -> Result<Vec<Participant>>;
}

/// Identifies one wait page instance: a group in a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BarrierKey {
    pub round: u32,
    pub group: GroupId,
}

/// Cross-player synchronization in front of the Results page.
#[async_trait]
pub trait WaitPage: Send + Sync {
    /// Blocks until `expected` callers arrived for `key`, then runs the last
    /// arrival's `after_all_arrive` exactly once and releases every caller
    /// when it has finished. Callbacks of earlier arrivals are dropped unpolled.
    async fn run_after_all_arrive<'a>(
        &'a self,
        key: BarrierKey,
        expected: usize,
        after_all_arrive: BoxFuture<'a, Result<()>>,
    ) -> Result<()>;
}

pub type PlayerStoreBox = Box<dyn PlayerStore>;
pub type ParticipantStoreBox = Box<dyn ParticipantStore>;
pub type WaitPageBox = Box<dyn WaitPage>;
