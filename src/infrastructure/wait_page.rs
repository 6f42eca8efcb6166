use crate::domain::ports::{BarrierKey, BoxFuture, WaitPage};
use crate::error::{ExperimentError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tracing::debug;

type Release = Option<std::result::Result<(), String>>;

struct Gate {
    arrived: Mutex<usize>,
    released: watch::Sender<Release>,
}

impl Gate {
    fn new() -> Self {
        let (released, _) = watch::channel(None);
        Self {
            arrived: Mutex::new(0),
            released,
        }
    }
}

#[derive(Default)]
struct Gates {
    open: HashMap<BarrierKey, Arc<Gate>>,
    /// Keys whose gate already released its group.
    closed: HashSet<BarrierKey>,
}

/// An in-process wait page built on tokio primitives.
///
/// One gate is kept per `BarrierKey` while its group is gathering. The last
/// arrival runs its callback, removes the gate and publishes the outcome on a
/// `watch` channel that every earlier arrival is parked on.
#[derive(Default, Clone)]
pub struct InMemoryWaitPage {
    gates: Arc<Mutex<Gates>>,
}

impl InMemoryWaitPage {
    pub fn new() -> Self {
        Self::default()
    }

    async fn gate(&self, key: BarrierKey) -> Result<Arc<Gate>> {
        let mut gates = self.gates.lock().await;
        if gates.closed.contains(&key) {
            return Err(ExperimentError::invariant(format!(
                "wait page of group {} in round {} was already released",
                key.group, key.round
            )));
        }
        Ok(Arc::clone(
            gates.open.entry(key).or_insert_with(|| Arc::new(Gate::new())),
        ))
    }

    async fn close(&self, key: BarrierKey) {
        let mut gates = self.gates.lock().await;
        gates.open.remove(&key);
        gates.closed.insert(key);
    }
}

#[async_trait]
impl WaitPage for InMemoryWaitPage {
    async fn run_after_all_arrive<'a>(
        &'a self,
        key: BarrierKey,
        expected: usize,
        after_all_arrive: BoxFuture<'a, Result<()>>,
    ) -> Result<()> {
        let gate = self.gate(key).await?;
        let mut released = gate.released.subscribe();

        let arrived = {
            let mut arrived = gate.arrived.lock().await;
            *arrived += 1;
            *arrived
        };
        if arrived > expected {
            return Err(ExperimentError::invariant(format!(
                "{} arrivals at the wait page of group {} in round {}, expected {}",
                arrived, key.group, key.round, expected
            )));
        }

        if arrived == expected {
            debug!(round = key.round, group = %key.group, "All players arrived");
            let result = after_all_arrive.await;
            let outcome = result.as_ref().map(|_| ()).map_err(|e| e.to_string());
            self.close(key).await;
            gate.released.send_replace(Some(outcome));
            return result;
        }

        drop(after_all_arrive);
        debug!(round = key.round, group = %key.group, arrived, expected, "Waiting for group");
        let outcome = released
            .wait_for(Option::is_some)
            .await
            .map_err(|_| ExperimentError::RoundAborted("wait page closed".to_string()))?
            .clone();
        match outcome {
            Some(Ok(())) => Ok(()),
            Some(Err(reason)) => Err(ExperimentError::RoundAborted(reason)),
            None => Err(ExperimentError::RoundAborted(
                "wait page released without an outcome".to_string(),
            )),
        }
    }
}
