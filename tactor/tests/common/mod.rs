#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use anyhow::bail;
use serde::{Deserialize, Serialize};
use tactor::{
    codec::{Codec, Postcard},
    prelude::*,
};
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Count {
    pub count: u64,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub enum CounterEvent {
    Incremented,
}

#[derive(Debug, PartialEq, Tagged)]
pub enum CounterMsg {
    Increment,
    Get,
    /// Increments and emits, then fails.
    FailAfterEmit,
    Panic,
    /// Blocks until the gate opens.
    Wait,
}

#[derive(Debug, Default)]
pub struct Counter {
    pub gate: Arc<Notify>,
}

impl Transactional for Counter {
    type State = Count;
    type Event = CounterEvent;
    type Msg = CounterMsg;
    type Reply = u64;

    async fn receive(
        &self,
        tx: &mut Transition<Count, CounterEvent>,
        _ctx: &Context<Self>,
        msg: CounterMsg,
    ) -> anyhow::Result<u64> {
        match msg {
            CounterMsg::Increment => Ok(increment(tx)),
            CounterMsg::Get => Ok(tx.get().count),
            CounterMsg::FailAfterEmit => {
                increment(tx);
                bail!("failed after emit")
            }
            CounterMsg::Panic => panic!("behavior blew up"),
            CounterMsg::Wait => {
                self.gate.notified().await;
                Ok(tx.get().count)
            }
        }
    }
}

fn increment(tx: &mut Transition<Count, CounterEvent>) -> u64 {
    let count = tx.get().count + 1;
    tx.set(Count { count });
    tx.emit(CounterEvent::Incremented);
    count
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn system(name: &str) -> ActorSystem<MemoryStorage> {
    init_tracing();
    ActorSystem::new(SystemConfig::new(name), MemoryStorage::default()).unwrap()
}

/// Decoded snapshot of `name` and its event sequence.
pub async fn snapshot<St: StorageAdapter>(
    system: &ActorSystem<St>,
    name: &str,
) -> Option<(Count, u64)> {
    let id = system.persistence_id(name).unwrap();
    let record = system.storage().load(&id).await.unwrap()?;

    Some((
        Postcard.decode(&record.state).unwrap(),
        record.event_sequence,
    ))
}

/// Decoded event log of `name` as `(sequence, event)` pairs.
pub async fn events<St: StorageAdapter>(
    system: &ActorSystem<St>,
    name: &str,
) -> Vec<(u64, CounterEvent)> {
    let id = system.persistence_id(name).unwrap();

    system
        .storage()
        .events(&id)
        .await
        .unwrap()
        .into_iter()
        .map(|r| (r.sequence, Postcard.decode(&r.event).unwrap()))
        .collect()
}

pub async fn wait_for_phase(actor: &ActorRef<Counter>, phase: Phase) {
    let mut rx = actor.observe();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|p| *p == phase))
        .await
        .expect("phase not reached in time")
        .unwrap();
}

/// Poll `cond` until it holds, failing the test after a few seconds.
pub async fn eventually<F, Fut>(mut cond: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond().await {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not met in time");
}
