//! Durable snapshot and event-log storage.
//!
//! Every write goes through a [`StorageTransaction`] bound to a single
//! persistence id. Transactions on the same id never interleave, and a
//! transaction that is dropped without [`StorageTransaction::commit`] leaves
//! no trace.

use std::{
    fmt,
    future::Future,
    sync::{Arc, Mutex as SyncMutex, PoisonError},
};

use bytes::Bytes;
use rustc_hash::FxHashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    base::PersistenceId,
    errors::StorageError,
    shard::{Shard, ShardConfig},
};

pub mod any;
#[cfg(feature = "fs")]
pub mod file;
pub mod memory;

// Re-exports
pub use any::AnyStorage;
#[cfg(feature = "fs")]
pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Latest materialized state of one actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateRecord {
    pub persistence_id: PersistenceId,
    pub shard: Shard,
    pub state: Bytes,
    pub event_sequence: u64,
}

/// One entry of an actor's append-only event log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub persistence_id: PersistenceId,
    pub shard: Shard,
    pub sequence: u64,
    pub event: Bytes,
}

/// One async lock per persistence id, created on first use and removed once
/// no transaction holds or waits for it.
#[derive(Debug, Default, Clone)]
pub(crate) struct IdLocks(Arc<SyncMutex<FxHashMap<PersistenceId, Arc<Mutex<()>>>>>);

/// Exclusive hold on one persistence id, released on drop.
pub(crate) struct IdGuard {
    locks: IdLocks,
    id: PersistenceId,
    guard: Option<OwnedMutexGuard<()>>,
}

pub trait StorageAdapter: Send + Sync + 'static {
    type Transaction: StorageTransaction;

    /// Shard configuration rows are written with.
    fn shards(&self) -> ShardConfig;

    /// Open a transaction scoped to `id`, waiting for any other transaction on
    /// the same id to finish first.
    fn transaction(
        &self,
        id: &PersistenceId,
    ) -> impl Future<Output = Result<Self::Transaction, StorageError>> + Send;

    /// Latest committed snapshot, for diagnostics. Not guaranteed fresh.
    fn load(
        &self,
        id: &PersistenceId,
    ) -> impl Future<Output = Result<Option<StateRecord>, StorageError>> + Send;

    /// Committed events of `id` in sequence order, for diagnostics.
    fn events(
        &self,
        id: &PersistenceId,
    ) -> impl Future<Output = Result<Vec<EventRecord>, StorageError>> + Send;
}

pub trait StorageTransaction: Send + 'static {
    fn persistence_id(&self) -> &PersistenceId;

    /// Snapshot as of the start of this transaction; `None` if never persisted.
    fn get(&mut self) -> impl Future<Output = Result<Option<StateRecord>, StorageError>> + Send;

    /// Upsert the snapshot row.
    fn set(
        &mut self,
        state: Bytes,
        event_sequence: u64,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Append one event row. Fails with [`StorageError::DuplicateEvent`] if the
    /// sequence is already taken, either here or at commit.
    fn emit(
        &mut self,
        event: Bytes,
        sequence: u64,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    fn commit(self) -> impl Future<Output = Result<(), StorageError>> + Send;

    fn abort(self) -> impl Future<Output = Result<(), StorageError>> + Send;
}

// Implementations

impl IdLocks {
    pub(crate) async fn lock(&self, id: &PersistenceId) -> IdGuard {
        let lock = self
            .0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(id.clone())
            .or_default()
            .clone();

        IdGuard {
            locks: self.clone(),
            id: id.clone(),
            guard: Some(lock.lock_owned().await),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Drop for IdGuard {
    fn drop(&mut self) {
        let mut locks = self.locks.0.lock().unwrap_or_else(PoisonError::into_inner);
        drop(self.guard.take());

        // Waiters clone the lock under the map lock, so a lone reference is idle
        if locks.get(&self.id).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(&self.id);
        }
    }
}

impl fmt::Debug for IdGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdGuard").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn id(name: &str) -> PersistenceId {
        PersistenceId::for_actor("test", name).unwrap()
    }

    #[tokio::test]
    async fn test_idle_locks_are_removed() {
        let locks = IdLocks::default();

        let a = locks.lock(&id("a")).await;
        let b = locks.lock(&id("b")).await;
        assert_eq!(locks.len(), 2);

        drop(a);
        assert_eq!(locks.len(), 1);

        drop(b);
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn test_lock_kept_while_waited_on() {
        let locks = IdLocks::default();
        let first = locks.lock(&id("a")).await;

        let waiter = tokio::spawn({
            let locks = locks.clone();
            async move {
                let _second = locks.lock(&id("a")).await;
            }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(first);
        assert_eq!(locks.len(), 1);

        waiter.await.unwrap();
        assert_eq!(locks.len(), 0);
    }
}
