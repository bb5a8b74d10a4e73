//! In-memory storage with the same two-table layout as a relational backend.
//!
//! Not durable; meant for tests and single-process deployments.

use std::{collections::BTreeMap, sync::Arc};

use bytes::Bytes;
use rustc_hash::FxHashMap;
use tokio::sync::RwLock;

use crate::{
    base::PersistenceId,
    errors::{ConfigError, StorageError},
    shard::{Shard, ShardConfig},
    storage::{EventRecord, IdGuard, IdLocks, StateRecord, StorageAdapter, StorageTransaction},
    trace,
};

#[derive(Debug, Clone)]
pub struct MemoryStorage {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    shards: ShardConfig,
    tables: RwLock<Tables>,
    locks: IdLocks,
}

#[derive(Debug, Default)]
struct Tables {
    state_journal: FxHashMap<PersistenceId, StateRecord>,
    event_journal: BTreeMap<(PersistenceId, u64), EventRecord>,
}

/// Buffers writes until commit, holding the per-id lock for its lifetime.
#[derive(Debug)]
pub struct MemoryTransaction {
    id: PersistenceId,
    shard: Shard,
    storage: MemoryStorage,
    state: Option<(Bytes, u64)>,
    events: Vec<EventRecord>,
    _guard: IdGuard,
}

// Implementations

impl MemoryStorage {
    pub fn new(shards: ShardConfig) -> Result<Self, ConfigError> {
        shards.validate()?;

        Ok(Self::with_valid(shards))
    }

    fn with_valid(shards: ShardConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                shards,
                tables: RwLock::default(),
                locks: IdLocks::default(),
            }),
        }
    }

    async fn contains_event(&self, id: &PersistenceId, sequence: u64) -> bool {
        self.inner
            .tables
            .read()
            .await
            .event_journal
            .contains_key(&(id.clone(), sequence))
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::with_valid(ShardConfig::default())
    }
}

impl StorageAdapter for MemoryStorage {
    type Transaction = MemoryTransaction;

    fn shards(&self) -> ShardConfig {
        self.inner.shards
    }

    async fn transaction(&self, id: &PersistenceId) -> Result<MemoryTransaction, StorageError> {
        let guard = self.inner.locks.lock(id).await;

        Ok(MemoryTransaction {
            id: id.clone(),
            shard: self.inner.shards.shard_of(id),
            storage: self.clone(),
            state: None,
            events: Vec::new(),
            _guard: guard,
        })
    }

    async fn load(&self, id: &PersistenceId) -> Result<Option<StateRecord>, StorageError> {
        Ok(self.inner.tables.read().await.state_journal.get(id).cloned())
    }

    async fn events(&self, id: &PersistenceId) -> Result<Vec<EventRecord>, StorageError> {
        let tables = self.inner.tables.read().await;

        Ok(tables
            .event_journal
            .range((id.clone(), 0)..=(id.clone(), u64::MAX))
            .map(|(_, record)| record.clone())
            .collect())
    }
}

impl StorageTransaction for MemoryTransaction {
    fn persistence_id(&self) -> &PersistenceId {
        &self.id
    }

    async fn get(&mut self) -> Result<Option<StateRecord>, StorageError> {
        if let Some((state, event_sequence)) = &self.state {
            return Ok(Some(StateRecord {
                persistence_id: self.id.clone(),
                shard: self.shard,
                state: state.clone(),
                event_sequence: *event_sequence,
            }));
        }

        self.storage.load(&self.id).await
    }

    async fn set(&mut self, state: Bytes, event_sequence: u64) -> Result<(), StorageError> {
        self.state = Some((state, event_sequence));
        Ok(())
    }

    async fn emit(&mut self, event: Bytes, sequence: u64) -> Result<(), StorageError> {
        let buffered = self.events.iter().any(|e| e.sequence == sequence);

        if buffered || self.storage.contains_event(&self.id, sequence).await {
            return Err(StorageError::DuplicateEvent {
                id: self.id.clone(),
                sequence,
            });
        }

        self.events.push(EventRecord {
            persistence_id: self.id.clone(),
            shard: self.shard,
            sequence,
            event,
        });

        Ok(())
    }

    async fn commit(self) -> Result<(), StorageError> {
        let mut tables = self.storage.inner.tables.write().await;

        // Validate everything before the first write so a failure applies nothing
        if let Some(dup) = self
            .events
            .iter()
            .find(|e| tables.event_journal.contains_key(&(self.id.clone(), e.sequence)))
        {
            return Err(StorageError::DuplicateEvent {
                id: self.id.clone(),
                sequence: dup.sequence,
            });
        }

        if let Some((state, event_sequence)) = self.state {
            tables.state_journal.insert(
                self.id.clone(),
                StateRecord {
                    persistence_id: self.id.clone(),
                    shard: self.shard,
                    state,
                    event_sequence,
                },
            );
        }

        let appended = self.events.len();
        for record in self.events {
            tables
                .event_journal
                .insert((self.id.clone(), record.sequence), record);
        }

        trace!("{} committed with {appended} events", self.id);

        Ok(())
    }

    async fn abort(self) -> Result<(), StorageError> {
        trace!("{} aborted, {} events discarded", self.id, self.events.len());
        Ok(())
    }
}
