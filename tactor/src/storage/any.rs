use bytes::Bytes;
use url::Url;

use crate::{
    base::PersistenceId,
    errors::{ConfigError, StorageError},
    shard::ShardConfig,
    storage::{EventRecord, MemoryStorage, StateRecord, StorageAdapter, StorageTransaction},
};

#[cfg(feature = "fs")]
use crate::storage::FileStorage;

/// Storage backend chosen at runtime from a URL.
///
/// - `memory:` keeps everything in process memory.
/// - `file:///path/to/dir` stores under the given directory; `file:///` alone
///   selects the platform data directory.
#[derive(Debug, Clone)]
pub enum AnyStorage {
    Memory(MemoryStorage),
    #[cfg(feature = "fs")]
    File(FileStorage),
}

#[derive(Debug)]
pub enum AnyTransaction {
    Memory(<MemoryStorage as StorageAdapter>::Transaction),
    #[cfg(feature = "fs")]
    File(<FileStorage as StorageAdapter>::Transaction),
}

// Implementations

impl AnyStorage {
    pub fn open(url: &Url, shards: ShardConfig) -> Result<Self, ConfigError> {
        shards.validate()?;

        match url.scheme() {
            "memory" => Ok(AnyStorage::Memory(MemoryStorage::new(shards)?)),
            #[cfg(feature = "fs")]
            "file" => {
                if url.path() == "/" {
                    return Ok(AnyStorage::File(FileStorage::open_default(shards)?));
                }

                let path = url.to_file_path().map_err(|_| ConfigError::Invalid {
                    field: "storage",
                    reason: format!("not a local path: {url}"),
                })?;

                Ok(AnyStorage::File(FileStorage::open(path, shards)?))
            }
            scheme => Err(ConfigError::UnsupportedScheme(scheme.to_string())),
        }
    }
}

impl From<MemoryStorage> for AnyStorage {
    fn from(storage: MemoryStorage) -> Self {
        AnyStorage::Memory(storage)
    }
}

#[cfg(feature = "fs")]
impl From<FileStorage> for AnyStorage {
    fn from(storage: FileStorage) -> Self {
        AnyStorage::File(storage)
    }
}

impl StorageAdapter for AnyStorage {
    type Transaction = AnyTransaction;

    fn shards(&self) -> ShardConfig {
        match self {
            AnyStorage::Memory(s) => s.shards(),
            #[cfg(feature = "fs")]
            AnyStorage::File(s) => s.shards(),
        }
    }

    async fn transaction(&self, id: &PersistenceId) -> Result<AnyTransaction, StorageError> {
        match self {
            AnyStorage::Memory(s) => s.transaction(id).await.map(AnyTransaction::Memory),
            #[cfg(feature = "fs")]
            AnyStorage::File(s) => s.transaction(id).await.map(AnyTransaction::File),
        }
    }

    async fn load(&self, id: &PersistenceId) -> Result<Option<StateRecord>, StorageError> {
        match self {
            AnyStorage::Memory(s) => s.load(id).await,
            #[cfg(feature = "fs")]
            AnyStorage::File(s) => s.load(id).await,
        }
    }

    async fn events(&self, id: &PersistenceId) -> Result<Vec<EventRecord>, StorageError> {
        match self {
            AnyStorage::Memory(s) => s.events(id).await,
            #[cfg(feature = "fs")]
            AnyStorage::File(s) => s.events(id).await,
        }
    }
}

impl StorageTransaction for AnyTransaction {
    fn persistence_id(&self) -> &PersistenceId {
        match self {
            AnyTransaction::Memory(t) => t.persistence_id(),
            #[cfg(feature = "fs")]
            AnyTransaction::File(t) => t.persistence_id(),
        }
    }

    async fn get(&mut self) -> Result<Option<StateRecord>, StorageError> {
        match self {
            AnyTransaction::Memory(t) => t.get().await,
            #[cfg(feature = "fs")]
            AnyTransaction::File(t) => t.get().await,
        }
    }

    async fn set(&mut self, state: Bytes, event_sequence: u64) -> Result<(), StorageError> {
        match self {
            AnyTransaction::Memory(t) => t.set(state, event_sequence).await,
            #[cfg(feature = "fs")]
            AnyTransaction::File(t) => t.set(state, event_sequence).await,
        }
    }

    async fn emit(&mut self, event: Bytes, sequence: u64) -> Result<(), StorageError> {
        match self {
            AnyTransaction::Memory(t) => t.emit(event, sequence).await,
            #[cfg(feature = "fs")]
            AnyTransaction::File(t) => t.emit(event, sequence).await,
        }
    }

    async fn commit(self) -> Result<(), StorageError> {
        match self {
            AnyTransaction::Memory(t) => t.commit().await,
            #[cfg(feature = "fs")]
            AnyTransaction::File(t) => t.commit().await,
        }
    }

    async fn abort(self) -> Result<(), StorageError> {
        match self {
            AnyTransaction::Memory(t) => t.abort().await,
            #[cfg(feature = "fs")]
            AnyTransaction::File(t) => t.abort().await,
        }
    }
}
