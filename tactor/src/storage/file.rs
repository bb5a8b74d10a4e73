//! Durable storage on the local file system.
//!
//! Layout, per actor:
//!
//! ```text
//! <root>/<shard>/<hex(persistence id)>/state.bin
//! <root>/<shard>/<hex(persistence id)>/events/<sequence>.bin
//! ```
//!
//! `state.bin` holds the snapshot watermark followed by the encoded state and
//! is replaced by atomic rename; that rename is the commit point. Event files
//! are written before it with no-clobber semantics. Any event file above the
//! watermark is the residue of an interrupted commit and is removed when the
//! next transaction opens.
//!
//! A transaction holds an exclusive advisory lock on `<actor dir>/lock` from
//! open to commit or drop, so instances in other processes sharing the root
//! never interleave on one actor.

use std::{
    fmt::Write as _,
    fs,
    io::{self, Write as _},
    path::{Path, PathBuf},
    sync::Arc,
};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use directories::ProjectDirs;
use fs4::fs_std::FileExt;
use tempfile::NamedTempFile;

use crate::{
    base::PersistenceId,
    debug,
    errors::{ConfigError, StorageError},
    shard::{Shard, ShardConfig},
    storage::{EventRecord, IdGuard, IdLocks, StateRecord, StorageAdapter, StorageTransaction},
    trace, warn,
};

const STATE_FILE: &str = "state.bin";
const EVENTS_DIR: &str = "events";
const EVENT_EXT: &str = ".bin";
const LOCK_FILE: &str = "lock";

#[derive(Debug, Clone)]
pub struct FileStorage {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    root: PathBuf,
    shards: ShardConfig,
    locks: IdLocks,
}

#[derive(Debug)]
pub struct FileTransaction {
    id: PersistenceId,
    shard: Shard,
    dir: PathBuf,
    committed: Option<StateRecord>,
    state: Option<(Bytes, u64)>,
    events: Vec<(u64, Bytes)>,
    _lock: fs::File,
    _guard: IdGuard,
}

// Implementations

impl FileStorage {
    pub fn open(root: impl Into<PathBuf>, shards: ShardConfig) -> Result<Self, ConfigError> {
        shards.validate()?;

        Ok(Self {
            inner: Arc::new(Inner {
                root: root.into(),
                shards,
                locks: IdLocks::default(),
            }),
        })
    }

    /// Open under the platform data directory.
    pub fn open_default(shards: ShardConfig) -> Result<Self, ConfigError> {
        let dirs = ProjectDirs::from("", "", "tactor").ok_or(ConfigError::NoDataDir)?;

        Self::open(dirs.data_dir().join("journal"), shards)
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    fn actor_dir(&self, id: &PersistenceId) -> (Shard, PathBuf) {
        let shard = self.inner.shards.shard_of(id);
        let dir = self
            .inner
            .root
            .join(shard.to_string())
            .join(hex(id.as_str()));

        (shard, dir)
    }
}

impl StorageAdapter for FileStorage {
    type Transaction = FileTransaction;

    fn shards(&self) -> ShardConfig {
        self.inner.shards
    }

    async fn transaction(&self, id: &PersistenceId) -> Result<FileTransaction, StorageError> {
        // At most one blocking lock waiter per instance and id
        let guard = self.inner.locks.lock(id).await;
        let (shard, dir) = self.actor_dir(id);

        let (lock, committed) = {
            let (id, dir) = (id.clone(), dir.clone());
            tokio::task::spawn_blocking(move || {
                let lock = lock_actor_dir(&id, &dir)?;
                let committed = read_state(&id, shard, &dir)?;
                let watermark = committed.as_ref().map_or(0, |s| s.event_sequence);
                prune_residue(&id, &dir, watermark)?;
                Ok::<_, StorageError>((lock, committed))
            })
            .await??
        };

        Ok(FileTransaction {
            id: id.clone(),
            shard,
            dir,
            committed,
            state: None,
            events: Vec::new(),
            _lock: lock,
            _guard: guard,
        })
    }

    async fn load(&self, id: &PersistenceId) -> Result<Option<StateRecord>, StorageError> {
        let (shard, dir) = self.actor_dir(id);
        let id = id.clone();

        tokio::task::spawn_blocking(move || read_state(&id, shard, &dir)).await?
    }

    async fn events(&self, id: &PersistenceId) -> Result<Vec<EventRecord>, StorageError> {
        let (shard, dir) = self.actor_dir(id);
        let id = id.clone();

        tokio::task::spawn_blocking(move || {
            let watermark = read_state(&id, shard, &dir)?.map_or(0, |s| s.event_sequence);

            let mut records = Vec::new();
            for sequence in list_events(&id, &dir)? {
                if sequence > watermark {
                    continue;
                }

                let event = fs::read(event_path(&dir, sequence))
                    .map_err(|e| StorageError::io(&id, e))?;
                records.push(EventRecord {
                    persistence_id: id.clone(),
                    shard,
                    sequence,
                    event: event.into(),
                });
            }

            Ok::<_, StorageError>(records)
        })
        .await?
    }
}

impl StorageTransaction for FileTransaction {
    fn persistence_id(&self) -> &PersistenceId {
        &self.id
    }

    async fn get(&mut self) -> Result<Option<StateRecord>, StorageError> {
        match &self.state {
            Some((state, event_sequence)) => Ok(Some(StateRecord {
                persistence_id: self.id.clone(),
                shard: self.shard,
                state: state.clone(),
                event_sequence: *event_sequence,
            })),
            None => Ok(self.committed.clone()),
        }
    }

    async fn set(&mut self, state: Bytes, event_sequence: u64) -> Result<(), StorageError> {
        self.state = Some((state, event_sequence));
        Ok(())
    }

    async fn emit(&mut self, event: Bytes, sequence: u64) -> Result<(), StorageError> {
        let watermark = self.committed.as_ref().map_or(0, |s| s.event_sequence);

        // Residue above the watermark was pruned on open, so only these can collide
        if sequence <= watermark || self.events.iter().any(|(s, _)| *s == sequence) {
            return Err(StorageError::DuplicateEvent {
                id: self.id.clone(),
                sequence,
            });
        }

        self.events.push((sequence, event));
        Ok(())
    }

    async fn commit(self) -> Result<(), StorageError> {
        let watermark = match &self.state {
            Some((_, event_sequence)) => *event_sequence,
            None => self.committed.as_ref().map_or(0, |s| s.event_sequence),
        };

        if let Some((sequence, _)) = self.events.iter().find(|(s, _)| *s > watermark) {
            return Err(StorageError::Watermark {
                id: self.id.clone(),
                sequence: *sequence,
                watermark,
            });
        }

        let FileTransaction {
            id,
            dir,
            state,
            events,
            _lock,
            _guard,
            ..
        } = self;

        tokio::task::spawn_blocking(move || {
            let (_lock, _guard) = (_lock, _guard);
            write_commit(&id, &dir, state, &events)
        })
        .await?
    }

    async fn abort(self) -> Result<(), StorageError> {
        trace!("{} aborted, {} events discarded", self.id, self.events.len());
        Ok(())
    }
}

fn hex(s: &str) -> String {
    s.bytes().fold(String::with_capacity(s.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

fn event_path(dir: &Path, sequence: u64) -> PathBuf {
    dir.join(EVENTS_DIR).join(format!("{sequence:020}{EVENT_EXT}"))
}

/// Block until this process holds the actor's lock file.
fn lock_actor_dir(id: &PersistenceId, dir: &Path) -> Result<fs::File, StorageError> {
    let io_err = |e: io::Error| StorageError::io(id, e);

    fs::create_dir_all(dir).map_err(io_err)?;

    let lock = fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(dir.join(LOCK_FILE))
        .map_err(io_err)?;

    lock.lock_exclusive().map_err(io_err)?;

    Ok(lock)
}

/// Make renames into `dir` durable.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

fn read_state(
    id: &PersistenceId,
    shard: Shard,
    dir: &Path,
) -> Result<Option<StateRecord>, StorageError> {
    let mut bytes = match fs::read(dir.join(STATE_FILE)) {
        Ok(bytes) => Bytes::from(bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StorageError::io(id, e)),
    };

    if bytes.len() < 8 {
        return Err(StorageError::Corrupted {
            id: id.clone(),
            reason: format!("state file too short: {} bytes", bytes.len()),
        });
    }

    let event_sequence = bytes.get_u64();

    Ok(Some(StateRecord {
        persistence_id: id.clone(),
        shard,
        state: bytes,
        event_sequence,
    }))
}

fn list_events(id: &PersistenceId, dir: &Path) -> Result<Vec<u64>, StorageError> {
    let entries = match fs::read_dir(dir.join(EVENTS_DIR)) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StorageError::io(id, e)),
    };

    let mut sequences = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StorageError::io(id, e))?;
        let name = entry.file_name();

        let Some(sequence) = name
            .to_str()
            .and_then(|n| n.strip_suffix(EVENT_EXT))
            .and_then(|n| n.parse::<u64>().ok())
        else {
            continue;
        };

        sequences.push(sequence);
    }

    sequences.sort_unstable();
    Ok(sequences)
}

/// Remove what an interrupted commit left behind.
fn prune_residue(id: &PersistenceId, dir: &Path, watermark: u64) -> Result<(), StorageError> {
    for sequence in list_events(id, dir)? {
        if sequence > watermark {
            warn!("{id} removing uncommitted event {sequence} above watermark {watermark}");
            fs::remove_file(event_path(dir, sequence)).map_err(|e| StorageError::io(id, e))?;
        }
    }

    for parent in [dir.to_path_buf(), dir.join(EVENTS_DIR)] {
        let Ok(entries) = fs::read_dir(&parent) else {
            continue;
        };

        for entry in entries.flatten() {
            if entry.file_name().to_string_lossy().starts_with(".tmp") {
                debug!("{id} removing stale temp file {:?}", entry.path());
                let _ = fs::remove_file(entry.path());
            }
        }
    }

    Ok(())
}

fn write_commit(
    id: &PersistenceId,
    dir: &Path,
    state: Option<(Bytes, u64)>,
    events: &[(u64, Bytes)],
) -> Result<(), StorageError> {
    let io_err = |e: io::Error| StorageError::io(id, e);

    let events_dir = dir.join(EVENTS_DIR);
    fs::create_dir_all(&events_dir).map_err(io_err)?;

    let mut written = Vec::with_capacity(events.len());

    let res = (|| -> Result<(), StorageError> {
        for (sequence, event) in events {
            let mut tmp = NamedTempFile::new_in(&events_dir).map_err(io_err)?;
            tmp.write_all(event).map_err(io_err)?;
            tmp.as_file().sync_all().map_err(io_err)?;

            let path = event_path(dir, *sequence);
            match tmp.persist_noclobber(&path) {
                Ok(_) => written.push(path),
                Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                    return Err(StorageError::DuplicateEvent {
                        id: id.clone(),
                        sequence: *sequence,
                    });
                }
                Err(e) => return Err(io_err(e.error)),
            }
        }

        if !events.is_empty() {
            sync_dir(&events_dir).map_err(io_err)?;
        }

        if let Some((state, event_sequence)) = &state {
            let mut buf = BytesMut::with_capacity(8 + state.len());
            buf.put_u64(*event_sequence);
            buf.put_slice(state);

            let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
            tmp.write_all(&buf).map_err(io_err)?;
            tmp.as_file().sync_all().map_err(io_err)?;
            tmp.persist(dir.join(STATE_FILE))
                .map_err(|e| io_err(e.error))?;
            sync_dir(dir).map_err(io_err)?;
        }

        Ok(())
    })();

    if res.is_err() {
        // The snapshot was not replaced, so these are not visible; remove them eagerly
        for path in written {
            let _ = fs::remove_file(path);
        }
    }

    res
}
