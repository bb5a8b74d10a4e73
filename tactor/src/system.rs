use std::{
    any::Any,
    borrow::Cow,
    fmt,
    sync::{Arc, PoisonError, RwLock},
};

use rustc_hash::FxHashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    actor_instance::{ActorInstance, ActorState},
    actor_ref::{ActorHdl, ActorMeta, ActorRef},
    base::PersistenceId,
    behavior::Transactional,
    codec::{Codec, Postcard},
    config::SystemConfig,
    context::Context,
    debug,
    errors::ConfigError,
    mailbox::mailbox,
    monitor::Monitor,
    storage::{AnyStorage, StorageAdapter},
    supervisor::{Escalate, Supervisor},
};

pub(crate) type ActorBindings = RwLock<FxHashMap<Cow<'static, str>, Box<dyn Any + Send + Sync>>>;

/// Spawns persistent actors over one storage and keeps them addressable by name.
pub struct ActorSystem<St: StorageAdapter, C: Codec = Postcard> {
    inner: Arc<Inner<St, C>>,
}

struct Inner<St, C> {
    config: SystemConfig,
    storage: Arc<St>,
    codec: Arc<C>,
    bindings: ActorBindings,
}

// Implementations

impl<St: StorageAdapter> ActorSystem<St> {
    pub fn new(config: SystemConfig, storage: St) -> Result<Self, ConfigError> {
        Self::with_codec(config, storage, Postcard)
    }
}

impl ActorSystem<AnyStorage> {
    /// Build a system over the storage named in `config`.
    pub fn from_config(config: SystemConfig) -> Result<Self, ConfigError> {
        let storage = config.open_storage()?;
        Self::new(config, storage)
    }
}

impl<St, C> ActorSystem<St, C>
where
    St: StorageAdapter,
    C: Codec,
{
    /// Fails if `storage` was opened with a different shard count than
    /// `config`, as rows and actor handles would then disagree on shards.
    pub fn with_codec(config: SystemConfig, storage: St, codec: C) -> Result<Self, ConfigError> {
        config.validate()?;

        if storage.shards() != config.shards {
            return Err(ConfigError::Invalid {
                field: "shards",
                reason: format!(
                    "system uses {} shards but storage uses {}",
                    config.shards.shards,
                    storage.shards().shards
                ),
            });
        }

        debug!(
            "actor system {} ready with {} shards",
            config.name, config.shards.shards
        );

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                storage: Arc::new(storage),
                codec: Arc::new(codec),
                bindings: ActorBindings::default(),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    pub fn config(&self) -> &SystemConfig {
        &self.inner.config
    }

    pub fn storage(&self) -> &St {
        &self.inner.storage
    }

    /// Persistence id an actor spawned under `name` would use.
    pub fn persistence_id(&self, name: &str) -> Result<PersistenceId, ConfigError> {
        PersistenceId::for_actor(&self.inner.config.name, name)
    }

    /// Spawn an actor with the default [`Escalate`] supervisor.
    ///
    /// See [`ActorSystem::spawn_supervised`].
    pub fn spawn<B>(
        &self,
        name: impl Into<Cow<'static, str>>,
        behavior: B,
        initial: B::State,
    ) -> Result<ActorRef<B>, ConfigError>
    where
        B: Transactional,
    {
        self.spawn_supervised(name, behavior, initial, Escalate)
    }

    /// Spawn the processing loop for the actor `name`, starting from `initial`
    /// until its first snapshot is persisted.
    ///
    /// The actor is bound under `name`, replacing any earlier binding, and
    /// stays alive until terminated or freed and every handle is dropped.
    /// Must be called within a tokio runtime.
    pub fn spawn_supervised<B, S>(
        &self,
        name: impl Into<Cow<'static, str>>,
        behavior: B,
        initial: B::State,
        supervisor: S,
    ) -> Result<ActorRef<B>, ConfigError>
    where
        B: Transactional,
        S: Supervisor<B::Reply>,
    {
        let name = name.into();
        let persistence_id = self.persistence_id(&name)?;
        let shard = self.inner.config.shards.shard_of(&persistence_id);

        let (msg_tx, msg_rx) = mailbox::<B>(&self.inner.config.mailbox);
        let (sig_tx, sig_rx) = mpsc::unbounded_channel();
        let (monitor, phase) = Monitor::new();

        let actor = ActorRef {
            msg_tx,
            hdl: ActorHdl(sig_tx),
            meta: Arc::new(ActorMeta {
                id: Uuid::new_v4(),
                persistence_id: persistence_id.clone(),
                shard,
                phase,
            }),
        };

        let instance = ActorInstance {
            state: ActorState {
                behavior,
                supervisor,
                initial,
                storage: self.inner.storage.clone(),
                codec: self.inner.codec.clone(),
                ctx: Context {
                    this: actor.downgrade(),
                    persistence_id,
                    shard,
                },
                monitor,
            },
            sig_rx,
            msg_rx,
        };

        tokio::spawn(instance.run());

        self.bind(name, actor.clone());

        Ok(actor)
    }

    /// Find a bound actor; `None` if absent or bound with another behavior type.
    pub fn lookup<B: Transactional>(&self, name: impl AsRef<str>) -> Option<ActorRef<B>> {
        self.inner
            .bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name.as_ref())
            .and_then(|actor| actor.downcast_ref::<ActorRef<B>>().cloned())
    }

    /// Remove a binding. The actor keeps running while other handles exist.
    pub fn free(&self, name: impl AsRef<str>) -> bool {
        self.inner
            .bindings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name.as_ref())
            .is_some()
    }

    fn bind<B: Transactional>(&self, name: Cow<'static, str>, actor: ActorRef<B>) {
        let replaced = self
            .inner
            .bindings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, Box::new(actor))
            .is_some();

        if replaced {
            debug!("existing binding replaced");
        }
    }
}

impl<St: StorageAdapter, C: Codec> Clone for ActorSystem<St, C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<St: StorageAdapter, C: Codec> fmt::Debug for ActorSystem<St, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorSystem")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
