//! Transactional, event-sourced actors with sharded persistence.
//!
//! Each actor processes one message at a time. For every message the loop
//! opens a storage transaction, loads the latest snapshot, runs the behavior
//! on a [`transition::Transition`], and persists the new state together with
//! the emitted events before the caller sees the reply.

extern crate self as tactor;

pub(crate) mod actor_instance;
pub mod actor_ref;
pub mod base;
pub mod behavior;
pub mod codec;
pub mod config;
pub mod context;
pub mod errors;
pub mod mailbox;
pub mod message;
pub mod monitor;
pub mod shard;
pub mod storage;
pub mod supervisor;
pub mod system;
pub mod transition;

// Re-exports

pub mod prelude {
    pub use crate::actor_ref::{ActorRef, WeakActorRef};
    pub use crate::base::PersistenceId;
    pub use crate::behavior::Transactional;
    pub use crate::config::SystemConfig;
    pub use crate::context::Context;
    pub use crate::errors::{ConfigError, RequestError, SendError, StorageError};
    pub use crate::mailbox::{MailboxConfig, OverflowPolicy};
    pub use crate::message::Tagged;
    pub use crate::monitor::Phase;
    pub use crate::shard::ShardConfig;
    pub use crate::storage::{AnyStorage, MemoryStorage, StorageAdapter, StorageTransaction};
    pub use crate::supervisor::{Escalate, Failure, Recover, Supervisor};
    pub use crate::system::ActorSystem;
    pub use crate::transition::Transition;

    #[cfg(feature = "fs")]
    pub use crate::storage::FileStorage;

    #[cfg(feature = "macros")]
    pub use tactor_macros::Tagged;
}
