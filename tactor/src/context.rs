use std::fmt;

use crate::{
    actor_ref::WeakActorRef, base::PersistenceId, behavior::Transactional, shard::Shard,
};

/// What a behavior knows about the actor it runs in.
pub struct Context<B: Transactional> {
    pub this: WeakActorRef<B>, // Self reference
    pub(crate) persistence_id: PersistenceId,
    pub(crate) shard: Shard,
}

// Implementations

impl<B: Transactional> Context<B> {
    pub fn persistence_id(&self) -> &PersistenceId {
        &self.persistence_id
    }

    pub fn shard(&self) -> Shard {
        self.shard
    }
}

impl<B: Transactional> Clone for Context<B> {
    fn clone(&self) -> Self {
        Self {
            this: self.this.clone(),
            persistence_id: self.persistence_id.clone(),
            shard: self.shard,
        }
    }
}

impl<B: Transactional> fmt::Debug for Context<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("persistence_id", &self.persistence_id)
            .field("shard", &self.shard)
            .finish()
    }
}
