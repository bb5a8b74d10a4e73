use std::{
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
    sync::Arc,
    time::Duration,
};

use futures::{channel::oneshot, future::BoxFuture};
use tokio::sync::Notify;

use crate::{
    base::PersistenceId,
    behavior::{ActorId, Transactional},
    errors::{RequestError, SendError},
    mailbox::{MsgTx, WeakMsgTx},
    message::{MsgPack, RawSignal, SigTx, WeakSigTx},
    monitor::{Phase, PhaseRx},
    shard::Shard,
};

/// Address of one persistent actor.
///
/// The actor stops once it is terminated or every `ActorRef` to it is dropped.
pub struct ActorRef<B: Transactional> {
    pub(crate) msg_tx: MsgTx<B>,
    pub(crate) hdl: ActorHdl,
    pub(crate) meta: Arc<ActorMeta>,
}

/// Reference that does not keep the actor alive.
pub struct WeakActorRef<B: Transactional> {
    pub(crate) msg_tx: WeakMsgTx<B>,
    pub(crate) hdl: WeakActorHdl,
    pub(crate) meta: Arc<ActorMeta>,
}

/// Type agnostic handle of an actor, capable of sending signal
#[derive(Debug, Clone)]
pub struct ActorHdl(pub(crate) SigTx);

#[derive(Debug, Clone)]
pub struct WeakActorHdl(pub(crate) WeakSigTx);

#[derive(Debug)]
pub(crate) struct ActorMeta {
    pub(crate) id: ActorId,
    pub(crate) persistence_id: PersistenceId,
    pub(crate) shard: Shard,
    pub(crate) phase: PhaseRx,
}

pub struct MsgRequest<'a, B: Transactional> {
    target: &'a ActorRef<B>,
    msg: B::Msg,
}

pub struct SignalRequest<'a> {
    target_hdl: &'a ActorHdl,
}

pub struct Deadline<'a, R>
where
    R: IntoFuture + Send,
{
    request: R,
    duration: Duration,
    _phantom: PhantomData<&'a ()>,
}

// Implementations

impl<B> ActorRef<B>
where
    B: Transactional,
{
    pub fn id(&self) -> ActorId {
        self.meta.id
    }

    pub fn persistence_id(&self) -> &PersistenceId {
        &self.meta.persistence_id
    }

    pub fn shard(&self) -> Shard {
        self.meta.shard
    }

    /// Enqueue without waiting for the outcome.
    ///
    /// Returns the message back if the mailbox is full (under
    /// [`crate::mailbox::OverflowPolicy::Reject`]) or the actor stopped.
    pub async fn tell(&self, msg: B::Msg) -> Result<(), SendError<B::Msg>> {
        self.send_raw((msg, None)).await.map_err(|e| match e {
            SendError::Full((msg, _)) => SendError::Full(msg),
            SendError::Closed((msg, _)) => SendError::Closed(msg),
        })
    }

    /// Enqueue and wait for the reply once the transition is persisted.
    pub fn ask(&self, msg: B::Msg) -> MsgRequest<'_, B> {
        MsgRequest { target: self, msg }
    }

    /// Stop the actor after the message in flight, if any. Messages still
    /// queued resolve with [`RequestError::Dropped`].
    pub fn terminate(&self) -> SignalRequest<'_> {
        SignalRequest {
            target_hdl: &self.hdl,
        }
    }

    /// Follow the processing phase of this actor.
    pub fn observe(&self) -> PhaseRx {
        self.meta.phase.clone()
    }

    pub fn phase(&self) -> Phase {
        *self.meta.phase.borrow()
    }

    pub fn downgrade(&self) -> WeakActorRef<B> {
        WeakActorRef {
            msg_tx: self.msg_tx.downgrade(),
            hdl: self.hdl.downgrade(),
            meta: self.meta.clone(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.msg_tx.is_closed()
    }

    /// Messages waiting in the mailbox, excluding the one in flight.
    pub fn queued(&self) -> usize {
        self.msg_tx.queued()
    }

    pub(crate) async fn send_raw(&self, pack: MsgPack<B>) -> Result<(), SendError<MsgPack<B>>> {
        self.msg_tx.send(pack).await
    }
}

impl<B> Clone for ActorRef<B>
where
    B: Transactional,
{
    fn clone(&self) -> Self {
        ActorRef {
            msg_tx: self.msg_tx.clone(),
            hdl: self.hdl.clone(),
            meta: self.meta.clone(),
        }
    }
}

impl<B> fmt::Debug for ActorRef<B>
where
    B: Transactional,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorRef")
            .field("id", &self.meta.id)
            .field("persistence_id", &self.meta.persistence_id)
            .field("shard", &self.meta.shard)
            .finish()
    }
}

impl<B> PartialEq for ActorRef<B>
where
    B: Transactional,
{
    fn eq(&self, other: &Self) -> bool {
        self.meta.id == other.meta.id
    }
}

impl<B> Eq for ActorRef<B> where B: Transactional {}

impl<B> Hash for ActorRef<B>
where
    B: Transactional,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.meta.id.hash(state);
    }
}

impl<B> WeakActorRef<B>
where
    B: Transactional,
{
    pub fn upgrade(&self) -> Option<ActorRef<B>> {
        Some(ActorRef {
            msg_tx: self.msg_tx.upgrade()?,
            hdl: self.hdl.upgrade()?,
            meta: self.meta.clone(),
        })
    }

    pub fn persistence_id(&self) -> &PersistenceId {
        &self.meta.persistence_id
    }
}

impl<B> Clone for WeakActorRef<B>
where
    B: Transactional,
{
    fn clone(&self) -> Self {
        WeakActorRef {
            msg_tx: self.msg_tx.clone(),
            hdl: self.hdl.clone(),
            meta: self.meta.clone(),
        }
    }
}

impl<B> fmt::Debug for WeakActorRef<B>
where
    B: Transactional,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakActorRef")
            .field("id", &self.meta.id)
            .field("persistence_id", &self.meta.persistence_id)
            .finish()
    }
}

impl ActorHdl {
    pub(crate) fn downgrade(&self) -> WeakActorHdl {
        WeakActorHdl(self.0.downgrade())
    }

    pub(crate) fn raw_send(&self, raw_sig: RawSignal) -> Result<(), SendError<RawSignal>> {
        self.0.send(raw_sig).map_err(|e| SendError::Closed(e.0))
    }
}

impl PartialEq for ActorHdl {
    fn eq(&self, other: &Self) -> bool {
        self.0.same_channel(&other.0)
    }
}

impl WeakActorHdl {
    pub(crate) fn upgrade(&self) -> Option<ActorHdl> {
        Some(ActorHdl(self.0.upgrade()?))
    }
}

impl<'a, B> MsgRequest<'a, B>
where
    B: Transactional,
{
    pub fn timeout(self, duration: Duration) -> Deadline<'a, Self> {
        Deadline {
            request: self,
            duration,
            _phantom: PhantomData,
        }
    }
}

impl<'a, B> IntoFuture for MsgRequest<'a, B>
where
    B: Transactional,
{
    type Output = Result<B::Reply, RequestError>;
    type IntoFuture = BoxFuture<'a, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            let (tx, rx) = oneshot::channel();

            self.target.send_raw((self.msg, Some(tx))).await?;

            match rx.await {
                Err(_) => Err(RequestError::Dropped),
                Ok(res) => res,
            }
        })
    }
}

impl<'a> SignalRequest<'a> {
    pub fn timeout(self, duration: Duration) -> Deadline<'a, Self> {
        Deadline {
            request: self,
            duration,
            _phantom: PhantomData,
        }
    }
}

impl<'a> IntoFuture for SignalRequest<'a> {
    type Output = Result<(), RequestError>;
    type IntoFuture = BoxFuture<'a, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            let k = Arc::new(Notify::new());

            // A closed signal channel means the loop already stopped
            if self
                .target_hdl
                .raw_send(RawSignal::Terminate(Some(k.clone())))
                .is_ok()
            {
                k.notified().await;
            }

            Ok(())
        })
    }
}

impl<'a, R, T> IntoFuture for Deadline<'a, R>
where
    R: 'a + IntoFuture<Output = Result<T, RequestError>> + Send,
    R::IntoFuture: Send,
{
    type Output = R::Output;
    type IntoFuture = BoxFuture<'a, Self::Output>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            match tokio::time::timeout(self.duration, self.request).await {
                Ok(res) => res,
                Err(_) => Err(RequestError::Timeout),
            }
        })
    }
}
