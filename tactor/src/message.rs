//! Message plumbing between actor handles and the processing loop.

use std::sync::Arc;

use futures::channel::oneshot;
use tokio::sync::{Notify, mpsc};

use crate::{behavior::Transactional, errors::RequestError};

/// Name of a message variant, used in logs and supervisor reports.
///
/// Usually derived with `#[derive(Tagged)]`.
pub trait Tagged {
    fn tag(&self) -> &'static str;
}

/// Outcome delivered to the caller of [`crate::actor_ref::ActorRef::ask`].
pub type Reply<B> = Result<<B as Transactional>::Reply, RequestError>;

/// Single-assignment response slot. Dropping it resolves the caller with
/// [`RequestError::Dropped`].
pub type ReplyTx<B> = oneshot::Sender<Reply<B>>;

/// A message and its response slot; `tell` carries no slot.
pub type MsgPack<B> = (<B as Transactional>::Msg, Option<ReplyTx<B>>);

/// Channel for sending lifecycle signals to an actor.
pub type SigTx = mpsc::UnboundedSender<RawSignal>;

pub type WeakSigTx = mpsc::WeakUnboundedSender<RawSignal>;

pub type SigRx = mpsc::UnboundedReceiver<RawSignal>;

/// Lifecycle signals, observed only between messages.
#[derive(Debug)]
pub enum RawSignal {
    Terminate(Option<Arc<Notify>>),
}
