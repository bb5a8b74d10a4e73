use std::future::Future;

use serde::{Serialize, de::DeserializeOwned};

use crate::{context::Context, message::Tagged, transition::Transition};

/// Unique identifier for each spawned actor instance.
pub type ActorId = uuid::Uuid;

/// Event-sourced behavior of a persistent actor.
///
/// For every message the processing loop loads the latest snapshot (or the
/// initial state given at spawn), hands it to [`Transactional::receive`] as a
/// [`Transition`], and persists the resulting state together with the emitted
/// events in one storage transaction before replying.
///
/// # Example
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use tactor::prelude::*;
///
/// #[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// struct Count(u64);
///
/// #[derive(Debug, Serialize, Deserialize)]
/// enum Event {
///     Incremented,
/// }
///
/// #[derive(Debug, Tagged)]
/// enum Msg {
///     Increment,
/// }
///
/// struct Counter;
///
/// impl Transactional for Counter {
///     type State = Count;
///     type Event = Event;
///     type Msg = Msg;
///     type Reply = u64;
///
///     async fn receive(
///         &self,
///         tx: &mut Transition<Count, Event>,
///         _ctx: &Context<Self>,
///         msg: Msg,
///     ) -> anyhow::Result<u64> {
///         match msg {
///             Msg::Increment => {
///                 let next = tx.get().0 + 1;
///                 tx.set(Count(next));
///                 tx.emit(Event::Incremented);
///                 Ok(next)
///             }
///         }
///     }
/// }
/// ```
pub trait Transactional: Sized + Send + Sync + 'static {
    type State: Clone + Send + Sync + Serialize + DeserializeOwned + 'static;

    type Event: Send + Serialize + 'static;

    /// Closed set of messages, dispatched by exhaustive `match`.
    type Msg: Tagged + Send + 'static;

    type Reply: Send + 'static;

    /// Run one transition. An `Err` is handed to the actor's supervisor; a
    /// panic is reported to the caller as a defect and persists nothing.
    fn receive(
        &self,
        tx: &mut Transition<Self::State, Self::Event>,
        ctx: &Context<Self>,
        msg: Self::Msg,
    ) -> impl Future<Output = anyhow::Result<Self::Reply>> + Send;
}
