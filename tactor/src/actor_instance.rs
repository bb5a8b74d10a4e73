use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use futures::FutureExt;
use tokio::{select, sync::Notify};

use crate::{
    base::panic_msg,
    behavior::Transactional,
    codec::Codec,
    context::Context,
    debug, error,
    errors::RequestError,
    mailbox::MsgRx,
    message::{MsgPack, RawSignal, SigRx, Tagged},
    monitor::{Monitor, Phase},
    storage::{StorageAdapter, StorageTransaction},
    supervisor::{Failure, Supervisor},
    trace,
    transition::Transition,
    warn,
};

/// Everything one transition needs, shared by reference while it runs.
pub(crate) struct ActorState<B, S, St, C>
where
    B: Transactional,
{
    pub(crate) behavior: B,
    pub(crate) supervisor: S,
    pub(crate) initial: B::State,
    pub(crate) storage: Arc<St>,
    pub(crate) codec: Arc<C>,
    pub(crate) ctx: Context<B>,
    pub(crate) monitor: Monitor,
}

/// The processing loop: the single consumer of one mailbox.
pub(crate) struct ActorInstance<B, S, St, C>
where
    B: Transactional,
{
    pub(crate) state: ActorState<B, S, St, C>,
    pub(crate) sig_rx: SigRx,
    pub(crate) msg_rx: MsgRx<B>,
}

// Implementations

impl<B, S, St, C> ActorInstance<B, S, St, C>
where
    B: Transactional,
    S: Supervisor<B::Reply>,
    St: StorageAdapter,
    C: Codec,
{
    pub(crate) async fn run(mut self) {
        debug!("{} started", self.state.ctx.persistence_id);

        let k = loop {
            select! {
                biased;

                Some(sig) = self.sig_rx.recv() => match sig {
                    RawSignal::Terminate(k) => break k,
                },
                mb_pack = self.msg_rx.recv() => match mb_pack {
                    Some(pack) => self.state.process_msg(pack).await,
                    // Every ActorRef dropped and the queue drained
                    None => break None,
                },
            }
        };

        self.stop(k);
    }

    fn stop(mut self, k: Option<Arc<Notify>>) {
        self.msg_rx.close();

        let mut dropped = 0usize;
        while self.msg_rx.try_recv().is_ok() {
            dropped += 1;
        }

        // Terminate requests that raced with this one still get notified
        self.sig_rx.close();

        let mut waiters: Vec<Arc<Notify>> = k.into_iter().collect();
        while let Ok(RawSignal::Terminate(k)) = self.sig_rx.try_recv() {
            waiters.extend(k);
        }

        self.state.monitor.report(Phase::Stopped);

        for k in waiters {
            k.notify_one();
        }

        if dropped > 0 {
            warn!(
                "{} stopped with {dropped} pending messages dropped",
                self.state.ctx.persistence_id
            );
        } else {
            debug!("{} stopped", self.state.ctx.persistence_id);
        }
    }
}

impl<B, S, St, C> ActorState<B, S, St, C>
where
    B: Transactional,
    S: Supervisor<B::Reply>,
    St: StorageAdapter,
    C: Codec,
{
    async fn process_msg(&self, (msg, reply_tx): MsgPack<B>) {
        let (tag, res) = match panic::catch_unwind(AssertUnwindSafe(|| msg.tag())) {
            Ok(tag) => {
                // Panics in codecs or storage must not take the loop down with them
                let res = AssertUnwindSafe(self.transition(tag, msg))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|p| {
                        Err(RequestError::Defect(format!(
                            "panicked while processing {tag}: {}",
                            panic_msg(p)
                        )))
                    });

                (tag, res)
            }
            Err(p) => (
                "<untagged>",
                Err(RequestError::Defect(format!(
                    "message tag panicked: {}",
                    panic_msg(p)
                ))),
            ),
        };

        match &res {
            Ok(_) | Err(RequestError::Behavior(_)) => {}
            Err(e) if e.is_defect() => {
                error!("{} defect while processing {tag}: {e}", self.ctx.persistence_id)
            }
            Err(e) => error!("{} failed to process {tag}: {e}", self.ctx.persistence_id),
        }

        self.monitor.report(Phase::Completing);

        if let Some(tx) = reply_tx {
            if tx.send(res).is_err() {
                debug!("{} caller of {tag} is gone", self.ctx.persistence_id);
            }
        }

        self.monitor.report(Phase::Idle);
    }

    /// Load, execute, persist. The storage transaction is held throughout,
    /// and any early return drops it, which discards every buffered write.
    async fn transition(&self, tag: &'static str, msg: B::Msg) -> Result<B::Reply, RequestError> {
        let id = &self.ctx.persistence_id;

        self.monitor.report(Phase::Loading);

        let mut txn = self.storage.transaction(id).await?;

        let (state, sequence) = match txn.get().await? {
            Some(record) => (
                self.codec.decode::<B::State>(&record.state)?,
                record.event_sequence,
            ),
            None => (self.initial.clone(), 0),
        };

        self.monitor.report(Phase::Executing);

        let mut tx = Transition::new(state);

        let res = AssertUnwindSafe(self.behavior.receive(&mut tx, &self.ctx, msg))
            .catch_unwind()
            .await
            .map_err(|p| {
                RequestError::Defect(format!("behavior panicked on {tag}: {}", panic_msg(p)))
            })?;

        let reply = match res {
            Ok(reply) => reply,
            Err(error) => {
                warn!("{id} failed on {tag}: {error:#}");

                let failure = Failure {
                    persistence_id: id.clone(),
                    tag,
                    error,
                };

                let supervised = AssertUnwindSafe(self.supervisor.supervise(failure))
                    .catch_unwind()
                    .await
                    .map_err(|p| {
                        RequestError::Defect(format!(
                            "supervisor panicked on {tag}: {}",
                            panic_msg(p)
                        ))
                    })?;

                match supervised {
                    Ok(reply) => {
                        debug!("{id} recovered from failure on {tag}");
                        reply
                    }
                    Err(error) => {
                        warn!("{id} supervisor gave up on {tag}: {error:#}");

                        if let Err(e) = txn.abort().await {
                            error!("{id} failed to abort transaction: {e}");
                        }

                        return Err(RequestError::Behavior(error));
                    }
                }
            }
        };

        self.monitor.report(Phase::Persisting);

        let (state, events) = tx.into_parts();
        let event_sequence = sequence + events.len() as u64;

        let state = self.codec.encode(&state)?;
        let events = events
            .iter()
            .map(|event| self.codec.encode(event))
            .collect::<Result<Vec<_>, _>>()?;

        txn.set(state, event_sequence).await?;

        for (event, sequence) in events.into_iter().zip(sequence + 1..) {
            txn.emit(event, sequence).await?;
        }

        txn.commit().await?;

        trace!("{id} committed {tag}, event sequence {event_sequence}");

        Ok(reply)
    }
}
