//! Bounded FIFO of pending messages feeding one processing loop.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::{behavior::Transactional, errors::ConfigError, errors::SendError, message::MsgPack};

pub const DEFAULT_CAPACITY: usize = 10_000;

/// What an enqueue does when the mailbox is at capacity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Fail immediately with [`SendError::Full`].
    #[default]
    Reject,
    /// Suspend the sender until a slot frees up.
    Backpressure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailboxConfig {
    pub capacity: usize,
    pub overflow: OverflowPolicy,
}

/// Sending half of a mailbox; applies the overflow policy on every enqueue.
#[derive(Debug)]
pub struct MsgTx<B: Transactional> {
    tx: mpsc::Sender<MsgPack<B>>,
    overflow: OverflowPolicy,
}

#[derive(Debug)]
pub struct WeakMsgTx<B: Transactional> {
    tx: mpsc::WeakSender<MsgPack<B>>,
    overflow: OverflowPolicy,
}

pub type MsgRx<B> = mpsc::Receiver<MsgPack<B>>;

// Implementations

impl MailboxConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "mailbox.capacity",
                reason: "capacity must be positive".into(),
            });
        }
        Ok(())
    }
}

impl Default for MailboxConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            overflow: OverflowPolicy::default(),
        }
    }
}

/// Create a mailbox. `config` must have been validated.
pub(crate) fn mailbox<B: Transactional>(config: &MailboxConfig) -> (MsgTx<B>, MsgRx<B>) {
    let (tx, rx) = mpsc::channel(config.capacity.max(1));

    (
        MsgTx {
            tx,
            overflow: config.overflow,
        },
        rx,
    )
}

impl<B: Transactional> MsgTx<B> {
    pub(crate) async fn send(&self, pack: MsgPack<B>) -> Result<(), SendError<MsgPack<B>>> {
        match self.overflow {
            OverflowPolicy::Reject => self.tx.try_send(pack).map_err(|e| match e {
                TrySendError::Full(pack) => SendError::Full(pack),
                TrySendError::Closed(pack) => SendError::Closed(pack),
            }),
            OverflowPolicy::Backpressure => {
                self.tx.send(pack).await.map_err(|e| SendError::Closed(e.0))
            }
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Messages waiting to be dequeued, excluding the one in flight.
    pub(crate) fn queued(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub(crate) fn same_mailbox(&self, other: &Self) -> bool {
        self.tx.same_channel(&other.tx)
    }

    pub(crate) fn downgrade(&self) -> WeakMsgTx<B> {
        WeakMsgTx {
            tx: self.tx.downgrade(),
            overflow: self.overflow,
        }
    }
}

impl<B: Transactional> Clone for MsgTx<B> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            overflow: self.overflow,
        }
    }
}

impl<B: Transactional> WeakMsgTx<B> {
    pub(crate) fn upgrade(&self) -> Option<MsgTx<B>> {
        Some(MsgTx {
            tx: self.tx.upgrade()?,
            overflow: self.overflow,
        })
    }
}

impl<B: Transactional> Clone for WeakMsgTx<B> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            overflow: self.overflow,
        }
    }
}
