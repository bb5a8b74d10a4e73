use thiserror::Error;

use crate::base::PersistenceId;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {field}, reason: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("unsupported storage scheme: {0}")]
    UnsupportedScheme(String),
    #[error("no data directory available on this platform")]
    NoDataDir,
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode: {0}")]
    Encode(#[source] postcard::Error),
    #[error("failed to decode: {0}")]
    Decode(#[source] postcard::Error),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io failed for {id}: {source}")]
    Io {
        id: PersistenceId,
        #[source]
        source: std::io::Error,
    },
    #[error("event {sequence} already exists for {id}")]
    DuplicateEvent { id: PersistenceId, sequence: u64 },
    #[error("event {sequence} above snapshot watermark {watermark} for {id}")]
    Watermark {
        id: PersistenceId,
        sequence: u64,
        watermark: u64,
    },
    #[error("corrupted record for {id}: {reason}")]
    Corrupted { id: PersistenceId, reason: String },
    #[error("storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Failure to enqueue a message, giving the message back.
#[derive(Debug, Error)]
pub enum SendError<T> {
    #[error("mailbox full")]
    Full(T),
    #[error("actor stopped")]
    Closed(T),
}

/// Outcome of a request that did not produce a reply.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("mailbox full")]
    MailboxFull,
    #[error("actor stopped")]
    Closed,
    #[error("request dropped before completion")]
    Dropped,
    #[error("request timed out")]
    Timeout,
    #[error("behavior failed: {0:#}")]
    Behavior(#[source] anyhow::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("defect: {0}")]
    Defect(String),
}

// Implementations

impl<T> SendError<T> {
    pub fn into_inner(self) -> T {
        match self {
            SendError::Full(t) | SendError::Closed(t) => t,
        }
    }
}

impl<T> From<SendError<T>> for RequestError {
    fn from(send_error: SendError<T>) -> Self {
        match send_error {
            SendError::Full(_) => RequestError::MailboxFull,
            SendError::Closed(_) => RequestError::Closed,
        }
    }
}

impl StorageError {
    pub(crate) fn io(id: &PersistenceId, source: std::io::Error) -> Self {
        StorageError::Io {
            id: id.clone(),
            source,
        }
    }
}

impl RequestError {
    /// Failures raised by the engine itself rather than by user code.
    pub fn is_defect(&self) -> bool {
        matches!(self, RequestError::Codec(_) | RequestError::Defect(_))
    }
}
