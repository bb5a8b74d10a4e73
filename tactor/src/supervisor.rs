//! Hook consulted once when a behavior returns an error.
//!
//! - `Ok(reply)` recovers: the caller receives `reply`, and the state and
//!   events the behavior accumulated before failing are persisted.
//! - `Err(e)` fails again: the caller receives `e` and nothing is persisted.

use std::future::Future;

use crate::base::PersistenceId;

/// Description of a failed execution.
#[derive(Debug)]
pub struct Failure {
    pub persistence_id: PersistenceId,
    /// Tag of the message being processed.
    pub tag: &'static str,
    pub error: anyhow::Error,
}

pub trait Supervisor<R>: Send + Sync + 'static {
    fn supervise(&self, failure: Failure) -> impl Future<Output = anyhow::Result<R>> + Send;
}

/// Default policy: fail again with the original error.
#[derive(Debug, Clone, Copy, Default)]
pub struct Escalate;

/// Supervisor backed by an async closure.
///
/// ```
/// use tactor::supervisor::{Failure, Recover};
///
/// let supervisor = Recover::new(|failure: Failure| async move {
///     if failure.tag == "Withdraw" {
///         Ok(0u64)
///     } else {
///         Err(failure.error)
///     }
/// });
/// # let _ = supervisor;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Recover<F>(F);

// Implementations

impl<R: Send + 'static> Supervisor<R> for Escalate {
    async fn supervise(&self, failure: Failure) -> anyhow::Result<R> {
        Err(failure.error)
    }
}

impl<F> Recover<F> {
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<R, F, Fut> Supervisor<R> for Recover<F>
where
    F: Fn(Failure) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<R>> + Send,
{
    fn supervise(&self, failure: Failure) -> impl Future<Output = anyhow::Result<R>> + Send {
        (self.0)(failure)
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    fn failure(tag: &'static str) -> Failure {
        Failure {
            persistence_id: PersistenceId::for_actor("test", "a").unwrap(),
            tag,
            error: anyhow!("insufficient funds"),
        }
    }

    #[tokio::test]
    async fn test_escalate_keeps_original_error() {
        let res: anyhow::Result<u32> = Escalate.supervise(failure("Withdraw")).await;
        assert_eq!(res.unwrap_err().to_string(), "insufficient funds");
    }

    #[tokio::test]
    async fn test_recover_by_tag() {
        let supervisor = Recover::new(|f: Failure| async move {
            match f.tag {
                "Withdraw" => Ok(0u32),
                _ => Err(f.error.context("unrecoverable")),
            }
        });

        assert_eq!(supervisor.supervise(failure("Withdraw")).await.unwrap(), 0);

        let err = supervisor.supervise(failure("Deposit")).await.unwrap_err();
        assert_eq!(format!("{err:#}"), "unrecoverable: insufficient funds");
    }
}
