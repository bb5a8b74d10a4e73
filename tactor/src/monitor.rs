use std::fmt;

use tokio::sync::watch;

/// Where a processing loop currently is.
///
/// `Idle → Loading → Executing → Persisting → Completing → Idle`, ending in
/// `Stopped`. A failed message skips `Persisting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Idle,
    Loading,
    Executing,
    Persisting,
    Completing,
    Stopped,
}

pub type PhaseRx = watch::Receiver<Phase>;

/// Publishes the phase of one actor; observers only see the latest value.
#[derive(Debug)]
pub(crate) struct Monitor {
    tx: watch::Sender<Phase>,
}

// Implementations

impl Monitor {
    pub(crate) fn new() -> (Self, PhaseRx) {
        let (tx, rx) = watch::channel(Phase::Idle);
        (Self { tx }, rx)
    }

    pub(crate) fn report(&self, phase: Phase) {
        // Succeeds with or without observers
        self.tx.send_replace(phase);
    }
}

impl Phase {
    pub fn is_stopped(&self) -> bool {
        matches!(self, Phase::Stopped)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Idle => "idle",
            Phase::Loading => "loading",
            Phase::Executing => "executing",
            Phase::Persisting => "persisting",
            Phase::Completing => "completing",
            Phase::Stopped => "stopped",
        };
        f.write_str(s)
    }
}
