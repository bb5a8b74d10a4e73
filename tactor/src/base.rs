use std::{borrow::Cow, fmt};

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Identifier of one persistent actor instance, used as storage key and shard input.
///
/// Formed as `"<system-name>(<actor-name>)"` by [`PersistenceId::for_actor`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersistenceId(Cow<'static, str>);

pub(crate) fn panic_msg(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Ok(s) = payload.downcast::<String>() {
        *s
    } else {
        "Unknown panic payload".to_string()
    }
}

#[doc(hidden)]
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {
        {#[cfg(feature = "tracing")] tracing::trace!($($arg)*);}
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        {#[cfg(feature = "tracing")] tracing::debug!($($arg)*);}
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        {#[cfg(feature = "tracing")] tracing::info!($($arg)*);}
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        {#[cfg(feature = "tracing")] tracing::warn!($($arg)*);}
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        {#[cfg(feature = "tracing")] tracing::error!($($arg)*);}
    };
}

// Implementations

impl PersistenceId {
    pub fn new(id: impl Into<Cow<'static, str>>) -> Result<Self, ConfigError> {
        let id = id.into();

        if id.is_empty() {
            return Err(ConfigError::Invalid {
                field: "persistence_id",
                reason: "must not be empty".into(),
            });
        }

        Ok(Self(id))
    }

    pub fn for_actor(system: &str, actor: &str) -> Result<Self, ConfigError> {
        if actor.is_empty() {
            return Err(ConfigError::Invalid {
                field: "actor_name",
                reason: "must not be empty".into(),
            });
        }

        Self::new(format!("{system}({actor})"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PersistenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PersistenceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
