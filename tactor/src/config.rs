use serde::{Deserialize, Serialize};
use url::Url;

use crate::{
    errors::ConfigError,
    mailbox::MailboxConfig,
    shard::ShardConfig,
    storage::{AnyStorage, MemoryStorage},
};

pub const DEFAULT_SYSTEM_NAME: &str = "tactor";

/// Configuration of one [`crate::system::ActorSystem`].
///
/// Every instance sharing a storage must use the same `name` and shard count,
/// otherwise they address different rows for the same actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Prefix of every persistence id, as in `"<name>(<actor>)"`.
    pub name: String,
    pub shards: ShardConfig,
    pub mailbox: MailboxConfig,
    /// `memory:` or `file:///path`; in-memory when absent.
    pub storage: Option<Url>,
}

// Implementations

impl SystemConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::Invalid {
                field: "name",
                reason: "system name must not be empty".into(),
            });
        }

        self.shards.validate()?;
        self.mailbox.validate()
    }

    /// Open the storage named by [`SystemConfig::storage`].
    pub fn open_storage(&self) -> Result<AnyStorage, ConfigError> {
        self.shards.validate()?;

        match &self.storage {
            Some(url) => AnyStorage::open(url, self.shards),
            None => Ok(AnyStorage::Memory(MemoryStorage::new(self.shards)?)),
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_SYSTEM_NAME.to_string(),
            shards: ShardConfig::default(),
            mailbox: MailboxConfig::default(),
            storage: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailbox::OverflowPolicy;

    #[test]
    fn test_defaults() {
        let config = SystemConfig::default();

        assert_eq!(config.name, "tactor");
        assert_eq!(config.shards.shards, 16);
        assert_eq!(config.mailbox.capacity, 10_000);
        assert_eq!(config.mailbox.overflow, OverflowPolicy::Reject);
        assert!(config.validate().is_ok());
        assert!(matches!(config.open_storage(), Ok(AnyStorage::Memory(_))));
    }

    #[test]
    fn test_validate_rejects() {
        assert!(SystemConfig::new("").validate().is_err());

        let mut config = SystemConfig::new("bank");
        config.shards.shards = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "shards", .. })
        ));

        let mut config = SystemConfig::new("bank");
        config.mailbox.capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unsupported_storage() {
        let config = SystemConfig {
            storage: Some(Url::parse("redis://localhost").unwrap()),
            ..SystemConfig::default()
        };

        assert!(matches!(
            config.open_storage(),
            Err(ConfigError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn test_deserialize_partial() {
        // Fields left out fall back to their defaults
        let config: SystemConfig = serde::Deserialize::deserialize(
            serde::de::value::MapDeserializer::<_, serde::de::value::Error>::new(
                [("name", "bank")].into_iter(),
            ),
        )
        .unwrap();

        assert_eq!(config.name, "bank");
        assert_eq!(config.shards, ShardConfig::default());
        assert_eq!(config.mailbox, MailboxConfig::default());
    }
}
