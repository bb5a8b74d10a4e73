//! Shard assignment for persistence identifiers.
//!
//! A shard is always recomputed from the identifier and the configured shard
//! count. Storage backends record it next to each row, but the resolver is the
//! source of truth. Changing the shard count moves entities between shards;
//! rebalancing existing rows is left to an external process.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Shard count used when no configuration is supplied.
///
/// Instances sharing one storage must agree on this value.
pub const DEFAULT_SHARDS: u32 = 16;

pub type Shard = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShardConfig {
    pub shards: u32,
}

// Implementations

impl ShardConfig {
    pub fn new(shards: u32) -> Result<Self, ConfigError> {
        let config = Self { shards };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.shards == 0 {
            return Err(ConfigError::Invalid {
                field: "shards",
                reason: "shard count must be positive".into(),
            });
        }
        Ok(())
    }

    /// Shard of `id` under this configuration.
    pub fn shard_of(&self, id: impl AsRef<str>) -> Shard {
        shard(id.as_ref(), self.shards)
    }
}

impl Default for ShardConfig {
    fn default() -> Self {
        Self {
            shards: DEFAULT_SHARDS,
        }
    }
}

/// Map `id` onto `[0, shards)`.
///
/// FxHash carries no per-process seed, so the result is stable across
/// restarts. A zero shard count falls back to [`DEFAULT_SHARDS`].
pub fn shard(id: &str, shards: u32) -> Shard {
    let shards = if shards == 0 { DEFAULT_SHARDS } else { shards };

    floor_mod(signed_hash(id), shards as i64) as Shard
}

fn signed_hash(id: &str) -> i64 {
    let mut h = FxHasher::default();
    id.hash(&mut h);
    h.finish() as i64
}

/// Modulo rounding toward negative infinity; never negative for positive `m`.
fn floor_mod(x: i64, m: i64) -> i64 {
    debug_assert!(m > 0);
    x.rem_euclid(m)
}
