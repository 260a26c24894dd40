//! Cache configuration.

use std::num::NonZeroUsize;

use serde::Deserialize;

const DEFAULT_AGGREGATE_LIMIT: usize = 256;
const DEFAULT_MAX_BUFFERED_BODY_BYTES: usize = 256 * 1024;

/// Cache behavior knobs from `mnemo.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Enable the aggregate cache and the write-path invalidation layer.
    pub enabled: bool,
    /// Maximum aggregates held in the LRU store.
    pub aggregate_limit: usize,
    /// Maximum request-body bytes buffered for invalidation-fact extraction.
    pub max_buffered_body_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            aggregate_limit: DEFAULT_AGGREGATE_LIMIT,
            max_buffered_body_bytes: DEFAULT_MAX_BUFFERED_BODY_BYTES,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            aggregate_limit: settings.aggregate_limit,
            max_buffered_body_bytes: settings.max_buffered_body_bytes,
        }
    }
}

impl CacheConfig {
    /// Aggregate limit as `NonZeroUsize`, clamping zero to 1.
    pub fn aggregate_limit_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.aggregate_limit).unwrap_or(NonZeroUsize::MIN)
    }
}
