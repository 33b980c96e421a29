//! Cache configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default freshness window for listing snapshots.
pub const DEFAULT_LISTING_TTL_SECS: u64 = 30;

/// Default freshness window for cached resource documents.
pub const DEFAULT_BLOB_TTL_SECS: u64 = 60;

/// Cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds a listing snapshot stays fresh
    pub listing_ttl_secs: u64,
    /// Seconds a cached document stays fresh
    pub blob_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            listing_ttl_secs: DEFAULT_LISTING_TTL_SECS,
            blob_ttl_secs: DEFAULT_BLOB_TTL_SECS,
        }
    }
}

impl CacheConfig {
    /// Returns the listing freshness window.
    pub fn listing_ttl(&self) -> Duration {
        Duration::from_secs(self.listing_ttl_secs)
    }

    /// Returns the document freshness window.
    pub fn blob_ttl(&self) -> Duration {
        Duration::from_secs(self.blob_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_durations() {
        let config = CacheConfig {
            listing_ttl_secs: 5,
            ..Default::default()
        };
        assert_eq!(config.listing_ttl(), Duration::from_secs(5));
        assert_eq!(config.blob_ttl(), Duration::from_secs(DEFAULT_BLOB_TTL_SECS));
    }

    #[test]
    fn test_config_partial_toml() {
        let config: CacheConfig = toml::from_str("listing_ttl_secs = 2").unwrap();
        assert_eq!(config.listing_ttl_secs, 2);
        assert_eq!(config.blob_ttl_secs, DEFAULT_BLOB_TTL_SECS);
    }
}
