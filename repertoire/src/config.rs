//! Store configuration.
//!
//! Precedence for the cache TTL:
//! 1. explicit value passed by the caller
//! 2. OPENBOOK_CACHE_TTL_SECS environment variable
//! 3. built-in default (10 seconds)

use std::time::Duration;

const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10);
const CACHE_TTL_ENV: &str = "OPENBOOK_CACHE_TTL_SECS";

/// Tunables for [`crate::PositionStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// How long a read may serve a cached record. `Duration::ZERO` disables
    /// the read cache entirely.
    pub cache_ttl: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

impl StoreConfig {
    /// Build a config from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let cache_ttl = std::env::var(CACHE_TTL_ENV)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_CACHE_TTL);
        Self { cache_ttl }
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }
}
