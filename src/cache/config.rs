//! Query cache configuration.
//!
//! Stale times are configured under `[cache]` in `roster.toml`:
//!
//! ```toml
//! [cache]
//! primary_stale_seconds = 300
//! secondary_stale_seconds = 120
//! ```

use std::time::Duration;

const DEFAULT_PRIMARY_STALE: Duration = Duration::from_secs(5 * 60);
const DEFAULT_SECONDARY_STALE: Duration = Duration::from_secs(2 * 60);

/// Freshness windows applied by the query helpers.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Stale time for primary entities (user lists and details).
    pub primary_stale_time: Duration,
    /// Stale time for secondary data derived from a primary entity (posts).
    pub secondary_stale_time: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            primary_stale_time: DEFAULT_PRIMARY_STALE,
            secondary_stale_time: DEFAULT_SECONDARY_STALE,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            primary_stale_time: settings.primary_stale_time,
            secondary_stale_time: settings.secondary_stale_time,
        }
    }
}

/// Per-query options supplied by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// Age after which a cached value is no longer fresh.
    pub stale_time: Duration,
}

impl QueryOptions {
    pub fn stale_after(stale_time: Duration) -> Self {
        Self { stale_time }
    }
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            stale_time: Duration::ZERO,
        }
    }
}

impl CacheConfig {
    pub fn primary(&self) -> QueryOptions {
        QueryOptions::stale_after(self.primary_stale_time)
    }

    pub fn secondary(&self) -> QueryOptions {
        QueryOptions::stale_after(self.secondary_stale_time)
    }
}
