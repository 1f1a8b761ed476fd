//! Roster query cache.
//!
//! Remote data is addressed by hierarchical [`QueryKey`]s and held in a
//! [`QueryClient`]:
//!
//! - **Reads** return fresh data directly and deduplicate concurrent loads
//!   of the same key into one request.
//! - **Observers** get stale data immediately while a background load
//!   revalidates it.
//! - **Writes** invalidate key prefixes so every dependent entry reloads.
//!
//! ## Configuration
//!
//! Freshness windows come from `roster.toml`:
//!
//! ```toml
//! [cache]
//! primary_stale_seconds = 300
//! secondary_stale_seconds = 120
//! ```

mod config;
mod keys;
mod lock;
mod observer;
mod store;

pub use config::{CacheConfig, QueryOptions};
pub use keys::{KeySegment, PostKeys, QueryKey, UserKeys};
pub use observer::{QueryObserver, QueryState, QueryStatus};
pub use store::{QueryClient, QueryError};
