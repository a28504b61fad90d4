//! An in-process, size- and age-bounded cache for configuration blobs.
//!
//! Values are byte payloads addressed by a composite key of name, group id and application name.
//! The cache is meant to sit in front of a slower configuration source and serve recent lookups
//! from memory.
//!
//! # Design
//!
//! - Reads and writes hit a sharded concurrent store and never wait on eviction work.
//! - Each hit or write queues a *touch*. A maintenance thread applies touches to a recency list,
//!   moving the entry to its head.
//! - A sweep thread wakes on a fixed interval, walks the recency list from its head and evicts
//!   every entry beyond the configured maximum size or not touched within the staleness window.
//! - The recency queue is bounded by the maximum size. When it is full the oldest touch is
//!   dropped; callers never block.
//! - No unsafe code
//!
//! # Examples
//!
//! ```rust
//! use config_lru::Cache;
//!
//! let cache = Cache::new(3)?;
//!
//! for group_id in 1..=4 {
//!     cache.store_or_update("k", group_id, "app", format!("v{group_id}"))?;
//! }
//!
//! // apply queued touches, then evict beyond the size bound
//! cache.sync();
//! cache.sweep_now();
//!
//! assert_eq!(cache.get("k", 1, "app"), None);
//! assert_eq!(cache.get("k", 4, "app").unwrap(), "v4");
//! # Ok::<(), config_lru::CacheError>(())
//! ```
//!
//! Custom bounds:
//!
//! ```rust
//! use config_lru::{Cache, CacheConfig};
//! use std::time::Duration;
//!
//! let config = CacheConfig::new(1_000)
//!     .staleness_window(Duration::from_secs(24 * 60 * 60))
//!     .sweep_interval(Duration::from_secs(60));
//! let cache = Cache::with_config(config)?;
//!
//! cache.store_or_update("db.url", 7, "billing", "postgres://db")?;
//! assert!(cache.contains("db.url", 7, "billing"));
//!
//! cache.shutdown();
//! # Ok::<(), config_lru::CacheError>(())
//! ```

#![forbid(unsafe_code)]
pub mod cache;
mod error;

pub use bytes::Bytes;
pub use cache::Cache;
pub use cache::config::CacheConfig;
pub use cache::entry::EntrySnapshot;
pub use cache::key::CacheKey;
pub use cache::stats::{Stats, SweepReport};
pub use error::CacheError;
