use thiserror::Error;

/// Errors returned by the cache.
///
/// A lookup miss is not an error; [`crate::Cache::get`] returns [`None`] for it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("invalid cache configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid cache key token: {0}")]
    InvalidKey(String),
    #[error("cache has been shut down")]
    Closed,
    #[error("failed to spawn cache worker: {0}")]
    WorkerSpawn(String),
}
