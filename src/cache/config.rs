use crate::CacheError;
use std::time::Duration;

const DEFAULT_MAX_SIZE: usize = 10_000;
const DEFAULT_STALENESS_WINDOW: Duration = Duration::from_secs(3 * 24 * 60 * 60);
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Settings for a [`crate::Cache`].
///
/// ```rust
/// use config_lru::CacheConfig;
/// use std::time::Duration;
///
/// let config = CacheConfig::default()
///     .max_size(500)
///     .staleness_window(Duration::from_secs(3_600))
///     .sweep_interval(Duration::from_secs(60));
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CacheConfig {
    /// Number of entries kept after a sweep. Also bounds the recency queue.
    pub max_size: usize,
    /// Entries not touched for this long are evicted on the next sweep.
    pub staleness_window: Duration,
    /// Pause between two sweeps.
    pub sweep_interval: Duration,
}

impl CacheConfig {
    pub fn new(max_size: usize) -> Self {
        Self::default().max_size(max_size)
    }

    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn staleness_window(mut self, staleness_window: Duration) -> Self {
        self.staleness_window = staleness_window;
        self
    }

    pub fn sweep_interval(mut self, sweep_interval: Duration) -> Self {
        self.sweep_interval = sweep_interval;
        self
    }

    pub fn validate(&self) -> Result<(), CacheError> {
        if self.max_size == 0 {
            return Err(CacheError::InvalidConfig(
                "max_size must be greater than zero".to_owned(),
            ));
        }

        if self.sweep_interval.is_zero() {
            return Err(CacheError::InvalidConfig(
                "sweep_interval must be greater than zero".to_owned(),
            ));
        }

        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            staleness_window: DEFAULT_STALENESS_WINDOW,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}
