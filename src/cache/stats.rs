use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct Stats {
    pub miss_count: u64,
    pub hit_count: u64,
    pub eviction_count: u64,
    /// Touches discarded because the recency queue was full.
    pub dropped_touch_count: u64,
    pub millis_elapsed: u128,
    /// Number of entries in the store when the stats were taken.
    pub len: usize,
}

/// Outcome of a single sweep.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct SweepReport {
    pub retained: usize,
    pub evicted: usize,
    /// Stored entries that were missing from the recency list and got linked at its tail.
    pub adopted: usize,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    hit_count: AtomicU64,
    miss_count: AtomicU64,
    eviction_count: AtomicU64,
    dropped_touch_count: AtomicU64,
}

impl Counters {
    pub(crate) fn increment_hit_count(&self) {
        self.hit_count.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn increment_miss_count(&self) {
        self.miss_count.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn add_eviction_count(&self, evicted: usize) {
        self.eviction_count.fetch_add(evicted as u64, Ordering::AcqRel);
    }

    pub(crate) fn increment_dropped_touch_count(&self) {
        self.dropped_touch_count.fetch_add(1, Ordering::AcqRel);
    }

    /// Copies the counters into `stats` and resets them.
    pub(crate) fn drain_into(&self, stats: &mut Stats) {
        stats.hit_count = self.hit_count.swap(0, Ordering::AcqRel);
        stats.miss_count = self.miss_count.swap(0, Ordering::AcqRel);
        stats.eviction_count = self.eviction_count.swap(0, Ordering::AcqRel);
        stats.dropped_touch_count = self.dropped_touch_count.swap(0, Ordering::AcqRel);
    }
}
