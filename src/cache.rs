use crate::{CacheError, Stats};
use bytes::Bytes;
use config::CacheConfig;
use entry::{Entry, EntrySnapshot, unix_millis};
use key::CacheKey;
use parking_lot::Mutex;
use recency_list::RecencyList;
use stats::{Counters, SweepReport};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use store::IndexedStore;
use touch_queue::{Push, TouchQueue};
use tracing::{debug, error, info, trace};
use worker::StopSignal;

pub(crate) mod config;
pub(crate) mod entry;
pub(crate) mod key;
mod recency_list;
mod ring_buffer;
pub(crate) mod stats;
mod store;
mod touch_queue;
mod worker;

pub(crate) type RandomState = ahash::RandomState;

/// Size- and age-bounded cache for configuration blobs.
///
/// Lookups and writes go straight to a sharded concurrent store. Every hit and every write also
/// queues a touch for a background maintenance thread, which moves the entry to the head of a
/// recency list. A second background thread sweeps that list on a fixed interval and evicts
/// entries beyond [`CacheConfig::max_size`] or older than [`CacheConfig::staleness_window`].
///
/// Writes are never rejected for capacity; the store may overshoot `max_size` until the next
/// sweep.
///
/// Wrap the cache in a [`std::sync::Arc`] to share it between threads. Dropping the last handle
/// stops both background threads.
#[derive(Debug)]
pub struct Cache {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    metrics_last_accessed: Mutex<Instant>,
}

/// State shared between the cache handle and its workers.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) config: CacheConfig,
    store: IndexedStore,
    // the only lock around list structure; always taken before any store shard lock
    list: Mutex<RecencyList>,
    pub(crate) touches: TouchQueue<Arc<Entry>>,
    counters: Counters,
    pub(crate) stop: StopSignal,
}

impl Cache {
    /// Creates a cache holding at most `max_size` entries after each sweep, with the default
    /// staleness window and sweep interval.
    pub fn new(max_size: usize) -> Result<Cache, CacheError> {
        Cache::with_config(CacheConfig::new(max_size))
    }

    /// Creates a cache and starts its maintenance and sweep threads.
    pub fn with_config(config: CacheConfig) -> Result<Cache, CacheError> {
        let cache = Cache::without_workers(config)?;

        let maintenance = worker::spawn_maintenance(Arc::clone(&cache.shared))?;
        cache.workers.lock().push(maintenance);

        let sweeper = worker::spawn_sweeper(Arc::clone(&cache.shared))?;
        cache.workers.lock().push(sweeper);

        Ok(cache)
    }

    fn without_workers(config: CacheConfig) -> Result<Cache, CacheError> {
        config.validate()?;

        let shared = Shared {
            store: IndexedStore::with_capacity(config.max_size),
            list: Mutex::new(RecencyList::with_capacity(config.max_size)),
            touches: TouchQueue::with_capacity(config.max_size),
            counters: Counters::default(),
            stop: StopSignal::default(),
            config,
        };

        Ok(Cache {
            shared: Arc::new(shared),
            workers: Mutex::new(Vec::with_capacity(2)),
            metrics_last_accessed: Mutex::new(Instant::now()),
        })
    }

    /// Returns the payload stored for the key and queues a recency touch for it.
    ///
    /// A miss returns [`None`].
    pub fn get(&self, name: &str, group_id: i64, app_name: &str) -> Option<Bytes> {
        let token = key::encode(name, group_id, app_name);

        let Some(entry) = self.shared.store.get(&token) else {
            self.shared.counters.increment_miss_count();
            return None;
        };

        self.shared.counters.increment_hit_count();
        let payload = entry.payload();
        self.shared.queue_touch(entry);
        Some(payload)
    }

    /// Stores `payload` under the key, replacing the payload of an existing entry in place.
    ///
    /// The entry's access time is refreshed asynchronously by the maintenance thread. Fails only
    /// after [`Cache::shutdown`].
    pub fn store_or_update(
        &self,
        name: &str,
        group_id: i64,
        app_name: &str,
        payload: impl Into<Bytes>,
    ) -> Result<(), CacheError> {
        if self.shared.stop.is_stopped() {
            return Err(CacheError::Closed);
        }

        let payload = payload.into();
        let token = key::encode(name, group_id, app_name);

        let (entry, created) = self.shared.store.upsert(
            token,
            |token| {
                Entry::new(
                    CacheKey::new(name, group_id, app_name),
                    token,
                    payload.clone(),
                )
            },
            |existing| {
                existing.replace_payload(payload.clone());
            },
        );

        if created {
            trace!(key = %entry.key(), "stored new entry");
        }

        self.shared.queue_touch(entry);
        Ok(())
    }

    /// Returns a detached copy of every stored entry, in no particular order.
    pub fn all_data(&self) -> Vec<EntrySnapshot> {
        self.shared.store.iter().map(|entry| entry.snapshot()).collect()
    }

    /// Reports whether the key is stored, without touching it.
    pub fn contains(&self, name: &str, group_id: i64, app_name: &str) -> bool {
        let token = key::encode(name, group_id, app_name);
        self.shared.store.get(&token).is_some()
    }

    /// Removes the key from both the store and the recency list, returning its payload.
    pub fn remove(&self, name: &str, group_id: i64, app_name: &str) -> Option<Bytes> {
        let token = key::encode(name, group_id, app_name);

        let mut list = self.shared.list.lock();
        let entry = self.shared.store.delete(&token)?;
        entry.mark_evicted();
        list.remove(&entry);

        Some(entry.payload())
    }

    /// Returns the number of stored entries, including any overshoot not yet swept.
    pub fn len(&self) -> usize {
        self.shared.store.len()
    }

    /// Returns `true` if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys of the recency list from most to least recently touched.
    ///
    /// Touches still queued are not reflected; call [`Cache::sync`] first for an exact picture.
    pub fn recency_order(&self) -> Vec<CacheKey> {
        self.shared.list.lock().keys()
    }

    /// Applies every queued touch on the calling thread.
    ///
    /// Once this returns, all touches queued before the call are visible in the recency order.
    pub fn sync(&self) {
        self.shared.apply_touches();
    }

    /// Runs a sweep on the calling thread, independent of the sweep interval.
    pub fn sweep_now(&self) -> SweepReport {
        self.shared.sweep()
    }

    /// Returns the counters accumulated since the previous call and resets them.
    pub fn stats(&self) -> Stats {
        let mut stats = Stats::default();

        stats.millis_elapsed = {
            let mut guard = self.metrics_last_accessed.lock();
            let millis_elapsed = guard.elapsed().as_millis();
            *guard = Instant::now();
            millis_elapsed
        };

        self.shared.counters.drain_into(&mut stats);
        stats.len = self.len();

        stats
    }

    /// Stops both background threads and waits for them.
    ///
    /// Touches queued before the call are still applied. Afterwards [`Cache::get`] keeps
    /// serving stored entries but no longer records recency, and [`Cache::store_or_update`]
    /// returns [`CacheError::Closed`]. Calling this more than once is a no-op.
    pub fn shutdown(&self) {
        self.shared.stop.stop();
        self.shared.touches.close();

        let workers: Vec<_> = self.workers.lock().drain(..).collect();
        for handle in workers {
            let name = handle.thread().name().unwrap_or("unnamed").to_owned();
            if handle.join().is_err() {
                error!(worker = %name, "cache worker panicked");
            }
        }
    }
}

impl Drop for Cache {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Shared {
    fn queue_touch(&self, entry: Arc<Entry>) {
        if self.touches.push(entry) == Push::DroppedOldest {
            self.counters.increment_dropped_touch_count();
            trace!("recency queue full, dropped oldest touch");
        }
    }

    /// Moves every queued entry to the head of the recency list. Returns how many were applied.
    pub(crate) fn apply_touches(&self) -> usize {
        let mut list = self.list.lock();
        Self::apply_touches_locked(&self.touches, &mut list)
    }

    fn apply_touches_locked(touches: &TouchQueue<Arc<Entry>>, list: &mut RecencyList) -> usize {
        let now = unix_millis();
        let mut applied = 0;

        for entry in touches.pop_all() {
            if list.touch(&entry, now) {
                applied += 1;
            }
        }

        applied
    }

    /// Brings the recency list up to date and evicts entries beyond `max_size` or past the
    /// staleness window from both the list and the store.
    pub(crate) fn sweep(&self) -> SweepReport {
        let mut list = self.list.lock();

        Self::apply_touches_locked(&self.touches, &mut list);

        let adopted = list.adopt(self.store.iter());
        if adopted > 0 {
            debug!(adopted, "linked stored entries missing from the recency list");
        }

        let evicted = list.sweep(
            unix_millis(),
            self.config.max_size,
            self.config.staleness_window,
        );
        for entry in &evicted {
            self.store.delete_entry(entry);
        }

        let report = SweepReport {
            retained: list.len(),
            evicted: evicted.len(),
            adopted,
        };
        drop(list);

        self.counters.add_eviction_count(report.evicted);
        info!(
            retained = report.retained,
            evicted = report.evicted,
            adopted = report.adopted,
            "sweep finished"
        );

        report
    }
}
