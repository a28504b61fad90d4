use crate::cache::key::CacheKey;
use bytes::Bytes;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Slot value of an entry that is not linked into the recency list.
pub(crate) const UNLINKED: usize = usize::MAX;

/// A cached record shared between the indexed store, the touch queue and the recency list.
///
/// The payload is replaced wholesale on update. The list links live in the recency list's arena;
/// the entry only remembers which arena slot it occupies.
#[derive(Debug)]
pub(crate) struct Entry {
    key: CacheKey,
    token: String,
    payload: RwLock<Bytes>,
    last_access: AtomicI64,
    slot: AtomicUsize,
    evicted: AtomicBool,
}

impl Entry {
    pub(crate) fn new(key: CacheKey, token: String, payload: Bytes) -> Self {
        Self {
            key,
            token,
            payload: RwLock::new(payload),
            last_access: AtomicI64::new(unix_millis()),
            slot: AtomicUsize::new(UNLINKED),
            evicted: AtomicBool::new(false),
        }
    }

    pub(crate) fn key(&self) -> &CacheKey {
        &self.key
    }

    pub(crate) fn token(&self) -> &str {
        &self.token
    }

    pub(crate) fn payload(&self) -> Bytes {
        self.payload.read().clone()
    }

    pub(crate) fn replace_payload(&self, payload: Bytes) -> Bytes {
        std::mem::replace(&mut *self.payload.write(), payload)
    }

    pub(crate) fn last_access(&self) -> i64 {
        self.last_access.load(Ordering::Acquire)
    }

    pub(crate) fn set_last_access(&self, millis: i64) {
        self.last_access.store(millis, Ordering::Release);
    }

    // slot and evicted are only written while holding the recency list lock

    pub(crate) fn slot(&self) -> usize {
        self.slot.load(Ordering::Acquire)
    }

    pub(crate) fn set_slot(&self, slot: usize) {
        self.slot.store(slot, Ordering::Release);
    }

    pub(crate) fn is_evicted(&self) -> bool {
        self.evicted.load(Ordering::Acquire)
    }

    pub(crate) fn mark_evicted(&self) {
        self.evicted.store(true, Ordering::Release);
    }

    pub(crate) fn snapshot(&self) -> EntrySnapshot {
        EntrySnapshot {
            key: self.key.clone(),
            payload: self.payload(),
            last_access_millis: self.last_access(),
        }
    }
}

/// A detached copy of a cached entry, as returned by [`crate::Cache::all_data`].
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct EntrySnapshot {
    pub key: CacheKey,
    pub payload: Bytes,
    /// Unix timestamp in milliseconds of the last applied touch.
    pub last_access_millis: i64,
}

/// Current Unix time in milliseconds.
pub(crate) fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}
