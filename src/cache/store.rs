use crate::cache::RandomState;
use crate::cache::entry::Entry;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::BuildHasher;
use std::num::NonZero;
use std::sync::Arc;
use std::{cmp, thread, vec};

type Shard<S> = RwLock<HashMap<String, Arc<Entry>, S>>;

/// Concurrent token → entry map, split into independently locked shards.
///
/// The store decides whether an entry exists. It knows nothing about recency.
#[derive(Debug)]
pub(crate) struct IndexedStore<S = RandomState> {
    hash_builder: S,
    shards: Vec<Shard<S>>,
}

impl IndexedStore<RandomState> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, Default::default())
    }
}

impl<S> IndexedStore<S>
where
    S: BuildHasher + Clone,
{
    pub(crate) fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        let available_parallelism = thread::available_parallelism()
            .map(NonZero::get)
            .unwrap_or(1);

        let number_of_shards = cmp::max(cmp::min(available_parallelism * 4, capacity), 1);
        let capacity_per_shard = capacity.div_ceil(number_of_shards);

        let shards = (0..number_of_shards)
            .map(|_| {
                RwLock::new(HashMap::with_capacity_and_hasher(
                    capacity_per_shard,
                    hash_builder.clone(),
                ))
            })
            .collect();

        Self {
            hash_builder,
            shards,
        }
    }

    pub(crate) fn get(&self, token: &str) -> Option<Arc<Entry>> {
        self.shard(token).read().get(token).cloned()
    }

    /// Looks up the entry for `token` and either updates it or stores a fresh one, atomically with
    /// respect to other writers of the same token.
    ///
    /// An entry the sweep has already marked as evicted is replaced rather than updated, so the
    /// write survives the pending delete. Returns the stored entry and whether it was created.
    pub(crate) fn upsert<C, U>(&self, token: String, create: C, update: U) -> (Arc<Entry>, bool)
    where
        C: FnOnce(String) -> Entry,
        U: FnOnce(&Entry),
    {
        let mut shard = self.shard(&token).write();

        if let Some(existing) = shard.get(&token).filter(|entry| !entry.is_evicted()) {
            update(existing);
            return (Arc::clone(existing), false);
        }

        let entry = Arc::new(create(token.clone()));
        shard.insert(token, Arc::clone(&entry));
        (entry, true)
    }

    pub(crate) fn delete(&self, token: &str) -> Option<Arc<Entry>> {
        self.shard(token).write().remove(token)
    }

    /// Deletes `entry` only if it is still the one stored under its token.
    pub(crate) fn delete_entry(&self, entry: &Arc<Entry>) -> bool {
        let mut shard = self.shard(entry.token()).write();

        match shard.get(entry.token()) {
            Some(stored) if Arc::ptr_eq(stored, entry) => {
                shard.remove(entry.token());
                true
            }
            _ => false,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    /// Returns a lazy traversal over all entries.
    ///
    /// Each shard is copied out when the traversal reaches it, so the result is weakly
    /// consistent: writes to shards not yet visited are observed, earlier ones are not.
    pub(crate) fn iter(&self) -> Iter<'_, S> {
        Iter {
            shards: self.shards.iter(),
            current: Vec::new().into_iter(),
        }
    }

    fn shard(&self, token: &str) -> &Shard<S> {
        let hash = self.hash_builder.hash_one(token);
        &self.shards[hash as usize % self.shards.len()]
    }
}

pub(crate) struct Iter<'a, S> {
    shards: std::slice::Iter<'a, Shard<S>>,
    current: vec::IntoIter<Arc<Entry>>,
}

impl<S> Iterator for Iter<'_, S> {
    type Item = Arc<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.current.next() {
                return Some(entry);
            }

            let shard = self.shards.next()?;
            let entries: Vec<_> = shard.read().values().cloned().collect();
            self.current = entries.into_iter();
        }
    }
}
