use crate::cache::entry::{Entry, UNLINKED};
use crate::cache::key::CacheKey;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const NIL: usize = UNLINKED;

#[derive(Debug)]
struct Node {
    entry: Arc<Entry>,
    prev: usize,
    next: usize,
}

/// Entries ordered from most to least recently touched.
///
/// Nodes live in an arena and link to each other by slot index. Each linked entry records its
/// own slot, which makes a relink O(1) without any pointer back into the list.
#[derive(Debug)]
pub(crate) struct RecencyList {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    head: usize,
    tail: usize,
    len: usize,
}

impl RecencyList {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            len: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// Stamps `entry` with `now_millis` and moves it to the head.
    ///
    /// Entries that were never linked are inserted at the head. Entries already evicted are
    /// skipped; `false` is returned for them.
    pub(crate) fn touch(&mut self, entry: &Arc<Entry>, now_millis: i64) -> bool {
        if entry.is_evicted() {
            return false;
        }

        entry.set_last_access(now_millis);

        match entry.slot() {
            UNLINKED => {
                let idx = self.alloc(Arc::clone(entry));
                self.push_head(idx);
            }
            idx if idx == self.head => {}
            idx => {
                if !self.holds(idx, entry) {
                    warn!(key = %entry.key(), slot = idx, "entry points at a foreign slot, skipping touch");
                    return false;
                }
                self.unlink(idx);
                self.push_head(idx);
            }
        }

        true
    }

    /// Links entries that are in the store but not in the list, appending them at the tail with
    /// the most recently accessed first.
    pub(crate) fn adopt<I>(&mut self, entries: I) -> usize
    where
        I: IntoIterator<Item = Arc<Entry>>,
    {
        let mut orphans: Vec<_> = entries
            .into_iter()
            .filter(|entry| entry.slot() == UNLINKED && !entry.is_evicted())
            .collect();
        orphans.sort_by_key(|entry| std::cmp::Reverse(entry.last_access()));

        for entry in &orphans {
            let idx = self.alloc(Arc::clone(entry));
            self.push_tail(idx);
        }

        orphans.len()
    }

    /// Walks the list from the head and detaches every entry whose position exceeds `max_size`
    /// or that was last touched before `now_millis - staleness`.
    ///
    /// Detached entries are marked evicted and returned in list order; the caller removes them
    /// from the store.
    pub(crate) fn sweep(
        &mut self,
        now_millis: i64,
        max_size: usize,
        staleness: Duration,
    ) -> Vec<Arc<Entry>> {
        let staleness_millis = i64::try_from(staleness.as_millis()).unwrap_or(i64::MAX);
        let cutoff = now_millis.saturating_sub(staleness_millis);

        let mut evicted = Vec::new();
        let mut ordinal = 0;
        let mut idx = self.head;

        while idx != NIL {
            let Some(node) = self.nodes[idx].as_ref() else {
                break;
            };
            let next = node.next;
            ordinal += 1;

            if ordinal > max_size || node.entry.last_access() < cutoff {
                if let Some(entry) = self.release(idx) {
                    entry.mark_evicted();
                    evicted.push(entry);
                }
            }

            idx = next;
        }

        evicted
    }

    /// Detaches `entry` if it is linked. Returns whether it was.
    pub(crate) fn remove(&mut self, entry: &Arc<Entry>) -> bool {
        let idx = entry.slot();
        if idx == UNLINKED || !self.holds(idx, entry) {
            return false;
        }

        self.release(idx).is_some()
    }

    /// Keys from most to least recently touched.
    pub(crate) fn keys(&self) -> Vec<CacheKey> {
        let mut keys = Vec::with_capacity(self.len);
        let mut idx = self.head;

        while let Some(node) = self.nodes.get(idx).and_then(Option::as_ref) {
            keys.push(node.entry.key().clone());
            idx = node.next;
        }

        keys
    }

    fn holds(&self, idx: usize, entry: &Arc<Entry>) -> bool {
        self.nodes
            .get(idx)
            .and_then(Option::as_ref)
            .is_some_and(|node| Arc::ptr_eq(&node.entry, entry))
    }

    fn alloc(&mut self, entry: Arc<Entry>) -> usize {
        let idx = self.free.pop().unwrap_or(self.nodes.len());
        entry.set_slot(idx);

        let node = Some(Node {
            entry,
            prev: NIL,
            next: NIL,
        });

        if idx == self.nodes.len() {
            self.nodes.push(node);
        } else {
            self.nodes[idx] = node;
        }

        self.len += 1;
        idx
    }

    /// Unlinks the node at `idx`, frees its slot and hands back its entry.
    fn release(&mut self, idx: usize) -> Option<Arc<Entry>> {
        self.unlink(idx);

        let node = self.nodes.get_mut(idx)?.take()?;
        self.free.push(idx);
        self.len -= 1;

        node.entry.set_slot(UNLINKED);
        Some(node.entry)
    }

    fn unlink(&mut self, idx: usize) {
        let Some(node) = self.link_mut(idx) else {
            return;
        };
        let (prev, next) = (node.prev, node.next);
        node.prev = NIL;
        node.next = NIL;

        match self.link_mut(prev) {
            Some(prev_node) => prev_node.next = next,
            None => self.head = next,
        }

        match self.link_mut(next) {
            Some(next_node) => next_node.prev = prev,
            None => self.tail = prev,
        }
    }

    fn push_head(&mut self, idx: usize) {
        let old_head = self.head;
        let Some(node) = self.link_mut(idx) else {
            return;
        };
        node.prev = NIL;
        node.next = old_head;

        match self.link_mut(old_head) {
            Some(old_head) => old_head.prev = idx,
            None => self.tail = idx,
        }
        self.head = idx;
    }

    fn push_tail(&mut self, idx: usize) {
        let old_tail = self.tail;
        let Some(node) = self.link_mut(idx) else {
            return;
        };
        node.prev = old_tail;
        node.next = NIL;

        match self.link_mut(old_tail) {
            Some(old_tail) => old_tail.next = idx,
            None => self.head = idx,
        }
        self.tail = idx;
    }

    /// Node at `idx`; `None` for `NIL` and for freed slots.
    fn link_mut(&mut self, idx: usize) -> Option<&mut Node> {
        self.nodes.get_mut(idx)?.as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn entry(group_id: i64) -> Arc<Entry> {
        let key = CacheKey::new("k", group_id, "app");
        let token = key.to_token();
        Arc::new(Entry::new(key, token, Bytes::from_static(b"v")))
    }

    fn groups(list: &RecencyList) -> Vec<i64> {
        list.keys().iter().map(|key| key.group_id).collect()
    }

    /// Checks that the forward and backward links describe the same sequence.
    fn assert_consistent(list: &RecencyList) {
        let mut forward = Vec::new();
        let mut idx = list.head;
        let mut prev = NIL;
        while idx != NIL {
            let node = list.nodes[idx].as_ref().unwrap();
            assert_eq!(node.prev, prev, "broken back link at slot {idx}");
            assert_ne!(node.next, idx, "self link at slot {idx}");
            assert_eq!(node.entry.slot(), idx);
            forward.push(idx);
            prev = idx;
            idx = node.next;
        }
        assert_eq!(list.tail, prev);
        assert_eq!(forward.len(), list.len());
    }

    #[test]
    fn it_orders_by_most_recent_touch() {
        // given
        let mut list = RecencyList::with_capacity(3);
        let (a, b, c) = (entry(1), entry(2), entry(3));
        list.touch(&a, 1);
        list.touch(&b, 2);
        list.touch(&c, 3);

        // when
        list.touch(&a, 4);

        // then
        assert_eq!(groups(&list), vec![1, 3, 2]);
        assert_eq!(a.last_access(), 4);
        assert_consistent(&list);
    }

    #[test]
    fn it_keeps_structure_when_touching_the_head_repeatedly() {
        // given
        let mut list = RecencyList::with_capacity(2);
        let (a, b) = (entry(1), entry(2));
        list.touch(&a, 1);
        list.touch(&b, 2);

        // when
        for now in 3..10 {
            list.touch(&b, now);
        }

        // then
        assert_eq!(groups(&list), vec![2, 1]);
        assert_eq!(list.len(), 2);
        assert_eq!(b.last_access(), 9);
        assert_consistent(&list);
    }

    #[test]
    fn it_moves_the_tail_to_the_head() {
        // given
        let mut list = RecencyList::with_capacity(3);
        let (a, b, c) = (entry(1), entry(2), entry(3));
        list.touch(&a, 1);
        list.touch(&b, 2);
        list.touch(&c, 3);

        // when
        list.touch(&a, 4);
        list.touch(&b, 5);

        // then
        assert_eq!(groups(&list), vec![2, 1, 3]);
        assert_consistent(&list);
    }

    #[test]
    fn it_skips_evicted_entries() {
        // given
        let mut list = RecencyList::with_capacity(1);
        let a = entry(1);
        a.mark_evicted();

        // when
        let touched = list.touch(&a, 1);

        // then
        assert!(!touched);
        assert_eq!(list.len(), 0);
        assert_eq!(a.slot(), UNLINKED);
    }

    #[test]
    fn it_evicts_everything_beyond_max_size() {
        // given
        let mut list = RecencyList::with_capacity(4);
        let entries: Vec<_> = (1..=4).map(entry).collect();
        for (now, entry) in entries.iter().enumerate() {
            list.touch(entry, now as i64 + 100);
        }

        // when
        let evicted = list.sweep(200, 2, Duration::from_secs(60));

        // then
        let evicted: Vec<_> = evicted.iter().map(|entry| entry.key().group_id).collect();
        assert_eq!(evicted, vec![2, 1]);
        assert_eq!(groups(&list), vec![4, 3]);
        assert!(entries[0].is_evicted() && entries[1].is_evicted());
        assert_eq!(entries[0].slot(), UNLINKED);
        assert_consistent(&list);
    }

    #[test]
    fn it_evicts_stale_entries_under_max_size() {
        // given
        let mut list = RecencyList::with_capacity(3);
        let (a, b, c) = (entry(1), entry(2), entry(3));
        list.touch(&a, 1_000);
        list.touch(&b, 5_000);
        list.touch(&c, 9_000);
        // b is touched again but keeps an old timestamp in the middle of the list
        b.set_last_access(2_000);

        // when
        let evicted = list.sweep(10_000, 10, Duration::from_millis(5_000));

        // then
        let evicted: Vec<_> = evicted.iter().map(|entry| entry.key().group_id).collect();
        assert_eq!(evicted, vec![2, 1]);
        assert_eq!(groups(&list), vec![3]);
        assert_consistent(&list);
    }

    #[test]
    fn it_counts_stale_entries_towards_max_size() {
        // given
        let mut list = RecencyList::with_capacity(3);
        let (a, b, c) = (entry(1), entry(2), entry(3));
        list.touch(&c, 9_000);
        list.touch(&b, 1_000);
        list.touch(&a, 9_500);

        // when
        let evicted = list.sweep(10_000, 2, Duration::from_millis(5_000));

        // then
        let evicted: Vec<_> = evicted.iter().map(|entry| entry.key().group_id).collect();
        assert_eq!(evicted, vec![2, 3]);
        assert_eq!(groups(&list), vec![1]);
        assert!(c.is_evicted());
        assert_consistent(&list);
    }

    #[test]
    fn it_skips_entries_pointing_at_a_foreign_slot() {
        // given
        let mut list = RecencyList::with_capacity(2);
        let (a, b, c) = (entry(1), entry(2), entry(3));
        list.touch(&a, 1);
        list.touch(&b, 2);
        c.set_slot(a.slot());

        // when
        let touched = list.touch(&c, 3);

        // then
        assert!(!touched);
        assert_eq!(groups(&list), vec![2, 1]);
        assert_eq!(list.len(), 2);
        assert_consistent(&list);

        // the list keeps working afterwards
        assert!(list.touch(&a, 4));
        assert_eq!(groups(&list), vec![1, 2]);
        assert_consistent(&list);
    }

    #[test]
    fn it_advances_the_head_when_evicting_it() {
        // given
        let mut list = RecencyList::with_capacity(2);
        let (a, b) = (entry(1), entry(2));
        list.touch(&a, 9_000);
        list.touch(&b, 1_000);

        // when
        let evicted = list.sweep(10_000, 10, Duration::from_millis(5_000));

        // then
        assert_eq!(evicted.len(), 1);
        assert_eq!(groups(&list), vec![1]);
        assert_consistent(&list);
    }

    #[test]
    fn it_reuses_freed_slots() {
        // given
        let mut list = RecencyList::with_capacity(2);
        let (a, b) = (entry(1), entry(2));
        list.touch(&a, 1);
        list.touch(&b, 2);
        list.sweep(2, 1, Duration::from_secs(1));

        // when
        let c = entry(3);
        list.touch(&c, 3);

        // then
        assert_eq!(list.nodes.len(), 2);
        assert_eq!(groups(&list), vec![3, 2]);
        assert_consistent(&list);
    }

    #[test]
    fn it_adopts_unlinked_entries_at_the_tail() {
        // given
        let mut list = RecencyList::with_capacity(4);
        let (a, b, c) = (entry(1), entry(2), entry(3));
        list.touch(&a, 1);
        b.set_last_access(10);
        c.set_last_access(20);

        // when
        let adopted = list.adopt([Arc::clone(&a), Arc::clone(&b), Arc::clone(&c)]);

        // then
        assert_eq!(adopted, 2);
        assert_eq!(groups(&list), vec![1, 3, 2]);
        assert_consistent(&list);
    }

    #[test]
    fn it_removes_linked_entries() {
        // given
        let mut list = RecencyList::with_capacity(3);
        let (a, b, c) = (entry(1), entry(2), entry(3));
        list.touch(&a, 1);
        list.touch(&b, 2);
        list.touch(&c, 3);

        // when
        let removed = list.remove(&b);

        // then
        assert!(removed);
        assert!(!list.remove(&b));
        assert_eq!(groups(&list), vec![3, 1]);
        assert_consistent(&list);
    }
}
