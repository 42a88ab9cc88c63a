//! RecencyCache: fixed-capacity LRU cache.
//!
//! Structure
//! - `RecencyList`: doubly linked list whose nodes live in a `SlotMap` arena
//!   and link to each other through generational `DefaultKey`s. The list owns
//!   the nodes; a stale key can never alias a reused node.
//! - `index`: a `hashbrown::HashTable<DefaultKey>` keyed by each node's
//!   stored hash. It holds lookup handles only, never node ownership.
//!
//! The set of keys reachable through `index` is exactly the set of nodes in
//! the list. Head is the most recently used entry, tail the least.

use crate::config::validate_capacity;
use crate::error::{ConfigError, StoreError};
use crate::reentrancy::DebugReentrancy;
use crate::store::Store;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::mem;
use hashbrown::HashTable;
use slotmap::{DefaultKey, SlotMap};
use std::collections::hash_map::RandomState;

#[derive(Debug)]
struct Node<K, V> {
    key: K,
    value: V,
    hash: u64,
    prev: Option<DefaultKey>,
    next: Option<DefaultKey>,
}

/// Arena-backed recency list.
#[derive(Debug)]
struct RecencyList<K, V> {
    nodes: SlotMap<DefaultKey, Node<K, V>>,
    head: Option<DefaultKey>,
    tail: Option<DefaultKey>,
}

impl<K, V> RecencyList<K, V> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: SlotMap::with_capacity_and_key(capacity),
            head: None,
            tail: None,
        }
    }

    fn len(&self) -> usize {
        self.nodes.len()
    }

    fn push_front(&mut self, key: K, value: V, hash: u64) -> DefaultKey {
        let k = self.nodes.insert(Node {
            key,
            value,
            hash,
            prev: None,
            next: None,
        });
        self.link_front(k);
        k
    }

    fn link_front(&mut self, k: DefaultKey) {
        let old_head = self.head;
        if let Some(n) = self.nodes.get_mut(k) {
            n.prev = None;
            n.next = old_head;
        }
        match old_head.and_then(|h| self.nodes.get_mut(h)) {
            Some(h) => h.prev = Some(k),
            None => self.tail = Some(k),
        }
        self.head = Some(k);
    }

    /// Splice `k` out of the chain; the node stays in the arena.
    fn unlink(&mut self, k: DefaultKey) {
        let Some(n) = self.nodes.get_mut(k) else {
            return;
        };
        let (prev, next) = (n.prev.take(), n.next.take());
        match prev.and_then(|p| self.nodes.get_mut(p)) {
            Some(p) => p.next = next,
            None => self.head = next,
        }
        match next.and_then(|x| self.nodes.get_mut(x)) {
            Some(x) => x.prev = prev,
            None => self.tail = prev,
        }
    }

    fn move_to_front(&mut self, k: DefaultKey) {
        if self.head != Some(k) {
            self.unlink(k);
            self.link_front(k);
        }
    }

    fn remove(&mut self, k: DefaultKey) -> Option<Node<K, V>> {
        self.unlink(k);
        self.nodes.remove(k)
    }

    fn pop_back(&mut self) -> Option<(DefaultKey, Node<K, V>)> {
        let t = self.tail?;
        self.remove(t).map(|n| (t, n))
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.head = None;
        self.tail = None;
    }

    fn iter(&self) -> ListIter<'_, K, V> {
        ListIter {
            nodes: &self.nodes,
            cursor: self.head,
        }
    }
}

/// Iterator over cache entries from most to least recently used.
pub struct ListIter<'a, K, V> {
    nodes: &'a SlotMap<DefaultKey, Node<K, V>>,
    cursor: Option<DefaultKey>,
}

impl<'a, K, V> Iterator for ListIter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let n = self.nodes.get(self.cursor?)?;
        self.cursor = n.next;
        Some((&n.key, &n.value))
    }
}

/// Hit, miss and churn counters for a [`RecencyCache`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub updates: u64,
    pub evictions: u64,
    pub removals: u64,
}

impl CacheStats {
    /// Fraction of `get` calls that hit; `0.0` before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Fixed-capacity least-recently-used cache.
///
/// `put` and `get` both mark an entry most recently used. When a new key
/// arrives at capacity, the tail entry is evicted first. All operations are
/// O(1) on average.
pub struct RecencyCache<K, V, S = RandomState> {
    hasher: S,
    index: HashTable<DefaultKey>,
    list: RecencyList<K, V>,
    capacity: usize,
    stats: CacheStats,
    reentrancy: DebugReentrancy,
}

impl<K, V> RecencyCache<K, V>
where
    K: Eq + Hash,
{
    pub fn with_capacity(capacity: usize) -> Result<Self, ConfigError> {
        Self::with_capacity_and_hasher(capacity, Default::default())
    }
}

fn index_node<K, V>(
    index: &mut HashTable<DefaultKey>,
    list: &RecencyList<K, V>,
    hash: u64,
    k: DefaultKey,
) {
    let nodes = &list.nodes;
    index.insert_unique(hash, k, |&kk| nodes.get(kk).map(|n| n.hash).unwrap_or(0));
}

/// Drop the index entry pointing at `k`.
fn unindex(index: &mut HashTable<DefaultKey>, hash: u64, k: DefaultKey) {
    if let Ok(entry) = index.find_entry(hash, |&kk| kk == k) {
        let _ = entry.remove();
    }
}

impl<K, V, S> RecencyCache<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Result<Self, ConfigError> {
        let capacity = validate_capacity(capacity)?;
        Ok(Self {
            hasher,
            index: HashTable::with_capacity(capacity),
            list: RecencyList::with_capacity(capacity),
            capacity,
            stats: CacheStats::default(),
            reentrancy: DebugReentrancy::new(),
        })
    }

    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    fn find<Q>(&self, hash: u64, q: &Q) -> Option<DefaultKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        self.index
            .find(hash, |&k| {
                self.list
                    .nodes
                    .get(k)
                    .map(|n| n.key.borrow() == q)
                    .unwrap_or(false)
            })
            .copied()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
    pub fn len(&self) -> usize {
        self.list.len()
    }
    pub fn is_empty(&self) -> bool {
        self.list.len() == 0
    }
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
    pub fn reset_stats(&mut self) {
        self.stats = CacheStats::default();
    }

    /// Insert or update `key` and mark it most recently used, evicting the
    /// least recently used entry if a new key arrives at capacity.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        let _g = self.reentrancy.enter();
        let hash = self.make_hash(&key);
        if let Some(k) = self.find(hash, &key) {
            self.list.move_to_front(k);
            self.stats.updates += 1;
            return self
                .list
                .nodes
                .get_mut(k)
                .map(|n| mem::replace(&mut n.value, value));
        }
        if self.list.len() >= self.capacity {
            if let Some((k, lru)) = self.list.pop_back() {
                unindex(&mut self.index, lru.hash, k);
                self.stats.evictions += 1;
            }
        }
        let k = self.list.push_front(key, value, hash);
        index_node(&mut self.index, &self.list, hash, k);
        self.stats.insertions += 1;
        None
    }

    /// Insert or update `key` without evicting. A new key at capacity fails
    /// with [`StoreError::CapacityExhausted`] and changes nothing.
    pub fn try_put(&mut self, key: K, value: V) -> Result<Option<V>, StoreError> {
        let _g = self.reentrancy.enter();
        let hash = self.make_hash(&key);
        if let Some(k) = self.find(hash, &key) {
            self.list.move_to_front(k);
            self.stats.updates += 1;
            return Ok(self
                .list
                .nodes
                .get_mut(k)
                .map(|n| mem::replace(&mut n.value, value)));
        }
        if self.list.len() >= self.capacity {
            return Err(StoreError::CapacityExhausted {
                capacity: self.capacity,
            });
        }
        let k = self.list.push_front(key, value, hash);
        index_node(&mut self.index, &self.list, hash, k);
        self.stats.insertions += 1;
        Ok(None)
    }

    /// Look `q` up and mark it most recently used.
    pub fn get<Q>(&mut self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let hash = self.make_hash(q);
        match self.find(hash, q) {
            Some(k) => {
                self.stats.hits += 1;
                self.list.move_to_front(k);
                self.list.nodes.get(k).map(|n| &n.value)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Like [`get`](Self::get) but with mutable access to the value.
    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let hash = self.make_hash(q);
        match self.find(hash, q) {
            Some(k) => {
                self.stats.hits += 1;
                self.list.move_to_front(k);
                self.list.nodes.get_mut(k).map(|n| &mut n.value)
            }
            None => {
                self.stats.misses += 1;
                None
            }
        }
    }

    /// Look `q` up without touching recency order or statistics.
    pub fn peek<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let k = self.find(self.make_hash(q), q)?;
        self.list.nodes.get(k).map(|n| &n.value)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        self.find(self.make_hash(q), q).is_some()
    }

    /// The entry that the next eviction would drop.
    pub fn peek_lru(&self) -> Option<(&K, &V)> {
        let n = self.list.nodes.get(self.list.tail?)?;
        Some((&n.key, &n.value))
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let hash = self.make_hash(q);
        let k = self.find(hash, q)?;
        unindex(&mut self.index, hash, k);
        let node = self.list.remove(k)?;
        self.stats.removals += 1;
        Some(node.value)
    }

    pub fn clear(&mut self) {
        let _g = self.reentrancy.enter();
        self.index.clear();
        self.list.clear();
    }

    /// Entries from most to least recently used.
    pub fn iter(&self) -> ListIter<'_, K, V> {
        self.list.iter()
    }

    /// Check that index and list hold the same handles and that the links
    /// are consistent in both directions.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        assert!(self.list.len() <= self.capacity);
        assert_eq!(self.index.len(), self.list.len());
        let mut forward = Vec::new();
        let mut prev = None;
        let mut cursor = self.list.head;
        while let Some(k) = cursor {
            let n = &self.list.nodes[k];
            assert_eq!(n.prev, prev, "broken back link");
            assert_eq!(self.find(n.hash, &n.key), Some(k), "node missing from index");
            forward.push(k);
            assert!(forward.len() <= self.list.len(), "cycle in recency list");
            prev = Some(k);
            cursor = n.next;
        }
        assert_eq!(self.list.tail, prev);
        assert_eq!(forward.len(), self.list.len());
    }
}

impl<K, V, S> Store<K, V> for RecencyCache<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn put(&mut self, key: K, value: V) -> Result<Option<V>, StoreError> {
        Ok(RecencyCache::put(self, key, value))
    }
    fn get(&mut self, key: &K) -> Option<&V> {
        RecencyCache::get(self, key)
    }
    fn remove(&mut self, key: &K) -> Option<V> {
        RecencyCache::remove(self, key)
    }
    fn len(&self) -> usize {
        self.list.len()
    }
}

impl<K, V, S> fmt::Debug for RecencyCache<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.list.iter()).finish()
    }
}
