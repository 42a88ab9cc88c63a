//! LinearHashStore: chained buckets with incremental, load-factor-triggered
//! splitting (linear hashing).
//!
//! Addressing uses two moduli. Buckets below the expansion pointer have
//! already been split in the current round and are addressed with the next
//! level's modulus; the rest still use the current level's:
//!
//! ```text
//! m = base_buckets * 2^level
//! a = hash mod m
//! if a < expansion_pointer { a = hash mod 2m }
//! ```
//!
//! Each split moves part of a single bucket into one new bucket appended at
//! `expansion_pointer + m`, so growth is spread over many inserts instead of
//! rehashing the whole table at once. Every entry keeps its precomputed hash;
//! splitting never calls `K: Hash`.

use crate::config::LinearHashConfig;
use crate::error::{ConfigError, StoreError};
use crate::reentrancy::DebugReentrancy;
use crate::store::Store;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::mem;
use std::collections::hash_map::RandomState;

#[derive(Debug, Clone)]
struct Entry<K, V> {
    key: K,
    value: V,
    hash: u64,
}

pub struct LinearHashStore<K, V, S = RandomState> {
    hasher: S,
    buckets: Vec<Vec<Entry<K, V>>>,
    base_buckets: usize,
    max_load_factor: f64,
    level: u32,
    expansion_pointer: usize,
    len: usize,
    reentrancy: DebugReentrancy,
}

impl<K, V> LinearHashStore<K, V>
where
    K: Eq + Hash,
{
    /// Store with [`LinearHashConfig::default`].
    pub fn new() -> Self {
        Self::build(LinearHashConfig::default(), Default::default())
    }

    pub fn with_config(config: LinearHashConfig) -> Result<Self, ConfigError> {
        Self::with_config_and_hasher(config, Default::default())
    }
}

impl<K, V> Default for LinearHashStore<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> LinearHashStore<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_config_and_hasher(config: LinearHashConfig, hasher: S) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config, hasher))
    }

    fn build(config: LinearHashConfig, hasher: S) -> Self {
        Self {
            hasher,
            buckets: (0..config.base_buckets).map(|_| Vec::new()).collect(),
            base_buckets: config.base_buckets,
            max_load_factor: config.max_load_factor,
            level: 0,
            expansion_pointer: 0,
            len: 0,
            reentrancy: DebugReentrancy::new(),
        }
    }

    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    pub fn len(&self) -> usize {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
    /// Completed doubling rounds.
    pub fn level(&self) -> u32 {
        self.level
    }
    /// Next bucket to split.
    pub fn expansion_pointer(&self) -> usize {
        self.expansion_pointer
    }
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
    /// Number of entries chained in bucket `index`.
    pub fn bucket_len(&self, index: usize) -> Option<usize> {
        self.buckets.get(index).map(Vec::len)
    }
    pub fn load_factor(&self) -> f64 {
        self.len as f64 / self.buckets.len() as f64
    }
    pub fn config(&self) -> LinearHashConfig {
        LinearHashConfig::new(self.base_buckets, self.max_load_factor)
    }

    /// Bucket count at the start of the current round: `base_buckets * 2^level`.
    #[inline]
    fn round_size(&self) -> usize {
        self.base_buckets << self.level
    }

    #[inline]
    fn address(&self, hash: u64) -> usize {
        let m = self.round_size() as u64;
        let a = (hash % m) as usize;
        if a < self.expansion_pointer {
            (hash % (m << 1)) as usize
        } else {
            a
        }
    }

    /// Bucket that `q` is routed to under the current level and pointer.
    pub fn address_of<Q>(&self, q: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash,
    {
        let _g = self.reentrancy.enter();
        self.address(self.make_hash(q))
    }

    fn locate<Q>(&self, q: &Q) -> (usize, Option<usize>)
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let b = self.address(self.make_hash(q));
        let pos = self.buckets[b].iter().position(|e| e.key.borrow() == q);
        (b, pos)
    }

    #[inline]
    fn overloaded(&self) -> bool {
        self.load_factor() > self.max_load_factor
    }

    /// Insert or update `key`. Never fails: an insert that pushes the load
    /// factor above the threshold splits buckets until it is restored.
    pub fn put(&mut self, key: K, value: V) -> Option<V> {
        let guard = self.reentrancy.enter();
        let hash = self.make_hash(&key);
        let b = self.address(hash);
        let bucket = &mut self.buckets[b];
        if let Some(e) = bucket.iter_mut().find(|e| e.key == key) {
            return Some(mem::replace(&mut e.value, value));
        }
        bucket.push(Entry { key, value, hash });
        self.len += 1;
        // Splits only read stored hashes.
        drop(guard);

        while self.overloaded() {
            self.split_next();
        }
        None
    }

    /// Split the bucket under the expansion pointer into itself and a new
    /// bucket at `expansion_pointer + base_buckets * 2^level`.
    fn split_next(&mut self) {
        let m = self.round_size();
        let p = self.expansion_pointer;
        let next_modulus = (m as u64) << 1;
        debug_assert_eq!(self.buckets.len(), m + p);

        let (stays, moves): (Vec<_>, Vec<_>) = mem::take(&mut self.buckets[p])
            .into_iter()
            .partition(|e| (e.hash % next_modulus) as usize == p);
        self.buckets[p] = stays;
        self.buckets.push(moves);

        self.expansion_pointer += 1;
        if self.expansion_pointer == m {
            self.expansion_pointer = 0;
            self.level += 1;
        }
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let (b, pos) = self.locate(q);
        pos.map(|i| &self.buckets[b][i].value)
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let (b, pos) = self.locate(q);
        let i = pos?;
        Some(&mut self.buckets[b][i].value)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        self.locate(q).1.is_some()
    }

    /// Splice `q` out of its chain. Buckets are never merged back.
    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let (b, pos) = self.locate(q);
        let e = self.buckets[b].remove(pos?);
        self.len -= 1;
        Some(e.value)
    }

    /// Drop every entry and shrink back to the base bucket count.
    pub fn clear(&mut self) {
        let _g = self.reentrancy.enter();
        self.buckets.truncate(self.base_buckets);
        for b in self.buckets.iter_mut() {
            b.clear();
        }
        self.level = 0;
        self.expansion_pointer = 0;
        self.len = 0;
    }

    /// Entries bucket by bucket, in chain order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.buckets
            .iter()
            .flat_map(|b| b.iter().map(|e| (&e.key, &e.value)))
    }

    #[cfg(test)]
    pub(crate) fn bucket_keys(&self, index: usize) -> Vec<&K> {
        self.buckets[index].iter().map(|e| &e.key).collect()
    }

    /// Check routing of every stored hash, bucket count bookkeeping and the
    /// load-factor bound.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        assert_eq!(self.buckets.len(), self.round_size() + self.expansion_pointer);
        assert!(self.expansion_pointer < self.round_size());
        assert_eq!(self.buckets.iter().map(Vec::len).sum::<usize>(), self.len);
        assert!(!self.overloaded(), "load factor {} above bound", self.load_factor());
        for (i, b) in self.buckets.iter().enumerate() {
            for e in b {
                assert_eq!(e.hash, self.make_hash(&e.key));
                assert_eq!(self.address(e.hash), i, "entry routed to wrong bucket");
            }
        }
    }
}

impl<K, V, S> Store<K, V> for LinearHashStore<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn put(&mut self, key: K, value: V) -> Result<Option<V>, StoreError> {
        Ok(LinearHashStore::put(self, key, value))
    }
    fn get(&mut self, key: &K) -> Option<&V> {
        LinearHashStore::get(self, key)
    }
    fn remove(&mut self, key: &K) -> Option<V> {
        LinearHashStore::remove(self, key)
    }
    fn len(&self) -> usize {
        self.len
    }
}

impl<K, V, S> fmt::Debug for LinearHashStore<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.buckets
                    .iter()
                    .flat_map(|b| b.iter().map(|e| (&e.key, &e.value))),
            )
            .finish()
    }
}
