//! LinearProbingStore: fixed-capacity open addressing with linear probing and
//! tombstone-based lazy deletion.

use crate::config::validate_capacity;
use crate::error::{ConfigError, StoreError};
use crate::reentrancy::DebugReentrancy;
use crate::slot_table::{Slot, SlotTable};
use crate::store::Store;
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::mem;
use std::collections::hash_map::RandomState;

#[derive(Debug, Clone)]
struct Pair<K, V> {
    key: K,
    value: V,
}

/// Linear probing table over a [`SlotTable`].
///
/// Removal buries the slot under a tombstone. Tombstones are reused by later
/// inserts but never compacted, so a delete-heavy workload gradually
/// lengthens probe scans. [`tombstone_count`](Self::tombstone_count) exposes
/// how far that has gone; [`clear`](Self::clear) is the only reset.
///
/// `put` always scans the probe sequence for an existing copy of the key
/// before reusing a free slot, including a tombstone at the home slot, and
/// then writes to the first non-occupied slot it passed. A key is therefore
/// never stored twice.
pub struct LinearProbingStore<K, V, S = RandomState> {
    hasher: S,
    slots: SlotTable<Pair<K, V>>,
    reentrancy: DebugReentrancy,
}

impl<K, V> LinearProbingStore<K, V>
where
    K: Eq + Hash,
{
    pub fn with_capacity(capacity: usize) -> Result<Self, ConfigError> {
        Self::with_capacity_and_hasher(capacity, Default::default())
    }
}

impl<K, V, S> LinearProbingStore<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Result<Self, ConfigError> {
        let capacity = validate_capacity(capacity)?;
        Ok(Self {
            hasher,
            slots: SlotTable::new(capacity),
            reentrancy: DebugReentrancy::new(),
        })
    }

    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }
    pub fn len(&self) -> usize {
        self.slots.occupied()
    }
    pub fn is_empty(&self) -> bool {
        self.slots.occupied() == 0
    }
    pub fn tombstone_count(&self) -> usize {
        self.slots.tombstones()
    }

    /// Scan from the home slot: tombstones are skipped, the first `Empty`
    /// slot or a full wrap ends the scan.
    fn find_index<Q>(&self, q: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let home = self.slots.home(self.make_hash(q));
        for i in self.slots.probe(home) {
            match self.slots.get(i) {
                Slot::Empty => return None,
                Slot::Tombstone => {}
                Slot::Occupied(p) => {
                    if p.key.borrow() == q {
                        return Some(i);
                    }
                }
            }
        }
        None
    }

    /// Insert or update `key`. Fails when the key is new and every slot is
    /// occupied.
    pub fn put(&mut self, key: K, value: V) -> Result<Option<V>, StoreError> {
        let _g = self.reentrancy.enter();
        let home = self.slots.home(self.make_hash(&key));

        let mut existing = None;
        let mut vacant = None;
        for i in self.slots.probe(home) {
            match self.slots.get(i) {
                Slot::Empty => {
                    vacant.get_or_insert(i);
                    break;
                }
                Slot::Tombstone => {
                    vacant.get_or_insert(i);
                }
                Slot::Occupied(p) => {
                    if p.key == key {
                        existing = Some(i);
                        break;
                    }
                }
            }
        }

        if let Some(i) = existing {
            let prev = self
                .slots
                .occupant_mut(i)
                .map(|p| mem::replace(&mut p.value, value));
            return Ok(prev);
        }
        match vacant {
            Some(i) => {
                self.slots.insert(i, Pair { key, value });
                Ok(None)
            }
            None => Err(StoreError::CapacityExhausted {
                capacity: self.slots.capacity(),
            }),
        }
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let i = self.find_index(q)?;
        self.slots.get(i).occupant().map(|p| &p.value)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        self.find_index(q).is_some()
    }

    /// Slot index currently holding `q`.
    pub fn position<Q>(&self, q: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        self.find_index(q)
    }

    /// Remove `q`, leaving a tombstone in its slot.
    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let i = self.find_index(q)?;
        self.slots.bury(i).map(|p| p.value)
    }

    /// Drop every entry and every tombstone.
    pub fn clear(&mut self) {
        let _g = self.reentrancy.enter();
        self.slots.clear();
    }

    /// Entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.slots.iter().map(|(_, p)| (&p.key, &p.value))
    }
}

impl<K, V, S> Store<K, V> for LinearProbingStore<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn put(&mut self, key: K, value: V) -> Result<Option<V>, StoreError> {
        LinearProbingStore::put(self, key, value)
    }
    fn get(&mut self, key: &K) -> Option<&V> {
        LinearProbingStore::get(self, key)
    }
    fn remove(&mut self, key: &K) -> Option<V> {
        LinearProbingStore::remove(self, key)
    }
    fn len(&self) -> usize {
        LinearProbingStore::len(self)
    }
}

impl<K, V, S> fmt::Debug for LinearProbingStore<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.slots.iter().map(|(_, p)| (&p.key, &p.value)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity_hasher::BuildIdentityHasher;

    fn store(capacity: usize) -> LinearProbingStore<u64, &'static str, BuildIdentityHasher> {
        LinearProbingStore::with_capacity_and_hasher(capacity, BuildIdentityHasher).unwrap()
    }

    #[test]
    fn zero_capacity_rejected() {
        assert!(matches!(
            LinearProbingStore::<u64, u64>::with_capacity(0),
            Err(ConfigError::ZeroCapacity)
        ));
    }

    /// Invariant: colliding keys occupy consecutive slots starting at home.
    #[test]
    fn collisions_probe_linearly_and_wrap() {
        let mut s = store(5);
        assert_eq!(s.put(17, "a"), Ok(None));
        assert_eq!(s.put(27, "b"), Ok(None));
        assert_eq!(s.put(37, "c"), Ok(None));
        assert_eq!(s.put(9, "d"), Ok(None));
        assert_eq!(s.position(&17), Some(2));
        assert_eq!(s.position(&27), Some(3));
        assert_eq!(s.position(&37), Some(4));
        // Home 4 is taken, so the probe wraps to slot 0.
        assert_eq!(s.position(&9), Some(0));
    }

    /// Invariant: updating returns the previous value and keeps the slot.
    #[test]
    fn update_returns_previous_value() {
        let mut s = store(5);
        s.put(17, "a").unwrap();
        s.put(27, "b").unwrap();
        assert_eq!(s.put(27, "B"), Ok(Some("b")));
        assert_eq!(s.get(&27), Some(&"B"));
        assert_eq!(s.position(&27), Some(3));
        assert_eq!(s.len(), 2);
    }

    /// Invariant: a tombstone does not end a lookup scan.
    #[test]
    fn lookup_skips_tombstones() {
        let mut s = store(5);
        s.put(2, "a").unwrap();
        s.put(7, "b").unwrap();
        s.put(12, "c").unwrap();
        assert_eq!(s.remove(&7), Some("b"));
        assert_eq!(s.tombstone_count(), 1);
        assert_eq!(s.get(&12), Some(&"c"));
        assert_eq!(s.get(&7), None);
        assert_eq!(s.remove(&7), None);
    }

    /// Invariant: a tombstone at the home slot is only reused after checking
    /// the rest of the cluster for the same key.
    #[test]
    fn home_tombstone_does_not_duplicate_key() {
        let mut s = store(5);
        s.put(1, "x").unwrap();
        s.put(6, "old").unwrap();
        s.remove(&1);
        assert!(s.slots.get(1).is_tombstone());

        assert_eq!(s.put(6, "new"), Ok(Some("old")));
        assert_eq!(s.len(), 1);
        assert_eq!(s.position(&6), Some(2));
        assert_eq!(s.remove(&6), Some("new"));
        assert_eq!(s.get(&6), None);
    }

    /// Invariant: a full table rejects new keys but still accepts updates.
    #[test]
    fn full_table_rejects_new_keys_only() {
        let mut s = store(3);
        for k in 0..3 {
            s.put(k, "v").unwrap();
        }
        assert_eq!(
            s.put(3, "w"),
            Err(StoreError::CapacityExhausted { capacity: 3 })
        );
        assert_eq!(s.put(1, "w"), Ok(Some("v")));
        assert_eq!(s.len(), 3);
    }

    /// Invariant: with only tombstones and occupants left, a miss wraps the
    /// whole table and still terminates.
    #[test]
    fn miss_terminates_without_empty_slots() {
        let mut s = store(3);
        for k in 0..3 {
            s.put(k, "v").unwrap();
        }
        s.remove(&0);
        assert_eq!(s.get(&30), None);
        assert_eq!(s.put(30, "t"), Ok(None));
        assert_eq!(s.position(&30), Some(0));
    }

    #[test]
    fn clear_drops_tombstones() {
        let mut s = store(4);
        s.put(1, "a").unwrap();
        s.remove(&1);
        s.clear();
        assert_eq!(s.tombstone_count(), 0);
        assert!(s.is_empty());
    }

    #[test]
    fn borrowed_lookup_with_str() {
        let mut s: LinearProbingStore<String, i32> = LinearProbingStore::with_capacity(8).unwrap();
        s.put("hello".to_string(), 1).unwrap();
        assert!(s.contains_key("hello"));
        assert_eq!(s.get("hello"), Some(&1));
        assert_eq!(s.remove("hello"), Some(1));
        assert!(!s.contains_key("hello"));
    }

    /// Invariant (debug-only): re-entering the store from `K: Eq` during a
    /// probe panics; in release builds this test is skipped.
    #[cfg(debug_assertions)]
    #[test]
    fn reentrancy_panics_from_eq_during_probe() {
        use core::hash::Hasher;

        struct ReentryKey {
            id: u64,
            store: *const LinearProbingStore<ReentryKey, i32, BuildIdentityHasher>,
        }
        impl PartialEq for ReentryKey {
            fn eq(&self, other: &Self) -> bool {
                if !other.store.is_null() {
                    // Probe the same store again from inside a probe.
                    unsafe {
                        let s = &*other.store;
                        let _ = s.contains_key(&ReentryKey {
                            id: self.id,
                            store: core::ptr::null(),
                        });
                    }
                }
                self.id == other.id
            }
        }
        impl Eq for ReentryKey {}
        impl Hash for ReentryKey {
            fn hash<H: Hasher>(&self, state: &mut H) {
                // Every key collides at slot 0.
                state.write_u64(0);
            }
        }

        let mut s: LinearProbingStore<ReentryKey, i32, BuildIdentityHasher> =
            LinearProbingStore::with_capacity_and_hasher(4, BuildIdentityHasher).unwrap();
        s.put(
            ReentryKey {
                id: 1,
                store: core::ptr::null(),
            },
            1,
        )
        .unwrap();

        let query = ReentryKey {
            id: 2,
            store: &s as *const _,
        };
        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = s.get(&query);
        }));
        assert!(res.is_err(), "expected reentrancy to panic in debug builds");
    }

    #[test]
    fn debug_renders_entries() {
        let mut s = store(4);
        s.put(1, "a").unwrap();
        assert_eq!(format!("{:?}", s), r#"{1: "a"}"#);
    }
}
