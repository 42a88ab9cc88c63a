//! RobinHoodStore: fixed-capacity open addressing with probe-distance-aware
//! displacement and backward-shift deletion.
//!
//! Every occupied slot records how far it sits from its home slot. On insert,
//! an entry that has travelled further than the resident of a slot takes that
//! slot and the resident continues probing ("steal from the rich"). Along any
//! run of occupied slots the distance grows by at most one per step, which
//! keeps the longest probe close to the average. Deletion pulls the following
//! displaced entries one slot back instead of leaving a tombstone.

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
struct Bucket<K, V> {
    key: K,
    value: V,
    /// Slots between the home slot and the slot this entry occupies.
    probe_distance: usize,
}

pub struct RobinHoodStore<K, V, S = RandomState> {
    hasher: S,
    slots: SlotTable<Bucket<K, V>>,
    reentrancy: DebugReentrancy,
}

impl<K, V> RobinHoodStore<K, V>
where
    K: Eq + Hash,
{
    pub fn with_capacity(capacity: usize) -> Result<Self, ConfigError> {
        Self::with_capacity_and_hasher(capacity, Default::default())
    }
}

impl<K, V, S> RobinHoodStore<K, V, S>
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

    /// Walk from the home slot until the key, an empty slot, or a full wrap.
    fn find_index<Q>(&self, q: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let home = self.slots.home(self.make_hash(q));
        for i in self.slots.probe(home) {
            match self.slots.get(i) {
                Slot::Occupied(b) => {
                    if b.key.borrow() == q {
                        return Some(i);
                    }
                }
                Slot::Empty | Slot::Tombstone => return None,
            }
        }
        None
    }

    /// Insert or update `key`.
    ///
    /// Updating an existing key never moves anything. A new key fails with
    /// [`StoreError::CapacityExhausted`] when every slot is occupied.
    pub fn put(&mut self, key: K, value: V) -> Result<Option<V>, StoreError> {
        let _g = self.reentrancy.enter();
        if let Some(i) = self.find_index(&key) {
            let prev = self
                .slots
                .occupant_mut(i)
                .map(|b| mem::replace(&mut b.value, value));
            return Ok(prev);
        }
        if self.slots.is_full() {
            return Err(StoreError::CapacityExhausted {
                capacity: self.slots.capacity(),
            });
        }

        let mut index = self.slots.home(self.make_hash(&key));
        let mut carry = Bucket {
            key,
            value,
            probe_distance: 0,
        };
        // A free slot exists, so the carried entry always lands.
        loop {
            let resident = self.slots.get(index).occupant().map(|b| b.probe_distance);
            match resident {
                None => {
                    self.slots.insert(index, carry);
                    return Ok(None);
                }
                Some(d) if d < carry.probe_distance => {
                    // The resident is richer: it yields the slot and the
                    // displaced entry keeps probing from here.
                    carry = match self.slots.insert(index, carry) {
                        Slot::Occupied(displaced) => displaced,
                        Slot::Empty | Slot::Tombstone => unreachable!("resident slot was occupied"),
                    };
                }
                Some(_) => {}
            }
            carry.probe_distance += 1;
            index = self.slots.next(index);
        }
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let i = self.find_index(q)?;
        self.slots.get(i).occupant().map(|b| &b.value)
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

    /// How far `q` sits from its home slot.
    pub fn probe_distance<Q>(&self, q: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let i = self.find_index(q)?;
        self.slots.get(i).occupant().map(|b| b.probe_distance)
    }

    /// Longest probe distance of any entry in the table.
    pub fn max_probe_distance(&self) -> usize {
        self.slots
            .iter()
            .map(|(_, b)| b.probe_distance)
            .max()
            .unwrap_or(0)
    }

    /// Remove `q` and close the gap with a backward shift.
    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let start = self.find_index(q)?;
        let removed = self.slots.take(start)?;

        let mut hole = start;
        for _ in 1..self.slots.capacity() {
            let next = self.slots.next(hole);
            let displaced = matches!(
                self.slots.get(next),
                Slot::Occupied(b) if b.probe_distance > 0
            );
            if !displaced {
                break;
            }
            if let Some(mut b) = self.slots.take(next) {
                b.probe_distance -= 1;
                self.slots.insert(hole, b);
            }
            hole = next;
        }
        Some(removed.value)
    }

    pub fn clear(&mut self) {
        let _g = self.reentrancy.enter();
        self.slots.clear();
    }

    /// Entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.slots.iter().map(|(_, b)| (&b.key, &b.value))
    }

    /// Check probe distances against recomputed home slots and the Robin
    /// Hood ordering between neighbours.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        let cap = self.slots.capacity();
        for (i, b) in self.slots.iter() {
            let home = self.slots.home(self.make_hash(&b.key));
            assert_eq!(
                b.probe_distance,
                self.slots.distance(home, i),
                "stale probe distance at slot {i}"
            );
            if b.probe_distance > 0 {
                let prev = self.slots.prev(i);
                let before = self.slots.get(prev).occupant();
                assert!(before.is_some(), "gap in front of displaced slot {i}");
            }
            let next = self.slots.next(i);
            if let Some(n) = self.slots.get(next).occupant() {
                assert!(
                    cap == 1 || n.probe_distance <= b.probe_distance + 1,
                    "slot {next} jumped ahead of slot {i}"
                );
            }
        }
    }
}

impl<K, V, S> Store<K, V> for RobinHoodStore<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    fn put(&mut self, key: K, value: V) -> Result<Option<V>, StoreError> {
        RobinHoodStore::put(self, key, value)
    }
    fn get(&mut self, key: &K) -> Option<&V> {
        RobinHoodStore::get(self, key)
    }
    fn remove(&mut self, key: &K) -> Option<V> {
        RobinHoodStore::remove(self, key)
    }
    fn len(&self) -> usize {
        RobinHoodStore::len(self)
    }
}

impl<K, V, S> fmt::Debug for RobinHoodStore<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.slots.iter().map(|(_, b)| (&b.key, &b.value)))
            .finish()
    }
}
