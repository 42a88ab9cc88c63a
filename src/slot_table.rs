//! SlotTable: fixed-length array of tagged slots shared by the open-addressing
//! stores.
//!
//! The table never grows. Slot indices handed out by [`SlotTable::probe`],
//! [`SlotTable::next`] and [`SlotTable::prev`] are always in bounds, and every
//! tag change goes through a method so the occupied/tombstone counters stay
//! exact.

use core::mem;

/// One position in a [`SlotTable`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot<T> {
    /// Never written, or cleared. Ends every probe scan.
    Empty,
    Occupied(T),
    /// Previously occupied. Probe scans walk past it; inserts may reuse it.
    Tombstone,
}

impl<T> Slot<T> {
    pub fn is_empty(&self) -> bool {
        matches!(self, Slot::Empty)
    }

    pub fn is_occupied(&self) -> bool {
        matches!(self, Slot::Occupied(_))
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self, Slot::Tombstone)
    }

    pub fn occupant(&self) -> Option<&T> {
        match self {
            Slot::Occupied(t) => Some(t),
            _ => None,
        }
    }
}

/// Fixed-size slot array with linear probe arithmetic.
#[derive(Debug, Clone)]
pub struct SlotTable<T> {
    slots: Box<[Slot<T>]>,
    occupied: usize,
    tombstones: usize,
}

impl<T> SlotTable<T> {
    /// Allocate `len` empty slots.
    ///
    /// # Panics
    /// Panics if `len` is zero; stores validate their capacity first.
    pub fn new(len: usize) -> Self {
        assert!(len > 0, "SlotTable needs at least one slot");
        Self {
            slots: (0..len).map(|_| Slot::Empty).collect(),
            occupied: 0,
            tombstones: 0,
        }
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn occupied(&self) -> usize {
        self.occupied
    }

    pub fn tombstones(&self) -> usize {
        self.tombstones
    }

    pub fn is_full(&self) -> bool {
        self.occupied == self.slots.len()
    }

    /// Home slot for a hash: `hash mod capacity`.
    #[inline]
    pub fn home(&self, hash: u64) -> usize {
        (hash % self.slots.len() as u64) as usize
    }

    #[inline]
    pub fn next(&self, index: usize) -> usize {
        let n = index + 1;
        if n == self.slots.len() {
            0
        } else {
            n
        }
    }

    #[inline]
    pub fn prev(&self, index: usize) -> usize {
        if index == 0 {
            self.slots.len() - 1
        } else {
            index - 1
        }
    }

    /// Distance walked from `home` to reach `index`, wrapping at the end.
    #[inline]
    pub fn distance(&self, home: usize, index: usize) -> usize {
        if index >= home {
            index - home
        } else {
            index + self.slots.len() - home
        }
    }

    /// Linear probe sequence starting at `home`: every slot exactly once,
    /// stopping before `home` would be revisited.
    pub fn probe(&self, home: usize) -> Probe {
        debug_assert!(home < self.slots.len());
        Probe {
            next: home,
            len: self.slots.len(),
            remaining: self.slots.len(),
        }
    }

    pub fn get(&self, index: usize) -> &Slot<T> {
        &self.slots[index]
    }

    /// Mutable access to an occupant. Tags are only changed through
    /// [`insert`](Self::insert), [`take`](Self::take) and [`bury`](Self::bury).
    pub fn occupant_mut(&mut self, index: usize) -> Option<&mut T> {
        match &mut self.slots[index] {
            Slot::Occupied(t) => Some(t),
            _ => None,
        }
    }

    /// Occupy `index` with `value`, returning what was there.
    pub fn insert(&mut self, index: usize, value: T) -> Slot<T> {
        let prev = mem::replace(&mut self.slots[index], Slot::Occupied(value));
        match prev {
            Slot::Empty => self.occupied += 1,
            Slot::Tombstone => {
                self.tombstones -= 1;
                self.occupied += 1;
            }
            Slot::Occupied(_) => {}
        }
        prev
    }

    /// Clear an occupied slot back to `Empty`.
    pub fn take(&mut self, index: usize) -> Option<T> {
        self.vacate(index, Slot::Empty)
    }

    /// Replace an occupied slot with a `Tombstone`.
    pub fn bury(&mut self, index: usize) -> Option<T> {
        self.vacate(index, Slot::Tombstone)
    }

    fn vacate(&mut self, index: usize, with: Slot<T>) -> Option<T> {
        if !self.slots[index].is_occupied() {
            return None;
        }
        if with.is_tombstone() {
            self.tombstones += 1;
        }
        self.occupied -= 1;
        match mem::replace(&mut self.slots[index], with) {
            Slot::Occupied(t) => Some(t),
            _ => None,
        }
    }

    /// Reset every slot, tombstones included, to `Empty`.
    pub fn clear(&mut self) {
        for s in self.slots.iter_mut() {
            *s = Slot::Empty;
        }
        self.occupied = 0;
        self.tombstones = 0;
    }

    /// Occupants with their slot index, in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.occupant().map(|t| (i, t)))
    }
}

/// Iterator over a linear probe sequence. See [`SlotTable::probe`].
#[derive(Debug, Clone)]
pub struct Probe {
    next: usize,
    len: usize,
    remaining: usize,
}

impl Iterator for Probe {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        let i = self.next;
        self.remaining -= 1;
        self.next = if i + 1 == self.len { 0 } else { i + 1 };
        Some(i)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Probe {}

#[cfg(test)]
mod tests {
    use super::*;

    /// Invariant: a probe sequence visits each slot once, wrapping past the end.
    #[test]
    fn probe_wraps_once() {
        let t: SlotTable<u8> = SlotTable::new(5);
        let seq: Vec<usize> = t.probe(3).collect();
        assert_eq!(seq, vec![3, 4, 0, 1, 2]);
        assert_eq!(t.probe(0).len(), 5);
    }

    #[test]
    fn neighbours_and_distance_wrap() {
        let t: SlotTable<u8> = SlotTable::new(4);
        assert_eq!(t.next(3), 0);
        assert_eq!(t.prev(0), 3);
        assert_eq!(t.distance(3, 1), 2);
        assert_eq!(t.distance(1, 3), 2);
        assert_eq!(t.home(10), 2);
    }

    /// Invariant: counters track every tag transition.
    #[test]
    fn counters_follow_tags() {
        let mut t = SlotTable::new(3);
        assert!(t.insert(0, 'a').is_empty());
        t.insert(1, 'b');
        assert_eq!(t.occupied(), 2);

        assert_eq!(t.bury(0), Some('a'));
        assert!(t.get(0).is_tombstone());
        assert_eq!((t.occupied(), t.tombstones()), (1, 1));

        // Burying or taking a non-occupied slot is a no-op.
        assert_eq!(t.bury(0), None);
        assert_eq!(t.take(2), None);
        assert_eq!((t.occupied(), t.tombstones()), (1, 1));

        assert!(t.insert(0, 'c').is_tombstone());
        assert_eq!((t.occupied(), t.tombstones()), (2, 0));

        assert_eq!(t.insert(0, 'd'), Slot::Occupied('c'));
        assert_eq!(t.occupied(), 2);

        t.insert(2, 'e');
        assert!(t.is_full());
        assert_eq!(t.take(1), Some('b'));
        assert!(t.get(1).is_empty());

        let live: Vec<_> = t.iter().collect();
        assert_eq!(live, vec![(0, &'d'), (2, &'e')]);

        t.clear();
        assert_eq!((t.occupied(), t.tombstones()), (0, 0));
        assert!(t.iter().next().is_none());
    }

    #[test]
    #[should_panic]
    fn zero_slots_rejected() {
        let _t: SlotTable<u8> = SlotTable::new(0);
    }
}
