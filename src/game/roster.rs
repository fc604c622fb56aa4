//! Ordered, presence-checked registry shared by every match collection
//!
//! Combatants, hazards, crate spawners and pickups all live in one of these.
//! Counts are small (a handful to a few dozen), so presence checks are a
//! linear scan and order is plain insertion order.

use std::fmt::Debug;

/// Anything stored in a [`Roster`] is identified by a stable key.
pub trait Keyed {
    type Key: Copy + Eq + Debug;

    fn key(&self) -> Self::Key;
}

/// Insertion-ordered collection holding at most one item per key
#[derive(Debug)]
pub struct Roster<T: Keyed> {
    items: Vec<T>,
}

impl<T: Keyed> Roster<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Append an item unless one with the same key is already present.
    /// Returns false (and drops `item`) on a duplicate.
    pub fn add(&mut self, item: T) -> bool {
        if self.contains(item.key()) {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Remove by key. Removing an absent key is a no-op.
    pub fn remove(&mut self, key: T::Key) -> Option<T> {
        self.position(key).map(|pos| self.items.remove(pos))
    }

    pub fn contains(&self, key: T::Key) -> bool {
        self.items.iter().any(|item| item.key() == key)
    }

    pub fn position(&self, key: T::Key) -> Option<usize> {
        self.items.iter().position(|item| item.key() == key)
    }

    pub fn get(&self, key: T::Key) -> Option<&T> {
        self.items.iter().find(|item| item.key() == key)
    }

    pub fn get_mut(&mut self, key: T::Key) -> Option<&mut T> {
        self.items.iter_mut().find(|item| item.key() == key)
    }

    pub fn get_index(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn first_mut(&mut self) -> Option<&mut T> {
        self.items.first_mut()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.items.iter_mut()
    }

    /// Snapshot of the current keys in order.
    ///
    /// Walk this instead of the live collection when items may be removed
    /// along the way; look each key up again and skip the ones that are gone.
    pub fn keys(&self) -> Vec<T::Key> {
        self.items.iter().map(Keyed::key).collect()
    }

    /// Remove every item, newest first
    pub fn drain_rev(&mut self) -> Vec<T> {
        let mut drained: Vec<T> = self.items.drain(..).collect();
        drained.reverse();
        drained
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: Keyed> Default for Roster<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use std::collections::BTreeSet;

    #[derive(Debug, Clone, PartialEq)]
    struct Item(u32, &'static str);

    impl Keyed for Item {
        type Key = u32;

        fn key(&self) -> u32 {
            self.0
        }
    }

    #[test]
    fn test_add_rejects_duplicates() {
        let mut roster = Roster::new();
        assert!(roster.add(Item(1, "a")));
        assert!(!roster.add(Item(1, "b")));
        assert_eq!(roster.len(), 1);
        assert_eq!(roster.get(1), Some(&Item(1, "a")));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut roster: Roster<Item> = Roster::new();
        roster.add(Item(1, "a"));
        assert!(roster.remove(7).is_none());
        assert_eq!(roster.len(), 1);
        assert_eq!(roster.remove(1), Some(Item(1, "a")));
        assert!(roster.remove(1).is_none());
        assert!(roster.is_empty());
    }

    #[test]
    fn test_insertion_order_survives_removal() {
        let mut roster = Roster::new();
        for key in [4, 2, 9, 1] {
            roster.add(Item(key, "x"));
        }
        roster.remove(2);
        assert_eq!(roster.keys(), vec![4, 9, 1]);
        assert_eq!(roster.position(1), Some(2));
    }

    #[test]
    fn test_removal_while_walking_snapshot() {
        let mut roster = Roster::new();
        for key in 0..5 {
            roster.add(Item(key, "x"));
        }
        let mut seen = Vec::new();
        for key in roster.keys() {
            // Everything after 1 disconnects as soon as 1 is visited
            if key == 1 {
                roster.remove(3);
                roster.remove(4);
            }
            if let Some(item) = roster.get(key) {
                seen.push(item.0);
            }
        }
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[test]
    fn test_random_add_remove_never_duplicates() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut roster = Roster::new();
        let mut model = BTreeSet::new();

        for _ in 0..500 {
            let key = rng.gen_range(0..12u32);
            if rng.gen_bool(0.6) {
                roster.add(Item(key, "x"));
                model.insert(key);
            } else {
                roster.remove(key);
                model.remove(&key);
            }

            let keys = roster.keys();
            let distinct: BTreeSet<u32> = keys.iter().copied().collect();
            assert_eq!(distinct.len(), keys.len());
            assert_eq!(distinct, model);
            assert_eq!(roster.len(), model.len());
        }
    }

    #[test]
    fn test_drain_rev_empties_newest_first() {
        let mut roster = Roster::new();
        roster.add(Item(1, "a"));
        roster.add(Item(2, "b"));
        let drained: Vec<u32> = roster.drain_rev().into_iter().map(|i| i.0).collect();
        assert_eq!(drained, vec![2, 1]);
        assert!(roster.is_empty());
    }
}
