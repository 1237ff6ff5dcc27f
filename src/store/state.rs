use std::{
    collections::{BTreeMap, HashMap},
    hash::Hash,
};

use super::entry::Entry;

#[derive(Debug)]
pub(crate) struct State<K, V> {
    pub(super) data: HashMap<K, Entry<V>>,
    /// Live keys by insertion sequence number.
    pub(super) order: BTreeMap<u64, K>,
    pub(super) next_seq: u64,
    pub(crate) reset_on_access: bool,
}

impl<K, V> State<K, V>
where
    K: Eq + Hash + Clone,
{
    pub(super) fn new(reset_on_access: bool) -> Self {
        Self {
            data: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
            reset_on_access,
        }
    }

    /// Overwrites the value of `key`, creating a fresh entry at the end of
    /// the insertion order if the key is not live.
    pub(super) fn upsert(&mut self, key: K, value: V) -> &mut Entry<V> {
        use std::collections::hash_map::Entry as MapEntry;

        match self.data.entry(key) {
            MapEntry::Occupied(o) => {
                let entry = o.into_mut();
                entry.value = value;
                entry
            }
            MapEntry::Vacant(v) => {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.order.insert(seq, v.key().clone());
                v.insert(Entry::new(value, seq))
            }
        }
    }

    /// Detaches the entry for `key`. Its timers are still armed until the
    /// returned entry is dropped.
    pub(super) fn remove(&mut self, key: &K) -> Option<Entry<V>> {
        let entry = self.data.remove(key)?;
        self.order.remove(&entry.seq);
        Some(entry)
    }

    /// Drops every entry, cancelling all timers. Returns the number removed.
    pub(super) fn clear(&mut self) -> usize {
        let removed = self.data.len();
        self.data.clear();
        self.order.clear();
        removed
    }

    pub(super) fn keys(&self) -> Vec<K> {
        self.order.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_keeps_insertion_position() {
        let mut state: State<&str, i32> = State::new(false);

        state.upsert("a", 1);
        state.upsert("b", 2);
        state.upsert("a", 3);

        assert_eq!(state.keys(), vec!["a", "b"]);
        assert_eq!(state.data["a"].value, 3);
    }

    #[test]
    fn reinserted_key_moves_to_the_end() {
        let mut state: State<&str, i32> = State::new(false);

        state.upsert("a", 1);
        state.upsert("b", 2);
        assert!(state.remove(&"a").is_some());
        state.upsert("a", 1);

        assert_eq!(state.keys(), vec!["b", "a"]);
    }

    #[test]
    fn remove_missing_key() {
        let mut state: State<&str, i32> = State::new(false);
        assert!(state.remove(&"nope").is_none());
    }

    #[test]
    fn clear_empties_order() {
        let mut state: State<&str, i32> = State::new(false);

        state.upsert("a", 1);
        state.upsert("b", 2);

        assert_eq!(state.clear(), 2);
        assert!(state.keys().is_empty());
        assert!(state.data.is_empty());
    }
}
