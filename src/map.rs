//! The public associative surface: `HopscotchMap` and its builder.
//!
//! `HopscotchMap` wires the data vectors (keys, values, hashes) to the
//! displacement engine in `crate::engine`. It exposes a fallible
//! `get`, a builder with `insert`/`extend`/`with_entries`/`build`, and
//! the usual std trait adaptations (`Clone`, `Debug`, `Index`, and so
//! on).

use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hash, Hasher};
use std::ops::Index;

use crate::engine::{self, Table};
use crate::error::{HopscotchError, NoSpace};

/// An in-memory associative container using hopscotch hashing: every
/// key's home bucket is its hash modulo the table size, and any key
/// that cannot sit at its home lives within a bounded neighborhood
/// immediately following it. Lookup therefore visits at most H slots
/// (the neighborhood width), regardless of how loaded the table is.
///
/// `S` is the hash builder, defaulting to
/// [`std::collections::hash_map::RandomState`] the same way
/// `std::collections::HashMap` does.
///
/// Not thread-safe; iteration order is an implementation detail that
/// is stable only across a window with no mutation.
pub struct HopscotchMap<K, V, S = RandomState> {
    table: Table,
    keys: Vec<K>,
    values: Vec<V>,
    hashes: Vec<u64>,
    hash_builder: S,
}

impl<K, V> HopscotchMap<K, V, RandomState> {
    /// Creates an empty map (capacity 8, neighborhood width 8).
    pub fn new() -> Self {
        Self::with_hasher(RandomState::new())
    }
}

impl<K, V> Default for HopscotchMap<K, V, RandomState> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> HopscotchMap<K, V, S> {
    /// Creates an empty map using an explicit hash builder.
    pub fn with_hasher(hash_builder: S) -> Self {
        HopscotchMap {
            table: Table::new(engine::INITIAL_SIZE, engine::INITIAL_WIDTH),
            keys: Vec::new(),
            values: Vec::new(),
            hashes: Vec::new(),
            hash_builder,
        }
    }

    /// Creates an empty map sized to hold at least `capacity` entries
    /// without growing, using an explicit hash builder. `capacity` is
    /// rounded up to the smallest allowed table size.
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        let mut size = engine::INITIAL_SIZE;
        while (capacity as f64) / (size as f64) >= engine::MAX_DENSITY {
            size *= 2;
        }
        let width = engine::required_width(size, engine::INITIAL_WIDTH)
            .expect("a freshly chosen power-of-two size always has a valid neighborhood width");
        HopscotchMap {
            table: Table::new(size, width),
            keys: Vec::new(),
            values: Vec::new(),
            hashes: Vec::new(),
            hash_builder,
        }
    }

    /// Number of live entries. O(1).
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Resets the map to its initial empty shape (capacity 8, width 8),
    /// releasing the old backing storage.
    pub fn clear(&mut self) {
        self.table = Table::new(engine::INITIAL_SIZE, engine::INITIAL_WIDTH);
        self.keys.clear();
        self.values.clear();
        self.hashes.clear();
    }

    /// Iterates keys in current storage order.
    pub fn iter_keys(&self) -> impl Iterator<Item = &K> {
        self.keys.iter()
    }

    /// Iterates values in current storage order.
    pub fn iter_values(&self) -> impl Iterator<Item = &V> {
        self.values.iter()
    }

    /// Iterates `(key, value)` pairs in current storage order.
    pub fn iter_items(&self) -> impl Iterator<Item = (&K, &V)> {
        self.keys.iter().zip(self.values.iter())
    }

    /// Iterates keys in reverse of current storage order.
    pub fn iter_reversed(&self) -> impl Iterator<Item = &K> {
        self.keys.iter().rev()
    }
}

impl<K, V, S: BuildHasher> HopscotchMap<K, V, S> {
    fn hash_key(&self, key: &K) -> u64
    where
        K: Hash,
    {
        let mut hasher = self.hash_builder.build_hasher();
        key.hash(&mut hasher);
        hasher.finish()
    }

    /// Returns the bucket holding `key`, not the entry index. Scans
    /// only the neighbor bits of `key`'s home bucket, so cost is
    /// bounded by the neighborhood width regardless of how loaded the
    /// table is.
    fn lookup_bucket(&self, key: &K) -> Option<usize>
    where
        K: Hash + Eq,
    {
        let hash = self.hash_key(key);
        let home = (hash as usize) % self.table.size;
        let mut found = None;

        for bucket in self.table.nbhds.displaced_neighbors(home) {
            debug_assert!(bucket < self.table.size, "displaced neighbor outside table bounds");
            let entry = self
                .table
                .slots
                .get(bucket)
                .expect("bucket claimed by a neighborhood bit must be occupied");

            log::trace!("lookup: scanning bucket {bucket} in neighborhood of home {home}");

            if self.hashes[entry] == hash && &self.keys[entry] == key {
                // Last match wins (relevant only under a hash/equality
                // contract violation producing duplicate live entries).
                found = Some(bucket);
            }
        }

        log::debug!("lookup: scanned neighborhood of home {home}, hit={}", found.is_some());
        found
    }

    /// Returns the value for `key`, or `MissingKey` if absent. Cost is
    /// bounded by the neighborhood width, not the table's load factor.
    pub fn get(&self, key: &K) -> Result<&V, HopscotchError>
    where
        K: Hash + Eq,
    {
        let bucket = self.lookup_bucket(key).ok_or(HopscotchError::MissingKey)?;
        let entry = self
            .table
            .slots
            .get(bucket)
            .expect("looked-up bucket must be occupied");
        Ok(&self.values[entry])
    }

    /// Returns the value for `key` if present, else `default`. Never
    /// inserts.
    pub fn get_or(&self, key: &K, default: V) -> V
    where
        K: Hash + Eq,
        V: Clone,
    {
        match self.get(key) {
            Ok(value) => value.clone(),
            Err(_) => default,
        }
    }

    /// Reports whether `key` is present.
    pub fn contains(&self, key: &K) -> bool
    where
        K: Hash + Eq,
    {
        self.lookup_bucket(key).is_some()
    }

    /// Inserts `key` with `value`, overwriting any existing value.
    pub fn set(&mut self, key: K, value: V)
    where
        K: Hash + Eq,
    {
        let hash = self.hash_key(&key);

        loop {
            if let Some(bucket) = self.lookup_bucket(&key) {
                let entry = self
                    .table
                    .slots
                    .get(bucket)
                    .expect("looked-up bucket must be occupied");
                self.keys[entry] = key;
                self.values[entry] = value;
                self.hashes[entry] = hash;
                debug_assert_eq!(self.keys.len(), self.values.len());
                debug_assert_eq!(self.keys.len(), self.hashes.len());
                return;
            }

            let home = hash as usize % self.table.size;

            if !self.table.slots.is_free(home) {
                match self.table.free_up(home, &self.hashes) {
                    Ok(()) => {}
                    Err(NoSpace) => {
                        self.grow();
                        continue;
                    }
                }
            }

            let entry = self.keys.len();
            self.table.slots.set(home, entry);
            self.table
                .nbhds
                .set(home, 0)
                .expect("home offset 0 is always valid");
            self.keys.push(key);
            self.values.push(value);
            self.hashes.push(hash);

            if self.keys.len() as f64 / self.table.size as f64 >= engine::MAX_DENSITY {
                self.grow();
            }
            return;
        }
    }

    /// Grows the table to the next size in the growth policy, applied
    /// when an insert can't maintain the neighborhood invariant or
    /// crosses the density threshold.
    fn grow(&mut self) {
        let new_size = engine::next_growth_size(self.table.size);
        self.table = engine::resize(&self.hashes, new_size, self.table.nbhd_width())
            .expect("growing to the next power-of-two target cannot violate resize's preconditions");
    }

    /// Reserves capacity for at least `additional` more entries,
    /// growing the table ahead of time. Mirrors
    /// `std::collections::HashMap::reserve`, but fallible: the
    /// underlying resize can reject a non-power-of-two target or a
    /// neighborhood width beyond 64 bits.
    pub fn reserve(&mut self, additional: usize) -> Result<(), HopscotchError>
    where
        K: Hash + Eq,
    {
        let needed = self.keys.len() + additional;
        let mut target = self.table.size.max(engine::INITIAL_SIZE);
        while needed as f64 / target as f64 >= engine::MAX_DENSITY {
            target *= 2;
        }
        if target == self.table.size {
            return Ok(());
        }
        self.table = engine::resize(&self.hashes, target, self.table.nbhd_width())?;
        Ok(())
    }

    /// Removes `key` and returns its value. Shared by `remove` and
    /// `pop`.
    fn delete(&mut self, key: &K) -> Result<V, HopscotchError>
    where
        K: Hash + Eq,
    {
        let hash = self.hash_key(key);
        let home = hash as usize % self.table.size;
        let b_act = self.lookup_bucket(key).ok_or(HopscotchError::MissingKey)?;
        let entry = self
            .table
            .slots
            .get(b_act)
            .expect("looked-up bucket must be occupied");
        let last = self.keys.len() - 1;

        // Look up the displaced key before b_act is marked free below.
        // Doing it in this order means the secondary lookup still sees
        // a consistent table (the bucket being removed hasn't been
        // freed yet).
        let removed_value = if entry != last {
            let last_key_bucket = self
                .lookup_bucket(&self.keys[last])
                .expect("the last entry must still be reachable by lookup");
            let removed = self.values.swap_remove(entry);
            self.keys.swap_remove(entry);
            self.hashes.swap_remove(entry);
            self.table.slots.set(last_key_bucket, entry);
            removed
        } else {
            let removed = self.values.pop().expect("non-empty map has a last value");
            self.keys.pop();
            self.hashes.pop();
            removed
        };

        let offset = (b_act - home) as u32;
        self.table
            .nbhds
            .clear(home, offset)
            .expect("b_act lies within home's neighborhood by lookup's own invariant");
        self.table.slots.set_free(b_act);

        Ok(removed_value)
    }

    /// Removes `key`. Returns `MissingKey` if it isn't present.
    pub fn remove(&mut self, key: &K) -> Result<(), HopscotchError>
    where
        K: Hash + Eq,
    {
        self.delete(key).map(|_| ())
    }

    /// Removes `key` and returns its value. If `key` is absent,
    /// returns `default` when one was supplied, else `MissingKey`. A
    /// caller passing `None` as an explicit default still gets
    /// `MissingKey` for a missing key; callers who need a nullable
    /// default should check `contains` first.
    pub fn pop(&mut self, key: &K, default: Option<V>) -> Result<V, HopscotchError>
    where
        K: Hash + Eq,
    {
        match self.delete(key) {
            Ok(value) => Ok(value),
            Err(HopscotchError::MissingKey) => default.ok_or(HopscotchError::MissingKey),
            Err(other) => Err(other),
        }
    }

    /// Removes and returns the entry at the end of storage order.
    /// Returns `Empty` if the map has no entries. Unlike a general
    /// `remove`, no relocation bucket-lookup is needed, since the
    /// removed entry already sits at the last data-vector index.
    pub fn pop_any(&mut self) -> Result<(K, V), HopscotchError>
    where
        K: Hash + Eq,
    {
        if self.keys.is_empty() {
            return Err(HopscotchError::Empty);
        }

        let last = self.keys.len() - 1;
        let hash = self.hashes[last];
        let home = hash as usize % self.table.size;
        let bucket = self
            .lookup_bucket(&self.keys[last])
            .expect("the last entry must be reachable by lookup");
        let offset = (bucket - home) as u32;

        self.table
            .nbhds
            .clear(home, offset)
            .expect("bucket lies within home's neighborhood by lookup's own invariant");
        self.table.slots.set_free(bucket);

        let key = self.keys.pop().expect("checked non-empty above");
        let value = self.values.pop().expect("checked non-empty above");
        self.hashes.pop();
        Ok((key, value))
    }

    /// Returns the existing value if `key` is present, else inserts
    /// `(key, default)` and returns `default`.
    pub fn set_default(&mut self, key: K, default: V) -> V
    where
        K: Hash + Eq,
        V: Clone,
    {
        if let Some(bucket) = self.lookup_bucket(&key) {
            let entry = self
                .table
                .slots
                .get(bucket)
                .expect("looked-up bucket must be occupied");
            return self.values[entry].clone();
        }
        self.set(key, default.clone());
        default
    }

    /// Returns an independent copy of this map. Keys and values are
    /// both cloned (Rust has no implicit shared-by-reference identity
    /// for an owned key the way some other languages do, so a shallow
    /// copy isn't a safe default).
    pub fn copy(&self) -> Self
    where
        K: Clone,
        V: Clone,
        S: Clone,
    {
        HopscotchMap {
            table: self.table.clone(),
            keys: self.keys.clone(),
            values: self.values.clone(),
            hashes: self.hashes.clone(),
            hash_builder: self.hash_builder.clone(),
        }
    }
}

impl<K: Clone, V: Clone, S: Clone> Clone for HopscotchMap<K, V, S> {
    fn clone(&self) -> Self {
        self.copy()
    }
}

impl<K: Hash + Eq, V: PartialEq, S: BuildHasher> PartialEq for HopscotchMap<K, V, S> {
    /// Two maps are equal when they hold the same size, the same set
    /// of keys, and matching values for every key. Storage order is
    /// not part of equality.
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter_items()
            .all(|(k, v)| other.get(k).map(|ov| ov == v).unwrap_or(false))
    }
}

impl<K: fmt::Debug, V: fmt::Debug, S> fmt::Debug for HopscotchMap<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter_items()).finish()
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> Index<&K> for HopscotchMap<K, V, S> {
    type Output = V;

    fn index(&self, key: &K) -> &V {
        self.get(key).expect("no entry found for key")
    }
}

impl<K: Hash + Eq, V, S: BuildHasher + Default> FromIterator<(K, V)> for HopscotchMap<K, V, S> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = HopscotchMap::with_hasher(S::default());
        for (k, v) in iter {
            map.set(k, v);
        }
        map
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> Extend<(K, V)> for HopscotchMap<K, V, S> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.set(k, v);
        }
    }
}

impl<K, V, S> IntoIterator for HopscotchMap<K, V, S> {
    type Item = (K, V);
    type IntoIter = std::iter::Zip<std::vec::IntoIter<K>, std::vec::IntoIter<V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.into_iter().zip(self.values.into_iter())
    }
}

impl<'a, K, V, S> IntoIterator for &'a HopscotchMap<K, V, S> {
    type Item = (&'a K, &'a V);
    type IntoIter = std::iter::Zip<std::slice::Iter<'a, K>, std::slice::Iter<'a, V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter().zip(self.values.iter())
    }
}

/// Builder for constructing a [`HopscotchMap`] from a known set of
/// entries. `build` is infallible (a hopscotch table accepts any key
/// set, so there is no failure mode to propagate).
pub struct HopscotchMapBuilder<K, V, S = RandomState> {
    map: HopscotchMap<K, V, S>,
}

impl<K: Hash + Eq, V> HopscotchMapBuilder<K, V, RandomState> {
    pub fn new() -> Self {
        Self {
            map: HopscotchMap::new(),
        }
    }
}

impl<K: Hash + Eq, V> Default for HopscotchMapBuilder<K, V, RandomState> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Hash + Eq, V, S: BuildHasher> HopscotchMapBuilder<K, V, S> {
    pub fn insert(mut self, key: K, value: V) -> Self {
        self.map.set(key, value);
        self
    }

    pub fn extend<I: IntoIterator<Item = (K, V)>>(mut self, iter: I) -> Self {
        for (k, v) in iter {
            self.map.set(k, v);
        }
        self
    }

    pub fn with_entries<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self
    where
        S: Default,
    {
        let mut map = HopscotchMap::with_hasher(S::default());
        for (k, v) in iter {
            map.set(k, v);
        }
        Self { map }
    }

    pub fn build(self) -> HopscotchMap<K, V, S> {
        self.map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trip() {
        let mut map: HopscotchMap<&str, i32> = HopscotchMap::new();
        map.set("a", 1);
        map.set("b", 2);
        assert_eq!(map.get(&"a"), Ok(&1));
        assert_eq!(map.get(&"b"), Ok(&2));
        assert_eq!(map.get(&"c"), Err(HopscotchError::MissingKey));
    }

    #[test]
    fn overwrite_keeps_len_and_updates_value() {
        let mut map: HopscotchMap<&str, i32> = HopscotchMap::new();
        map.set("a", 1);
        map.set("a", 2);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&"a"), Ok(&2));
    }

    #[test]
    fn remove_then_contains_is_false() {
        let mut map: HopscotchMap<&str, i32> = HopscotchMap::new();
        map.set("a", 1);
        map.remove(&"a").unwrap();
        assert!(!map.contains(&"a"));
        assert_eq!(map.len(), 0);
        assert!(matches!(map.remove(&"a"), Err(HopscotchError::MissingKey)));
    }

    #[test]
    fn bucket_zero_is_a_valid_hit() {
        // A key whose hash happens to land on bucket 0 must still be
        // found. Guards against treating bucket index 0 as falsy when
        // checking whether a lookup resolved to a bucket.
        struct ZeroHasher;
        impl Hasher for ZeroHasher {
            fn finish(&self) -> u64 {
                0
            }
            fn write(&mut self, _bytes: &[u8]) {}
        }

        #[derive(Default, Clone)]
        struct ZeroBuildHasher;
        impl BuildHasher for ZeroBuildHasher {
            type Hasher = ZeroHasher;
            fn build_hasher(&self) -> ZeroHasher {
                ZeroHasher
            }
        }

        let mut map: HopscotchMap<&str, i32, ZeroBuildHasher> =
            HopscotchMap::with_hasher(ZeroBuildHasher);
        map.set("zero", 42);
        assert_eq!(map.get(&"zero"), Ok(&42));
        assert!(map.contains(&"zero"));
    }

    #[test]
    fn insert_then_remove_many_empties_every_slot() {
        let mut map: HopscotchMap<i32, i32> = HopscotchMap::new();
        for i in 0..500 {
            map.set(i, i * 2);
        }
        assert_eq!(map.len(), 500);
        for i in 0..500 {
            assert_eq!(map.get(&i), Ok(&(i * 2)));
        }
        for i in 0..500 {
            map.remove(&i).unwrap();
        }
        assert_eq!(map.len(), 0);
        for i in 0..500 {
            assert!(!map.contains(&i));
        }
    }

    #[test]
    fn pop_any_drains_the_map() {
        let mut map: HopscotchMap<i32, i32> = HopscotchMap::new();
        for i in 0..20 {
            map.set(i, i);
        }
        let mut seen = Vec::new();
        while let Ok((k, v)) = map.pop_any() {
            assert_eq!(k, v);
            seen.push(k);
        }
        assert_eq!(seen.len(), 20);
        assert_eq!(map.pop_any(), Err(HopscotchError::Empty));
    }

    #[test]
    fn set_default_returns_existing_or_inserts() {
        let mut map: HopscotchMap<&str, i32> = HopscotchMap::new();
        assert_eq!(map.set_default("a", 1), 1);
        assert_eq!(map.set_default("a", 99), 1);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn pop_without_default_on_missing_key_errors() {
        let mut map: HopscotchMap<&str, i32> = HopscotchMap::new();
        assert_eq!(map.pop(&"missing", None), Err(HopscotchError::MissingKey));
        assert_eq!(map.pop(&"missing", Some(7)), Ok(7));
    }

    #[test]
    fn clear_resets_to_initial_shape() {
        let mut map: HopscotchMap<i32, i32> = HopscotchMap::new();
        for i in 0..100 {
            map.set(i, i);
        }
        map.clear();
        assert_eq!(map.len(), 0);
        assert_eq!(map.table.size, engine::INITIAL_SIZE);
        assert_eq!(map.table.nbhd_width(), engine::INITIAL_WIDTH);
    }

    #[test]
    fn copy_is_independent_deep_clone() {
        let mut map: HopscotchMap<&str, Vec<i32>> = HopscotchMap::new();
        map.set("a", vec![1, 2, 3]);
        let mut copy = map.copy();
        copy.set("a", vec![9]);
        assert_eq!(map.get(&"a").unwrap(), &vec![1, 2, 3]);
        assert_eq!(copy.get(&"a").unwrap(), &vec![9]);
    }

    #[test]
    fn equals_compares_contents_not_layout() {
        let mut a: HopscotchMap<i32, i32> = HopscotchMap::new();
        let mut b: HopscotchMap<i32, i32> = HopscotchMap::new();
        a.set(1, 10);
        a.set(2, 20);
        b.set(2, 20);
        b.set(1, 10);
        assert_eq!(a, b);
        b.set(2, 21);
        assert_ne!(a, b);
    }

    #[test]
    fn density_never_reaches_threshold_after_insert() {
        let mut map: HopscotchMap<i32, i32> = HopscotchMap::new();
        for i in 0..1000 {
            map.set(i, i);
            assert!((map.len() as f64) / (map.table.size as f64) < engine::MAX_DENSITY);
        }
    }

    #[test]
    fn from_iter_and_into_iter_round_trip() {
        let pairs = vec![(1, "a"), (2, "b"), (3, "c")];
        let map: HopscotchMap<i32, &str> = pairs.clone().into_iter().collect();
        assert_eq!(map.len(), 3);
        let mut collected: Vec<_> = map.into_iter().collect();
        collected.sort();
        let mut expected = pairs;
        expected.sort();
        assert_eq!(collected, expected);
    }

    #[test]
    fn index_panics_on_missing_key() {
        let map: HopscotchMap<&str, i32> = HopscotchMap::new();
        let result = std::panic::catch_unwind(|| &map[&"missing"]);
        assert!(result.is_err());
    }

    #[test]
    fn builder_pattern() {
        let map: HopscotchMap<&str, &str> = HopscotchMapBuilder::new()
            .insert("hello", "world")
            .insert("foo", "bar")
            .build();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&"hello"), Ok(&"world"));
    }
}
