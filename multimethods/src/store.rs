//! Vector stores: mapping runtime type keys to dispatch vectors.
//!
//! The store is the only data structure on the dispatch path whose shape
//! depends on the key scheme, so it is a swappable backend. [`MapStore`]
//! accepts any key and is the default. [`DenseStore`] indexes a flat array
//! by the raw key value and pairs with [`KeyAllocator`](crate::KeyAllocator)
//! keys, trading generality for a bounds-checked array read.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::dispatch::DispatchVector;
use crate::rtti::TypeKey;

/// Backend mapping type keys to per-class dispatch vectors.
///
/// Populated once during compilation, read-only afterwards.
pub trait VptrStore: Default {
    fn store(&mut self, key: TypeKey, vector: Arc<DispatchVector>);
    fn lookup(&self, key: TypeKey) -> Option<&Arc<DispatchVector>>;
}

/// Hash-map store; works with any key scheme, including `TypeKey::of`
/// hashes.
#[derive(Debug, Default)]
pub struct MapStore {
    vectors: FxHashMap<TypeKey, Arc<DispatchVector>>,
}

impl VptrStore for MapStore {
    fn store(&mut self, key: TypeKey, vector: Arc<DispatchVector>) {
        self.vectors.insert(key, vector);
    }

    fn lookup(&self, key: TypeKey) -> Option<&Arc<DispatchVector>> {
        self.vectors.get(&key)
    }
}

/// Flat array store indexed by the raw key value.
///
/// Requires small sequential keys such as those from
/// [`KeyAllocator`](crate::KeyAllocator); the array grows to the largest
/// key stored.
#[derive(Debug, Default)]
pub struct DenseStore {
    vectors: Vec<Option<Arc<DispatchVector>>>,
}

impl VptrStore for DenseStore {
    fn store(&mut self, key: TypeKey, vector: Arc<DispatchVector>) {
        let index = key.as_raw() as usize;
        debug_assert!(index < 1 << 24, "dense store requires small sequential keys");
        if index >= self.vectors.len() {
            self.vectors.resize(index + 1, None);
        }
        self.vectors[index] = Some(vector);
    }

    fn lookup(&self, key: TypeKey) -> Option<&Arc<DispatchVector>> {
        self.vectors.get(key.as_raw() as usize)?.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class_graph::ClassId;
    use crate::dispatch::SlotEntry;

    fn vector(index: usize) -> Arc<DispatchVector> {
        Arc::new(DispatchVector::new(
            ClassId::from_index(index),
            Box::new([SlotEntry::NotApplicable]),
        ))
    }

    #[test]
    fn map_store_round_trips() {
        let mut store = MapStore::default();
        store.store(TypeKey::from_raw(42), vector(0));
        assert!(store.lookup(TypeKey::from_raw(42)).is_some());
        assert!(store.lookup(TypeKey::from_raw(7)).is_none());
    }

    #[test]
    fn dense_store_grows_to_the_largest_key() {
        let mut store = DenseStore::default();
        store.store(TypeKey::from_raw(0), vector(0));
        store.store(TypeKey::from_raw(5), vector(1));
        assert!(store.lookup(TypeKey::from_raw(0)).is_some());
        assert!(store.lookup(TypeKey::from_raw(5)).is_some());
        assert!(store.lookup(TypeKey::from_raw(3)).is_none());
        assert!(store.lookup(TypeKey::from_raw(100)).is_none());
    }
}
