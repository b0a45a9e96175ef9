//! Session-scoped parameter/capability store
//!
//! [`FeatureStore`] is an explicit context object passed by reference through
//! the pipeline. Every session-wide singleton — the capability descriptor,
//! the defaults registry, platform buffers built during allocation — lives
//! here, keyed by type. There are no ambient globals; the store's lifetime
//! is the session's lifetime.
//!
//! # Concurrency
//!
//! The store is written only during the single-threaded query stage and is
//! read-only for the remainder of the session. Writers and readers are
//! temporally disjoint by contract, so no locking is involved.

use std::any::{Any, TypeId};
use std::collections::HashMap;

/// Type-keyed singleton storage for one encode session
#[derive(Default)]
pub struct FeatureStore {
    slots: HashMap<TypeId, Box<dyn Any>>,
}

impl FeatureStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the singleton of type `T`, constructing it with default values on
    /// first access
    ///
    /// Subsequent calls return the same instance; no two callers can end up
    /// with independent copies of the same `T`.
    pub fn get_or_construct<T: Default + 'static>(&mut self) -> &mut T {
        self.slots
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::default()))
            .downcast_mut::<T>()
            .expect("store slot type matches its TypeId key")
    }

    /// Insert (or replace) the singleton of type `T`
    pub fn insert<T: 'static>(&mut self, value: T) {
        self.slots.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Read the singleton of type `T`, if constructed
    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.slots
            .get(&TypeId::of::<T>())
            .and_then(|slot| slot.downcast_ref::<T>())
    }

    /// Mutable access to the singleton of type `T`, if constructed
    pub fn get_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.slots
            .get_mut(&TypeId::of::<T>())
            .and_then(|slot| slot.downcast_mut::<T>())
    }

    /// Whether a singleton of type `T` has been constructed
    pub fn contains<T: 'static>(&self) -> bool {
        self.slots.contains_key(&TypeId::of::<T>())
    }
}

impl std::fmt::Debug for FeatureStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureStore")
            .field("slots", &self.slots.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter(u32);

    #[test]
    fn get_or_construct_returns_same_instance() {
        let mut store = FeatureStore::new();
        store.get_or_construct::<Counter>().0 += 1;
        store.get_or_construct::<Counter>().0 += 1;
        assert_eq!(store.get::<Counter>().unwrap().0, 2);
    }

    #[test]
    fn get_before_construction_is_none() {
        let store = FeatureStore::new();
        assert!(store.get::<Counter>().is_none());
        assert!(!store.contains::<Counter>());
    }

    #[test]
    fn insert_replaces_existing() {
        let mut store = FeatureStore::new();
        store.get_or_construct::<Counter>().0 = 7;
        store.insert(Counter(42));
        assert_eq!(store.get::<Counter>().unwrap().0, 42);
    }
}
