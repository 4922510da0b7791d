use std::borrow::Borrow;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use kit_types::{FromValue, TypedValue};

use crate::error::StoreResult;
use crate::store::Store;

/// Thread-safe wrapper around a [`Store`].
///
/// Loads and `encode` take the shared lock; `store`, `delete`, `merge`,
/// `decode` and `reset` take the exclusive lock. Every guard lives only for
/// the single map access it protects, and no method calls another locking
/// method while holding a guard. Values leave the wrapper as clones; no
/// reference into the map escapes.
pub struct SafeStore<K: Eq + Hash = String> {
    inner: RwLock<Store<K>>,
}

impl<K: Eq + Hash> SafeStore<K> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Store::new()),
        }
    }

    // A panicking reader or writer cannot leave the map half-updated: every
    // mutation below is a single map call. Poisoning is therefore ignored.
    fn read(&self) -> RwLockReadGuard<'_, Store<K>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Store<K>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or overwrite.
    pub fn store(&self, key: K, value: impl Into<TypedValue>) {
        let value = value.into();
        self.write().store(key, value);
    }

    /// Remove a key. Absent keys are a no-op.
    pub fn delete<Q>(&self, key: &Q) -> Option<TypedValue>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.write().delete(key)
    }

    /// Raw lookup, returning a copy of the value.
    pub fn load<Q>(&self, key: &Q) -> Option<TypedValue>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.read().load(key).cloned()
    }

    /// See [`Store::load_as`].
    pub fn load_as<T, Q>(&self, key: &Q, nullable: bool) -> StoreResult<T>
    where
        T: FromValue,
        K: Borrow<Q>,
        Q: Hash + Eq + Display + ?Sized,
    {
        self.read().load_as(key, nullable)
    }

    pub fn load_string<Q>(&self, key: &Q, nullable: bool) -> StoreResult<String>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Display + ?Sized,
    {
        self.load_as(key, nullable)
    }

    pub fn load_int<Q>(&self, key: &Q, nullable: bool) -> StoreResult<i64>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Display + ?Sized,
    {
        self.load_as(key, nullable)
    }

    pub fn load_uint<Q>(&self, key: &Q, nullable: bool) -> StoreResult<u64>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Display + ?Sized,
    {
        self.load_as(key, nullable)
    }

    pub fn load_bool<Q>(&self, key: &Q, nullable: bool) -> StoreResult<bool>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Display + ?Sized,
    {
        self.load_as(key, nullable)
    }

    pub fn load_string_list<Q>(&self, key: &Q, nullable: bool) -> StoreResult<Vec<String>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Display + ?Sized,
    {
        self.load_as(key, nullable)
    }

    pub fn load_uint_list<Q>(&self, key: &Q, nullable: bool) -> StoreResult<Vec<u64>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Display + ?Sized,
    {
        self.load_as(key, nullable)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Atomically discard every entry.
    pub fn reset(&self) {
        let dropped = std::mem::take(&mut *self.write());
        debug!(entries = dropped.len(), "safe store reset");
    }
}

impl<K: Eq + Hash + Clone> SafeStore<K> {
    /// Owned copy of the current contents.
    pub fn snapshot(&self) -> Store<K> {
        self.read().clone()
    }

    /// Merge `other` under a single exclusive lock.
    pub fn merge(&self, other: &Store<K>) {
        self.write().merge(other);
    }

    /// Merge another safe store's contents.
    ///
    /// `other` is copied under its shared lock, which is released before
    /// this store's exclusive lock is taken, so `a.merge_from(&a)` is safe.
    pub fn merge_from(&self, other: &SafeStore<K>) {
        let copy = other.snapshot();
        self.merge(&copy);
    }
}

impl<K: Eq + Hash + Serialize> SafeStore<K> {
    /// See [`Store::encode`].
    pub fn encode(&self) -> StoreResult<Vec<u8>> {
        self.read().encode()
    }
}

impl<K: Eq + Hash + DeserializeOwned> SafeStore<K> {
    /// Replace the contents from a snapshot.
    ///
    /// The snapshot is parsed before the lock is taken; on error nothing
    /// changes.
    pub fn decode(&self, snapshot: &[u8]) -> StoreResult<()> {
        let decoded = Store::from_snapshot(snapshot)?;
        *self.write() = decoded;
        Ok(())
    }
}

impl<K: Eq + Hash> Default for SafeStore<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash> From<Store<K>> for SafeStore<K> {
    fn from(store: Store<K>) -> Self {
        Self {
            inner: RwLock::new(store),
        }
    }
}

impl<K: Eq + Hash> std::fmt::Debug for SafeStore<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("SafeStore")
            .field("entry_count", &count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn store_load_delete() {
        let store = SafeStore::new();
        store.store("k".to_string(), "v");
        assert_eq!(store.load("k"), Some(TypedValue::from("v")));
        assert_eq!(store.load_string("k", false).unwrap(), "v");

        store.delete("k");
        store.delete("k");
        assert!(store.load("k").is_none());
        assert!(store.load_string("k", false).unwrap_err().is_undefined());
        assert_eq!(store.load_string("k", true).unwrap(), "");
    }

    #[test]
    fn reset_is_visible_to_readers() {
        let store = SafeStore::new();
        store.store("a".to_string(), 1u64);
        store.store("b".to_string(), 2u64);
        store.reset();
        assert!(store.is_empty());
        assert!(store.load("a").is_none());
    }

    #[test]
    fn merge_and_merge_from_self() {
        let store = SafeStore::new();
        store.store("x".to_string(), 1u64);

        let mut other = Store::new();
        other.store("x".to_string(), 2u64);
        other.store("y".to_string(), 3u64);
        store.merge(&other);
        assert_eq!(store.load_uint("x", false).unwrap(), 2);
        assert_eq!(store.load_uint("y", false).unwrap(), 3);

        // Must not deadlock.
        store.merge_from(&store);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn decode_failure_leaves_contents() {
        let store = SafeStore::new();
        store.store("keep".to_string(), true);
        assert!(store.decode(b"???").unwrap_err().is_decode());
        assert!(store.load_bool("keep", false).unwrap());
    }

    #[test]
    fn encode_decode_between_instances() {
        let source = SafeStore::new();
        source.store("ids".to_string(), vec![1u64, 2]);
        source.store("neg".to_string(), -5i64);

        let target: SafeStore = SafeStore::new();
        target.store("gone".to_string(), "x");
        target.decode(&source.encode().unwrap()).unwrap();

        assert_eq!(target.snapshot(), source.snapshot());
        assert!(target.load("gone").is_none());
    }

    #[test]
    fn concurrent_writers_and_readers() {
        let store = Arc::new(SafeStore::new());
        let mut handles = Vec::new();

        for t in 0..8u64 {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for i in 0..100u64 {
                    let key = format!("{t}-{i}");
                    store.store(key.clone(), i);
                    assert_eq!(store.load_uint(&key, false).unwrap(), i);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 800);
    }

    #[test]
    fn readers_never_see_partial_merge() {
        let store = Arc::new(SafeStore::new());
        let batch: Store = (0..64).map(|i| (format!("k{i}"), true)).collect();

        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..50 {
                    store.merge(&batch);
                    store.reset();
                }
            })
        };

        for _ in 0..200 {
            let len = store.len();
            assert!(len == 0 || len == 64, "observed partial merge: {len}");
        }
        writer.join().unwrap();
    }
}
