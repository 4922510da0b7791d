use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use kit_types::{FromValue, TypedValue};

use crate::codec;
use crate::error::{StoreError, StoreResult};

/// Unsynchronized map from a key to a [`TypedValue`].
///
/// Keys default to `String` but any `Eq + Hash` type works. For concurrent
/// use wrap it in a [`SafeStore`](crate::SafeStore).
#[derive(Clone, Debug, PartialEq)]
pub struct Store<K: Eq + Hash = String> {
    values: HashMap<K, TypedValue>,
}

impl<K: Eq + Hash> Store<K> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Insert or overwrite.
    pub fn store(&mut self, key: K, value: impl Into<TypedValue>) {
        self.values.insert(key, value.into());
    }

    /// Remove a key. Absent keys are a no-op.
    pub fn delete<Q>(&mut self, key: &Q) -> Option<TypedValue>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.values.remove(key)
    }

    /// Raw lookup, no coercion.
    pub fn load<Q>(&self, key: &Q) -> Option<&TypedValue>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.values.get(key)
    }

    /// Typed lookup.
    ///
    /// A missing key or an explicit null yields `T::default()` when
    /// `nullable` is set and [`StoreError::UndefinedValue`] otherwise. A
    /// value `T` does not accept yields [`StoreError::InvalidType`].
    pub fn load_as<T, Q>(&self, key: &Q, nullable: bool) -> StoreResult<T>
    where
        T: FromValue,
        K: Borrow<Q>,
        Q: Hash + Eq + Display + ?Sized,
    {
        match self.values.get(key) {
            None | Some(TypedValue::Absent) if nullable => Ok(T::default()),
            None | Some(TypedValue::Absent) => Err(StoreError::UndefinedValue {
                key: key.to_string(),
            }),
            Some(value) => T::from_value(value).ok_or_else(|| StoreError::InvalidType {
                key: key.to_string(),
                expected: T::TARGET,
                found: value.kind(),
            }),
        }
    }

    pub fn load_string<Q>(&self, key: &Q, nullable: bool) -> StoreResult<String>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Display + ?Sized,
    {
        self.load_as(key, nullable)
    }

    /// Accepts an `Int`, or a `Float` truncated toward zero.
    pub fn load_int<Q>(&self, key: &Q, nullable: bool) -> StoreResult<i64>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Display + ?Sized,
    {
        self.load_as(key, nullable)
    }

    /// Accepts a `Uint`, or a non-negative `Float` truncated toward zero.
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

    /// Accepts a `StringList` or a `List` of strings; one bad element fails
    /// the whole load.
    pub fn load_string_list<Q>(&self, key: &Q, nullable: bool) -> StoreResult<Vec<String>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Display + ?Sized,
    {
        self.load_as(key, nullable)
    }

    /// Accepts a `UintList` or a `List` whose elements each load as a uint.
    pub fn load_uint_list<Q>(&self, key: &Q, nullable: bool) -> StoreResult<Vec<u64>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + Display + ?Sized,
    {
        self.load_as(key, nullable)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.values.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &TypedValue)> {
        self.values.iter()
    }

    /// Drop every entry.
    pub fn reset(&mut self) {
        self.values = HashMap::new();
    }
}

impl<K: Eq + Hash + Clone> Store<K> {
    /// Overwrite this store's value for every key in `other`.
    pub fn merge(&mut self, other: &Store<K>) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }
}

impl<K: Eq + Hash + Serialize> Store<K> {
    /// Serialize every entry into a text-safe snapshot.
    pub fn encode(&self) -> StoreResult<Vec<u8>> {
        let out = codec::encode_map(&self.values)?;
        debug!(entries = self.values.len(), bytes = out.len(), "store encoded");
        Ok(out)
    }
}

impl<K: Eq + Hash + DeserializeOwned> Store<K> {
    /// Build a store from a snapshot.
    pub fn from_snapshot(snapshot: &[u8]) -> StoreResult<Self> {
        let values = codec::decode_map(snapshot)?;
        debug!(entries = values.len(), bytes = snapshot.len(), "store decoded");
        Ok(Self { values })
    }

    /// Replace every entry with the contents of a snapshot.
    ///
    /// On error the current contents are kept.
    pub fn decode(&mut self, snapshot: &[u8]) -> StoreResult<()> {
        *self = Self::from_snapshot(snapshot)?;
        Ok(())
    }
}

impl Store<String> {
    /// Ingest a decoded JSON object; see [`TypedValue::from_json`].
    pub fn from_json_object(object: serde_json::Map<String, serde_json::Value>) -> StoreResult<Self> {
        let mut store = Self::new();
        for (key, value) in object {
            store.store(key, TypedValue::from_json(value)?);
        }
        Ok(store)
    }

    /// Render as a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl<K: Eq + Hash> Default for Store<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash> From<HashMap<K, TypedValue>> for Store<K> {
    fn from(values: HashMap<K, TypedValue>) -> Self {
        Self { values }
    }
}

impl<K: Eq + Hash, V: Into<TypedValue>> FromIterator<(K, V)> for Store<K> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k, v.into())).collect(),
        }
    }
}
