//! Snapshot codec.
//!
//! Format:
//! ```text
//! base64-standard( bincode( HashMap<K, TypedValue> ) )
//! ```
//! Entry order in the payload is unspecified. Integers are stored
//! bit-exact. Surrounding ASCII whitespace is ignored on decode.

use std::collections::HashMap;
use std::hash::Hash;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;

use kit_types::TypedValue;

use crate::error::{StoreError, StoreResult};

/// Upper bound on a decoded payload (64 MiB).
pub const MAX_SNAPSHOT_BYTES: u64 = 64 * 1024 * 1024;

fn options() -> impl Options {
    bincode::DefaultOptions::new().with_limit(MAX_SNAPSHOT_BYTES)
}

/// Serialize a map into a text-safe snapshot.
pub fn encode_map<K>(map: &HashMap<K, TypedValue>) -> StoreResult<Vec<u8>>
where
    K: Serialize + Eq + Hash,
{
    let payload = options()
        .serialize(map)
        .map_err(|e| StoreError::Encode(e.to_string()))?;
    Ok(STANDARD.encode(payload).into_bytes())
}

/// Parse a snapshot produced by [`encode_map`].
pub fn decode_map<K>(snapshot: &[u8]) -> StoreResult<HashMap<K, TypedValue>>
where
    K: DeserializeOwned + Eq + Hash,
{
    let payload = STANDARD
        .decode(snapshot.trim_ascii())
        .map_err(|e| StoreError::Decode(format!("invalid base64: {e}")))?;
    options()
        .deserialize(&payload)
        .map_err(|e| StoreError::Decode(format!("invalid payload: {e}")))
}
