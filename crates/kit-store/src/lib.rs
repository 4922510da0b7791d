//! Dynamically-typed key/value storage for kit.
//!
//! # Storage Types
//!
//! - [`Store`] -- unsynchronized map from a key to a [`TypedValue`], with
//!   typed loads, merge, and snapshot encode/decode
//! - [`SafeStore`] -- the same surface behind a reader/writer lock
//!
//! # Design Rules
//!
//! 1. Typed loads never log and never swallow: absence (`UndefinedValue`)
//!    and shape mismatch (`InvalidType`) go straight back to the caller.
//! 2. Coercion is explicit and narrow; see [`kit_types::FromValue`].
//! 3. A failed decode leaves the previous contents in place.
//! 4. A [`SafeStore`] never hands out a reference into its map.

pub mod codec;
pub mod error;
pub mod safe;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use kit_types::{FromValue, TypedValue};
pub use safe::SafeStore;
pub use store::Store;
