//! Foundation types for kit.
//!
//! Every other kit crate that touches dynamically-typed data depends on
//! `kit-types`.
//!
//! # Key Types
//!
//! - [`TypedValue`]: closed set of value kinds a store may hold, with
//!   [`ListItem`] as the scalar element of its heterogeneous list
//! - [`FromValue`]: narrow, explicit coercion from a [`TypedValue`] to a
//!   concrete Rust type
//! - [`Slice`]: ordered vector wrapper with locate/unique-insert/pop helpers

pub mod coerce;
pub mod error;
pub mod slice;
pub mod value;

pub use coerce::FromValue;
pub use error::{TypeError, TypeResult};
pub use slice::Slice;
pub use value::{ListItem, TypedValue};
