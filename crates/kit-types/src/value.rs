use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};

/// Dynamically-typed payload held by a store.
///
/// The canonical kinds are `String`, `Int`, `Uint`, `Bool`, `StringList`,
/// `UintList` and `Absent`. `Float` and `List` exist because values often
/// arrive from loosely-typed decoders (JSON numbers are always floats, JSON
/// arrays are heterogeneous); typed loads coerce them on the way out.
///
/// `Absent` is an explicit null and is distinct from a key that is not
/// present at all.
///
/// `List` holds [`ListItem`]s, which cannot themselves be lists, so every
/// value is at most two levels deep.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TypedValue {
    String(String),
    Int(i64),
    Uint(u64),
    Bool(bool),
    StringList(Vec<String>),
    UintList(Vec<u64>),
    Float(f64),
    List(Vec<ListItem>),
    Absent,
}

/// Scalar element of a [`TypedValue::List`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ListItem {
    String(String),
    Int(i64),
    Uint(u64),
    Bool(bool),
    Float(f64),
    Absent,
}

impl ListItem {
    /// Convert one element of a decoded JSON array.
    ///
    /// Arrays and objects inside arrays are rejected.
    pub fn from_json(value: serde_json::Value) -> TypeResult<Self> {
        use serde_json::Value;

        Ok(match value {
            Value::Null => Self::Absent,
            Value::Bool(b) => Self::Bool(b),
            Value::String(s) => Self::String(s),
            Value::Number(n) => Self::Float(json_number(&n)?),
            Value::Array(_) => return Err(TypeError::UnsupportedJson("nested array")),
            Value::Object(_) => return Err(TypeError::UnsupportedJson("nested object")),
        })
    }

    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;

        match self {
            Self::String(s) => Value::from(s.as_str()),
            Self::Int(i) => Value::from(*i),
            Self::Uint(u) => Value::from(*u),
            Self::Bool(b) => Value::from(*b),
            Self::Float(f) => float_to_json(*f),
            Self::Absent => Value::Null,
        }
    }
}

fn json_number(n: &serde_json::Number) -> TypeResult<f64> {
    n.as_f64()
        .ok_or(TypeError::UnsupportedJson("number out of range"))
}

/// Non-finite floats have no JSON form and render as `null`.
fn float_to_json(f: f64) -> serde_json::Value {
    serde_json::Number::from_f64(f)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

impl TypedValue {
    /// Short name of the active variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Int(_) => "int",
            Self::Uint(_) => "uint",
            Self::Bool(_) => "bool",
            Self::StringList(_) => "string list",
            Self::UintList(_) => "uint list",
            Self::Float(_) => "float",
            Self::List(_) => "list",
            Self::Absent => "absent",
        }
    }

    /// Returns `true` for the explicit null.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Convert a decoded JSON value.
    ///
    /// Numbers become [`TypedValue::Float`], arrays become
    /// [`TypedValue::List`] and `null` becomes [`TypedValue::Absent`].
    /// Objects, and arrays nested in arrays, have no counterpart and are
    /// rejected.
    pub fn from_json(value: serde_json::Value) -> TypeResult<Self> {
        use serde_json::Value;

        Ok(match value {
            Value::Null => Self::Absent,
            Value::Bool(b) => Self::Bool(b),
            Value::String(s) => Self::String(s),
            Value::Number(n) => Self::Float(json_number(&n)?),
            Value::Array(items) => Self::List(
                items
                    .into_iter()
                    .map(ListItem::from_json)
                    .collect::<TypeResult<Vec<_>>>()?,
            ),
            Value::Object(_) => return Err(TypeError::UnsupportedJson("nested object")),
        })
    }

    /// Render as JSON. Non-finite floats render as `null`.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;

        match self {
            Self::String(s) => Value::from(s.as_str()),
            Self::Int(i) => Value::from(*i),
            Self::Uint(u) => Value::from(*u),
            Self::Bool(b) => Value::from(*b),
            Self::StringList(items) => Value::from(items.clone()),
            Self::UintList(items) => Value::from(items.clone()),
            Self::Float(f) => float_to_json(*f),
            Self::List(items) => Value::Array(items.iter().map(ListItem::to_json).collect()),
            Self::Absent => Value::Null,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl From<String> for TypedValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for TypedValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<i64> for TypedValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for TypedValue {
    fn from(value: u64) -> Self {
        Self::Uint(value)
    }
}

impl From<bool> for TypedValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for TypedValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<Vec<String>> for TypedValue {
    fn from(value: Vec<String>) -> Self {
        Self::StringList(value)
    }
}

impl From<Vec<u64>> for TypedValue {
    fn from(value: Vec<u64>) -> Self {
        Self::UintList(value)
    }
}

impl<T: Into<TypedValue>> From<Option<T>> for TypedValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Absent, Into::into)
    }
}

impl From<&str> for ListItem {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for ListItem {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<u64> for ListItem {
    fn from(value: u64) -> Self {
        Self::Uint(value)
    }
}

impl From<f64> for ListItem {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl TryFrom<serde_json::Value> for TypedValue {
    type Error = TypeError;

    fn try_from(value: serde_json::Value) -> TypeResult<Self> {
        Self::from_json(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_numbers_become_floats() {
        assert_eq!(TypedValue::from_json(json!(42)).unwrap(), TypedValue::Float(42.0));
        assert_eq!(TypedValue::from_json(json!(1.5)).unwrap(), TypedValue::Float(1.5));
    }

    #[test]
    fn json_arrays_are_heterogeneous_lists() {
        let value = TypedValue::from_json(json!(["a", 1, null])).unwrap();
        assert_eq!(
            value,
            TypedValue::List(vec![
                ListItem::from("a"),
                ListItem::Float(1.0),
                ListItem::Absent,
            ])
        );
    }

    #[test]
    fn json_nested_arrays_rejected() {
        let err = TypedValue::from_json(json!([1, [2]])).unwrap_err();
        assert_eq!(err, TypeError::UnsupportedJson("nested array"));

        let err = TypedValue::from_json(json!([{"a": 1}])).unwrap_err();
        assert_eq!(err, TypeError::UnsupportedJson("nested object"));
    }

    #[test]
    fn list_renders_as_json_array() {
        let value = TypedValue::List(vec![ListItem::Uint(3), ListItem::Float(f64::NAN)]);
        assert_eq!(value.to_json(), json!([3, null]));
    }

    #[test]
    fn json_null_is_absent() {
        assert!(TypedValue::from_json(json!(null)).unwrap().is_absent());
    }

    #[test]
    fn json_objects_rejected() {
        let err = TypedValue::from_json(json!({"nested": true})).unwrap_err();
        assert_eq!(err, TypeError::UnsupportedJson("nested object"));
    }

    #[test]
    fn to_json_preserves_integers() {
        assert_eq!(TypedValue::Uint(u64::MAX).to_json(), json!(u64::MAX));
        assert_eq!(TypedValue::Int(-7).to_json(), json!(-7));
        assert_eq!(TypedValue::UintList(vec![1, 2]).to_json(), json!([1, 2]));
    }

    #[test]
    fn option_conversion_maps_none_to_absent() {
        assert_eq!(TypedValue::from(None::<bool>), TypedValue::Absent);
        assert_eq!(TypedValue::from(Some(true)), TypedValue::Bool(true));
    }

    #[test]
    fn kind_names() {
        assert_eq!(TypedValue::from("x").kind(), "string");
        assert_eq!(TypedValue::UintList(vec![]).kind(), "uint list");
        assert_eq!(TypedValue::Absent.kind(), "absent");
    }
}
