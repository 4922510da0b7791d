use crate::value::{ListItem, TypedValue};

/// Two to the 63rd power; the first float outside the `i64` range.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;
/// Two to the 64th power; the first float outside the `u64` range.
const U64_BOUND: f64 = 18_446_744_073_709_551_616.0;

/// Explicit conversion from a [`TypedValue`] to a concrete type.
///
/// Each implementation lists the exact source variants it accepts. Anything
/// else yields `None`, which callers surface as an invalid-type error.
/// `Absent` is never handled here; nullability is the caller's policy.
pub trait FromValue: Sized + Default {
    /// Name of the target type, used in error messages.
    const TARGET: &'static str;

    fn from_value(value: &TypedValue) -> Option<Self>;
}

impl FromValue for String {
    const TARGET: &'static str = "string";

    fn from_value(value: &TypedValue) -> Option<Self> {
        match value {
            TypedValue::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromValue for bool {
    const TARGET: &'static str = "bool";

    fn from_value(value: &TypedValue) -> Option<Self> {
        match value {
            TypedValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromValue for i64 {
    const TARGET: &'static str = "int";

    fn from_value(value: &TypedValue) -> Option<Self> {
        match value {
            TypedValue::Int(i) => Some(*i),
            TypedValue::Float(f) => float_to_i64(*f),
            _ => None,
        }
    }
}

impl FromValue for u64 {
    const TARGET: &'static str = "uint";

    fn from_value(value: &TypedValue) -> Option<Self> {
        match value {
            TypedValue::Uint(u) => Some(*u),
            TypedValue::Float(f) => float_to_u64(*f),
            _ => None,
        }
    }
}

impl FromValue for Vec<String> {
    const TARGET: &'static str = "string list";

    fn from_value(value: &TypedValue) -> Option<Self> {
        match value {
            TypedValue::StringList(items) => Some(items.clone()),
            TypedValue::List(items) => items
                .iter()
                .map(|item| match item {
                    ListItem::String(s) => Some(s.clone()),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }
}

impl FromValue for Vec<u64> {
    const TARGET: &'static str = "uint list";

    fn from_value(value: &TypedValue) -> Option<Self> {
        match value {
            TypedValue::UintList(items) => Some(items.clone()),
            TypedValue::List(items) => items
                .iter()
                .map(|item| match item {
                    ListItem::Uint(u) => Some(*u),
                    ListItem::Float(f) => float_to_u64(*f),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }
}

/// Truncate toward zero; rejects non-finite and out-of-range values.
fn float_to_i64(f: f64) -> Option<i64> {
    let t = f.trunc();
    if t.is_finite() && (-I64_BOUND..I64_BOUND).contains(&t) {
        Some(t as i64)
    } else {
        None
    }
}

/// Truncate toward zero; rejects negative, non-finite and out-of-range values.
fn float_to_u64(f: f64) -> Option<u64> {
    let t = f.trunc();
    if t.is_finite() && (0.0..U64_BOUND).contains(&t) {
        Some(t as u64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_accepts_native_and_float() {
        assert_eq!(i64::from_value(&TypedValue::Int(-3)), Some(-3));
        assert_eq!(i64::from_value(&TypedValue::Float(42.0)), Some(42));
        assert_eq!(i64::from_value(&TypedValue::Float(-2.9)), Some(-2));
    }

    #[test]
    fn int_rejects_other_variants() {
        assert_eq!(i64::from_value(&TypedValue::from("42")), None);
        assert_eq!(i64::from_value(&TypedValue::Uint(1)), None);
        assert_eq!(i64::from_value(&TypedValue::Float(f64::NAN)), None);
        assert_eq!(i64::from_value(&TypedValue::Float(1e19)), None);
    }

    #[test]
    fn uint_rejects_negative_floats() {
        assert_eq!(u64::from_value(&TypedValue::Float(7.9)), Some(7));
        assert_eq!(u64::from_value(&TypedValue::Float(-1.0)), None);
        assert_eq!(u64::from_value(&TypedValue::Float(f64::INFINITY)), None);
    }

    #[test]
    fn bool_and_string_are_strict() {
        assert_eq!(bool::from_value(&TypedValue::Bool(true)), Some(true));
        assert_eq!(bool::from_value(&TypedValue::Uint(1)), None);
        assert_eq!(String::from_value(&TypedValue::Bool(false)), None);
    }

    #[test]
    fn heterogeneous_string_list() {
        let ok = TypedValue::List(vec!["a".into(), "b".into()]);
        assert_eq!(
            Vec::<String>::from_value(&ok),
            Some(vec!["a".to_string(), "b".to_string()])
        );

        let bad = TypedValue::List(vec!["a".into(), ListItem::Float(1.0)]);
        assert_eq!(Vec::<String>::from_value(&bad), None);
    }

    #[test]
    fn heterogeneous_uint_list_converts_floats() {
        let ok = TypedValue::List(vec![ListItem::Float(1.0), ListItem::Uint(2)]);
        assert_eq!(Vec::<u64>::from_value(&ok), Some(vec![1, 2]));

        let bad = TypedValue::List(vec![ListItem::Float(1.0), "x".into()]);
        assert_eq!(Vec::<u64>::from_value(&bad), None);
    }

    #[test]
    fn native_lists_pass_through() {
        assert_eq!(
            Vec::<u64>::from_value(&TypedValue::UintList(vec![3, 4])),
            Some(vec![3, 4])
        );
        assert_eq!(Vec::<u64>::from_value(&TypedValue::StringList(vec![])), None);
    }
}
