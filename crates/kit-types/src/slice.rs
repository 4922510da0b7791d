use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;
use std::ops::Deref;
use std::str::FromStr;

use crate::error::{TypeError, TypeResult};

/// Ordered vector wrapper with set-like insertion helpers.
///
/// Element order is whatever the caller built; only [`Slice::sort`]
/// reorders.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Slice<T>(Vec<T>);

impl<T> Slice<T> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn into_inner(self) -> Vec<T> {
        self.0
    }

    /// Append values in order, duplicates allowed.
    pub fn append(&mut self, values: impl IntoIterator<Item = T>) {
        self.0.extend(values);
    }

    /// Prepend values one at a time, so the last value ends up first.
    pub fn prepend(&mut self, values: impl IntoIterator<Item = T>) {
        for value in values {
            self.0.insert(0, value);
        }
    }

    /// Remove the element at `index`.
    ///
    /// Returns `None` if `index` is out of bounds.
    pub fn pop(&mut self, index: usize) -> Option<T> {
        (index < self.0.len()).then(|| self.0.remove(index))
    }
}

impl<T: PartialEq> Slice<T> {
    /// Index of the first element equal to `value`.
    pub fn locate(&self, value: &T) -> Option<usize> {
        self.0.iter().position(|item| item == value)
    }
}

impl<T: Ord> Slice<T> {
    pub fn sort(&mut self) {
        self.0.sort();
    }
}

impl<T: Eq + Hash + Clone> Slice<T> {
    /// Set of the distinct elements.
    pub fn to_set(&self) -> HashSet<T> {
        self.0.iter().cloned().collect()
    }

    /// Append only values not already present. Returns what was added.
    pub fn unique_append(&mut self, values: impl IntoIterator<Item = T>) -> Vec<T> {
        let mut seen = self.to_set();
        let mut added = Vec::new();
        for value in values {
            if seen.insert(value.clone()) {
                self.0.push(value.clone());
                added.push(value);
            }
        }
        added
    }

    /// Prepend only values not already present. Returns what was added.
    pub fn unique_prepend(&mut self, values: impl IntoIterator<Item = T>) -> Vec<T> {
        let mut seen = self.to_set();
        let mut added = Vec::new();
        for value in values {
            if seen.insert(value.clone()) {
                self.0.insert(0, value.clone());
                added.push(value);
            }
        }
        added
    }

    /// Remove every occurrence of each of `values`, keeping order.
    pub fn pop_values(&mut self, values: impl IntoIterator<Item = T>) {
        let doomed: HashSet<T> = values.into_iter().collect();
        if doomed.is_empty() {
            return;
        }
        self.0.retain(|item| !doomed.contains(item));
    }
}

impl<T: fmt::Display> Slice<T> {
    pub fn to_string_slice(&self) -> Slice<String> {
        self.0.iter().map(ToString::to_string).collect()
    }
}

impl Slice<String> {
    /// Parse every element, failing on the first one that does not parse.
    pub fn parse_into<U>(&self) -> TypeResult<Slice<U>>
    where
        U: FromStr,
        U::Err: fmt::Display,
    {
        self.0
            .iter()
            .enumerate()
            .map(|(index, value)| {
                value.parse::<U>().map_err(|e| TypeError::Parse {
                    index,
                    value: value.clone(),
                    reason: e.to_string(),
                })
            })
            .collect()
    }
}

impl<T> Deref for Slice<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.0
    }
}

impl<T> From<Vec<T>> for Slice<T> {
    fn from(value: Vec<T>) -> Self {
        Self(value)
    }
}

impl<T> FromIterator<T> for Slice<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<T> IntoIterator for Slice<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Renders as `[a,b,c]`; an empty slice renders as the empty string.
impl<T: fmt::Display> fmt::Display for Slice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some((first, rest)) = self.0.split_first() else {
            return Ok(());
        };
        write!(f, "[{first}")?;
        for item in rest {
            write!(f, ",{item}")?;
        }
        write!(f, "]")
    }
}
