//! # Fields Module
//!
//! Key/value multi-map used for request parameters, cookies, metadata and
//! uploaded files.
//!
//! A key holds either a single value or an ordered list of values (repeated
//! query parameters, multi-selects). Nothing is coerced on write; the read
//! accessors ([`FieldContainer::get_list`], [`FieldContainer::first`], ...)
//! are the only place where a scalar is viewed as a list or vice versa.
//!
//! ```rust
//! use dynform::fields::FieldContainer;
//!
//! let fields: FieldContainer = [("name", "Ada")].into_iter().collect();
//! assert_eq!(fields.get_list("name"), vec!["Ada"]);
//! assert!(fields.get_list("missing").is_empty());
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A stored field value: one string or an ordered list of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Single(String),
    List(Vec<String>),
}

impl FieldValue {
    /// The scalar value, if this is not list-shaped
    #[must_use]
    pub fn as_single(&self) -> Option<&str> {
        match self {
            FieldValue::Single(s) => Some(s),
            FieldValue::List(_) => None,
        }
    }

    /// The list value, if this is list-shaped
    #[must_use]
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::Single(_) => None,
            FieldValue::List(items) => Some(items),
        }
    }

    #[must_use]
    pub fn is_list(&self) -> bool {
        matches!(self, FieldValue::List(_))
    }

    /// True for an empty scalar or an empty list.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Single(s) => s.is_empty(),
            FieldValue::List(items) => items.is_empty(),
        }
    }

    fn values(&self) -> Vec<&str> {
        match self {
            FieldValue::Single(s) if s.is_empty() => Vec::new(),
            FieldValue::Single(s) => vec![s.as_str()],
            FieldValue::List(items) => items.iter().map(String::as_str).collect(),
        }
    }
}

impl Default for FieldValue {
    fn default() -> Self {
        FieldValue::Single(String::new())
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Single(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Single(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(values: Vec<String>) -> Self {
        FieldValue::List(values)
    }
}

impl From<Vec<&str>> for FieldValue {
    fn from(values: Vec<&str>) -> Self {
        FieldValue::List(values.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for FieldValue {
    fn from(values: [&str; N]) -> Self {
        FieldValue::List(values.iter().map(|v| v.to_string()).collect())
    }
}

/// Multi-map of request fields.
///
/// Keys iterate in sorted order, which keeps [`FieldContainer::query_string`]
/// and serialized output deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldContainer {
    entries: BTreeMap<String, FieldValue>,
}

impl FieldContainer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value verbatim, returning whatever was there before.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Option<FieldValue> {
        self.entries.insert(key.into(), value.into())
    }

    /// Add one more value under `key`.
    ///
    /// The first value is stored as a scalar; a second one turns the entry
    /// into a list. This is how repeated query parameters are collected.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        match self.entries.entry(key.into()) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(FieldValue::Single(value));
            }
            std::collections::btree_map::Entry::Occupied(mut slot) => {
                let current = slot.get_mut();
                match current {
                    FieldValue::Single(existing) => {
                        let existing = std::mem::take(existing);
                        *current = FieldValue::List(vec![existing, value]);
                    }
                    FieldValue::List(items) => items.push(value),
                }
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.entries.remove(key)
    }

    /// Copy every entry of `other` into `self`, overwriting on conflicts.
    pub fn extend_from(&mut self, other: &FieldContainer) {
        for (key, value) in &other.entries {
            self.entries.insert(key.clone(), value.clone());
        }
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The stored value, verbatim.
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.entries.get(key)
    }

    /// The stored value, or `default` as a scalar when the key is absent.
    #[must_use]
    pub fn get_or(&self, key: &str, default: &str) -> FieldValue {
        self.entries
            .get(key)
            .cloned()
            .unwrap_or_else(|| FieldValue::Single(default.to_string()))
    }

    /// The scalar stored under `key`, or `""`.
    ///
    /// List-shaped values are not flattened here; use [`Self::first`] or
    /// [`Self::last`] for that.
    #[must_use]
    pub fn get_str(&self, key: &str) -> &str {
        self.entries
            .get(key)
            .and_then(FieldValue::as_single)
            .unwrap_or("")
    }

    /// Always a list: a scalar becomes a one element list, a missing or empty
    /// value becomes an empty list. List values keep their order.
    #[must_use]
    pub fn get_list(&self, key: &str) -> Vec<&str> {
        self.entries.get(key).map(FieldValue::values).unwrap_or_default()
    }

    /// Like [`Self::get_list`] with duplicates removed.
    #[must_use]
    pub fn get_set(&self, key: &str) -> BTreeSet<&str> {
        self.get_list(key).into_iter().collect()
    }

    /// First element of a list value, the scalar itself otherwise.
    /// `default` when the key is absent or the list is empty.
    #[must_use]
    pub fn first<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        match self.entries.get(key) {
            Some(FieldValue::Single(s)) => s,
            Some(FieldValue::List(items)) => items.first().map(String::as_str).unwrap_or(default),
            None => default,
        }
    }

    /// Last element of a list value, the scalar itself otherwise.
    /// `default` when the key is absent or the list is empty.
    #[must_use]
    pub fn last<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        match self.entries.get(key) {
            Some(FieldValue::Single(s)) => s,
            Some(FieldValue::List(items)) => items.last().map(String::as_str).unwrap_or(default),
            None => default,
        }
    }

    /// A new container holding only `keys`, missing ones set to `default`.
    #[must_use]
    pub fn subset<I, S>(&self, keys: I, default: &str) -> FieldContainer
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        keys.into_iter()
            .map(|key| {
                let key = key.as_ref();
                (key.to_string(), self.get_or(key, default))
            })
            .collect()
    }

    /// URL-encoded form of all entries; list values repeat their key.
    #[must_use]
    pub fn query_string(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.entries {
            match value {
                FieldValue::Single(s) => {
                    serializer.append_pair(key, s);
                }
                FieldValue::List(items) => {
                    for item in items {
                        serializer.append_pair(key, item);
                    }
                }
            }
        }
        serializer.finish()
    }
}

impl<K, V> FromIterator<(K, V)> for FieldContainer
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        FieldContainer {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
