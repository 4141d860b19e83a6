#![forbid(unsafe_code)]

//! Plain, evaluated copy of a model's attributes.

use crate::attr::{Attr, Attrs};

/// Attribute values evaluated once, in store order.
///
/// A computed attribute that evaluated to `None` keeps its key with a `None`
/// value, so [`contains_key`](Self::contains_key) agrees with
/// [`Model::has`](crate::Model::has) at snapshot time.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<V> {
    entries: Vec<(String, Option<V>)>,
}

impl<V> Snapshot<V> {
    pub(crate) fn from_entries(entries: Vec<(String, Option<V>)>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_ref())
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&V>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Static attributes suitable for seeding a new model. Entries without a
    /// value are dropped.
    #[must_use]
    pub fn into_attrs(self) -> Attrs<V>
    where
        V: 'static,
    {
        self.entries
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k, Attr::Static(v))))
            .collect()
    }
}

impl<V> IntoIterator for Snapshot<V> {
    type Item = (String, Option<V>);
    type IntoIter = std::vec::IntoIter<(String, Option<V>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
