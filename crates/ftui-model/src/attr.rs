#![forbid(unsafe_code)]

//! Attribute values and the ordered attribute store.
//!
//! # Design
//!
//! [`Attr<V>`] is either a plain value or a computed function of the owning
//! [`Model`]. Computed attributes are **not** memoized: every read calls the
//! function again, so the result always reflects the current state of
//! whatever the function reads. Nothing is cached.
//!
//! [`Attrs<V>`] is an insertion-ordered map. Replacing an existing key keeps
//! its position; removing a key and setting it again moves it to the end.

use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;

use crate::model::Model;

/// Signature of a computed attribute.
pub type ComputeFn<V> = dyn Fn(&Model<V>) -> Option<V>;

/// A stored attribute value.
pub enum Attr<V: 'static> {
    /// Returned as-is (cloned) on read.
    Static(V),
    /// Evaluated against the owning model on every read.
    Computed(Rc<ComputeFn<V>>),
}

impl<V: 'static> Attr<V> {
    /// Wrap a function as a computed attribute.
    pub fn computed(f: impl Fn(&Model<V>) -> Option<V> + 'static) -> Self {
        Self::Computed(Rc::new(f))
    }

    #[must_use]
    pub fn is_computed(&self) -> bool {
        matches!(self, Self::Computed(_))
    }

    /// The stored value, if this attribute is static.
    #[must_use]
    pub fn as_static(&self) -> Option<&V> {
        match self {
            Self::Static(value) => Some(value),
            Self::Computed(_) => None,
        }
    }

    /// Whether both attributes are computed and share the same function.
    #[must_use]
    pub fn same_fn(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Computed(a), Self::Computed(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<V: Clone + 'static> Attr<V> {
    /// Resolve the attribute against `model`.
    pub fn evaluate(&self, model: &Model<V>) -> Option<V> {
        match self {
            Self::Static(value) => Some(value.clone()),
            Self::Computed(f) => f(model),
        }
    }
}

// Shallow: static values are cloned, computed functions are shared.
impl<V: Clone + 'static> Clone for Attr<V> {
    fn clone(&self) -> Self {
        match self {
            Self::Static(value) => Self::Static(value.clone()),
            Self::Computed(f) => Self::Computed(Rc::clone(f)),
        }
    }
}

impl<V: PartialEq + 'static> PartialEq for Attr<V> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Static(a), Self::Static(b)) => a == b,
            (Self::Computed(a), Self::Computed(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<V: fmt::Debug + 'static> fmt::Debug for Attr<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(value) => f.debug_tuple("Static").field(value).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl<V: 'static> From<V> for Attr<V> {
    fn from(value: V) -> Self {
        Self::Static(value)
    }
}

/// Insertion-ordered attribute map.
pub struct Attrs<V: 'static> {
    entries: Vec<(String, Attr<V>)>,
    index: AHashMap<String, usize>,
}

impl<V: 'static> Default for Attrs<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: 'static> Attrs<V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: AHashMap::new(),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Attr<V>> {
        self.index.get(key).map(|&i| &self.entries[i].1)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Insert or replace. Returns the replaced value.
    pub fn insert(&mut self, key: impl Into<String>, value: Attr<V>) -> Option<Attr<V>> {
        let key = key.into();
        match self.index.get(&key) {
            Some(&i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Remove `key`, preserving the order of the remaining entries.
    pub fn remove(&mut self, key: &str) -> Option<Attr<V>> {
        let position = self.index.remove(key)?;
        let (_, value) = self.entries.remove(position);
        for (name, _) in &self.entries[position..] {
            if let Some(slot) = self.index.get_mut(name) {
                *slot -= 1;
            }
        }
        Some(value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Attr<V>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index.clear();
    }

    /// Copy every entry of `source` into `self` without touching nested
    /// values: existing keys are overwritten in place, new keys are appended.
    pub fn merge_from(&mut self, source: &Attrs<V>) -> &mut Self
    where
        V: Clone,
    {
        for (key, value) in source.iter() {
            self.insert(key, value.clone());
        }
        self
    }
}

impl<V: Clone + 'static> Clone for Attrs<V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            index: self.index.clone(),
        }
    }
}

impl<V: fmt::Debug + 'static> fmt::Debug for Attrs<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<V: 'static, K: Into<String>> Extend<(K, Attr<V>)> for Attrs<V> {
    fn extend<I: IntoIterator<Item = (K, Attr<V>)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<V: 'static, K: Into<String>> FromIterator<(K, Attr<V>)> for Attrs<V> {
    fn from_iter<I: IntoIterator<Item = (K, Attr<V>)>>(iter: I) -> Self {
        let mut attrs = Self::new();
        attrs.extend(iter);
        attrs
    }
}

impl<V: 'static> IntoIterator for Attrs<V> {
    type Item = (String, Attr<V>);
    type IntoIter = std::vec::IntoIter<(String, Attr<V>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(attrs: &Attrs<i32>) -> Vec<&str> {
        attrs.keys().collect()
    }

    fn xyz() -> Attrs<i32> {
        [
            ("x", Attr::Static(1)),
            ("y", Attr::Static(2)),
            ("z", Attr::Static(3)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn insertion_order_is_preserved() {
        let attrs = xyz();
        assert_eq!(keys(&attrs), vec!["x", "y", "z"]);
    }

    #[test]
    fn replace_keeps_position() {
        let mut attrs = xyz();
        let old = attrs.insert("x", Attr::Static(10));
        assert_eq!(old, Some(Attr::Static(1)));
        assert_eq!(keys(&attrs), vec!["x", "y", "z"]);
        assert_eq!(attrs.get("x"), Some(&Attr::Static(10)));
    }

    #[test]
    fn remove_then_reinsert_moves_to_end() {
        let mut attrs = xyz();
        assert_eq!(attrs.remove("x"), Some(Attr::Static(1)));
        assert_eq!(keys(&attrs), vec!["y", "z"]);
        assert_eq!(attrs.get("z"), Some(&Attr::Static(3)));

        attrs.insert("x", Attr::Static(4));
        assert_eq!(keys(&attrs), vec!["y", "z", "x"]);
        assert_eq!(attrs.get("y"), Some(&Attr::Static(2)));
        assert_eq!(attrs.remove("missing"), None);
    }

    #[test]
    fn clone_shares_computed_functions() {
        let mut attrs: Attrs<i32> = Attrs::new();
        attrs.insert("z", Attr::computed(|_| Some(3)));
        let copy = attrs.clone();
        let (Some(a), Some(b)) = (attrs.get("z"), copy.get("z")) else {
            panic!("missing computed attribute");
        };
        assert!(a.same_fn(b));
    }

    #[test]
    fn merge_from_is_shallow_and_independent() {
        let source: Attrs<Rc<Vec<i32>>> = [("v", Attr::Static(Rc::new(vec![1])))]
            .into_iter()
            .collect();
        let mut target = Attrs::new();
        target.merge_from(&source);

        let (Some(Attr::Static(a)), Some(Attr::Static(b))) = (source.get("v"), target.get("v"))
        else {
            panic!("expected static values");
        };
        assert!(Rc::ptr_eq(a, b));

        target.insert("w", Attr::Static(Rc::new(vec![])));
        assert!(!source.contains_key("w"));
    }

    #[test]
    fn debug_hides_functions() {
        let mut attrs: Attrs<i32> = Attrs::new();
        attrs.insert("x", Attr::Static(1));
        attrs.insert("f", Attr::computed(|_| None));
        assert_eq!(format!("{attrs:?}"), r#"{"x": Static(1), "f": Computed(..)}"#);
    }
}
