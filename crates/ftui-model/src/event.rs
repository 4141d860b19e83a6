#![forbid(unsafe_code)]

//! Notifications emitted by a [`Model`](crate::Model).
//!
//! | Namespace       | When                                   | `attr` | `value`          | `previous`     |
//! |-----------------|----------------------------------------|--------|------------------|----------------|
//! | `before.change` | before every set or delete             | yes    | always `None`    | stored before  |
//! | `change.set`    | after a value was stored               | yes    | the stored value | stored before  |
//! | `change.delete` | after an attribute was removed         | yes    | `None`           | stored before  |
//! | `destroy`       | once per [`Model::destroy`](crate::Model::destroy), before detaching | no | `None` | `None` |
//!
//! `before.change` never carries the pending value, even for a set. Existing
//! subscribers rely on that shape; read the `change.set` event for the new
//! value.

use crate::attr::Attr;
use crate::namespace::Namespace;

pub const BEFORE_CHANGE: Namespace = Namespace::from_static("before.change");
pub const CHANGE_SET: Namespace = Namespace::from_static("change.set");
pub const CHANGE_DELETE: Namespace = Namespace::from_static("change.delete");
pub const DESTROY: Namespace = Namespace::from_static("destroy");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    BeforeChange,
    Set,
    Delete,
    Destroy,
}

impl ChangeKind {
    #[must_use]
    pub const fn namespace(self) -> Namespace {
        match self {
            Self::BeforeChange => BEFORE_CHANGE,
            Self::Set => CHANGE_SET,
            Self::Delete => CHANGE_DELETE,
            Self::Destroy => DESTROY,
        }
    }

    #[must_use]
    pub fn from_namespace(namespace: &Namespace) -> Option<Self> {
        [Self::BeforeChange, Self::Set, Self::Delete, Self::Destroy]
            .into_iter()
            .find(|kind| kind.namespace() == *namespace)
    }
}

/// Payload delivered to model subscribers.
pub struct ModelEvent<V: 'static> {
    kind: ChangeKind,
    attr: Option<String>,
    value: Option<Attr<V>>,
    previous: Option<Attr<V>>,
}

impl<V: 'static> ModelEvent<V> {
    pub(crate) fn before_change(attr: &str, previous: Option<Attr<V>>) -> Self {
        Self {
            kind: ChangeKind::BeforeChange,
            attr: Some(attr.to_owned()),
            value: None,
            previous,
        }
    }

    pub(crate) fn set(attr: &str, value: Attr<V>, previous: Option<Attr<V>>) -> Self {
        Self {
            kind: ChangeKind::Set,
            attr: Some(attr.to_owned()),
            value: Some(value),
            previous,
        }
    }

    pub(crate) fn delete(attr: &str, previous: Option<Attr<V>>) -> Self {
        Self {
            kind: ChangeKind::Delete,
            attr: Some(attr.to_owned()),
            value: None,
            previous,
        }
    }

    pub(crate) fn destroy() -> Self {
        Self {
            kind: ChangeKind::Destroy,
            attr: None,
            value: None,
            previous: None,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ChangeKind {
        self.kind
    }

    #[must_use]
    pub fn namespace(&self) -> Namespace {
        self.kind.namespace()
    }

    /// Attribute name; `None` only for `destroy`.
    #[must_use]
    pub fn attr(&self) -> Option<&str> {
        self.attr.as_deref()
    }

    /// New value. Only `change.set` carries one.
    #[must_use]
    pub fn value(&self) -> Option<&Attr<V>> {
        self.value.as_ref()
    }

    /// Raw value stored before the change, unevaluated.
    #[must_use]
    pub fn previous(&self) -> Option<&Attr<V>> {
        self.previous.as_ref()
    }
}

impl<V: std::fmt::Debug + 'static> std::fmt::Debug for ModelEvent<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelEvent")
            .field("namespace", &self.kind.namespace().as_str())
            .field("attr", &self.attr)
            .field("value", &self.value)
            .field("previous", &self.previous)
            .finish()
    }
}
