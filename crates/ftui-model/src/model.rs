#![forbid(unsafe_code)]

//! The reactive attribute container.
//!
//! # Design
//!
//! [`Model<V>`] owns an ordered attribute store and a notification
//! [`Channel`]. All operations take `&self`; state lives behind
//! `RefCell`/`Cell` so subscribers and computed attributes can call back into
//! the model they were invoked from.
//!
//! Every [`set`](Model::set) emits two notifications, in order:
//!
//! ```text
//! set(attr, value)
//!   ├─► previous = store[attr]
//!   ├─► emit before.change (attr, None, previous)
//!   ├─► value is None ─► remove attr ─► emit change.delete (attr, None, previous)
//!   └─► otherwise     ─► store value ─► emit change.set    (attr, value, previous)
//! ```
//!
//! # Invariants
//!
//! 1. The store is never borrowed while user code (a subscriber or a computed
//!    function) runs.
//! 2. Enumeration order is first-set order; replacing a value keeps its slot.
//! 3. Storing `None` removes the attribute; there is no stored absent value.
//! 4. `is_destroyed()` never goes back to `false`.
//!
//! # Lifecycle
//!
//! ```text
//! Active ──destroy()──► Destroyed
//! ```
//!
//! Both states accept every operation. [`destroy`](Model::destroy) emits
//! `destroy`, detaches every subscriber and clears the store; later
//! mutations still apply but nobody observes them.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::attr::{Attr, Attrs};
use crate::channel::{Channel, Subscription, SubscriptionId};
use crate::error::{ModelError, Result};
use crate::event::ModelEvent;
use crate::namespace::Pattern;
use crate::snapshot::Snapshot;

/// Channel type owned by every model.
pub type ModelChannel<V> = Channel<Model<V>, ModelEvent<V>>;

/// Result of [`Model::clone_as`].
#[derive(Debug)]
pub enum Cloned<V: 'static> {
    Model(Model<V>),
    Object(Snapshot<V>),
}

/// Reactive attribute container.
pub struct Model<V: 'static> {
    attrs: RefCell<Attrs<V>>,
    destroyed: Cell<bool>,
    channel: ModelChannel<V>,
}

impl<V: Clone + 'static> Default for Model<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Clone + 'static> Model<V> {
    /// Create an empty model.
    #[must_use]
    pub fn new() -> Self {
        Self::from_store(Attrs::new())
    }

    /// Create a model seeded with `initial`. Entries are copied into a fresh
    /// store; no notifications are emitted.
    pub fn with_attrs<K: Into<String>>(initial: impl IntoIterator<Item = (K, Attr<V>)>) -> Self {
        let mut store = Attrs::new();
        store.extend(initial);
        Self::from_store(store)
    }

    fn from_store(attrs: Attrs<V>) -> Self {
        Self {
            attrs: RefCell::new(attrs),
            destroyed: Cell::new(false),
            channel: Channel::new(),
        }
    }

    /// The model itself. Counterpart of calling the model with no arguments.
    #[must_use]
    pub fn this(&self) -> &Self {
        self
    }

    /// Read an attribute. Computed attributes are evaluated against `self`
    /// on every call. Absent attributes read as `None`.
    #[must_use]
    pub fn get(&self, attr: &str) -> Option<V> {
        let compute = {
            let attrs = self.attrs.borrow();
            match attrs.get(attr)? {
                Attr::Static(value) => return Some(value.clone()),
                Attr::Computed(f) => Rc::clone(f),
            }
        };
        compute(self)
    }

    /// The stored attribute without evaluating it.
    #[must_use]
    pub fn raw(&self, attr: &str) -> Option<Attr<V>> {
        self.attrs.borrow().get(attr).cloned()
    }

    /// Store `value` under `attr`, or remove `attr` when `value` is `None`.
    ///
    /// Emits `before.change` and then either `change.set` or
    /// `change.delete`. The `before.change` event always reports `None` as
    /// its new value.
    pub fn set(&self, attr: impl Into<String>, value: impl Into<Option<Attr<V>>>) -> &Self {
        let attr = attr.into();
        let value = value.into();
        let previous = self.raw(&attr);

        self.emit(&ModelEvent::before_change(&attr, previous.clone()));

        match value {
            None => {
                self.attrs.borrow_mut().remove(&attr);
                tracing::trace!(message = "model.set", attr = %attr, deleted = true);
                self.emit(&ModelEvent::delete(&attr, previous));
            }
            Some(value) => {
                self.attrs.borrow_mut().insert(attr.as_str(), value.clone());
                tracing::trace!(message = "model.set", attr = %attr, deleted = false);
                self.emit(&ModelEvent::set(&attr, value, previous));
            }
        }
        self
    }

    /// Store a static value.
    pub fn set_value(&self, attr: impl Into<String>, value: V) -> &Self {
        self.set(attr, Attr::Static(value))
    }

    /// Store a computed attribute.
    pub fn set_computed(
        &self,
        attr: impl Into<String>,
        f: impl Fn(&Model<V>) -> Option<V> + 'static,
    ) -> &Self {
        self.set(attr, Attr::computed(f))
    }

    /// Remove `attr`. Same as `set(attr, None)`, notifications included.
    pub fn delete(&self, attr: impl Into<String>) -> &Self {
        self.set(attr, None)
    }

    /// Apply several sets, in the iteration order of `attrs`.
    ///
    /// With `keep_existent_keys`, keys already present when they are reached
    /// are skipped without notification. Notifications fire per key, so
    /// subscribers can observe a partially applied merge.
    pub fn merge<K: Into<String>>(
        &self,
        attrs: impl IntoIterator<Item = (K, Option<Attr<V>>)>,
        keep_existent_keys: bool,
    ) -> &Self {
        let mut applied = 0usize;
        let mut skipped = 0usize;
        for (key, value) in attrs {
            let key = key.into();
            if keep_existent_keys && self.has(&key) {
                skipped += 1;
                continue;
            }
            self.set(key, value);
            applied += 1;
        }
        tracing::debug!(
            message = "model.merge",
            applied,
            skipped,
            keep_existent_keys
        );
        self
    }

    /// [`merge`](Self::merge) with a store of present values.
    pub fn merge_attrs(&self, attrs: Attrs<V>, keep_existent_keys: bool) -> &Self {
        self.merge(
            attrs.into_iter().map(|(k, v)| (k, Some(v))),
            keep_existent_keys,
        )
    }

    /// Whether `attr` is present, whatever its value evaluates to.
    #[must_use]
    pub fn has(&self, attr: &str) -> bool {
        self.attrs.borrow().contains_key(attr)
    }

    /// Present attribute names in store order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.attrs.borrow().keys().map(str::to_owned).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.attrs.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attrs.borrow().is_empty()
    }

    /// Evaluate every attribute once into a plain, detached mapping.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot<V> {
        let store = self.attrs.borrow().clone();
        let entries = store
            .iter()
            .map(|(key, attr)| (key.to_owned(), attr.evaluate(self)))
            .collect();
        Snapshot::from_entries(entries)
    }

    /// `clone_as(false)` is [`Clone::clone`]; `clone_as(true)` is
    /// [`snapshot`](Self::snapshot).
    #[must_use]
    pub fn clone_as(&self, as_object: bool) -> Cloned<V> {
        if as_object {
            Cloned::Object(self.snapshot())
        } else {
            Cloned::Model(self.clone())
        }
    }

    /// Mark the model destroyed, emit `destroy`, detach every subscriber and
    /// clear the store.
    pub fn destroy(&self) {
        self.destroyed.set(true);
        self.emit(&ModelEvent::destroy());
        let detached = self.channel.detach_all();
        let cleared = {
            let mut attrs = self.attrs.borrow_mut();
            let cleared = attrs.len();
            attrs.clear();
            cleared
        };
        tracing::debug!(message = "model.destroy", cleared, detached);
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    /// `is_destroyed` is read-only; this always fails.
    pub fn set_destroyed(&self, _value: bool) -> Result<()> {
        Err(ModelError::read_only("is_destroyed"))
    }

    /// Attach a handler until [`off`](Self::off) or [`destroy`](Self::destroy).
    ///
    /// `pattern` is a namespace (`change.set`), a prefix wildcard
    /// (`change.*`) or `*`.
    pub fn on(
        &self,
        pattern: &str,
        handler: impl Fn(&Model<V>, &ModelEvent<V>) + 'static,
    ) -> Result<SubscriptionId> {
        Ok(self.channel.on(Pattern::parse(pattern)?, handler))
    }

    /// Attach a handler for as long as the returned guard lives.
    pub fn subscribe(
        &self,
        pattern: &str,
        handler: impl Fn(&Model<V>, &ModelEvent<V>) + 'static,
    ) -> Result<Subscription> {
        Ok(self.channel.subscribe(Pattern::parse(pattern)?, handler))
    }

    pub fn off(&self, id: SubscriptionId) -> bool {
        self.channel.off(id)
    }

    #[must_use]
    pub fn channel(&self) -> &ModelChannel<V> {
        &self.channel
    }

    fn emit(&self, event: &ModelEvent<V>) -> usize {
        self.channel.emit(&event.namespace(), self, event)
    }
}

/// Shallow copy: the new model gets its own store holding the same entries
/// (computed functions are shared), a fresh channel with no subscribers and
/// an active lifecycle.
impl<V: Clone + 'static> Clone for Model<V> {
    fn clone(&self) -> Self {
        Self::from_store(self.attrs.borrow().clone())
    }
}

impl<V: Clone + 'static> From<Attrs<V>> for Model<V> {
    fn from(attrs: Attrs<V>) -> Self {
        Self::from_store(attrs)
    }
}

impl<V: Clone + 'static, K: Into<String>> FromIterator<(K, Attr<V>)> for Model<V> {
    fn from_iter<I: IntoIterator<Item = (K, Attr<V>)>>(iter: I) -> Self {
        Self::with_attrs(iter)
    }
}

impl<V: fmt::Debug + 'static> fmt::Debug for Model<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("attrs", &*self.attrs.borrow())
            .field("destroyed", &self.destroyed.get())
            .field("channel", &self.channel)
            .finish()
    }
}
