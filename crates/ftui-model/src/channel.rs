#![forbid(unsafe_code)]

//! Synchronous publish/subscribe channel keyed by dot-segmented namespaces.
//!
//! # Design
//!
//! Subscriptions live in a small matching table: exact subscriptions are
//! bucketed by [`Namespace`], wildcard subscriptions (`prefix.*`, `*`) sit in
//! a flat list that is scanned on every emit. Each subscription carries a
//! monotonically increasing [`SubscriptionId`]; the handlers selected for an
//! emit are ordered by id, so delivery follows registration order regardless
//! of which bucket a handler came from.
//!
//! Handlers registered with [`Channel::on`] are owned by the channel.
//! Handlers registered with [`Channel::subscribe`] are owned by the returned
//! [`Subscription`] guard; the channel only keeps a `Weak` pointer. Dead
//! entries are pruned by the next emit that reaches them and by every
//! registration.
//!
//! # Invariants
//!
//! 1. Handlers run synchronously, inside [`Channel::emit`], in registration
//!    order.
//! 2. The registry is never borrowed while a handler runs, so handlers may
//!    call back into the channel (subscribe, unsubscribe, emit, detach).
//! 3. A handler detached during an emit cycle is not invoked for the rest of
//!    that cycle.
//! 4. A handler registered during an emit cycle is first invoked by the next
//!    emit.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use ahash::AHashMap;

use crate::namespace::{Namespace, Pattern};

/// Identifies one registered handler on one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

type Callback<S, E> = Box<dyn Fn(&S, &E)>;

struct Handler<S: ?Sized, E> {
    id: SubscriptionId,
    pattern: Pattern,
    live: Cell<bool>,
    callback: Callback<S, E>,
}

trait Detach {
    fn detach(&self);
}

impl<S: ?Sized, E> Detach for Handler<S, E> {
    fn detach(&self) {
        self.live.set(false);
    }
}

enum Slot<S: ?Sized, E> {
    Owned(Rc<Handler<S, E>>),
    Guarded(Weak<Handler<S, E>>),
}

impl<S: ?Sized, E> Slot<S, E> {
    fn handler(&self) -> Option<Rc<Handler<S, E>>> {
        match self {
            Self::Owned(handler) => Some(Rc::clone(handler)),
            Self::Guarded(weak) => weak.upgrade().filter(|h| h.live.get()),
        }
    }

    fn id(&self) -> Option<SubscriptionId> {
        self.handler().map(|h| h.id)
    }
}

fn position_of<S: ?Sized, E>(slots: &[Slot<S, E>], id: SubscriptionId) -> Option<usize> {
    slots.iter().position(|slot| slot.id() == Some(id))
}

struct Registry<S: ?Sized, E> {
    exact: AHashMap<Namespace, Vec<Slot<S, E>>>,
    wildcard: Vec<Slot<S, E>>,
    next_id: u64,
}

impl<S: ?Sized, E> Registry<S, E> {
    fn insert(
        &mut self,
        pattern: Pattern,
        slot_for: impl FnOnce(Rc<Handler<S, E>>) -> Slot<S, E>,
        callback: Callback<S, E>,
    ) -> Rc<Handler<S, E>> {
        self.prune();
        self.next_id += 1;
        let handler = Rc::new(Handler {
            id: SubscriptionId(self.next_id),
            pattern: pattern.clone(),
            live: Cell::new(true),
            callback,
        });
        let slot = slot_for(Rc::clone(&handler));
        match pattern {
            Pattern::Exact(ns) => self.exact.entry(ns).or_default().push(slot),
            Pattern::Prefix(_) | Pattern::Any => self.wildcard.push(slot),
        }
        handler
    }

    /// Drop slots whose handler is gone or detached, and empty buckets.
    fn prune(&mut self) {
        self.exact.retain(|_, bucket| {
            bucket.retain(|slot| slot.handler().is_some());
            !bucket.is_empty()
        });
        self.wildcard.retain(|slot| slot.handler().is_some());
    }

    #[cfg(test)]
    fn slot_count(&self) -> usize {
        self.exact.values().map(Vec::len).sum::<usize>() + self.wildcard.len()
    }

    /// Live handlers whose pattern matches `namespace`, in registration order.
    /// Dead guarded slots encountered on the way are dropped.
    fn matching(&mut self, namespace: &Namespace) -> Vec<Rc<Handler<S, E>>> {
        let mut selected = Vec::new();

        if let Some(bucket) = self.exact.get_mut(namespace) {
            bucket.retain(|slot| match slot.handler() {
                Some(handler) => {
                    selected.push(handler);
                    true
                }
                None => false,
            });
            if bucket.is_empty() {
                self.exact.remove(namespace);
            }
        }

        self.wildcard.retain(|slot| match slot.handler() {
            Some(handler) => {
                if handler.pattern.matches(namespace) {
                    selected.push(handler);
                }
                true
            }
            None => false,
        });

        selected.sort_unstable_by_key(|h| h.id);
        selected
    }

    fn remove(&mut self, id: SubscriptionId) -> Option<Rc<Handler<S, E>>> {
        if let Some(index) = position_of(&self.wildcard, id) {
            return self.wildcard.remove(index).handler();
        }
        let (namespace, index) = self.exact.iter().find_map(|(ns, bucket)| {
            position_of(bucket, id).map(|index| (ns.clone(), index))
        })?;
        let bucket = self.exact.get_mut(&namespace)?;
        let removed = bucket.remove(index).handler();
        if bucket.is_empty() {
            self.exact.remove(&namespace);
        }
        removed
    }

    fn drain(&mut self) -> Vec<Rc<Handler<S, E>>> {
        self.exact
            .drain()
            .flat_map(|(_, bucket)| bucket)
            .chain(self.wildcard.drain(..))
            .filter_map(|slot| slot.handler())
            .collect()
    }

    fn live_count(&self) -> usize {
        self.exact
            .values()
            .flatten()
            .chain(self.wildcard.iter())
            .filter(|slot| slot.handler().is_some())
            .count()
    }
}

/// Namespace-matching publish/subscribe channel.
///
/// `S` is the sender handed to every handler alongside the event; a model
/// passes itself so handlers can read or mutate it re-entrantly.
pub struct Channel<S: ?Sized, E> {
    registry: RefCell<Registry<S, E>>,
}

impl<S: ?Sized, E> Default for Channel<S, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ?Sized, E> fmt::Debug for Channel<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("subscribers", &self.len())
            .finish()
    }
}

impl<S: ?Sized, E> Channel<S, E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: RefCell::new(Registry {
                exact: AHashMap::new(),
                wildcard: Vec::new(),
                next_id: 0,
            }),
        }
    }

    /// Register a handler that stays attached until [`off`](Self::off) or
    /// [`detach_all`](Self::detach_all).
    pub fn on(&self, pattern: Pattern, handler: impl Fn(&S, &E) + 'static) -> SubscriptionId {
        self.registry
            .borrow_mut()
            .insert(pattern, Slot::Owned, Box::new(handler))
            .id
    }

    /// Detach a single handler. Returns `false` if it was not attached.
    pub fn off(&self, id: SubscriptionId) -> bool {
        let removed = self.registry.borrow_mut().remove(id);
        match removed {
            Some(handler) => {
                handler.detach();
                true
            }
            None => false,
        }
    }

    /// Deliver `event` to every live handler whose pattern matches
    /// `namespace`. Returns the number of handlers invoked.
    pub fn emit(&self, namespace: &Namespace, sender: &S, event: &E) -> usize {
        let handlers = self.registry.borrow_mut().matching(namespace);
        let mut delivered = 0;
        for handler in handlers {
            if handler.live.get() {
                (handler.callback)(sender, event);
                delivered += 1;
            }
        }
        tracing::trace!(message = "channel.emit", namespace = %namespace, delivered);
        delivered
    }

    /// Detach every handler. Handlers already selected by an emit that is
    /// still in progress are skipped from here on.
    pub fn detach_all(&self) -> usize {
        let handlers = self.registry.borrow_mut().drain();
        for handler in &handlers {
            handler.detach();
        }
        handlers.len()
    }

    /// Number of attached handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.borrow().live_count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S: ?Sized + 'static, E: 'static> Channel<S, E> {
    /// Register a handler owned by the returned guard. Dropping the guard
    /// detaches the handler.
    #[must_use = "dropping the Subscription detaches the handler immediately"]
    pub fn subscribe(
        &self,
        pattern: Pattern,
        handler: impl Fn(&S, &E) + 'static,
    ) -> Subscription {
        let handler = self.registry.borrow_mut().insert(
            pattern,
            |h| Slot::Guarded(Rc::downgrade(&h)),
            Box::new(handler),
        );
        Subscription {
            id: handler.id,
            handle: handler,
        }
    }
}

/// RAII guard for a handler registered with [`Channel::subscribe`].
pub struct Subscription {
    id: SubscriptionId,
    handle: Rc<dyn Detach>,
}

impl Subscription {
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Log = Rc<RefCell<Vec<String>>>;

    fn ns(name: &str) -> Namespace {
        Namespace::new(name).unwrap()
    }

    fn pat(text: &str) -> Pattern {
        Pattern::parse(text).unwrap()
    }

    fn recorder(log: &Log, tag: &'static str) -> impl Fn(&(), &String) + 'static {
        let log = Rc::clone(log);
        move |_, ev| log.borrow_mut().push(format!("{tag}:{ev}"))
    }

    #[test]
    fn exact_and_wildcard_delivery() {
        let channel: Channel<(), String> = Channel::new();
        let log: Log = Rc::default();
        channel.on(pat("change.set"), recorder(&log, "exact"));
        channel.on(pat("change.*"), recorder(&log, "prefix"));
        channel.on(pat("*"), recorder(&log, "any"));

        assert_eq!(channel.emit(&ns("change.set"), &(), &"a".into()), 3);
        assert_eq!(channel.emit(&ns("change.delete"), &(), &"b".into()), 2);
        assert_eq!(channel.emit(&ns("destroy"), &(), &"c".into()), 1);

        assert_eq!(
            *log.borrow(),
            vec!["exact:a", "prefix:a", "any:a", "prefix:b", "any:b", "any:c"]
        );
    }

    #[test]
    fn delivery_follows_registration_order_across_buckets() {
        let channel: Channel<(), String> = Channel::new();
        let log: Log = Rc::default();
        channel.on(pat("*"), recorder(&log, "1"));
        channel.on(pat("change.set"), recorder(&log, "2"));
        channel.on(pat("change.*"), recorder(&log, "3"));
        channel.on(pat("change.set"), recorder(&log, "4"));

        channel.emit(&ns("change.set"), &(), &"x".into());
        assert_eq!(*log.borrow(), vec!["1:x", "2:x", "3:x", "4:x"]);
    }

    #[test]
    fn off_detaches_single_handler() {
        let channel: Channel<(), String> = Channel::new();
        let log: Log = Rc::default();
        let a = channel.on(pat("change.*"), recorder(&log, "a"));
        channel.on(pat("change.*"), recorder(&log, "b"));

        assert!(channel.off(a));
        assert!(!channel.off(a));
        channel.emit(&ns("change.set"), &(), &"x".into());
        assert_eq!(*log.borrow(), vec!["b:x"]);
        assert_eq!(channel.len(), 1);
    }

    #[test]
    fn off_works_for_exact_buckets() {
        let channel: Channel<(), String> = Channel::new();
        let id = channel.on(pat("destroy"), |_, _| {});
        assert_eq!(channel.len(), 1);
        assert!(channel.off(id));
        assert!(channel.is_empty());
    }

    #[test]
    fn detach_all_clears_everything() {
        let channel: Channel<(), String> = Channel::new();
        let log: Log = Rc::default();
        channel.on(pat("a"), recorder(&log, "a"));
        channel.on(pat("*"), recorder(&log, "any"));

        assert_eq!(channel.detach_all(), 2);
        assert!(channel.is_empty());
        assert_eq!(channel.emit(&ns("a"), &(), &"x".into()), 0);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn subscription_guard_detaches_on_drop() {
        let channel: Channel<(), String> = Channel::new();
        let log: Log = Rc::default();
        let guard = channel.subscribe(pat("change.*"), recorder(&log, "g"));
        channel.emit(&ns("change.set"), &(), &"1".into());
        drop(guard);
        channel.emit(&ns("change.set"), &(), &"2".into());

        assert_eq!(*log.borrow(), vec!["g:1"]);
        assert!(channel.is_empty());
    }

    #[test]
    fn dropped_guards_do_not_accumulate_on_quiet_namespaces() {
        let channel: Channel<(), String> = Channel::new();
        for _ in 0..100 {
            drop(channel.subscribe(pat("never.fired"), |_, _| {}));
            drop(channel.subscribe(pat("never.*"), |_, _| {}));
        }
        assert!(channel.is_empty());
        assert!(channel.registry.borrow().slot_count() <= 2);

        channel.on(pat("other"), |_, _| {});
        let registry = channel.registry.borrow();
        assert_eq!(registry.slot_count(), 1);
        assert!(!registry.exact.contains_key(&ns("never.fired")));
    }

    #[test]
    fn handler_detached_mid_cycle_is_skipped() {
        let channel: Rc<Channel<(), String>> = Rc::new(Channel::new());
        let log: Log = Rc::default();
        let weak = Rc::downgrade(&channel);
        channel.on(pat("*"), move |_, _| {
            if let Some(ch) = weak.upgrade() {
                ch.detach_all();
            }
        });
        channel.on(pat("*"), recorder(&log, "late"));

        assert_eq!(channel.emit(&ns("x"), &(), &"1".into()), 1);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn handler_added_mid_cycle_waits_for_next_emit() {
        let channel: Rc<Channel<(), String>> = Rc::new(Channel::new());
        let log: Log = Rc::default();
        let weak = Rc::downgrade(&channel);
        let inner_log = Rc::clone(&log);
        let added = Rc::new(Cell::new(false));
        channel.on(pat("x"), move |_, _| {
            if added.replace(true) {
                return;
            }
            if let Some(ch) = weak.upgrade() {
                ch.on(Pattern::parse("x").unwrap(), recorder(&inner_log, "new"));
            }
        });

        channel.emit(&ns("x"), &(), &"1".into());
        assert!(log.borrow().is_empty());
        channel.emit(&ns("x"), &(), &"2".into());
        assert_eq!(*log.borrow(), vec!["new:2"]);
    }

    #[test]
    fn sender_is_passed_through() {
        let channel: Channel<str, u32> = Channel::new();
        let seen = Rc::new(RefCell::new(String::new()));
        let sink = Rc::clone(&seen);
        channel.on(pat("tick"), move |sender, n| {
            sink.borrow_mut().push_str(&format!("{sender}{n}"));
        });
        channel.emit(&ns("tick"), "t", &7);
        assert_eq!(*seen.borrow(), "t7");
    }

    #[test]
    fn debug_reports_subscriber_count() {
        let channel: Channel<(), String> = Channel::new();
        channel.on(pat("a"), |_, _| {});
        assert!(format!("{channel:?}").contains("subscribers: 1"));
    }
}
