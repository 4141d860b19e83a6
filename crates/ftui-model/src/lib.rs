#![forbid(unsafe_code)]

//! Reactive attribute container for FrankenTUI view-models.
//!
//! A [`Model<V>`] stores named attributes, evaluates computed attributes on
//! every read, and reports every mutation through an owned, namespaced
//! notification [`Channel`].
//!
//! - [`Model`]: get / set / delete / merge / has / keys / snapshot / clone /
//!   destroy, plus subscription helpers.
//! - [`Attr`]: a static value or a computed function of the model.
//! - [`Attrs`]: the insertion-ordered attribute store.
//! - [`Channel`]: synchronous publish/subscribe with `prefix.*` wildcards.
//! - [`Model::call`]: one entry point routed by argument shape.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use ftui_model::{Attr, Model};
//!
//! let model = Model::with_attrs([
//!     ("x", Attr::Static(1)),
//!     ("z", Attr::computed(|m: &Model<i32>| Some(m.get("x")? + 2))),
//! ]);
//! assert_eq!(model.get("z"), Some(3));
//!
//! let changes = Rc::new(RefCell::new(Vec::new()));
//! let sink = Rc::clone(&changes);
//! model
//!     .on("change.*", move |_, ev| {
//!         sink.borrow_mut().push(ev.namespace().to_string());
//!     })
//!     .unwrap();
//!
//! model.set_value("x", 10).delete("x");
//! assert_eq!(*changes.borrow(), vec!["change.set", "change.delete"]);
//! ```
//!
//! # Threading
//!
//! Everything here is single-threaded (`Rc`/`RefCell`); `Model` is neither
//! `Send` nor `Sync`. Notifications are delivered synchronously before the
//! mutating call returns.

pub mod attr;
pub mod channel;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod model;
pub mod namespace;
pub mod snapshot;

pub use attr::{Attr, Attrs, ComputeFn};
pub use channel::{Channel, Subscription, SubscriptionId};
pub use dispatch::{Arg, Reply};
pub use error::{ModelError, Result};
pub use event::{BEFORE_CHANGE, CHANGE_DELETE, CHANGE_SET, ChangeKind, DESTROY, ModelEvent};
pub use model::{Cloned, Model, ModelChannel};
pub use namespace::{Namespace, Pattern};
pub use snapshot::Snapshot;
