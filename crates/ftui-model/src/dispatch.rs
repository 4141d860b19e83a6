#![forbid(unsafe_code)]

//! Single-entry access to a model, routed by argument shape.
//!
//! The named operations on [`Model`] are the primary surface.
//! [`Model::call`] exists for callers that forward loosely shaped argument
//! lists (scripting bridges, command palettes) and need one entry point:
//!
//! | Arguments             | Routed to                    | Reply          |
//! |-----------------------|------------------------------|----------------|
//! | `[]`                  | the model itself             | `Model`        |
//! | `[Attrs]`             | `merge(attrs, false)`        | `Model`        |
//! | `[Attrs, Flag(keep)]` | `merge(attrs, keep)`         | `Model`        |
//! | `[Key]`               | `get(key)`                   | `Value`        |
//! | `[Key, Value]`        | `set(key, value)`            | `Model`        |
//!
//! Any other shape fails with [`ModelError::UnsupportedCall`] before the
//! model is touched.

use crate::attr::{Attr, Attrs};
use crate::error::{ModelError, Result};
use crate::model::Model;

/// One positional argument to [`Model::call`].
///
/// `bool`, `&str` and `String` convert to [`Flag`](Arg::Flag) and
/// [`Key`](Arg::Key), never to a value. Values always go through [`Attr`]:
/// on a `Model<bool>`, set with `Attr::Static(true).into()`, since
/// `true.into()` is a flag and `[Key, Flag]` is rejected.
pub enum Arg<V: 'static> {
    Key(String),
    Attrs(Vec<(String, Option<Attr<V>>)>),
    Value(Option<Attr<V>>),
    Flag(bool),
}

impl<V: 'static> Arg<V> {
    fn kind(&self) -> &'static str {
        match self {
            Self::Key(_) => "key",
            Self::Attrs(_) => "attrs",
            Self::Value(_) => "value",
            Self::Flag(_) => "flag",
        }
    }
}

impl<V: 'static> From<&str> for Arg<V> {
    fn from(key: &str) -> Self {
        Self::Key(key.to_owned())
    }
}

impl<V: 'static> From<String> for Arg<V> {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl<V: 'static> From<bool> for Arg<V> {
    fn from(flag: bool) -> Self {
        Self::Flag(flag)
    }
}

impl<V: 'static> From<Attr<V>> for Arg<V> {
    fn from(value: Attr<V>) -> Self {
        Self::Value(Some(value))
    }
}

impl<V: 'static> From<Option<Attr<V>>> for Arg<V> {
    fn from(value: Option<Attr<V>>) -> Self {
        Self::Value(value)
    }
}

impl<V: 'static> From<Attrs<V>> for Arg<V> {
    fn from(attrs: Attrs<V>) -> Self {
        Self::Attrs(attrs.into_iter().map(|(k, v)| (k, Some(v))).collect())
    }
}

/// What [`Model::call`] returns.
pub enum Reply<'a, V: 'static> {
    Model(&'a Model<V>),
    Value(Option<V>),
}

impl<'a, V: 'static> Reply<'a, V> {
    #[must_use]
    pub fn as_model(&self) -> Option<&'a Model<V>> {
        match self {
            Self::Model(model) => Some(model),
            Self::Value(_) => None,
        }
    }

    /// The value of a get. `None` for model replies and absent attributes.
    #[must_use]
    pub fn into_value(self) -> Option<V> {
        match self {
            Self::Model(_) => None,
            Self::Value(value) => value,
        }
    }
}

impl<V: std::fmt::Debug + 'static> std::fmt::Debug for Reply<'_, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Model(_) => f.write_str("Model(..)"),
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
        }
    }
}

impl<V: Clone + 'static> Model<V> {
    /// Route `args` to `get`, `set` or `merge` by shape. See the module docs
    /// for the accepted shapes.
    pub fn call(&self, args: Vec<Arg<V>>) -> Result<Reply<'_, V>> {
        let mut args = args.into_iter();
        let reply = match (args.next(), args.next(), args.next()) {
            (None, _, _) => Reply::Model(self),
            (Some(Arg::Attrs(attrs)), None, _) => Reply::Model(self.merge(attrs, false)),
            (Some(Arg::Attrs(attrs)), Some(Arg::Flag(keep)), None) => {
                Reply::Model(self.merge(attrs, keep))
            }
            (Some(Arg::Key(key)), None, _) => Reply::Value(self.get(&key)),
            (Some(Arg::Key(key)), Some(Arg::Value(value)), None) => {
                Reply::Model(self.set(key, value))
            }
            (first, second, third) => {
                let shape = [first, second, third]
                    .iter()
                    .flatten()
                    .map(Arg::kind)
                    .chain(args.map(|_| "..."))
                    .collect::<Vec<_>>()
                    .join(", ");
                tracing::debug!(message = "model.call.rejected", shape = %shape);
                return Err(ModelError::unsupported(shape));
            }
        };
        Ok(reply)
    }
}
