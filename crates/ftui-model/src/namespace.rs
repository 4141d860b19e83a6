#![forbid(unsafe_code)]

//! Dot-segmented event namespaces and the patterns that subscribe to them.
//!
//! A [`Namespace`] is an identifier such as `change.set`. A [`Pattern`] is
//! what a subscriber registers with:
//!
//! | Pattern      | Matches                                             |
//! |--------------|-----------------------------------------------------|
//! | `change.set` | exactly `change.set`                                |
//! | `change.*`   | `change.set`, `change.delete`, `change.a.b`, ...    |
//! | `*`          | every namespace                                     |
//!
//! Prefix matching is segment-aligned: `change.*` does not match `changes.set`
//! and does not match the bare `change`.

use std::borrow::Cow;
use std::fmt;

use crate::error::{ModelError, Result};

const SEPARATOR: char = '.';
const WILDCARD: &str = "*";

/// A validated, dot-segmented event identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace(Cow<'static, str>);

impl Namespace {
    /// Parse a namespace, rejecting empty segments and wildcard characters.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate(&name).map_err(|reason| ModelError::InvalidNamespace {
            namespace: name.clone(),
            reason,
        })?;
        Ok(Self(Cow::Owned(name)))
    }

    /// Build a namespace from a literal known to be well-formed.
    ///
    /// Used for the built-in namespaces; no validation happens here.
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR)
    }

    /// Whether `prefix` names whole leading segments of `self`, with at least
    /// one segment left over.
    #[must_use]
    pub fn has_prefix(&self, prefix: &Namespace) -> bool {
        self.0
            .strip_prefix(prefix.as_str())
            .is_some_and(|rest| rest.starts_with(SEPARATOR))
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Namespace {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for Namespace {
    type Error = ModelError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

fn validate(name: &str) -> std::result::Result<(), &'static str> {
    if name.is_empty() {
        return Err("namespace is empty");
    }
    if name.contains('*') {
        return Err("wildcards are only allowed in patterns");
    }
    if name.split(SEPARATOR).any(str::is_empty) {
        return Err("empty segment");
    }
    Ok(())
}

/// What a subscription listens to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Pattern {
    /// A single namespace.
    Exact(Namespace),
    /// Every namespace below the given prefix (`prefix.*`).
    Prefix(Namespace),
    /// Every namespace (`*`).
    Any,
}

impl Pattern {
    /// Parse `name`, `prefix.*` or `*`.
    pub fn parse(pattern: &str) -> Result<Self> {
        let invalid = |reason| ModelError::InvalidPattern {
            pattern: pattern.to_owned(),
            reason,
        };

        if pattern == WILDCARD {
            return Ok(Self::Any);
        }
        if let Some(prefix) = pattern.strip_suffix(".*") {
            validate(prefix).map_err(invalid)?;
            return Ok(Self::Prefix(Namespace(Cow::Owned(prefix.to_owned()))));
        }
        validate(pattern).map_err(invalid)?;
        Ok(Self::Exact(Namespace(Cow::Owned(pattern.to_owned()))))
    }

    #[must_use]
    pub fn matches(&self, namespace: &Namespace) -> bool {
        match self {
            Self::Exact(exact) => exact == namespace,
            Self::Prefix(prefix) => namespace.has_prefix(prefix),
            Self::Any => true,
        }
    }

    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        !matches!(self, Self::Exact(_))
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(ns) => write!(f, "{ns}"),
            Self::Prefix(ns) => write!(f, "{ns}.*"),
            Self::Any => f.write_str(WILDCARD),
        }
    }
}

impl From<Namespace> for Pattern {
    fn from(namespace: Namespace) -> Self {
        Self::Exact(namespace)
    }
}

impl TryFrom<&str> for Pattern {
    type Error = ModelError;

    fn try_from(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}
