#![forbid(unsafe_code)]

//! Error type shared by the model, its notification channel and the
//! argument-shape dispatcher.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Attempted to write a property that only has a getter.
    #[error("property is read-only: {property}")]
    ReadOnly { property: &'static str },

    /// [`Model::call`](crate::Model::call) received an argument list that
    /// matches none of its call shapes.
    #[error("unsupported call shape: ({shape})")]
    UnsupportedCall { shape: String },

    #[error("invalid namespace {namespace:?}: {reason}")]
    InvalidNamespace {
        namespace: String,
        reason: &'static str,
    },

    #[error("invalid subscription pattern {pattern:?}: {reason}")]
    InvalidPattern {
        pattern: String,
        reason: &'static str,
    },
}

impl ModelError {
    #[must_use]
    pub fn read_only(property: &'static str) -> Self {
        Self::ReadOnly { property }
    }

    #[must_use]
    pub fn unsupported(shape: impl Into<String>) -> Self {
        Self::UnsupportedCall {
            shape: shape.into(),
        }
    }
}
