//! Error types for the reconciler.
//!
//! Every failure raised while diffing (a component's render or lifecycle
//! hook, a ref callback, a committed callback, a native host rejection) is a
//! [`RenderError`]. Errors are cloneable so boundary hooks can inspect them by
//! reference and the dispatcher can keep walking with the same value.

use thiserror::Error;

use crate::engine::{ComponentId, NodeId};

/// Failure reported by a [`NativeHost`](crate::host::NativeHost).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The native property exists but cannot be assigned.
    #[error("native property `{name}` is read-only")]
    ReadOnly { name: String },

    /// The native node refused the value.
    #[error("native node rejected `{name}`: {reason}")]
    Rejected { name: String, reason: String },
}

/// Failure raised during a diff pass or a commit flush.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    /// Raised by component code: render, lifecycle hooks, refs, callbacks.
    #[error("{message}")]
    Thrown { message: String },

    /// Raised by the native host while applying a mutation.
    #[error(transparent)]
    Host(#[from] HostError),

    /// The node id no longer addresses a live record.
    #[error("node {0:?} is not mounted")]
    StaleNode(NodeId),

    /// The component id no longer addresses a live instance.
    #[error("component {0:?} is not mounted")]
    StaleComponent(ComponentId),

    /// A component was asked to re-render before it was ever attached.
    #[error("component {0:?} has no native parent container")]
    MissingContainer(ComponentId),
}

impl RenderError {
    /// Build a [`RenderError::Thrown`] from any message.
    pub fn thrown(message: impl Into<String>) -> Self {
        Self::Thrown {
            message: message.into(),
        }
    }
}
