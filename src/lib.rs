//! # spark-reconcile
//!
//! Virtual-tree reconciliation for native widget trees.
//!
//! Components describe the UI they want as a tree of immutable [`VNode`]
//! descriptors. The [`Reconciler`] diffs each new tree against the one it
//! rendered last time and applies the minimal set of mutations to a native
//! tree behind the [`NativeHost`] trait: create and move nodes, set
//! attributes, properties and styles, subscribe listeners. It runs the
//! component lifecycle along the way, routes failures to error boundaries and
//! flushes post-commit callbacks.
//!
//! ## Architecture
//!
//! ```text
//! VNode (descriptor) ─► Reconciler::diff ─► VNodeTree (records, arena)
//!                                        ├► Arena<Instance> (components)
//!                                        └► NativeHost (mutations)
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Property values, children, events, refs
//! - [`engine`] - Descriptors, records, arenas, components, context
//! - [`host`] - The native-node capability and an in-memory host
//! - [`renderer`] - Diff, element and property differs, boundaries, commit
//! - [`pipeline`] - Entry points, hook table, configuration
//! - [`error`] - Error types

pub mod engine;
pub mod error;
pub mod host;
pub mod pipeline;
pub mod renderer;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use error::{HostError, RenderError};

pub use engine::{
    clone_element, create_context, create_element, create_vnode, fragment, is_valid_element,
    text, CommitFlow, Component, ComponentContext, ComponentId, ComponentSpec, ComponentType,
    ContextKey, GlobalContext, Instance, InstanceFlags, Lifecycle, NodeId, NodeType, RawVNode,
    State, Updater, VNode, VNodeRecord, VNodeTree,
};

pub use host::{MemoryHost, MemoryNode, Mutation, NativeHost, SVG_NAMESPACE};

pub use renderer::{
    coerce_child, is_non_dimensional, BoundaryOutcome, ChildReconciler, PositionalChildren, Reconciler,
    SiblingPool,
};

pub use pipeline::{HaltPolicy, Options, RenderConfig};
