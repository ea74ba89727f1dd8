//! Engine - Descriptors, components, and the arenas that hold them.
//!
//! - Registry: generational arenas and typed ids
//! - VNode: the descriptor, its factory, and per-position records
//! - Component: capability surface, instances, and the state container
//! - Context: the ambient mapping and context providers
//!
//! # Architecture
//!
//! The reconciled tree is not a graph of objects. Every position is a record
//! in an arena, addressed by [`NodeId`]; parents are ids, never references:
//!
//! ```text
//! n0: <div>       parent=-   children=[n1, n2]
//! n1: <Counter/>  parent=n0  children=[n3]     component=c0
//! n2: #text       parent=n0  children=[]
//! n3: <span>      parent=n1  children=[]
//! ```

mod component;
mod context;
mod registry;
mod vnode;

pub use component::*;
pub use context::*;
pub use registry::*;
pub use vnode::*;
