//! Index Registry - Arenas for descriptor records and instances.
//!
//! Both arenas are `SlotMap`s keyed by their own id type:
//! - Freed slots are reused
//! - Each key carries the slot version, so a stale id never aliases a reused slot
//! - `NodeId` and `ComponentId` are distinct types and cannot be mixed up
//!
//! Parent links in the descriptor tree are ids into this arena, never
//! references, so the tree has no ownership cycles.

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Id of a descriptor record in the reconciled tree.
    pub struct NodeId;

    /// Id of a component instance.
    pub struct ComponentId;
}

/// Arena of `T` addressed by the id type `I`.
pub type Arena<I, T> = SlotMap<I, T>;
