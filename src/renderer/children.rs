//! Child reconciliation.
//!
//! [`ChildReconciler`] is the seam through which a parent's rendered child
//! list is matched against its previous children. [`PositionalChildren`] is
//! the default: same position first, then a linear scan for a sibling with
//! the same key and type.

use crate::engine::{
    create_vnode, text, ComponentId, ComponentType, GlobalContext, NextDom, NodeId, NodeType, VNode,
};
use crate::error::RenderError;
use crate::host::NativeHost;
use crate::types::{Child, Props, Ref, RefValue};

use super::Reconciler;

// =============================================================================
// Sibling pool
// =============================================================================

/// Native nodes not yet claimed by any descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct SiblingPool<N>(Vec<Option<N>>);

impl<N> Default for SiblingPool<N> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<N: Clone + PartialEq> SiblingPool<N> {
    pub fn new(nodes: impl IntoIterator<Item = N>) -> Self {
        Self(nodes.into_iter().map(Some).collect())
    }

    /// First entry, claimed or not.
    pub fn first(&self) -> Option<N> {
        self.0.first().cloned().flatten()
    }

    /// Claim the first unclaimed node accepted by `matches`.
    pub fn claim_where(&mut self, mut matches: impl FnMut(&N) -> bool) -> Option<N> {
        self.0
            .iter_mut()
            .find(|slot| slot.as_ref().is_some_and(&mut matches))
            .and_then(Option::take)
    }

    /// Mark `node` claimed.
    pub fn claim(&mut self, node: &N) {
        if let Some(slot) = self.0.iter_mut().find(|slot| slot.as_ref() == Some(node)) {
            *slot = None;
        }
    }

    /// Unclaimed nodes, in order.
    pub fn remaining(&self) -> impl DoubleEndedIterator<Item = &N> {
        self.0.iter().flatten()
    }
}

// =============================================================================
// Coercion
// =============================================================================

/// Turn a renderable into a descriptor. Empty values leave a hole; text
/// becomes a text descriptor; a nested list becomes a fragment.
pub fn coerce_child(child: Child) -> Option<VNode> {
    match child {
        Child::Empty => None,
        Child::Text(content) => Some(text(content)),
        Child::Node(vnode) => Some(vnode),
        Child::List(items) => Some(create_vnode(
            NodeType::Component(ComponentType::fragment()),
            Props::new().with("children", Child::List(items)),
            None,
            None,
            None,
        )),
    }
}

// =============================================================================
// Seam
// =============================================================================

/// Matches a parent's new child list against its previous children.
///
/// Implementations allocate a record per new child under `new_parent`, call
/// [`Reconciler::diff`] for each, place the resulting native nodes inside
/// `parent_dom` around `anchor`, apply changed refs, unmount old children
/// nobody matched, and release the old records they consumed.
pub trait ChildReconciler<H: NativeHost> {
    #[allow(clippy::too_many_arguments)]
    fn diff_children(
        &self,
        reconciler: &mut Reconciler<H>,
        parent_dom: &H::Node,
        children: Vec<Child>,
        new_parent: NodeId,
        old_parent: Option<NodeId>,
        global: &GlobalContext,
        svg: bool,
        pool: Option<&mut SiblingPool<H::Node>>,
        queue: &mut Vec<ComponentId>,
        anchor: Option<H::Node>,
        hydrating: bool,
    ) -> Result<(), RenderError>;
}

/// Default child matching: positional, falling back to a key + type scan.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionalChildren;

impl PositionalChildren {
    /// Take the old child matching `vnode`, preferring `index`.
    ///
    /// An empty slot that was a hole in the old list stays unmatched; a slot
    /// emptied by an earlier match falls through to the scan.
    fn take_match<H: NativeHost>(
        r: &mut Reconciler<H>,
        old_parent: Option<NodeId>,
        index: usize,
        vnode: &VNode,
        taken: &mut [bool],
    ) -> Option<NodeId> {
        let old_parent = old_parent?;
        let old_children = r.tree().get(old_parent)?.children().to_vec();

        let matches = |id: &NodeId| {
            r.tree().get(*id).is_some_and(|old| {
                old.vnode().key() == vnode.key() && old.vnode().ty() == vnode.ty()
            })
        };

        let position = match old_children.get(index) {
            Some(None) if !taken.get(index).copied().unwrap_or(false) => return None,
            Some(Some(id)) if matches(id) => index,
            _ => old_children
                .iter()
                .position(|slot| slot.as_ref().is_some_and(&matches))?,
        };

        if let Some(flag) = taken.get_mut(position) {
            *flag = true;
        }
        r.tree_mut().take_child(old_parent, position)
    }
}

impl<H: NativeHost> ChildReconciler<H> for PositionalChildren {
    fn diff_children(
        &self,
        r: &mut Reconciler<H>,
        parent_dom: &H::Node,
        children: Vec<Child>,
        new_parent: NodeId,
        old_parent: Option<NodeId>,
        global: &GlobalContext,
        svg: bool,
        mut pool: Option<&mut SiblingPool<H::Node>>,
        queue: &mut Vec<ComponentId>,
        anchor: Option<H::Node>,
        hydrating: bool,
    ) -> Result<(), RenderError> {
        let old_count = old_parent
            .and_then(|id| r.tree().get(id))
            .map_or(0, |record| record.children().len());
        let parent_is_component = r
            .tree()
            .get(new_parent)
            .is_some_and(|record| record.vnode().is_component());

        let mut anchor = anchor;
        let mut first_dom = None;
        let mut taken = vec![false; old_count];
        let mut refs: Vec<(Ref, Option<RefValue>, NodeId)> = Vec::new();

        r.tree_mut().reset_children(new_parent);

        for (index, child) in children.into_iter().enumerate() {
            let Some(vnode) = coerce_child(child) else {
                r.tree_mut().push_child(new_parent, None);
                continue;
            };

            let id = r.tree_mut().insert(vnode.clone(), Some(new_parent));
            r.tree_mut().push_child(new_parent, Some(id));

            let old = Self::take_match(r, old_parent, index, &vnode, &mut taken);
            let result = r.diff(
                parent_dom,
                id,
                old,
                global,
                svg,
                pool.as_deref_mut(),
                queue,
                anchor.clone(),
                hydrating,
            );
            if let Err(error) = result {
                if let Some(old) = old {
                    r.tree_mut().release(old);
                }
                return Err(error);
            }

            let old_record = old.and_then(|old| r.tree().get(old));
            let old_ref = old_record.and_then(|record| record.vnode().node_ref().cloned());
            let old_dom = old_record.and_then(|record| record.dom().cloned());
            let record = r.tree().get(id);
            let new_dom = record.and_then(|record| record.dom().cloned());
            let component = record.and_then(|record| record.component());

            if let Some(new_ref) = vnode.node_ref() {
                if old_ref.as_ref() != Some(new_ref) {
                    if let Some(old_ref) = old_ref {
                        refs.push((old_ref, None, id));
                    }
                    let handle = match component {
                        Some(component) => Some(RefValue::Component(component)),
                        None => new_dom
                            .clone()
                            .map(|dom| RefValue::Native(std::rc::Rc::new(dom))),
                    };
                    refs.push((new_ref.clone(), handle, id));
                }
            }

            if let Some(new_dom) = new_dom {
                if first_dom.is_none() {
                    first_dom = Some(new_dom.clone());
                }

                let next = r.tree_mut().take_next_dom(id);
                anchor = if vnode.is_component() && next == NextDom::Unset {
                    // Bailed out: its descendants keep their records but may
                    // have to move.
                    reorder(r, id, anchor, parent_dom, old_count)
                } else {
                    place_child(r, parent_dom, next, &new_dom, anchor, old_count)
                };

                if parent_is_component {
                    r.tree_mut().set_next_dom(new_parent, anchor.clone());
                }
            } else if let (Some(current), Some(old)) = (anchor.as_ref(), old) {
                if old_dom.as_ref() == Some(current) && r.host().parent(current).as_ref() != Some(parent_dom) {
                    anchor = r.tree().dom_sibling(old, None);
                }
            }

            if let Some(old) = old {
                r.tree_mut().release(old);
            }
        }

        if parent_is_component {
            r.tree_mut().set_dom(new_parent, first_dom);
        }

        if let Some(old_parent) = old_parent {
            let remaining = r.tree_mut().take_children(old_parent);
            for old in remaining.into_iter().rev().flatten() {
                r.unmount(old, Some(new_parent), false)?;
            }
        }

        for (target, value, id) in refs {
            r.apply_ref(&target, value, Some(id))?;
        }

        Ok(())
    }
}

/// Put `dom` in place before `anchor`, returning the next anchor.
fn place_child<H: NativeHost>(
    r: &mut Reconciler<H>,
    parent_dom: &H::Node,
    next: NextDom<H::Node>,
    dom: &H::Node,
    anchor: Option<H::Node>,
    old_count: usize,
) -> Option<H::Node> {
    if let NextDom::Known(next) = next {
        return next;
    }

    let host = r.host_mut();
    if anchor.as_ref() == Some(dom) && host.parent(dom).is_some() {
        return host.next_sibling(dom);
    }

    match anchor {
        Some(anchor) if host.parent(&anchor).as_ref() == Some(parent_dom) => {
            // Already a little further along: leave it there.
            let mut sibling = host.next_sibling(&anchor);
            let mut scanned = 0;
            while let Some(node) = sibling {
                if scanned >= old_count {
                    break;
                }
                if &node == dom {
                    return host.next_sibling(dom);
                }
                sibling = host.next_sibling(&node);
                scanned += 2;
            }

            host.insert_before(parent_dom, dom, Some(&anchor));
            Some(anchor)
        }
        _ => {
            host.insert_before(parent_dom, dom, None);
            None
        }
    }
}

/// Re-place the descendants of a bailed-out component.
fn reorder<H: NativeHost>(
    r: &mut Reconciler<H>,
    id: NodeId,
    mut anchor: Option<H::Node>,
    parent_dom: &H::Node,
    old_count: usize,
) -> Option<H::Node> {
    let children = r
        .tree()
        .get(id)
        .map(|record| record.children().to_vec())
        .unwrap_or_default();

    for child in children.into_iter().flatten() {
        r.tree_mut().set_parent(child, id);
        let Some(record) = r.tree().get(child) else {
            continue;
        };

        if record.vnode().is_component() {
            anchor = reorder(r, child, anchor, parent_dom, old_count);
        } else if let Some(dom) = record.dom().cloned() {
            anchor = place_child(r, parent_dom, NextDom::Unset, &dom, anchor, old_count);
        }
    }

    anchor
}
