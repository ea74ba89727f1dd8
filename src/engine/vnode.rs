//! Node Model - Descriptors and their reconciliation records.
//!
//! A [`VNode`] is an immutable description of one position in the declared
//! UI tree. It is cheap to clone and may be passed around freely; passing the
//! *same* descriptor again is how a component says "this subtree did not
//! change" (see [`VNode::original`]).
//!
//! The bookkeeping the reconciler attaches to a descriptor while diffing it
//! lives in a [`VNodeRecord`] inside the [`VNodeTree`] arena:
//!
//! ```text
//! VNode (shared, immutable)        VNodeRecord (arena slot, owned by the tree)
//! ├── type                         ├── vnode ──────────► VNode
//! ├── props / key / ref            ├── children: [Option<NodeId>]
//! ├── original                     ├── parent: Option<NodeId>  (never owning)
//! └── sentinel                     ├── dom, next_dom
//!                                  ├── component: Option<ComponentId>
//!                                  └── hydrating, original
//! ```

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::component::ComponentType;
use super::registry::{Arena, ComponentId, NodeId};
use crate::error::RenderError;
use crate::types::{fmt_number, Child, Key, PropValue, Props, Ref, SharedStr};

// =============================================================================
// Creation identity
// =============================================================================

/// Process-wide creation counter. Never reset; only incremented.
static VNODE_ID: AtomicU64 = AtomicU64::new(0);

fn next_original() -> u64 {
    VNODE_ID.fetch_add(1, Ordering::Relaxed) + 1
}

// =============================================================================
// Node type
// =============================================================================

/// What a descriptor renders to.
#[derive(Clone)]
pub enum NodeType {
    /// A native text node.
    Text,
    /// A native element with this tag.
    Element(SharedStr),
    /// A component.
    Component(ComponentType),
}

impl NodeType {
    pub fn is_component(&self) -> bool {
        matches!(self, NodeType::Component(_))
    }

    /// Element tag, for element types.
    pub fn tag(&self) -> Option<&str> {
        match self {
            NodeType::Element(tag) => Some(tag),
            _ => None,
        }
    }
}

impl PartialEq for NodeType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (NodeType::Text, NodeType::Text) => true,
            (NodeType::Element(a), NodeType::Element(b)) => a == b,
            (NodeType::Component(a), NodeType::Component(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeType::Text => write!(f, "#text"),
            NodeType::Element(tag) => write!(f, "<{tag}>"),
            NodeType::Component(ty) => write!(f, "<{}/>", ty.name()),
        }
    }
}

impl From<&str> for NodeType {
    fn from(tag: &str) -> Self {
        NodeType::Element(tag.into())
    }
}

impl From<ComponentType> for NodeType {
    fn from(ty: ComponentType) -> Self {
        NodeType::Component(ty)
    }
}

impl From<&ComponentType> for NodeType {
    fn from(ty: &ComponentType) -> Self {
        NodeType::Component(ty.clone())
    }
}

// =============================================================================
// VNode - the descriptor
// =============================================================================

struct VNodeData {
    ty: NodeType,
    props: Props,
    text: Option<SharedStr>,
    key: Option<Key>,
    node_ref: Option<Ref>,
    original: u64,
    sentinel: Option<SharedStr>,
}

/// Descriptor for one position in the declared tree.
#[derive(Clone)]
pub struct VNode(Rc<VNodeData>);

impl VNode {
    /// Descriptor type. Fixed at construction.
    pub fn ty(&self) -> &NodeType {
        &self.0.ty
    }

    /// Normalized properties (never contains `key` or `ref`).
    pub fn props(&self) -> &Props {
        &self.0.props
    }

    /// Content of a text descriptor.
    pub fn text(&self) -> Option<&str> {
        self.0.text.as_deref()
    }

    pub fn key(&self) -> Option<&Key> {
        self.0.key.as_ref()
    }

    pub fn node_ref(&self) -> Option<&Ref> {
        self.0.node_ref.as_ref()
    }

    /// Creation identity. Equal identities mean "this is literally the same
    /// descriptor being passed again".
    pub fn original(&self) -> u64 {
        self.0.original
    }

    /// Component type, for component descriptors.
    pub fn component_type(&self) -> Option<&ComponentType> {
        match &self.0.ty {
            NodeType::Component(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn is_component(&self) -> bool {
        self.0.ty.is_component()
    }

    /// Whether this is the built-in grouping placeholder.
    pub fn is_fragment(&self) -> bool {
        self.component_type().is_some_and(ComponentType::is_fragment)
    }

    /// A value is a genuine descriptor only if its sentinel is unset.
    pub fn is_valid(&self) -> bool {
        self.0.sentinel.is_none()
    }

    /// Whether both handles are the same descriptor allocation.
    pub fn ptr_eq(&self, other: &VNode) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Copy this descriptor, keeping its creation identity.
    pub fn copy(&self) -> VNode {
        create_vnode_inner(
            self.0.ty.clone(),
            self.0.props.clone(),
            self.0.text.clone(),
            self.0.key.clone(),
            self.0.node_ref.clone(),
            Some(self.0.original),
        )
    }
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("VNode");
        s.field("type", &self.0.ty).field("original", &self.0.original);
        if let Some(key) = &self.0.key {
            s.field("key", key);
        }
        if let Some(text) = &self.0.text {
            s.field("text", text);
        }
        s.finish()
    }
}

/// Descriptor-shaped data from outside the factory (deserialized input,
/// foreign bridges). Carries the reserved sentinel field as-is.
#[derive(Clone, Debug)]
pub struct RawVNode {
    pub ty: NodeType,
    pub props: Props,
    pub key: Option<Key>,
    /// Reserved. Any value here marks the data as not a descriptor.
    pub sentinel: Option<String>,
}

impl VNode {
    /// Adopt externally supplied descriptor data.
    ///
    /// The sentinel is preserved; the reconciler refuses to process the
    /// result when it is set.
    pub fn from_raw(raw: RawVNode) -> VNode {
        VNode(Rc::new(VNodeData {
            ty: raw.ty,
            props: raw.props,
            text: None,
            key: raw.key,
            node_ref: None,
            original: next_original(),
            sentinel: raw.sentinel.map(Into::into),
        }))
    }
}

/// Check whether a value is a genuine descriptor.
pub fn is_valid_element(vnode: &VNode) -> bool {
    vnode.is_valid()
}

// =============================================================================
// Factory
// =============================================================================

fn key_from(value: &PropValue) -> Option<Key> {
    match value {
        PropValue::Str(s) => Some(s.clone()),
        PropValue::Number(n) => Some(fmt_number(*n).into()),
        _ => None,
    }
}

/// Create a descriptor.
///
/// `key` and `ref` are pulled out of `raw` and never stored in the props.
/// One child is stored verbatim under `children`; several are collected into
/// a list; none leaves whatever `raw` had. Component default props fill any
/// property still absent.
pub fn create_element(ty: impl Into<NodeType>, raw: Props, children: Vec<Child>) -> VNode {
    let ty = ty.into();
    let mut key = None;
    let mut node_ref = None;
    let mut props = Props::new();

    for (name, value) in raw.iter() {
        match name {
            "key" => key = key_from(value),
            "ref" => {
                if let PropValue::Ref(r) = value {
                    node_ref = Some(r.clone());
                }
            }
            _ => props.insert(name, value.clone()),
        }
    }

    match children.len() {
        0 => {}
        1 => {
            let child = children.into_iter().next().unwrap_or_default();
            props.insert("children", PropValue::Children(child));
        }
        _ => props.insert("children", PropValue::Children(Child::List(children))),
    }

    if let NodeType::Component(component) = &ty {
        if let Some(defaults) = component.default_props() {
            for (name, value) in defaults.iter() {
                if !props.contains(name) {
                    props.insert(name, value.clone());
                }
            }
        }
    }

    create_vnode(ty, props, key, node_ref, None)
}

/// Create a descriptor from already-normalized parts.
///
/// Passing `original` propagates a prior creation identity instead of
/// minting a new one.
pub fn create_vnode(
    ty: NodeType,
    props: Props,
    key: Option<Key>,
    node_ref: Option<Ref>,
    original: Option<u64>,
) -> VNode {
    create_vnode_inner(ty, props, None, key, node_ref, original)
}

fn create_vnode_inner(
    ty: NodeType,
    props: Props,
    text: Option<SharedStr>,
    key: Option<Key>,
    node_ref: Option<Ref>,
    original: Option<u64>,
) -> VNode {
    VNode(Rc::new(VNodeData {
        ty,
        props,
        text,
        key,
        node_ref,
        original: original.unwrap_or_else(next_original),
        sentinel: None,
    }))
}

/// Create a text descriptor.
pub fn text(content: impl Into<SharedStr>) -> VNode {
    create_vnode_inner(NodeType::Text, Props::new(), Some(content.into()), None, None, None)
}

/// Create a grouping placeholder around `children`.
pub fn fragment(children: Vec<Child>) -> VNode {
    create_element(ComponentType::fragment(), Props::new(), children)
}

/// Copy `vnode` with property overrides and, when non-empty, new children.
///
/// `key` and `ref` overrides are honored. The copy gets a fresh identity.
pub fn clone_element(vnode: &VNode, overrides: Props, children: Vec<Child>) -> VNode {
    let mut props = vnode.props().clone();
    let mut key = vnode.key().cloned();
    let mut node_ref = vnode.node_ref().cloned();

    for (name, value) in overrides.iter() {
        match name {
            "key" => key = key_from(value),
            "ref" => {
                if let PropValue::Ref(r) = value {
                    node_ref = Some(r.clone());
                }
            }
            _ => props.insert(name, value.clone()),
        }
    }

    match children.len() {
        0 => {}
        1 => {
            let child = children.into_iter().next().unwrap_or_default();
            props.insert("children", PropValue::Children(child));
        }
        _ => props.insert("children", PropValue::Children(Child::List(children))),
    }

    create_vnode_inner(
        vnode.ty().clone(),
        props,
        vnode.0.text.clone(),
        key,
        node_ref,
        None,
    )
}

// =============================================================================
// Records
// =============================================================================

/// Cached next native sibling.
///
/// `Unset` (not computed this pass) is distinct from `Known(None)` (computed,
/// and there is no sibling).
#[derive(Clone, Debug, PartialEq)]
pub enum NextDom<N> {
    Unset,
    Known(Option<N>),
}

impl<N> Default for NextDom<N> {
    fn default() -> Self {
        NextDom::Unset
    }
}

impl<N> NextDom<N> {
    /// Read and reset to `Unset`.
    pub fn take(&mut self) -> NextDom<N> {
        std::mem::take(self)
    }
}

/// Reconciliation bookkeeping for one tree position.
pub struct VNodeRecord<N> {
    pub(crate) vnode: VNode,
    /// `None` once invalidated by a failed diff.
    pub(crate) original: Option<u64>,
    pub(crate) children: Option<Vec<Option<NodeId>>>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) depth: u32,
    pub(crate) dom: Option<N>,
    pub(crate) next_dom: NextDom<N>,
    pub(crate) component: Option<ComponentId>,
    /// `Some(mode)` while paused mid-hydration (or mid-creation).
    pub(crate) hydrating: Option<bool>,
}

impl<N: Clone> VNodeRecord<N> {
    fn new(vnode: VNode, parent: Option<NodeId>, depth: u32) -> Self {
        Self {
            original: Some(vnode.original()),
            vnode,
            children: None,
            parent,
            depth,
            dom: None,
            next_dom: NextDom::Unset,
            component: None,
            hydrating: None,
        }
    }

    pub fn vnode(&self) -> &VNode {
        &self.vnode
    }

    /// Native node created for this position (first child's node for
    /// components).
    pub fn dom(&self) -> Option<&N> {
        self.dom.as_ref()
    }

    /// Child records. Holes are unmounted or empty positions.
    pub fn children(&self) -> &[Option<NodeId>] {
        self.children.as_deref().unwrap_or(&[])
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn component(&self) -> Option<ComponentId> {
        self.component
    }

    /// Whether a failed pass left this position paused for resumption.
    pub fn is_paused(&self) -> bool {
        self.hydrating.is_some()
    }

    pub fn original(&self) -> Option<u64> {
        self.original
    }
}

/// Whether two identities prove the same descriptor is being passed again.
pub(crate) fn same_original(a: Option<u64>, b: Option<u64>) -> bool {
    matches!((a, b), (Some(x), Some(y)) if x == y)
}

// =============================================================================
// Tree
// =============================================================================

/// Arena of records for the reconciled tree.
pub struct VNodeTree<N> {
    records: Arena<NodeId, VNodeRecord<N>>,
}

impl<N> Default for VNodeTree<N> {
    fn default() -> Self {
        Self {
            records: Arena::with_key(),
        }
    }
}

impl<N: Clone + PartialEq> VNodeTree<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a record for `vnode` under `parent`.
    pub fn insert(&mut self, vnode: VNode, parent: Option<NodeId>) -> NodeId {
        let depth = parent
            .and_then(|p| self.records.get(p))
            .map_or(0, |p| p.depth + 1);
        self.records.insert(VNodeRecord::new(vnode, parent, depth))
    }

    /// Allocate a record directly (used for detached copies).
    pub(crate) fn insert_record(&mut self, record: VNodeRecord<N>) -> NodeId {
        self.records.insert(record)
    }

    /// Free one record. Its children are not touched.
    pub fn release(&mut self, id: NodeId) -> Option<VNodeRecord<N>> {
        self.records.remove(id)
    }

    pub fn get(&self, id: NodeId) -> Option<&VNodeRecord<N>> {
        self.records.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut VNodeRecord<N>> {
        self.records.get_mut(id)
    }

    /// Like [`get`](Self::get) but a stale id is an error.
    pub fn record(&self, id: NodeId) -> Result<&VNodeRecord<N>, RenderError> {
        self.records.get(id).ok_or(RenderError::StaleNode(id))
    }

    /// Like [`get_mut`](Self::get_mut) but a stale id is an error.
    pub fn record_mut(&mut self, id: NodeId) -> Result<&mut VNodeRecord<N>, RenderError> {
        self.records.get_mut(id).ok_or(RenderError::StaleNode(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.records.contains_key(id)
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.records.get(id).and_then(|r| r.parent)
    }

    // -------------------------------------------------------------------------
    // Bookkeeping used by child reconcilers
    // -------------------------------------------------------------------------

    /// Start a fresh child list for `id`.
    pub fn reset_children(&mut self, id: NodeId) {
        if let Some(record) = self.records.get_mut(id) {
            record.children = Some(Vec::new());
        }
    }

    /// Append a position (or a hole) to `id`'s child list.
    pub fn push_child(&mut self, id: NodeId, child: Option<NodeId>) {
        if let Some(record) = self.records.get_mut(id) {
            record.children.get_or_insert_with(Vec::new).push(child);
        }
    }

    /// Take the child at `index`, leaving a hole.
    pub fn take_child(&mut self, id: NodeId, index: usize) -> Option<NodeId> {
        self.records
            .get_mut(id)?
            .children
            .as_mut()?
            .get_mut(index)?
            .take()
    }

    /// Take every remaining child, leaving an empty list.
    pub fn take_children(&mut self, id: NodeId) -> Vec<Option<NodeId>> {
        self.records
            .get_mut(id)
            .and_then(|record| record.children.as_mut())
            .map(std::mem::take)
            .unwrap_or_default()
    }

    pub fn set_parent(&mut self, id: NodeId, parent: NodeId) {
        if let Some(record) = self.records.get_mut(id) {
            record.parent = Some(parent);
        }
    }

    pub fn set_dom(&mut self, id: NodeId, dom: Option<N>) {
        if let Some(record) = self.records.get_mut(id) {
            record.dom = dom;
        }
    }

    /// Read and reset the cached next sibling.
    pub fn take_next_dom(&mut self, id: NodeId) -> NextDom<N> {
        self.records
            .get_mut(id)
            .map(|record| record.next_dom.take())
            .unwrap_or_default()
    }

    pub fn set_next_dom(&mut self, id: NodeId, next: Option<N>) {
        if let Some(record) = self.records.get_mut(id) {
            record.next_dom = NextDom::Known(next);
        }
    }

    /// Native node that follows `id`'s subtree.
    ///
    /// With `from` set, searches `id`'s own children starting at that
    /// position; component records with nothing there continue to their
    /// parent's following siblings.
    pub fn dom_sibling(&self, id: NodeId, from: Option<usize>) -> Option<N> {
        let record = self.records.get(id)?;

        let Some(start) = from else {
            let parent = record.parent?;
            let index = self
                .records
                .get(parent)?
                .children()
                .iter()
                .position(|child| *child == Some(id))
                .map_or(0, |i| i + 1);
            return self.dom_sibling(parent, Some(index));
        };

        for child in record.children().iter().skip(start).flatten() {
            if let Some(dom) = self.records.get(*child).and_then(|c| c.dom.clone()) {
                return Some(dom);
            }
        }

        if record.vnode.is_component() {
            self.dom_sibling(id, None)
        } else {
            None
        }
    }

    /// Native nodes directly owned by `id`'s subtree, in document order.
    ///
    /// Component records contribute their descendants' nodes.
    pub fn native_nodes(&self, id: NodeId) -> Vec<N> {
        let mut out = Vec::new();
        self.collect_native(id, &mut out);
        out
    }

    fn collect_native(&self, id: NodeId, out: &mut Vec<N>) {
        let Some(record) = self.records.get(id) else {
            return;
        };
        if record.vnode.is_component() {
            for child in record.children().iter().flatten() {
                self.collect_native(*child, out);
            }
        } else if let Some(dom) = &record.dom {
            out.push(dom.clone());
        }
    }
}
