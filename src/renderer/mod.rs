//! Renderer - The reconciler.
//!
//! Turns descriptor trees into native mutations:
//!
//! ```text
//! render(child) ─► diff ─┬─► component branch ─► render() ─► diff_children ─┐
//!                        └─► diff_element ─► diff_props                     │
//!                                         └─► diff_children ◄───────────────┘
//!                 on failure ─► catch_error (boundary walk)
//!                 after pass ─► commit_root (queued callbacks)
//! ```
//!
//! The [`Reconciler`] owns the host, the record arena, the instance arena and
//! the listener registry. The list-matching step is a seam
//! ([`ChildReconciler`]); [`PositionalChildren`] is the default.

mod catch_error;
mod children;
mod commit;
mod diff;
mod element;
mod props;

pub use catch_error::BoundaryOutcome;
pub use children::{coerce_child, ChildReconciler, PositionalChildren, SiblingPool};
pub use props::{is_non_dimensional, Listeners};

use std::collections::HashMap;
use std::rc::Rc;

use crate::engine::{Arena, ComponentId, ComponentType, Instance, NodeId, VNodeTree};
use crate::host::NativeHost;
use crate::pipeline::{Options, RenderConfig};

/// Property holding raw HTML content.
pub const DANGEROUS_HTML: &str = "dangerouslySetInnerHTML";

/// Reconciles descriptor trees against one native host.
pub struct Reconciler<H: NativeHost> {
    pub(crate) host: H,
    pub(crate) tree: VNodeTree<H::Node>,
    pub(crate) instances: Arena<ComponentId, Instance<H::Node>>,
    pub(crate) listeners: Listeners<H::Node>,
    pub(crate) options: Options,
    pub(crate) config: RenderConfig,
    pub(crate) children: Rc<dyn ChildReconciler<H>>,
    /// Root record per container.
    pub(crate) roots: HashMap<H::Node, NodeId>,
}

impl<H: NativeHost> Reconciler<H> {
    pub fn new(host: H) -> Self {
        Self::with_config(host, RenderConfig::default())
    }

    pub fn with_config(host: H, config: RenderConfig) -> Self {
        Self {
            host,
            tree: VNodeTree::new(),
            instances: Arena::with_key(),
            listeners: Listeners::default(),
            options: Options::default(),
            config,
            children: Rc::new(PositionalChildren),
            roots: HashMap::new(),
        }
    }

    /// Replace the list-matching step.
    pub fn with_child_reconciler(mut self, children: impl ChildReconciler<H> + 'static) -> Self {
        self.children = Rc::new(children);
        self
    }

    /// Replace the extension hook table.
    pub fn set_options(&mut self, options: Options) {
        self.options = options;
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// The record arena.
    pub fn tree(&self) -> &VNodeTree<H::Node> {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut VNodeTree<H::Node> {
        &mut self.tree
    }

    pub fn instance(&self, id: ComponentId) -> Option<&Instance<H::Node>> {
        self.instances.get(id)
    }

    /// Live instances of `ty`, in arena order.
    pub fn instances_of(&self, ty: &ComponentType) -> Vec<ComponentId> {
        self.instances
            .iter()
            .filter(|(_, instance)| instance.component_type().ptr_eq(ty))
            .map(|(id, _)| id)
            .collect()
    }

    /// Root record rendered into `container`.
    pub fn root(&self, container: &H::Node) -> Option<NodeId> {
        self.roots.get(container).copied()
    }

    /// Listener registry.
    pub fn listeners(&self) -> &Listeners<H::Node> {
        &self.listeners
    }
}
