//! Native Host - The abstract native-node capability.
//!
//! The reconciler never touches a concrete widget toolkit. Everything it does
//! to the native tree goes through [`NativeHost`]: create nodes, set
//! attributes, properties and styles, subscribe listeners, insert and remove.
//! Node handles are small cloneable values (ids, pointers) owned by the host.
//!
//! [`MemoryHost`] is an in-memory implementation with a mutation log, used by
//! the tests and handy for headless rendering.

mod memory;

pub use memory::{MemoryHost, MemoryNode, Mutation};

use std::fmt;
use std::hash::Hash;

use crate::error::HostError;
use crate::types::PropValue;

/// Namespace used for elements created below an `svg` element.
pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// A native widget tree.
pub trait NativeHost {
    /// Handle to one native node.
    type Node: Clone + Eq + Hash + fmt::Debug + 'static;

    // -------------------------------------------------------------------------
    // Creation
    // -------------------------------------------------------------------------

    /// Create an element. `namespace` is set for SVG creation mode; `is`
    /// names a customized built-in.
    fn create_element(&mut self, tag: &str, namespace: Option<&str>, is: Option<&str>) -> Self::Node;

    fn create_text(&mut self, text: &str) -> Self::Node;

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    fn is_text(&self, node: &Self::Node) -> bool;

    /// Tag of an element, `None` for text nodes.
    fn local_name(&self, node: &Self::Node) -> Option<String>;

    /// Content of a text node.
    fn text(&self, node: &Self::Node) -> Option<String>;

    /// Current attributes, in document order.
    fn attributes(&self, node: &Self::Node) -> Vec<(String, String)>;

    /// Whether `name` is a settable native property of this node.
    fn has_property(&self, node: &Self::Node, name: &str) -> bool;

    /// Current value of a native property.
    fn property(&self, node: &Self::Node, name: &str) -> Option<PropValue>;

    /// Whether `event` (lower-cased, no `on` prefix) is a built-in event
    /// of this node.
    fn is_builtin_event(&self, node: &Self::Node, event: &str) -> bool;

    fn inner_html(&self, node: &Self::Node) -> String;

    fn child_nodes(&self, node: &Self::Node) -> Vec<Self::Node>;

    fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

    fn next_sibling(&self, node: &Self::Node) -> Option<Self::Node>;

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    fn set_text(&mut self, node: &Self::Node, text: &str);

    fn set_attribute(&mut self, node: &Self::Node, name: &str, value: &str);

    fn remove_attribute(&mut self, node: &Self::Node, name: &str);

    /// Assign a native property. Failures are reported, never panics.
    fn set_property(&mut self, node: &Self::Node, name: &str, value: &PropValue) -> Result<(), HostError>;

    /// Replace the whole inline style text.
    fn set_style_text(&mut self, node: &Self::Node, css: &str);

    /// Set one style entry; `None` clears it. Names starting with `-` are
    /// custom properties and are stored as written.
    fn set_style(&mut self, node: &Self::Node, name: &str, value: Option<&str>);

    fn add_listener(&mut self, node: &Self::Node, event: &str, capture: bool);

    fn remove_listener(&mut self, node: &Self::Node, event: &str, capture: bool);

    fn set_inner_html(&mut self, node: &Self::Node, html: &str);

    /// Insert `child` into `parent` before `before`, or append when `before`
    /// is `None`. Moves the child if it is already attached.
    fn insert_before(&mut self, parent: &Self::Node, child: &Self::Node, before: Option<&Self::Node>);

    /// Detach `node` from its parent. No-op when detached.
    fn remove(&mut self, node: &Self::Node);
}
