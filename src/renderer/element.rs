//! Element Differ.
//!
//! Creates or reuses the native node for an element or text position, diffs
//! its properties and recurses into its children.

use std::rc::Rc;

use tracing::trace;

use crate::engine::{ComponentId, GlobalContext, NodeId, NodeType};
use crate::error::RenderError;
use crate::host::{NativeHost, SVG_NAMESPACE};
use crate::types::{PropValue, Props};

use super::{Reconciler, SiblingPool, DANGEROUS_HTML};

impl<H: NativeHost> Reconciler<H> {
    /// Diff an element or text position. `dom` is the old position's native
    /// node, if any. The resulting node is stored on record `new`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn diff_element(
        &mut self,
        dom: Option<H::Node>,
        new: NodeId,
        old: Option<NodeId>,
        global: &GlobalContext,
        svg: bool,
        pool: Option<&mut SiblingPool<H::Node>>,
        queue: &mut Vec<ComponentId>,
        hydrating: bool,
    ) -> Result<(), RenderError> {
        let vnode = self.tree.record(new)?.vnode.clone();
        let old_vnode = old.and_then(|old| self.tree.get(old)).map(|record| record.vnode.clone());
        let tag = vnode.ty().tag().map(str::to_string);
        let svg = svg || tag.as_deref() == Some("svg");

        let mut dom = dom;
        let mut pool = pool;
        let mut hydrating = hydrating;

        if let Some(pool) = pool.as_deref_mut() {
            let host = &self.host;
            let claimed = pool.claim_where(|node| match &tag {
                Some(tag) => !host.is_text(node) && host.local_name(node).as_deref() == Some(tag),
                None => host.is_text(node),
            });
            if claimed.is_some() {
                dom = claimed;
            }
        }

        let dom = match dom {
            Some(dom) => dom,
            None => {
                let created = match (&tag, vnode.ty()) {
                    (Some(tag), _) => {
                        let is = if svg {
                            None
                        } else {
                            vnode.props().get("is").and_then(PropValue::as_str)
                        };
                        self.host
                            .create_element(tag, svg.then_some(SVG_NAMESPACE), is)
                    }
                    (None, NodeType::Text) => self.host.create_text(vnode.text().unwrap_or_default()),
                    (None, _) => return Ok(()),
                };
                trace!(?created, ty = ?vnode.ty(), "created native node");

                self.tree.record_mut(new)?.dom = Some(created.clone());
                if tag.is_none() {
                    return Ok(());
                }
                pool = None;
                hydrating = false;
                created
            }
        };
        self.tree.record_mut(new)?.dom = Some(dom.clone());

        let Some(tag) = tag else {
            let content = vnode.text().unwrap_or_default();
            let changed = match &old_vnode {
                Some(old) if self.config.skip_identical_text => old.text() != Some(content),
                Some(old) => !old.ptr_eq(&vnode),
                None => true,
            };
            if changed && (!hydrating || self.host.text(&dom).as_deref() != Some(content)) {
                self.host.set_text(&dom, content);
            }
            return Ok(());
        };

        let mut child_pool = pool.map(|_| SiblingPool::new(self.host.child_nodes(&dom)));

        let new_props = vnode.props().clone();
        let mut old_props = old_vnode.as_ref().map(|old| old.props().clone()).unwrap_or_default();
        let new_html = new_props.get(DANGEROUS_HTML).cloned();

        if !hydrating {
            if child_pool.is_some() {
                old_props = self.host.attributes(&dom).into_iter().collect::<Props>();
            }

            let old_html = old_props.get(DANGEROUS_HTML);
            if new_html.is_some() || old_html.is_some() {
                let markup = match &new_html {
                    Some(PropValue::Html(markup)) => Some(markup.to_string()),
                    _ => None,
                };
                let apply = match &markup {
                    None => true,
                    Some(markup) => {
                        old_html.is_none_or(|old| old != &PropValue::Html(markup.as_str().into()))
                            && *markup != self.host.inner_html(&dom)
                    }
                };
                if apply {
                    self.host.set_inner_html(&dom, markup.as_deref().unwrap_or_default());
                }
            }
        }

        self.diff_props(&dom, &new_props, &old_props, svg, hydrating);

        if new_html.is_some() {
            if let Some(old) = old {
                for child in self.tree.take_children(old).into_iter().flatten() {
                    self.unmount(child, Some(new), true)?;
                }
            }
            self.tree.reset_children(new);
        } else {
            let anchor = match &child_pool {
                Some(pool) => pool.first(),
                None => old.and_then(|old| self.tree.dom_sibling(old, Some(0))),
            };
            let children = new_props.children().into_list();

            let reconciler = Rc::clone(&self.children);
            reconciler.diff_children(
                self,
                &dom,
                children,
                new,
                old,
                global,
                svg && tag != "foreignObject",
                child_pool.as_mut(),
                queue,
                anchor,
                hydrating,
            )?;

            if let Some(pool) = &child_pool {
                let leftover: Vec<_> = pool.remaining().rev().cloned().collect();
                for node in leftover {
                    self.host.remove(&node);
                }
            }
        }

        if !hydrating {
            // A present `Null` clears the control: `value` to "", `checked` to false.
            if let Some(value) = new_props.get("value") {
                let old_value = old_props.get("value");
                let native = match value {
                    PropValue::Null => PropValue::from(""),
                    other => other.clone(),
                };
                if old_value != Some(value)
                    || self.host.property(&dom, "value") != Some(native)
                    || (tag == "progress" && value.is_falsy())
                {
                    self.set_property(&dom, "value", value, old_value, false);
                }
            }
            if let Some(checked) = new_props.get("checked") {
                let native = PropValue::Bool(!checked.is_falsy());
                if self.host.property(&dom, "checked") != Some(native) {
                    self.set_property(&dom, "checked", checked, old_props.get("checked"), false);
                }
            }
        }

        Ok(())
    }
}
