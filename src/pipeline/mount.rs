//! Mount API - Top-level entry points.
//!
//! `render` and `hydrate` reconcile a renderable into a native container;
//! `render_dirty` re-renders components whose state changed since their last
//! render; `dispatch_event` delivers a host event to the handler registered
//! for it.
//!
//! # Example
//!
//! ```ignore
//! use spark_reconcile::{create_element, MemoryHost, Props, Reconciler};
//!
//! let mut host = MemoryHost::new();
//! let root = host.container();
//! let mut reconciler = Reconciler::new(host);
//!
//! reconciler.render(create_element("p", Props::new(), vec!["hi".into()]).into(), &root)?;
//! assert_eq!(reconciler.host().inner_markup(root), "<p>hi</p>");
//! ```

use tracing::{debug, warn};

use crate::engine::{
    create_element, ComponentId, ComponentType, GlobalContext, InstanceFlags, NextDom, NodeId,
    VNodeRecord,
};
use crate::error::RenderError;
use crate::host::NativeHost;
use crate::renderer::{Reconciler, SiblingPool};
use crate::types::{Child, Event, Props};

impl<H: NativeHost> Reconciler<H> {
    /// Render `child` into `container`, reconciling against whatever was
    /// rendered there before.
    ///
    /// On the first render into a non-empty container the existing native
    /// children are offered for reuse; any the new tree does not claim stay
    /// in place.
    pub fn render(&mut self, child: Child, container: &H::Node) -> Result<(), RenderError> {
        self.render_root(child, container, false)
    }

    /// Adopt the native children already in `container` (server-rendered
    /// markup) instead of creating new ones. Only callable properties
    /// (listeners) are applied during hydration.
    pub fn hydrate(&mut self, child: Child, container: &H::Node) -> Result<(), RenderError> {
        self.render_root(child, container, true)
    }

    fn render_root(&mut self, child: Child, container: &H::Node, hydrating: bool) -> Result<(), RenderError> {
        let mut old = self.roots.get(container).copied();
        if hydrating {
            if let Some(previous) = old.take() {
                self.unmount(previous, None, true)?;
            }
        }

        let root = self
            .tree
            .insert(create_element(ComponentType::fragment(), Props::new(), vec![child]), None);
        self.roots.insert(container.clone(), root);

        let existing = self.host.child_nodes(container);
        let mut pool = (old.is_none() && !existing.is_empty()).then(|| SiblingPool::new(existing.clone()));
        let anchor = match old {
            Some(old) => self.tree.get(old).and_then(|record| record.dom().cloned()),
            None => existing.first().cloned(),
        };

        let mut queue = Vec::new();
        let result = self.diff(
            container,
            root,
            old,
            &GlobalContext::new(),
            false,
            pool.as_mut(),
            &mut queue,
            anchor,
            hydrating,
        );
        if let Some(old) = old {
            self.tree.release(old);
        }
        if let Err(error) = result {
            warn!(%error, "render failed with no boundary to claim it");
            return Err(error);
        }

        self.commit_root(queue, root)
    }

    /// Unmount whatever was rendered into `container`.
    pub fn unmount_root(&mut self, container: &H::Node) -> Result<(), RenderError> {
        match self.roots.remove(container) {
            Some(root) => self.unmount(root, None, false),
            None => Ok(()),
        }
    }

    /// Re-render every dirty component, shallowest first. Components
    /// re-rendered by an ancestor in the same call are skipped.
    ///
    /// Returns how many components were re-rendered.
    pub fn render_dirty(&mut self) -> Result<usize, RenderError> {
        let mut dirty: Vec<(u32, ComponentId)> = self
            .instances
            .iter()
            .filter(|(_, instance)| instance.is_dirty() && instance.parent_dom.is_some())
            .filter_map(|(id, instance)| {
                let depth = self.tree.get(instance.vnode)?.depth();
                Some((depth, id))
            })
            .collect();
        dirty.sort_by_key(|(depth, _)| *depth);

        let mut rendered = 0;
        for (_, id) in dirty {
            if self.instances.get(id).is_some_and(|instance| instance.is_dirty()) {
                debug!(component = ?id, "re-rendering dirty component");
                self.render_component(id)?;
                rendered += 1;
            }
        }

        Ok(rendered)
    }

    /// Re-diff one component in place against a copy of its own record.
    pub fn render_component(&mut self, id: ComponentId) -> Result<(), RenderError> {
        let instance = self.instances.get(id).ok_or(RenderError::StaleComponent(id))?;
        let parent_dom = instance.parent_dom.clone().ok_or(RenderError::MissingContainer(id))?;
        let global = instance.global_context.clone();
        let svg = instance.svg;
        let node = instance.vnode;

        let children = self.tree.take_children(node);
        let record = self.tree.record(node)?;
        let old_dom = record.dom.clone();
        let hydrating = record.hydrating;

        // The copy never matches the original's identity, so the component
        // cannot bail out as an unchanged descriptor.
        let copy = VNodeRecord {
            vnode: record.vnode.clone(),
            original: record.original.map(|original| original.wrapping_add(1)),
            children: Some(children),
            parent: record.parent,
            depth: record.depth,
            dom: old_dom.clone(),
            next_dom: NextDom::Unset,
            component: record.component,
            hydrating,
        };
        let copy = self.tree.insert_record(copy);

        let anchor = match &old_dom {
            Some(dom) => Some(dom.clone()),
            None => self.tree.dom_sibling(node, None),
        };

        let mut queue = Vec::new();
        let result = self.diff(
            &parent_dom,
            node,
            Some(copy),
            &global,
            svg,
            None,
            &mut queue,
            anchor,
            hydrating.unwrap_or(false),
        );
        self.tree.release(copy);
        result?;

        self.commit_root(queue, node)?;

        if self.tree.get(node).and_then(|record| record.dom().cloned()) != old_dom {
            self.update_parent_dom_pointers(node);
        }
        Ok(())
    }

    /// After a component's first native node changed, refresh the cached
    /// node of every enclosing component.
    fn update_parent_dom_pointers(&mut self, node: NodeId) {
        let mut current = self.tree.parent(node);

        while let Some(id) = current {
            let Some(record) = self.tree.get(id) else {
                return;
            };
            let Some(component) = record.component() else {
                return;
            };

            let first = record
                .children()
                .iter()
                .flatten()
                .find_map(|child| self.tree.get(*child).and_then(|child| child.dom().cloned()));

            self.tree.set_dom(id, first.clone());
            if let Some(instance) = self.instances.get_mut(component) {
                instance.base = first;
            }
            current = self.tree.parent(id);
        }
    }

    /// Merge `patch` into a component's pending state and mark it dirty.
    pub fn set_state(&mut self, id: ComponentId, patch: Props) -> Result<(), RenderError> {
        let instance = self.instances.get_mut(id).ok_or(RenderError::StaleComponent(id))?;
        instance.updater.set_state(patch);
        Ok(())
    }

    /// Mark a component for re-render, bypassing its update-skip predicate.
    pub fn force_update(&mut self, id: ComponentId) -> Result<(), RenderError> {
        let instance = self.instances.get_mut(id).ok_or(RenderError::StaleComponent(id))?;
        instance.updater.force_update();
        Ok(())
    }

    /// Deliver `event` to the handler registered on `node`. Returns whether
    /// a handler was found.
    pub fn dispatch_event(&self, node: &H::Node, event: Event) -> bool {
        let Some(handler) = self.listeners.get(node, &event.name, event.capture).cloned() else {
            return false;
        };

        let event = match &self.options.event {
            Some(hook) => hook(event),
            None => event,
        };
        handler.call(&event);
        true
    }

    /// Whether any live component still has a pending re-render.
    pub fn has_dirty(&self) -> bool {
        self.instances.iter().any(|(_, instance)| {
            instance.updater.flags.contains(InstanceFlags::DIRTY) && instance.parent_dom.is_some()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::engine::{Component, ComponentContext, ComponentSpec, Lifecycle, State, Updater};
    use crate::host::{MemoryHost, MemoryNode};
    use crate::types::{EventHandler, PropValue};

    fn setup() -> (Reconciler<MemoryHost>, MemoryNode) {
        let mut host = MemoryHost::new();
        let container = host.container();
        (Reconciler::new(host), container)
    }

    struct Counter;

    impl Component for Counter {
        fn initial_state(&mut self) -> Option<State> {
            Some(Props::new().with("count", 0))
        }

        fn render(&mut self, _: &Props, state: &State, _: &ComponentContext) -> Result<Child, RenderError> {
            let count = state.get("count").and_then(PropValue::as_number).unwrap_or_default();
            Ok(create_element("span", Props::new(), vec![format!("{count}").into()]).into())
        }
    }

    #[test]
    fn test_set_state_then_render_dirty() {
        let ty = ComponentSpec::class("Counter", |_, _| Counter).build();
        let (mut r, root) = setup();

        r.render(create_element(&ty, Props::new(), vec![]).into(), &root).unwrap();
        assert_eq!(r.host().inner_markup(root), "<span>0</span>");
        assert!(!r.has_dirty());

        let id = r.instances_of(&ty)[0];
        r.set_state(id, Props::new().with("count", 3)).unwrap();
        assert!(r.has_dirty());

        assert_eq!(r.render_dirty().unwrap(), 1);
        assert_eq!(r.host().inner_markup(root), "<span>3</span>");
        assert_eq!(r.render_dirty().unwrap(), 0);
    }

    #[test]
    fn test_parent_rerender_covers_dirty_child() {
        let ty = ComponentSpec::class("Counter", |_, _| Counter).build();
        let outer_ty = {
            let inner = ty.clone();
            ComponentSpec::function("Outer", move |_, _| {
                Ok(create_element(&inner, Props::new(), vec![]).into())
            })
            .build()
        };
        let (mut r, root) = setup();

        r.render(create_element(&outer_ty, Props::new(), vec![]).into(), &root).unwrap();
        let outer = r.instances_of(&outer_ty)[0];
        let inner = r.instances_of(&ty)[0];
        r.force_update(outer).unwrap();
        r.set_state(inner, Props::new().with("count", 1)).unwrap();

        assert_eq!(r.render_dirty().unwrap(), 1);
        assert_eq!(r.host().inner_markup(root), "<span>1</span>");
    }

    #[test]
    fn test_component_dom_change_updates_ancestors() {
        struct Toggle;
        impl Component for Toggle {
            fn render(&mut self, _: &Props, state: &State, _: &ComponentContext) -> Result<Child, RenderError> {
                let tag = if state.contains("alt") { "b" } else { "i" };
                Ok(create_element(tag, Props::new(), vec![]).into())
            }
        }
        let toggle = ComponentSpec::class("Toggle", |_, _| Toggle).build();
        let wrapper = {
            let inner = toggle.clone();
            ComponentSpec::function("Wrapper", move |_, _| Ok(create_element(&inner, Props::new(), vec![]).into()))
                .build()
        };
        let (mut r, root) = setup();

        r.render(create_element(&wrapper, Props::new(), vec![]).into(), &root).unwrap();
        let id = r.instances_of(&toggle)[0];
        r.set_state(id, Props::new().with("alt", true)).unwrap();
        r.render_dirty().unwrap();

        assert_eq!(r.host().inner_markup(root), "<b></b>");
        let wrapper_id = r.instances_of(&wrapper)[0];
        let base = *r.instance(wrapper_id).unwrap().base().unwrap();
        assert_eq!(r.host().local_name(&base).as_deref(), Some("b"));
    }

    #[test]
    fn test_existing_children_are_reused_on_first_render() {
        let mut host = MemoryHost::new();
        let root = host.container();
        let p = host.create_element("p", None, None);
        host.insert_before(&root, &p, None);
        host.clear_mutations();
        let mut r = Reconciler::new(host);

        r.render(create_element("p", Props::new().with("id", "x"), vec![]).into(), &root).unwrap();

        assert_eq!(r.host().child_nodes(&root), vec![p]);
        assert_eq!(r.host().attribute(p, "id"), Some("x"));
    }

    #[test]
    fn test_hydrate_adopts_markup_and_attaches_listeners() {
        let mut host = MemoryHost::new();
        let root = host.container();
        let button = host.create_element("button", None, None);
        host.set_attribute(&button, "class", "server");
        let label = host.create_text("go");
        host.insert_before(&button, &label, None);
        host.insert_before(&root, &button, None);
        let mut r = Reconciler::new(host);

        let clicks = Rc::new(Cell::new(0));
        let counter = clicks.clone();
        let handler = EventHandler::new(move |_| counter.set(counter.get() + 1));
        let tree = create_element(
            "button",
            Props::new().with("class", "client").with("onClick", handler),
            vec!["go".into()],
        );
        r.hydrate(tree.into(), &root).unwrap();

        assert_eq!(r.host().child_nodes(&root), vec![button]);
        assert_eq!(r.host().attribute(button, "class"), Some("server"));
        assert!(r.dispatch_event(&button, Event::new("click")));
        assert_eq!(clicks.get(), 1);
    }

    #[test]
    fn test_failed_hydration_pauses_and_resumes_on_same_node() {
        let mut host = MemoryHost::new();
        let root = host.container();
        let p = host.create_element("p", None, None);
        let label = host.create_text("x");
        host.insert_before(&p, &label, None);
        host.insert_before(&root, &p, None);
        let mut r = Reconciler::new(host);

        let fail = Rc::new(Cell::new(true));
        let flag = fail.clone();
        let ty = ComponentSpec::function("Late", move |_, _| {
            if flag.get() {
                return Err(RenderError::thrown("not yet"));
            }
            Ok(create_element("p", Props::new(), vec!["x".into()]).into())
        })
        .build();
        let tree = || create_element(&ty, Props::new(), vec![]);

        assert_eq!(r.hydrate(tree().into(), &root), Err(RenderError::thrown("not yet")));
        let top = r.tree().get(r.root(&root).unwrap()).unwrap();
        let paused = r.tree().get(top.children()[0].unwrap()).unwrap();
        assert!(paused.is_paused());
        assert_eq!(paused.dom(), Some(&p));

        fail.set(false);
        r.host_mut().clear_mutations();
        r.render(tree().into(), &root).unwrap();

        assert_eq!(r.host().child_nodes(&root), vec![p]);
        assert_eq!(r.host().inner_markup(root), "<p>x</p>");
        assert!(!r
            .host()
            .mutations()
            .iter()
            .any(|m| matches!(m, crate::host::Mutation::CreateElement { .. })));
    }

    #[test]
    fn test_event_hook_rewrites_event() {
        let (mut r, root) = setup();
        let seen = Rc::new(Cell::new(false));
        let flag = seen.clone();
        let handler = EventHandler::new(move |event| flag.set(event.detail == PropValue::from("hooked")));
        r.set_options(crate::pipeline::Options::new().on_event(|event| event.with_detail("hooked")));

        r.render(create_element("a", Props::new().with("onClick", handler), vec![]).into(), &root)
            .unwrap();
        let a = r.host().child_nodes(&root)[0];

        assert!(r.dispatch_event(&a, Event::new("click")));
        assert!(seen.get());
        assert!(!r.dispatch_event(&a, Event::new("click").capturing()));
    }

    #[test]
    fn test_unmount_root_clears_container() {
        struct Tracked(Rc<Cell<bool>>);
        impl Component for Tracked {
            fn lifecycle(&self) -> Lifecycle {
                Lifecycle::WILL_UNMOUNT
            }
            fn render(&mut self, _: &Props, _: &State, _: &ComponentContext) -> Result<Child, RenderError> {
                Ok("t".into())
            }
            fn will_unmount(&mut self, _: &Updater) -> Result<(), RenderError> {
                self.0.set(true);
                Ok(())
            }
        }
        let gone = Rc::new(Cell::new(false));
        let flag = gone.clone();
        let ty = ComponentSpec::class("Tracked", move |_, _| Tracked(flag.clone())).build();
        let (mut r, root) = setup();

        r.render(create_element(&ty, Props::new(), vec![]).into(), &root).unwrap();
        r.unmount_root(&root).unwrap();

        assert!(gone.get());
        assert_eq!(r.host().inner_markup(root), "");
        assert!(r.tree().is_empty());
        assert!(r.root(&root).is_none());
    }

    #[test]
    fn test_stale_component_is_rejected() {
        let ty = ComponentSpec::class("Counter", |_, _| Counter).build();
        let (mut r, root) = setup();

        r.render(create_element(&ty, Props::new(), vec![]).into(), &root).unwrap();
        let id = r.instances_of(&ty)[0];
        r.unmount_root(&root).unwrap();

        assert_eq!(r.render_component(id), Err(RenderError::StaleComponent(id)));
        assert_eq!(r.set_state(id, Props::new()), Err(RenderError::StaleComponent(id)));
    }
}
