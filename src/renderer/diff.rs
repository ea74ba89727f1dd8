//! Node Differ.
//!
//! Reconciles one new record against the old record that previously occupied
//! its position. Component positions run the instance lifecycle and recurse
//! into the rendered output; element and text positions go to
//! [`diff_element`](Reconciler::diff_element).
//!
//! A failure anywhere below a position is offered to the boundaries above it.
//! A position whose diff failed loses its creation identity, so the next pass
//! never mistakes it for an unchanged descriptor.

use std::rc::Rc;

use tracing::{debug, warn};

use crate::engine::{
    same_original, ComponentContext, ComponentId, Deferred, GlobalContext, Instance, InstanceFlags,
    Lifecycle, NodeId, State,
};
use crate::error::RenderError;
use crate::host::NativeHost;
use crate::types::{Child, Props, Ref, RefValue};

use super::{Reconciler, SiblingPool};

impl<H: NativeHost> Reconciler<H> {
    /// Diff record `new` against `old` inside `parent_dom`.
    ///
    /// `pool` holds unclaimed native nodes (hydration, or mounting into a
    /// non-empty container). `anchor` is the native node the new output
    /// should precede. Components with callbacks to run are appended to
    /// `queue` in post-order.
    #[allow(clippy::too_many_arguments)]
    pub fn diff(
        &mut self,
        parent_dom: &H::Node,
        new: NodeId,
        old: Option<NodeId>,
        global: &GlobalContext,
        svg: bool,
        pool: Option<&mut SiblingPool<H::Node>>,
        queue: &mut Vec<ComponentId>,
        anchor: Option<H::Node>,
        hydrating: bool,
    ) -> Result<(), RenderError> {
        let vnode = self.tree.record(new)?.vnode.clone();
        if !vnode.is_valid() {
            warn!(?vnode, "refusing to render a value that is not a descriptor");
            return Ok(());
        }

        let mut hydrating = hydrating;
        let mut anchor = anchor;
        let mut resumed = SiblingPool::default();
        let mut pool: Option<&mut SiblingPool<H::Node>> = pool;

        // A position paused by an earlier failure resumes where it stopped.
        if let Some(old_record) = old.and_then(|old| self.tree.get(old)) {
            if let Some(mode) = old_record.hydrating {
                let dom = old_record.dom.clone();
                hydrating = mode;
                anchor = dom.clone();
                resumed = SiblingPool::new(dom.clone());
                pool = Some(&mut resumed);

                let record = self.tree.record_mut(new)?;
                record.dom = dom;
                record.hydrating = None;
            }
        }

        if let Some(hook) = &self.options.diff {
            hook(&vnode);
        }

        let result = if vnode.is_component() {
            self.diff_component(
                parent_dom,
                new,
                old,
                global,
                svg,
                pool.as_deref_mut(),
                queue,
                anchor.clone(),
                hydrating,
            )
        } else {
            let old_record = old.and_then(|old| self.tree.get(old));
            let unchanged = pool.is_none()
                && old_record.is_some_and(|record| same_original(self.tree.get(new).and_then(|r| r.original), record.original));

            match old {
                Some(old) if unchanged => self.adopt(new, old),
                _ => {
                    let dom = old_record.and_then(|record| record.dom.clone());
                    self.diff_element(dom, new, old, global, svg, pool.as_deref_mut(), queue, hydrating)
                }
            }
        };

        let error = match result {
            Ok(()) => {
                if let Some(hook) = &self.options.diffed {
                    hook(&vnode);
                }
                return Ok(());
            }
            Err(error) => error,
        };

        let record = self.tree.record_mut(new)?;
        record.original = None;
        if hydrating || pool.is_some() {
            // Keep the existing native node so a later pass can resume here.
            record.dom = anchor.clone();
            record.hydrating = Some(hydrating);
            if let (Some(pool), Some(dom)) = (pool.as_deref_mut(), anchor.as_ref()) {
                pool.claim(dom);
            }
        } else if let Some(old) = old {
            let new_dom = record.dom.clone();
            // The frame's own failure is what the caller sees; a failing
            // teardown is only logged.
            for child in self.tree.take_children(old).into_iter().flatten() {
                if let Err(teardown) = self.unmount(child, Some(new), false) {
                    warn!(%teardown, %error, "unmount failed while discarding a failed position");
                }
            }

            let orphan = self
                .tree
                .get(old)
                .filter(|record| !record.vnode.is_component())
                .and_then(|record| record.dom.clone())
                .filter(|dom| Some(dom) != new_dom.as_ref());
            if let Some(dom) = orphan {
                self.host.remove(&dom);
                self.listeners.forget(&dom);
            }
        }

        self.catch_error(error, new).into_result()
    }

    /// Reuse the old position wholesale: same native node, same children.
    fn adopt(&mut self, new: NodeId, old: NodeId) -> Result<(), RenderError> {
        let dom = self.tree.record(old)?.dom.clone();
        let children = self.tree.take_children(old);

        for child in children.iter().flatten() {
            self.tree.set_parent(*child, new);
        }

        let record = self.tree.record_mut(new)?;
        record.dom = dom;
        record.children = Some(children);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn diff_component(
        &mut self,
        parent_dom: &H::Node,
        new: NodeId,
        old: Option<NodeId>,
        global: &GlobalContext,
        svg: bool,
        pool: Option<&mut SiblingPool<H::Node>>,
        queue: &mut Vec<ComponentId>,
        anchor: Option<H::Node>,
        hydrating: bool,
    ) -> Result<(), RenderError> {
        let vnode = self.tree.record(new)?.vnode.clone();
        let Some(ty) = vnode.component_type().cloned() else {
            return Ok(());
        };
        let props = vnode.props().clone();

        // Subscribers see the nearest provider's value, everything else the
        // ambient mapping.
        let provider = ty.context_type().and_then(|key| global.provider(key.id()));
        let context = match ty.context_type() {
            Some(key) => {
                let value = provider
                    .and_then(|id| self.instances.get(id))
                    .map(|instance| instance.props().get("value").cloned().unwrap_or_default());
                ComponentContext::Value(value.unwrap_or_else(|| key.default_value().clone()))
            }
            None => ComponentContext::Global(global.clone()),
        };

        let reused = old
            .and_then(|old| self.tree.get(old))
            .and_then(|record| record.component)
            .filter(|id| self.instances.contains_key(*id));

        let (cid, is_new, clear_exception) = match reused {
            Some(cid) => {
                let instance = self.instance_mut(cid)?;
                let pending = instance.updater.flags.contains(InstanceFlags::PENDING_ERROR);
                instance.updater.flags.set(InstanceFlags::PROCESSING_EXCEPTION, pending);
                (cid, false, pending)
            }
            None => {
                let mut instance = Instance::new(ty.clone(), &props, context.clone(), global.clone(), new);
                instance.provider = provider;
                let cid = self.instances.insert(instance);
                if let Some(provider) = provider.and_then(|id| self.instances.get_mut(id)) {
                    provider.subscribers.push(cid);
                }
                (cid, true, false)
            }
        };
        self.tree.record_mut(new)?.component = Some(cid);

        let instance = self.instance_mut(cid)?;
        if ty.derives_state_from_props() {
            if let Some(patch) = ty.derive_state_from_props(&props, instance.updater.next_state())? {
                instance.updater.merge_state(&patch);
            }
        }

        let mut previous: Option<(Props, State)> = None;
        let mut did_update_slot = None;

        if is_new {
            if !ty.derives_state_from_props() && instance.has(Lifecycle::WILL_MOUNT) {
                instance.component.will_mount(&mut instance.updater)?;
            }
            if instance.has(Lifecycle::DID_MOUNT) {
                instance.updater.callbacks.push(Deferred::DidMount);
            }
        } else {
            let old_props = instance.updater.props.clone();
            let old_state = instance.updater.state.clone();

            if ty.provides().is_some() && old_props.get("value") != props.get("value") {
                let subscribers = instance.subscribers.clone();
                for subscriber in subscribers {
                    if let Some(subscriber) = self.instances.get_mut(subscriber) {
                        subscriber.updater.force_update();
                    }
                }
            }

            let same = match old {
                Some(old) => same_original(self.tree.record(new)?.original, self.tree.record(old)?.original),
                None => false,
            };

            let instance = self.instance_mut(cid)?;
            if !same
                && !ty.derives_state_from_props()
                && !props.ptr_eq(&old_props)
                && instance.has(Lifecycle::WILL_RECEIVE_PROPS)
            {
                instance
                    .component
                    .will_receive_props(&props, &context, &mut instance.updater)?;
            }

            // Forcing only bypasses the predicate; an unchanged descriptor
            // always bails.
            let bail = same
                || (!instance.updater.flags.contains(InstanceFlags::FORCE)
                    && instance.has(Lifecycle::SHOULD_UPDATE)
                    && !instance.component.should_update(
                        &props,
                        instance.updater.next_state(),
                        &context,
                        &instance.updater,
                    )?);

            if bail {
                instance.updater.props = props;
                instance.updater.commit_state();
                if !same {
                    instance.updater.flags.remove(InstanceFlags::DIRTY);
                }
                instance.vnode = new;
                let has_callbacks = !instance.updater.callbacks.is_empty();

                if let Some(old) = old {
                    self.adopt(new, old)?;
                }
                if has_callbacks {
                    queue.push(cid);
                }
                debug!(component = ty.name(), same, "update skipped");
                return Ok(());
            }

            if instance.has(Lifecycle::WILL_UPDATE) {
                instance.component.will_update(
                    &props,
                    instance.updater.next_state(),
                    &context,
                    &instance.updater,
                )?;
            }
            if instance.has(Lifecycle::DID_UPDATE) {
                did_update_slot = Some(instance.updater.callbacks.len());
                instance.updater.callbacks.push(Deferred::DidUpdate {
                    prev_props: old_props.clone(),
                    prev_state: old_state.clone(),
                    snapshot: None,
                });
            }
            previous = Some((old_props, old_state));
        }

        let instance = self.instance_mut(cid)?;
        instance.updater.context = context;
        instance.updater.props = props;
        instance.global_context = global.clone();
        instance.updater.commit_state();

        if let Some(hook) = &self.options.render {
            hook(&vnode);
        }

        let instance = self.instance_mut(cid)?;
        instance.updater.flags.remove(InstanceFlags::DIRTY);
        instance.vnode = new;
        instance.parent_dom = Some(parent_dom.clone());
        instance.svg = svg;

        let updater = &instance.updater;
        let rendered = instance
            .component
            .render(&updater.props, &updater.state, &updater.context)?;

        let mut child_global = global.clone();
        if instance.has(Lifecycle::CHILD_CONTEXT) {
            let values = instance.component.child_context(&instance.updater)?;
            child_global = child_global.with_values(&values);
        }
        if let Some(id) = ty.provides() {
            child_global = child_global.with_provider(id, cid);
        }

        if let Some((prev_props, prev_state)) = &previous {
            if instance.has(Lifecycle::SNAPSHOT_BEFORE_UPDATE) {
                let captured = instance
                    .component
                    .snapshot_before_update(prev_props, prev_state, &instance.updater)?;
                if let Some(Deferred::DidUpdate { snapshot, .. }) =
                    did_update_slot.and_then(|slot| instance.updater.callbacks.get_mut(slot))
                {
                    *snapshot = Some(captured);
                }
            }
        }

        let children = match rendered {
            Child::Node(top) if top.is_fragment() && top.key().is_none() => top.props().children().into_list(),
            other => other.into_list(),
        };

        let reconciler = Rc::clone(&self.children);
        reconciler.diff_children(
            self,
            parent_dom,
            children,
            new,
            old,
            &child_global,
            svg,
            pool,
            queue,
            anchor,
            hydrating,
        )?;

        let record = self.tree.record_mut(new)?;
        record.hydrating = None;
        let base = record.dom.clone();

        let instance = self.instance_mut(cid)?;
        instance.base = base;
        if !instance.updater.callbacks.is_empty() {
            queue.push(cid);
        }
        if clear_exception {
            instance
                .updater
                .flags
                .remove(InstanceFlags::PENDING_ERROR | InstanceFlags::PROCESSING_EXCEPTION);
        }
        instance.updater.flags.remove(InstanceFlags::FORCE);

        Ok(())
    }

    fn instance_mut(&mut self, id: ComponentId) -> Result<&mut Instance<H::Node>, RenderError> {
        self.instances.get_mut(id).ok_or(RenderError::StaleComponent(id))
    }

    /// Tear down the subtree at `id`: detach refs, run `will_unmount`,
    /// release records and remove native nodes.
    ///
    /// Failures are offered to boundaries above `parent`; the first one no
    /// boundary claims is returned once the subtree is gone. With `skip_remove`
    /// the native nodes stay where they are (an ancestor is already going
    /// away, or the nodes are being handed to hydration).
    pub fn unmount(&mut self, id: NodeId, parent: Option<NodeId>, skip_remove: bool) -> Result<(), RenderError> {
        let Some(record) = self.tree.release(id) else {
            return Ok(());
        };

        if let Some(hook) = &self.options.unmount {
            hook(&record.vnode);
        }

        // Teardown always completes; the first unclaimed failure is returned.
        let mut failure = None;

        if let Some(target) = record.vnode.node_ref() {
            let detach = match target {
                Ref::Callback(_) => true,
                Ref::Object(object) => match object.current() {
                    None => true,
                    Some(current) => {
                        record.dom.is_some() && current.native::<H::Node>() == record.dom
                    }
                },
            };
            if detach {
                if let Err(error) = self.apply_ref(target, None, parent) {
                    failure.get_or_insert(error);
                }
            }
        }

        if let Some(cid) = record.component {
            if let Some(mut instance) = self.instances.remove(cid) {
                if instance.has(Lifecycle::WILL_UNMOUNT) {
                    if let Err(error) = instance.component.will_unmount(&instance.updater) {
                        if let Err(error) = self.route_error(error, parent) {
                            failure.get_or_insert(error);
                        }
                    }
                }
                if let Some(provider) = instance.provider.and_then(|p| self.instances.get_mut(p)) {
                    provider.subscribers.retain(|subscriber| *subscriber != cid);
                }
            }
        }

        let is_component = record.vnode.is_component();
        for child in record.children.into_iter().flatten().flatten() {
            if let Err(error) = self.unmount(child, parent, skip_remove || !is_component) {
                failure.get_or_insert(error);
            }
        }

        if let Some(dom) = &record.dom {
            if !skip_remove {
                self.host.remove(dom);
            }
            if !is_component {
                self.listeners.forget(dom);
            }
        }

        failure.map_or(Ok(()), Err)
    }

    /// Attach (`Some`) or detach (`None`) a ref. A failing callback is
    /// offered to the boundaries above `at`.
    pub fn apply_ref(&mut self, target: &Ref, value: Option<RefValue>, at: Option<NodeId>) -> Result<(), RenderError> {
        let result = match target {
            Ref::Callback(callback) => callback(value),
            Ref::Object(object) => {
                object.set(value);
                Ok(())
            }
        };

        match result {
            Ok(()) => Ok(()),
            Err(error) => self.route_error(error, at),
        }
    }
}
