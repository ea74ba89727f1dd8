//! Components - The capability surface the reconciler drives.
//!
//! A component type is described once by a [`ComponentSpec`]: a constructor
//! plus optional static hooks. Instance hooks are methods on the
//! [`Component`] trait; which of them a component actually implements is
//! declared up front through [`Component::lifecycle`], read once when the
//! instance is created and stored on the [`Instance`]. The reconciler checks
//! those flags instead of calling every hook and hoping it is a no-op.
//!
//! Function components (`ComponentSpec::function`) are adapted to the same
//! trait and declare no lifecycle hooks.

use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;

use super::context::{ComponentContext, ContextKey, GlobalContext};
use super::registry::{ComponentId, NodeId};
use crate::error::RenderError;
use crate::types::{Child, PropValue, Props};

/// Component state. Same shape as props: an ordered, copy-on-write mapping.
pub type State = Props;

// =============================================================================
// Flags
// =============================================================================

bitflags! {
    /// Instance hooks a component implements.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Lifecycle: u16 {
        const WILL_MOUNT = 1 << 0;
        const DID_MOUNT = 1 << 1;
        const WILL_RECEIVE_PROPS = 1 << 2;
        const SHOULD_UPDATE = 1 << 3;
        const WILL_UPDATE = 1 << 4;
        const DID_UPDATE = 1 << 5;
        const SNAPSHOT_BEFORE_UPDATE = 1 << 6;
        const WILL_UNMOUNT = 1 << 7;
        const DID_CATCH = 1 << 8;
        const CHILD_CONTEXT = 1 << 9;
    }
}

bitflags! {
    /// Per-instance reconciliation state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct InstanceFlags: u8 {
        /// Needs a re-render.
        const DIRTY = 1 << 0;
        /// Next update bypasses the update-skip predicate.
        const FORCE = 1 << 1;
        /// Claimed an error that has not been re-rendered away yet.
        const PENDING_ERROR = 1 << 2;
        /// Currently re-rendering after claiming an error; skipped by the
        /// boundary walk so it cannot claim its own failure again.
        const PROCESSING_EXCEPTION = 1 << 3;
    }
}

/// What a committed callback asks of the flush.
///
/// How `Halt` is honored is decided by the
/// [`HaltPolicy`](crate::pipeline::HaltPolicy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitFlow {
    #[default]
    Continue,
    Halt,
}

// =============================================================================
// Component trait
// =============================================================================

/// A stateful component.
///
/// Only `render` is required. Every other hook is called only when its bit
/// is present in [`lifecycle`](Self::lifecycle).
#[allow(unused_variables)]
pub trait Component: 'static {
    /// Hooks this component implements.
    fn lifecycle(&self) -> Lifecycle {
        Lifecycle::empty()
    }

    /// Initial state. `None` starts with an empty mapping.
    fn initial_state(&mut self) -> Option<State> {
        None
    }

    /// Produce the renderable for the current props, state and context.
    fn render(
        &mut self,
        props: &Props,
        state: &State,
        context: &ComponentContext,
    ) -> Result<Child, RenderError>;

    /// Before the first render. Not called when the type derives state from
    /// props.
    fn will_mount(&mut self, updater: &mut Updater) -> Result<(), RenderError> {
        Ok(())
    }

    /// After the first commit.
    fn did_mount(&mut self, updater: &mut Updater) -> Result<CommitFlow, RenderError> {
        Ok(CommitFlow::Continue)
    }

    /// Props identity changed. Not called when the type derives state from
    /// props.
    fn will_receive_props(
        &mut self,
        next_props: &Props,
        context: &ComponentContext,
        updater: &mut Updater,
    ) -> Result<(), RenderError> {
        Ok(())
    }

    /// Update-skip predicate. Returning `false` bails out of the update.
    fn should_update(
        &mut self,
        next_props: &Props,
        next_state: &State,
        context: &ComponentContext,
        updater: &Updater,
    ) -> Result<bool, RenderError> {
        Ok(true)
    }

    /// Before an update render.
    fn will_update(
        &mut self,
        next_props: &Props,
        next_state: &State,
        context: &ComponentContext,
        updater: &Updater,
    ) -> Result<(), RenderError> {
        Ok(())
    }

    /// After an update is committed.
    fn did_update(
        &mut self,
        prev_props: &Props,
        prev_state: &State,
        snapshot: Option<&PropValue>,
        updater: &mut Updater,
    ) -> Result<CommitFlow, RenderError> {
        Ok(CommitFlow::Continue)
    }

    /// Captured after render and before children are diffed, on updates only.
    fn snapshot_before_update(
        &mut self,
        prev_props: &Props,
        prev_state: &State,
        updater: &Updater,
    ) -> Result<PropValue, RenderError> {
        Ok(PropValue::Null)
    }

    fn will_unmount(&mut self, updater: &Updater) -> Result<(), RenderError> {
        Ok(())
    }

    /// A descendant failed. Calling `set_state` on the updater claims the
    /// error.
    fn did_catch(&mut self, error: &RenderError, updater: &mut Updater) -> Result<(), RenderError> {
        Ok(())
    }

    /// Entries added to the ambient context for this component's subtree.
    fn child_context(&mut self, updater: &Updater) -> Result<Props, RenderError> {
        Ok(Props::new())
    }
}

// =============================================================================
// Updater - the state container
// =============================================================================

/// Callback queued for the commit phase.
pub enum Deferred {
    DidMount,
    DidUpdate {
        prev_props: Props,
        prev_state: State,
        /// Filled in after render when the component captures snapshots.
        snapshot: Option<PropValue>,
    },
    Callback(Box<dyn FnOnce(&mut Updater) -> Result<CommitFlow, RenderError>>),
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deferred::DidMount => write!(f, "DidMount"),
            Deferred::DidUpdate { snapshot, .. } => {
                f.debug_struct("DidUpdate").field("snapshot", snapshot).finish()
            }
            Deferred::Callback(_) => write!(f, "Callback"),
        }
    }
}

/// Props, state and flags of one instance, as handed to its hooks.
///
/// Pending state starts aliased to the current state and is copied before
/// the first merge.
#[derive(Debug, Default)]
pub struct Updater {
    pub(crate) props: Props,
    pub(crate) state: State,
    pub(crate) next_state: Option<State>,
    pub(crate) context: ComponentContext,
    pub(crate) flags: InstanceFlags,
    pub(crate) callbacks: Vec<Deferred>,
}

impl Updater {
    pub fn props(&self) -> &Props {
        &self.props
    }

    /// Committed state.
    pub fn state(&self) -> &State {
        &self.state
    }

    /// State the next render will see.
    pub fn next_state(&self) -> &State {
        self.next_state.as_ref().unwrap_or(&self.state)
    }

    pub fn context(&self) -> &ComponentContext {
        &self.context
    }

    pub fn flags(&self) -> InstanceFlags {
        self.flags
    }

    pub fn is_dirty(&self) -> bool {
        self.flags.contains(InstanceFlags::DIRTY)
    }

    /// Shallow-merge `patch` into the pending state and mark the instance
    /// dirty. The re-render happens on the next
    /// [`render_dirty`](crate::Reconciler::render_dirty).
    pub fn set_state(&mut self, patch: Props) {
        self.merge_state(&patch);
        self.flags.insert(InstanceFlags::DIRTY);
    }

    /// Re-render on the next pass, bypassing the update-skip predicate.
    pub fn force_update(&mut self) {
        self.flags.insert(InstanceFlags::DIRTY | InstanceFlags::FORCE);
    }

    /// Run `callback` after the next commit of this instance.
    pub fn after_commit(
        &mut self,
        callback: impl FnOnce(&mut Updater) -> Result<CommitFlow, RenderError> + 'static,
    ) {
        self.callbacks.push(Deferred::Callback(Box::new(callback)));
    }

    /// Merge without touching flags (derived state).
    pub(crate) fn merge_state(&mut self, patch: &Props) {
        let state = &self.state;
        self.next_state
            .get_or_insert_with(|| state.clone())
            .merge(patch);
    }

    /// Pending state becomes current.
    pub(crate) fn commit_state(&mut self) {
        if let Some(next) = self.next_state.take() {
            self.state = next;
        }
    }
}

// =============================================================================
// Instance
// =============================================================================

/// A live component instance.
pub struct Instance<N> {
    pub(crate) ty: ComponentType,
    pub(crate) component: Box<dyn Component>,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) updater: Updater,
    /// Ambient mapping this instance was diffed under.
    pub(crate) global_context: GlobalContext,
    /// Record currently owning the instance.
    pub(crate) vnode: NodeId,
    pub(crate) parent_dom: Option<N>,
    pub(crate) base: Option<N>,
    pub(crate) svg: bool,
    /// Provider this instance subscribes to.
    pub(crate) provider: Option<ComponentId>,
    /// Subscribers, when this instance is a provider.
    pub(crate) subscribers: Vec<ComponentId>,
}

impl<N> Instance<N> {
    pub(crate) fn new(
        ty: ComponentType,
        props: &Props,
        context: ComponentContext,
        global_context: GlobalContext,
        vnode: NodeId,
    ) -> Self {
        let mut component = ty.construct(props, &context);
        let lifecycle = component.lifecycle();
        let state = component.initial_state().unwrap_or_default();

        Self {
            ty,
            component,
            lifecycle,
            updater: Updater {
                props: props.clone(),
                state,
                next_state: None,
                context,
                flags: InstanceFlags::DIRTY,
                callbacks: Vec::new(),
            },
            global_context,
            vnode,
            parent_dom: None,
            base: None,
            svg: false,
            provider: None,
            subscribers: Vec::new(),
        }
    }

    pub fn component_type(&self) -> &ComponentType {
        &self.ty
    }

    pub fn props(&self) -> &Props {
        &self.updater.props
    }

    pub fn state(&self) -> &State {
        &self.updater.state
    }

    pub fn context(&self) -> &ComponentContext {
        &self.updater.context
    }

    pub fn flags(&self) -> InstanceFlags {
        self.updater.flags
    }

    pub fn is_dirty(&self) -> bool {
        self.updater.is_dirty()
    }

    /// Record currently owning this instance.
    pub fn vnode(&self) -> NodeId {
        self.vnode
    }

    /// First native node of the rendered output.
    pub fn base(&self) -> Option<&N> {
        self.base.as_ref()
    }

    pub(crate) fn has(&self, hook: Lifecycle) -> bool {
        self.lifecycle.contains(hook)
    }

    /// Run one deferred callback.
    pub(crate) fn run(&mut self, deferred: Deferred) -> Result<CommitFlow, RenderError> {
        match deferred {
            Deferred::DidMount => self.component.did_mount(&mut self.updater),
            Deferred::DidUpdate {
                prev_props,
                prev_state,
                snapshot,
            } => self.component.did_update(
                &prev_props,
                &prev_state,
                snapshot.as_ref(),
                &mut self.updater,
            ),
            Deferred::Callback(callback) => callback(&mut self.updater),
        }
    }
}

impl<N> fmt::Debug for Instance<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type", &self.ty.name())
            .field("vnode", &self.vnode)
            .field("flags", &self.updater.flags)
            .finish()
    }
}

// =============================================================================
// Component spec
// =============================================================================

type Construct = Box<dyn Fn(&Props, &ComponentContext) -> Box<dyn Component>>;
type DeriveFromProps = Box<dyn Fn(&Props, &State) -> Result<Option<Props>, RenderError>>;
type DeriveFromError = Box<dyn Fn(&RenderError) -> Result<Option<Props>, RenderError>>;
type RenderFn = Rc<dyn Fn(&Props, &ComponentContext) -> Result<Child, RenderError>>;

/// Description of a component type: constructor plus optional static hooks.
pub struct ComponentSpec {
    name: &'static str,
    construct: Construct,
    derive_state_from_props: Option<DeriveFromProps>,
    derive_state_from_error: Option<DeriveFromError>,
    context_type: Option<ContextKey>,
    default_props: Option<Props>,
    provides: Option<u64>,
    fragment: bool,
}

struct FunctionComponent {
    render: RenderFn,
}

impl Component for FunctionComponent {
    fn render(
        &mut self,
        props: &Props,
        _state: &State,
        context: &ComponentContext,
    ) -> Result<Child, RenderError> {
        (self.render)(props, context)
    }
}

impl ComponentSpec {
    fn with_constructor(name: &'static str, construct: Construct) -> Self {
        Self {
            name,
            construct,
            derive_state_from_props: None,
            derive_state_from_error: None,
            context_type: None,
            default_props: None,
            provides: None,
            fragment: false,
        }
    }

    /// A stateful component built by `construct` from (props, context).
    pub fn class<C: Component>(
        name: &'static str,
        construct: impl Fn(&Props, &ComponentContext) -> C + 'static,
    ) -> Self {
        Self::with_constructor(
            name,
            Box::new(move |props, context| Box::new(construct(props, context))),
        )
    }

    /// A stateless component: a render function of (props, context).
    pub fn function(
        name: &'static str,
        render: impl Fn(&Props, &ComponentContext) -> Result<Child, RenderError> + 'static,
    ) -> Self {
        let render: RenderFn = Rc::new(render);
        Self::with_constructor(
            name,
            Box::new(move |_, _| {
                Box::new(FunctionComponent {
                    render: render.clone(),
                })
            }),
        )
    }

    /// Static hook: state derived from (next props, pending state), merged
    /// before every render. Suppresses `will_mount` and `will_receive_props`.
    pub fn derive_state_from_props(
        mut self,
        derive: impl Fn(&Props, &State) -> Result<Option<Props>, RenderError> + 'static,
    ) -> Self {
        self.derive_state_from_props = Some(Box::new(derive));
        self
    }

    /// Static hook: state derived from a descendant's failure. Makes the type
    /// an error boundary.
    pub fn derive_state_from_error(
        mut self,
        derive: impl Fn(&RenderError) -> Result<Option<Props>, RenderError> + 'static,
    ) -> Self {
        self.derive_state_from_error = Some(Box::new(derive));
        self
    }

    /// Subscribe to a context. The instance then receives the nearest
    /// provider's value (or the default) instead of the ambient mapping.
    pub fn context_type(mut self, key: &ContextKey) -> Self {
        self.context_type = Some(key.clone());
        self
    }

    /// Properties filled in by the factory when absent.
    pub fn default_props(mut self, props: Props) -> Self {
        self.default_props = Some(props);
        self
    }

    pub(crate) fn provides(mut self, context_id: u64) -> Self {
        self.provides = Some(context_id);
        self
    }

    pub fn build(self) -> ComponentType {
        ComponentType(Rc::new(self))
    }
}

// =============================================================================
// Component type
// =============================================================================

/// Shared handle to a [`ComponentSpec`]. Types compare by identity.
#[derive(Clone)]
pub struct ComponentType(Rc<ComponentSpec>);

thread_local! {
    static FRAGMENT: ComponentType = {
        let mut spec = ComponentSpec::function("Fragment", |props, _| Ok(props.children()));
        spec.fragment = true;
        spec.build()
    };
}

impl ComponentType {
    /// The built-in grouping placeholder.
    pub fn fragment() -> ComponentType {
        FRAGMENT.with(Clone::clone)
    }

    pub fn name(&self) -> &'static str {
        self.0.name
    }

    pub fn ptr_eq(&self, other: &ComponentType) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn is_fragment(&self) -> bool {
        self.0.fragment
    }

    pub fn default_props(&self) -> Option<&Props> {
        self.0.default_props.as_ref()
    }

    pub fn context_type(&self) -> Option<&ContextKey> {
        self.0.context_type.as_ref()
    }

    /// Context id this type provides, for providers.
    pub fn provides(&self) -> Option<u64> {
        self.0.provides
    }

    pub fn derives_state_from_props(&self) -> bool {
        self.0.derive_state_from_props.is_some()
    }

    pub fn derives_state_from_error(&self) -> bool {
        self.0.derive_state_from_error.is_some()
    }

    pub(crate) fn derive_state_from_props(
        &self,
        props: &Props,
        state: &State,
    ) -> Result<Option<Props>, RenderError> {
        match &self.0.derive_state_from_props {
            Some(derive) => derive(props, state),
            None => Ok(None),
        }
    }

    pub(crate) fn derive_state_from_error(
        &self,
        error: &RenderError,
    ) -> Result<Option<Props>, RenderError> {
        match &self.0.derive_state_from_error {
            Some(derive) => derive(error),
            None => Ok(None),
        }
    }

    fn construct(&self, props: &Props, context: &ComponentContext) -> Box<dyn Component> {
        (self.0.construct)(props, context)
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentType({})", self.0.name)
    }
}
