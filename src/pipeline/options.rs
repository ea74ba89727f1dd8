//! Options - Extension hooks and render configuration.
//!
//! [`Options`] is the hook table a [`Reconciler`](crate::Reconciler) calls
//! out to at fixed points of a pass. Every slot is optional. The table is
//! owned by the reconciler and replaced as a whole with
//! [`set_options`](crate::Reconciler::set_options).

use std::fmt;
use std::rc::Rc;

use crate::engine::{ComponentId, VNode};
use crate::error::RenderError;
use crate::types::Event;

pub type VNodeHook = Rc<dyn Fn(&VNode)>;
pub type CommitHook = Rc<dyn Fn(&VNode, &[ComponentId])>;
pub type EventHook = Rc<dyn Fn(Event) -> Event>;
/// Sees each failure before the boundary walk. Returning `None` swallows it;
/// `Some` continues the walk with the (possibly rewritten) error.
pub type CatchErrorHook = Rc<dyn Fn(RenderError, &VNode) -> Option<RenderError>>;

/// Extension hook table.
#[derive(Clone, Default)]
pub struct Options {
    /// Before a position is diffed.
    pub diff: Option<VNodeHook>,
    /// Before a component renders.
    pub render: Option<VNodeHook>,
    /// After a position was diffed successfully.
    pub diffed: Option<VNodeHook>,
    /// Before the commit queue is flushed, with the root of the pass.
    pub commit: Option<CommitHook>,
    /// As a position begins unmounting.
    pub unmount: Option<VNodeHook>,
    /// Rewrites an event before it is delivered.
    pub event: Option<EventHook>,
    /// Intercepts a failure before each boundary walk, with the failing
    /// position.
    pub catch_error: Option<CatchErrorHook>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_diff(mut self, hook: impl Fn(&VNode) + 'static) -> Self {
        self.diff = Some(Rc::new(hook));
        self
    }

    pub fn on_render(mut self, hook: impl Fn(&VNode) + 'static) -> Self {
        self.render = Some(Rc::new(hook));
        self
    }

    pub fn on_diffed(mut self, hook: impl Fn(&VNode) + 'static) -> Self {
        self.diffed = Some(Rc::new(hook));
        self
    }

    pub fn on_commit(mut self, hook: impl Fn(&VNode, &[ComponentId]) + 'static) -> Self {
        self.commit = Some(Rc::new(hook));
        self
    }

    pub fn on_unmount(mut self, hook: impl Fn(&VNode) + 'static) -> Self {
        self.unmount = Some(Rc::new(hook));
        self
    }

    pub fn on_event(mut self, hook: impl Fn(Event) -> Event + 'static) -> Self {
        self.event = Some(Rc::new(hook));
        self
    }

    pub fn on_catch_error(
        mut self,
        hook: impl Fn(RenderError, &VNode) -> Option<RenderError> + 'static,
    ) -> Self {
        self.catch_error = Some(Rc::new(hook));
        self
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("diff", &self.diff.is_some())
            .field("render", &self.render.is_some())
            .field("diffed", &self.diffed.is_some())
            .field("commit", &self.commit.is_some())
            .field("unmount", &self.unmount.is_some())
            .field("event", &self.event.is_some())
            .field("catch_error", &self.catch_error.is_some())
            .finish()
    }
}

// =============================================================================
// Render configuration
// =============================================================================

/// What a committed callback returning
/// [`CommitFlow::Halt`](crate::engine::CommitFlow::Halt) does to the flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HaltPolicy {
    /// Keep flushing.
    #[default]
    Ignore,
    /// Drop the remaining callbacks of the halting component.
    SkipComponent,
    /// Drop everything left in the flush.
    AbortFlush,
}

/// Reconciler configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub halt_policy: HaltPolicy,
    /// Leave a text node alone when its content is unchanged, even if the
    /// descriptor is new.
    pub skip_identical_text: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            halt_policy: HaltPolicy::default(),
            skip_identical_text: true,
        }
    }
}

impl RenderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn halt_policy(mut self, policy: HaltPolicy) -> Self {
        self.halt_policy = policy;
        self
    }

    pub fn skip_identical_text(mut self, skip: bool) -> Self {
        self.skip_identical_text = skip;
        self
    }
}
