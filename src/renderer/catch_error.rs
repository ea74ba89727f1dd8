//! Error Boundary Dispatcher.
//!
//! Walks the parent links of the failing position looking for a component
//! that claims the failure. A component claims it when its static
//! error-derivation hook or its `did_catch` hook leaves it dirty. A hook
//! that itself fails replaces the in-flight error and the walk continues.

use tracing::{debug, trace};

use crate::engine::{ComponentId, Instance, InstanceFlags, Lifecycle, NodeId};
use crate::error::RenderError;
use crate::host::NativeHost;

use super::Reconciler;

/// Result of a boundary search.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundaryOutcome {
    /// This instance took the failure and will re-render.
    Claimed(ComponentId),
    /// The `catch_error` hook swallowed it.
    Intercepted,
    /// Nothing claimed it.
    Propagate(RenderError),
}

impl BoundaryOutcome {
    /// `Ok` when claimed.
    pub fn into_result(self) -> Result<(), RenderError> {
        match self {
            BoundaryOutcome::Claimed(_) | BoundaryOutcome::Intercepted => Ok(()),
            BoundaryOutcome::Propagate(error) => Err(error),
        }
    }
}

impl<H: NativeHost> Reconciler<H> {
    /// Find a boundary for `error` raised at `node`, starting at its parent.
    pub fn catch_error(&mut self, error: RenderError, node: NodeId) -> BoundaryOutcome {
        let mut error = error;
        if let (Some(hook), Some(record)) = (&self.options.catch_error, self.tree.get(node)) {
            match hook(error, record.vnode()) {
                Some(rewritten) => error = rewritten,
                None => {
                    debug!("error intercepted by hook");
                    return BoundaryOutcome::Intercepted;
                }
            }
        }

        let mut current = self.tree.parent(node);

        while let Some(id) = current {
            current = self.tree.parent(id);

            let Some(component) = self.tree.get(id).and_then(|record| record.component) else {
                continue;
            };
            let Some(instance) = self.instances.get_mut(component) else {
                continue;
            };
            if instance.updater.flags.contains(InstanceFlags::PROCESSING_EXCEPTION) {
                continue;
            }

            match offer(instance, &error) {
                Ok(true) => {
                    instance.updater.flags.insert(InstanceFlags::PENDING_ERROR);
                    debug!(boundary = instance.component_type().name(), %error, "error claimed");
                    return BoundaryOutcome::Claimed(component);
                }
                Ok(false) => {}
                Err(replaced) => {
                    trace!(%replaced, "boundary hook failed; continuing with its error");
                    error = replaced;
                }
            }
        }

        BoundaryOutcome::Propagate(error)
    }

    /// Route a failure from `at` to a boundary. Without a position the
    /// failure propagates.
    pub(crate) fn route_error(&mut self, error: RenderError, at: Option<NodeId>) -> Result<(), RenderError> {
        match at {
            Some(node) => self.catch_error(error, node).into_result(),
            None => Err(error),
        }
    }
}

/// Offer `error` to one instance. `Ok(true)` when it claimed it.
fn offer<N>(instance: &mut Instance<N>, error: &RenderError) -> Result<bool, RenderError> {
    let mut handled = false;

    if instance.ty.derives_state_from_error() {
        if let Some(patch) = instance.ty.derive_state_from_error(error)? {
            instance.updater.set_state(patch);
        }
        handled = instance.updater.is_dirty();
    }

    if instance.has(Lifecycle::DID_CATCH) {
        instance.component.did_catch(error, &mut instance.updater)?;
        handled = instance.updater.is_dirty();
    }

    Ok(handled)
}
