//! Commit Queue Flusher.
//!
//! Runs the callbacks queued during a diff pass. Components were appended in
//! post-order, so a child's `did_mount` runs before its parent's.

use tracing::debug;

use crate::engine::{CommitFlow, ComponentId, NodeId};
use crate::error::RenderError;
use crate::host::NativeHost;
use crate::pipeline::HaltPolicy;

use super::Reconciler;

impl<H: NativeHost> Reconciler<H> {
    /// Flush `queue`. `root` is the record the pass started at.
    ///
    /// A failing callback is routed to the boundaries above its component;
    /// when one claims it the rest of that component's callbacks are dropped.
    pub fn commit_root(&mut self, queue: Vec<ComponentId>, root: NodeId) -> Result<(), RenderError> {
        if let (Some(hook), Some(record)) = (&self.options.commit, self.tree.get(root)) {
            hook(record.vnode(), &queue);
        }

        'flush: for component in queue {
            let Some(instance) = self.instances.get_mut(component) else {
                continue;
            };
            let callbacks = std::mem::take(&mut instance.updater.callbacks);

            for deferred in callbacks {
                let Some(instance) = self.instances.get_mut(component) else {
                    break;
                };

                match instance.run(deferred) {
                    Ok(CommitFlow::Continue) => {}
                    Ok(CommitFlow::Halt) => match self.config.halt_policy {
                        HaltPolicy::Ignore => {}
                        HaltPolicy::SkipComponent => {
                            debug!(?component, "commit halted; skipping component");
                            break;
                        }
                        HaltPolicy::AbortFlush => {
                            debug!(?component, "commit halted; aborting flush");
                            break 'flush;
                        }
                    },
                    Err(error) => {
                        let vnode = instance.vnode;
                        self.catch_error(error, vnode).into_result()?;
                        break;
                    }
                }
            }
        }

        Ok(())
    }
}
