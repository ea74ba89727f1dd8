//! Pipeline - Entry points and per-reconciler configuration.
//!
//! ```text
//! render / hydrate ─► root Fragment ─► Reconciler::diff ─► commit_root
//! set_state / force_update ─► DIRTY ─► render_dirty ─► render_component
//! dispatch_event ─► Options::event ─► handler
//! ```
//!
//! - **options** - The extension hook table and [`RenderConfig`]
//! - **mount** - `render`, `hydrate`, `unmount_root`, `render_dirty` and
//!   event delivery, as methods on [`Reconciler`](crate::Reconciler)

mod mount;
mod options;

pub use options::{
    CatchErrorHook, CommitHook, EventHook, HaltPolicy, Options, RenderConfig, VNodeHook,
};
