//! Context - Ambient values passed down the tree.
//!
//! The ambient mapping ([`GlobalContext`]) flows from parent to child during
//! a diff. Components extend it for their subtree with a child-context hook,
//! and providers created by [`create_context`] register themselves in it so
//! descendants that subscribe (a component spec's `context_type`) can find
//! the nearest one.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use super::component::{ComponentSpec, ComponentType};
use super::registry::ComponentId;
use crate::types::{PropValue, Props};

static CONTEXT_ID: AtomicU64 = AtomicU64::new(0);

// =============================================================================
// Context keys
// =============================================================================

struct ContextKeyData {
    id: u64,
    default_value: PropValue,
    provider: ComponentType,
}

/// A subscribable context: an id, a default, and its provider component.
#[derive(Clone)]
pub struct ContextKey(Rc<ContextKeyData>);

impl ContextKey {
    pub fn id(&self) -> u64 {
        self.0.id
    }

    /// Value seen by subscribers with no provider above them.
    pub fn default_value(&self) -> &PropValue {
        &self.0.default_value
    }

    /// Component type that provides this context. Its `value` prop is what
    /// subscribers below it receive.
    pub fn provider(&self) -> &ComponentType {
        &self.0.provider
    }
}

impl fmt::Debug for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContextKey({})", self.0.id)
    }
}

/// Create a new context with a default value.
pub fn create_context(default_value: impl Into<PropValue>) -> ContextKey {
    let id = CONTEXT_ID.fetch_add(1, Ordering::Relaxed);
    let provider = ComponentSpec::function("Provider", |props, _| Ok(props.children()))
        .provides(id)
        .build();

    ContextKey(Rc::new(ContextKeyData {
        id,
        default_value: default_value.into(),
        provider,
    }))
}

// =============================================================================
// Ambient mapping
// =============================================================================

/// Key in the ambient mapping.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ContextSlot {
    /// Entry contributed by a child-context hook.
    Named(String),
    /// Provider registration for a context id.
    Provider(u64),
}

/// Value in the ambient mapping.
#[derive(Clone, Debug, PartialEq)]
pub enum ContextEntry {
    Value(PropValue),
    Provider(ComponentId),
}

/// The ambient context mapping. Extending it copies; parents never observe
/// what their children add.
#[derive(Clone, Default, PartialEq)]
pub struct GlobalContext(Rc<IndexMap<ContextSlot, ContextEntry>>);

impl GlobalContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value contributed under `name` by an ancestor's child-context hook.
    pub fn get(&self, name: &str) -> Option<&PropValue> {
        match self.0.get(&ContextSlot::Named(name.to_string())) {
            Some(ContextEntry::Value(value)) => Some(value),
            _ => None,
        }
    }

    /// Nearest provider registered for `id`.
    pub fn provider(&self, id: u64) -> Option<ComponentId> {
        match self.0.get(&ContextSlot::Provider(id)) {
            Some(ContextEntry::Provider(component)) => Some(*component),
            _ => None,
        }
    }

    /// Copy extended with the entries of a child-context hook.
    pub fn with_values(&self, values: &Props) -> Self {
        if values.is_empty() {
            return self.clone();
        }
        let mut map = (*self.0).clone();
        for (name, value) in values.iter() {
            map.insert(ContextSlot::Named(name.to_string()), ContextEntry::Value(value.clone()));
        }
        Self(Rc::new(map))
    }

    /// Copy extended with a provider registration.
    pub fn with_provider(&self, id: u64, provider: ComponentId) -> Self {
        let mut map = (*self.0).clone();
        map.insert(ContextSlot::Provider(id), ContextEntry::Provider(provider));
        Self(Rc::new(map))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for GlobalContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

/// Context handed to a component.
///
/// Subscribers (spec with `context_type`) see only the provider's value;
/// everything else sees the ambient mapping.
#[derive(Clone, Debug, PartialEq)]
pub enum ComponentContext {
    Global(GlobalContext),
    Value(PropValue),
}

impl ComponentContext {
    /// Subscribed value, for subscribers.
    pub fn value(&self) -> Option<&PropValue> {
        match self {
            ComponentContext::Value(value) => Some(value),
            ComponentContext::Global(_) => None,
        }
    }

    /// Named ambient entry, for non-subscribers.
    pub fn get(&self, name: &str) -> Option<&PropValue> {
        match self {
            ComponentContext::Global(global) => global.get(name),
            ComponentContext::Value(_) => None,
        }
    }
}

impl Default for ComponentContext {
    fn default() -> Self {
        ComponentContext::Global(GlobalContext::new())
    }
}
