//! Property Differ.
//!
//! Applies the minimal attribute, property, style and listener changes that
//! turn one property set into another on a single native node.
//!
//! Listeners are subscribed on the native node only when a handler appears
//! or disappears. Swapping one handler for another only updates the
//! [`Listeners`] registry, which is what event delivery reads.

use std::borrow::Cow;
use std::collections::HashMap;
use std::hash::Hash;

use tracing::trace;

use crate::host::NativeHost;
use crate::types::{fmt_number, EventHandler, PropValue, Props};

use super::{Reconciler, DANGEROUS_HTML};

/// Properties never applied as attributes even though the node has a native
/// property of that name.
const ATTRIBUTE_ONLY: &[&str] = &["href", "list", "form", "tabIndex", "download"];

// =============================================================================
// Listener registry
// =============================================================================

/// Current handler per (node, event, capture).
#[derive(Debug)]
pub struct Listeners<N> {
    handlers: HashMap<N, HashMap<(String, bool), EventHandler>>,
}

impl<N> Default for Listeners<N> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<N: Clone + Eq + Hash> Listeners<N> {
    /// Store (or clear, with `None`) the handler for one event phase.
    pub fn set(&mut self, node: &N, event: &str, capture: bool, handler: Option<EventHandler>) {
        match handler {
            Some(handler) => {
                self.handlers
                    .entry(node.clone())
                    .or_default()
                    .insert((event.to_string(), capture), handler);
            }
            None => {
                if let Some(entries) = self.handlers.get_mut(node) {
                    entries.remove(&(event.to_string(), capture));
                    if entries.is_empty() {
                        self.handlers.remove(node);
                    }
                }
            }
        }
    }

    pub fn get(&self, node: &N, event: &str, capture: bool) -> Option<&EventHandler> {
        self.handlers.get(node)?.get(&(event.to_string(), capture))
    }

    /// Drop every handler of a node that is going away.
    pub fn forget(&mut self, node: &N) {
        self.handlers.remove(node);
    }

    /// Number of nodes with at least one handler.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

// =============================================================================
// Style helpers
// =============================================================================

/// Style keys whose numeric values are unitless.
///
/// Case-insensitive match on fragments such as `acit` (opacity), `ex`
/// followed by `s`/`g`/`n`/`p`/end (flex, flex-grow, z-index), `rph`
/// (orphans), `zoo`, `ine` followed by `c`/`h` (line-clamp, line-height) and
/// a leading `ord` (order).
pub fn is_non_dimensional(key: &str) -> bool {
    const FRAGMENTS: &[&str] = &["acit", "rph", "grid", "ows", "mnc", "ntw", "zoo", "itera"];

    let key = key.to_ascii_lowercase();
    let bytes = key.as_bytes();

    FRAGMENTS.iter().any(|fragment| key.contains(fragment))
        || key.starts_with("ord")
        || key
            .match_indices("ex")
            .any(|(i, _)| matches!(bytes.get(i + 2), None | Some(b's' | b'g' | b'n' | b'p')))
        || key
            .match_indices("ine")
            .any(|(i, _)| matches!(bytes.get(i + 3), Some(b'c' | b'h')))
}

/// Text for one style entry. `None` clears it.
fn style_value(key: &str, value: &PropValue) -> Option<String> {
    let text = match value {
        PropValue::Null => return None,
        PropValue::Number(n) if !key.starts_with('-') && !is_non_dimensional(key) => {
            format!("{}px", fmt_number(*n))
        }
        other => other.to_attribute()?,
    };
    (!text.is_empty()).then_some(text)
}

/// SVG spelling of a property name: `xlinkHref`/`xlink:href` become `href`,
/// `className` becomes `class`.
fn svg_name(name: &str) -> Cow<'_, str> {
    let mut name = Cow::Borrowed(name);
    for prefix in ["xlinkH", "xlink:h", "xlinkh"] {
        if let Some(at) = name.find(prefix) {
            let rest = &name[at + prefix.len()..];
            name = Cow::Owned(format!("{}h{rest}", &name[..at]));
            break;
        }
    }
    if let Some(stem) = name.strip_suffix("sName") {
        name = Cow::Owned(format!("{stem}s"));
    }
    name
}

// =============================================================================
// Differ
// =============================================================================

impl<H: NativeHost> Reconciler<H> {
    /// Diff `old` against `new` on `dom`.
    ///
    /// `children` and `key` are never applied; `value` and `checked` are
    /// left to the controlled-input step. While hydrating only callables are
    /// applied.
    pub fn diff_props(&mut self, dom: &H::Node, new: &Props, old: &Props, svg: bool, hydrating: bool) {
        for (name, value) in old.iter() {
            if name != "children" && name != "key" && !new.contains(name) {
                self.set_property(dom, name, &PropValue::Null, Some(value), svg);
            }
        }

        for (name, value) in new.iter() {
            if (!hydrating || value.is_function())
                && !matches!(name, "children" | "key" | "value" | "checked")
                && old.get(name) != Some(value)
            {
                self.set_property(dom, name, value, old.get(name), svg);
            }
        }
    }

    /// Apply one property.
    pub fn set_property(
        &mut self,
        dom: &H::Node,
        name: &str,
        value: &PropValue,
        old: Option<&PropValue>,
        svg: bool,
    ) {
        if name == "style" {
            self.set_style_prop(dom, value, old);
        } else if name.starts_with("on") {
            self.set_event_prop(dom, name, value, old);
        } else if name != DANGEROUS_HTML {
            self.set_plain_prop(dom, name, value, svg);
        }
    }

    fn set_style_prop(&mut self, dom: &H::Node, value: &PropValue, old: Option<&PropValue>) {
        if let PropValue::Str(css) = value {
            self.host.set_style_text(dom, css);
            return;
        }

        let mut old = old;
        if let Some(PropValue::Str(_)) = old {
            self.host.set_style_text(dom, "");
            old = None;
        }

        let old_map = old.and_then(PropValue::as_map);
        let new_map = value.as_map();

        if let Some(old_map) = old_map {
            for (key, _) in old_map.iter() {
                if !new_map.is_some_and(|map| map.contains(key)) {
                    self.host.set_style(dom, key, None);
                }
            }
        }

        if let Some(new_map) = new_map {
            for (key, entry) in new_map.iter() {
                if old_map.is_none_or(|map| map.get(key) != Some(entry)) {
                    let text = style_value(key, entry);
                    self.host.set_style(dom, key, text.as_deref());
                }
            }
        }
    }

    fn set_event_prop(&mut self, dom: &H::Node, name: &str, value: &PropValue, old: Option<&PropValue>) {
        let (name, capture) = match name.strip_suffix("Capture") {
            Some(stripped) => (stripped, true),
            None => (name, false),
        };

        let lower = name.to_ascii_lowercase();
        let event = if self.host.is_builtin_event(dom, &lower[2..]) {
            &lower[2..]
        } else {
            &name[2..]
        };

        let handler = value.as_handler().cloned();
        let had_handler = old.and_then(PropValue::as_handler).is_some();
        let subscribe = handler.is_some();
        self.listeners.set(dom, event, capture, handler);

        if subscribe {
            if !had_handler {
                trace!(event, capture, "subscribing listener");
                self.host.add_listener(dom, event, capture);
            }
        } else {
            trace!(event, capture, "unsubscribing listener");
            self.host.remove_listener(dom, event, capture);
        }
    }

    fn set_plain_prop(&mut self, dom: &H::Node, name: &str, value: &PropValue, svg: bool) {
        let name = if svg {
            svg_name(name)
        } else {
            if !ATTRIBUTE_ONLY.contains(&name) && self.host.has_property(dom, name) {
                let assigned = match value {
                    PropValue::Null => PropValue::from(""),
                    other => other.clone(),
                };
                match self.host.set_property(dom, name, &assigned) {
                    Ok(()) => return,
                    Err(error) => trace!(%error, "property assignment failed; using attribute"),
                }
            }
            Cow::Borrowed(name)
        };

        if value.is_function() {
            return;
        }

        let keep_false = name.starts_with("aria");
        match value {
            PropValue::Null => self.host.remove_attribute(dom, &name),
            PropValue::Bool(false) if !keep_false => self.host.remove_attribute(dom, &name),
            other => match other.to_attribute() {
                Some(text) => self.host.set_attribute(dom, &name, &text),
                None => self.host.remove_attribute(dom, &name),
            },
        }
    }
}
