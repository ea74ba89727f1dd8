//! Core types for spark-reconcile.
//!
//! These are the values that flow through descriptors: property values,
//! ordered property maps, renderable children, event handlers and refs.
//! Everything here is cheap to clone (reference counted) because the
//! reconciler compares old and new values by identity as often as by value.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::engine::{ComponentId, VNode};
use crate::error::RenderError;

/// Shared immutable string.
pub type SharedStr = Rc<str>;

/// Stable identity of a descriptor among its siblings.
pub type Key = SharedStr;

// =============================================================================
// Number formatting
// =============================================================================

/// Format a number the way attribute and style values expect it.
///
/// Integral values print without a fractional part (`5`, not `5.0`).
pub fn fmt_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

// =============================================================================
// Events
// =============================================================================

/// An event delivered to a listener registered through an `on*` property.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Event name without the `on` prefix (`click`, `input`, ...).
    pub name: String,
    /// Whether this is the capture-phase delivery.
    pub capture: bool,
    /// Event payload supplied by the host.
    pub detail: PropValue,
}

impl Event {
    /// Create a bubble-phase event with no payload.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capture: false,
            detail: PropValue::Null,
        }
    }

    /// Mark the event as a capture-phase delivery.
    pub fn capturing(mut self) -> Self {
        self.capture = true;
        self
    }

    /// Attach a payload.
    pub fn with_detail(mut self, detail: impl Into<PropValue>) -> Self {
        self.detail = detail.into();
        self
    }
}

/// Event handler stored under an `on*` property.
///
/// Handlers compare by identity: two handlers are equal only if they are
/// clones of the same closure.
#[derive(Clone)]
pub struct EventHandler(Rc<dyn Fn(&Event)>);

impl EventHandler {
    /// Wrap a closure.
    pub fn new(handler: impl Fn(&Event) + 'static) -> Self {
        Self(Rc::new(handler))
    }

    /// Invoke the handler.
    pub fn call(&self, event: &Event) {
        (self.0)(event)
    }
}

impl PartialEq for EventHandler {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventHandler({:p})", Rc::as_ptr(&self.0))
    }
}

// =============================================================================
// Refs
// =============================================================================

/// What a ref receives: a native handle or a component instance.
#[derive(Clone)]
pub enum RefValue {
    /// The native node created for an element or text descriptor.
    Native(Rc<dyn Any>),
    /// The instance created for a component descriptor.
    Component(ComponentId),
}

impl RefValue {
    /// Downcast a native handle to the host's node type.
    pub fn native<N: Clone + 'static>(&self) -> Option<N> {
        match self {
            RefValue::Native(handle) => handle.downcast_ref::<N>().cloned(),
            RefValue::Component(_) => None,
        }
    }

    /// The component instance, if this ref points at one.
    pub fn component(&self) -> Option<ComponentId> {
        match self {
            RefValue::Component(id) => Some(*id),
            RefValue::Native(_) => None,
        }
    }

    /// Whether two ref values address the same native node or instance.
    pub fn same_as(&self, other: &RefValue) -> bool {
        match (self, other) {
            (RefValue::Native(a), RefValue::Native(b)) => Rc::ptr_eq(a, b),
            (RefValue::Component(a), RefValue::Component(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for RefValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefValue::Native(handle) => write!(f, "Native({:p})", Rc::as_ptr(handle)),
            RefValue::Component(id) => write!(f, "Component({id:?})"),
        }
    }
}

/// Ref callback. Receives the handle on attach and `None` on detach.
pub type RefCallback = Rc<dyn Fn(Option<RefValue>) -> Result<(), RenderError>>;

/// Object ref: a shared `current` cell.
#[derive(Clone, Default)]
pub struct ObjectRef(Rc<RefCell<Option<RefValue>>>);

impl ObjectRef {
    /// Create an empty ref.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current value.
    pub fn current(&self) -> Option<RefValue> {
        self.0.borrow().clone()
    }

    /// Assign the current value.
    pub fn set(&self, value: Option<RefValue>) {
        *self.0.borrow_mut() = value;
    }

    /// Shortcut for the native handle, downcast to the host node type.
    pub fn native<N: Clone + 'static>(&self) -> Option<N> {
        self.current().and_then(|value| value.native::<N>())
    }
}

/// Write-target for the native handle or component instance of a descriptor.
#[derive(Clone)]
pub enum Ref {
    /// Invoked with the handle (or `None` on detach).
    Callback(RefCallback),
    /// Its `current` field is assigned the handle.
    Object(ObjectRef),
}

impl Ref {
    /// Build a callback ref.
    pub fn callback(f: impl Fn(Option<RefValue>) -> Result<(), RenderError> + 'static) -> Self {
        Ref::Callback(Rc::new(f))
    }
}

impl PartialEq for Ref {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Ref::Callback(a), Ref::Callback(b)) => Rc::ptr_eq(a, b),
            (Ref::Object(a), Ref::Object(b)) => Rc::ptr_eq(&a.0, &b.0),
            _ => false,
        }
    }
}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ref::Callback(cb) => write!(f, "Ref::Callback({:p})", Rc::as_ptr(cb)),
            Ref::Object(obj) => write!(f, "Ref::Object({:?})", obj.current()),
        }
    }
}

impl From<ObjectRef> for Ref {
    fn from(value: ObjectRef) -> Self {
        Ref::Object(value)
    }
}

// =============================================================================
// Prop Value
// =============================================================================

/// A property value.
///
/// Scalars compare by value; handlers, refs and descriptor children compare
/// by identity.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum PropValue {
    /// Absent / cleared.
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Str(SharedStr),
    /// Raw HTML content (the `dangerouslySetInnerHTML` property).
    Html(SharedStr),
    /// Nested mapping (style objects, child context entries, ...).
    Map(Props),
    /// Event handler (`on*` properties).
    Handler(EventHandler),
    /// Ref carried in a raw property bag before the factory extracts it.
    Ref(Ref),
    /// Renderable children (`children`, render props).
    Children(Child),
}

impl PropValue {
    /// Whether the value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, PropValue::Null)
    }

    /// Whether the value is callable. Callables are never serialized as
    /// attributes and are the only props applied while hydrating.
    pub fn is_function(&self) -> bool {
        matches!(self, PropValue::Handler(_) | PropValue::Ref(Ref::Callback(_)))
    }

    /// Falsy in the boolean sense (`null`, `false`, `0`, `""`).
    pub fn is_falsy(&self) -> bool {
        match self {
            PropValue::Null => true,
            PropValue::Bool(b) => !b,
            PropValue::Number(n) => *n == 0.0 || n.is_nan(),
            PropValue::Str(s) => s.is_empty(),
            _ => false,
        }
    }

    /// String view of `Str` values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view of `Number` values.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The handler, for `Handler` values.
    pub fn as_handler(&self) -> Option<&EventHandler> {
        match self {
            PropValue::Handler(h) => Some(h),
            _ => None,
        }
    }

    /// The mapping, for `Map` values.
    pub fn as_map(&self) -> Option<&Props> {
        match self {
            PropValue::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Text form used when the value is written as an attribute.
    ///
    /// Returns `None` for values that are never serialized.
    pub fn to_attribute(&self) -> Option<String> {
        match self {
            PropValue::Bool(b) => Some(b.to_string()),
            PropValue::Number(n) => Some(fmt_number(*n)),
            PropValue::Str(s) | PropValue::Html(s) => Some(s.to_string()),
            PropValue::Null
            | PropValue::Map(_)
            | PropValue::Handler(_)
            | PropValue::Ref(_)
            | PropValue::Children(_) => None,
        }
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Number(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Number(f64::from(value))
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Number(value as f64)
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(value.into())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(value.into())
    }
}

impl From<SharedStr> for PropValue {
    fn from(value: SharedStr) -> Self {
        PropValue::Str(value)
    }
}

impl From<Props> for PropValue {
    fn from(value: Props) -> Self {
        PropValue::Map(value)
    }
}

impl From<EventHandler> for PropValue {
    fn from(value: EventHandler) -> Self {
        PropValue::Handler(value)
    }
}

impl From<Ref> for PropValue {
    fn from(value: Ref) -> Self {
        PropValue::Ref(value)
    }
}

impl From<Child> for PropValue {
    fn from(value: Child) -> Self {
        PropValue::Children(value)
    }
}

impl From<VNode> for PropValue {
    fn from(value: VNode) -> Self {
        PropValue::Children(Child::Node(value))
    }
}

impl<T: Into<PropValue>> From<Option<T>> for PropValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(PropValue::Null, Into::into)
    }
}

// =============================================================================
// Props
// =============================================================================

/// Ordered property mapping with string keys.
///
/// Clones share storage; the first mutation of a shared map copies it
/// (copy-on-write through `Rc::make_mut`). Identity comparison
/// ([`Props::ptr_eq`]) is what "props changed" means to lifecycle hooks.
#[derive(Clone, Default)]
pub struct Props(Rc<IndexMap<String, PropValue>>);

impl Props {
    /// An empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace an entry, copying shared storage first.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PropValue>) {
        Rc::make_mut(&mut self.0).insert(key.into(), value.into());
    }

    /// Remove an entry, preserving the order of the rest.
    pub fn remove(&mut self, key: &str) -> Option<PropValue> {
        if !self.0.contains_key(key) {
            return None;
        }
        Rc::make_mut(&mut self.0).shift_remove(key)
    }

    /// Shallow merge: every entry of `patch` overwrites this map's entry.
    pub fn merge(&mut self, patch: &Props) {
        if patch.is_empty() {
            return;
        }
        let map = Rc::make_mut(&mut self.0);
        for (key, value) in patch.iter() {
            map.insert(key.to_string(), value.clone());
        }
    }

    pub fn get(&self, key: &str) -> Option<&PropValue> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The `children` entry as a renderable, `Child::Empty` when absent.
    pub fn children(&self) -> Child {
        match self.get("children") {
            Some(PropValue::Children(child)) => child.clone(),
            Some(PropValue::Str(s)) => Child::Text(s.clone()),
            Some(PropValue::Number(n)) => Child::Text(fmt_number(*n).into()),
            _ => Child::Empty,
        }
    }

    /// Whether both handles share storage.
    pub fn ptr_eq(&self, other: &Props) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Props {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.0 == other.0
    }
}

impl fmt::Debug for Props {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.0.iter()).finish()
    }
}

impl<K: Into<String>, V: Into<PropValue>> FromIterator<(K, V)> for Props {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let map: IndexMap<String, PropValue> = iter
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self(Rc::new(map))
    }
}

// =============================================================================
// Child - renderable values
// =============================================================================

/// Anything a component can render or an element can contain.
#[derive(Clone, Debug, Default)]
pub enum Child {
    /// Renders nothing; leaves a hole in the child list.
    #[default]
    Empty,
    /// Text content; becomes a text descriptor.
    Text(SharedStr),
    /// A descriptor.
    Node(VNode),
    /// A nested sequence; becomes a fragment descriptor.
    List(Vec<Child>),
}

impl Child {
    /// Normalize to a sequence: lists unwrap, everything else is a
    /// one-element sequence.
    pub fn into_list(self) -> Vec<Child> {
        match self {
            Child::List(children) => children,
            other => vec![other],
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Child::Empty)
    }
}

impl PartialEq for Child {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Child::Empty, Child::Empty) => true,
            (Child::Text(a), Child::Text(b)) => a == b,
            (Child::Node(a), Child::Node(b)) => a.ptr_eq(b),
            (Child::List(a), Child::List(b)) => a == b,
            _ => false,
        }
    }
}

impl From<VNode> for Child {
    fn from(value: VNode) -> Self {
        Child::Node(value)
    }
}

impl From<&str> for Child {
    fn from(value: &str) -> Self {
        Child::Text(value.into())
    }
}

impl From<String> for Child {
    fn from(value: String) -> Self {
        Child::Text(value.into())
    }
}

impl From<i32> for Child {
    fn from(value: i32) -> Self {
        Child::Text(value.to_string().into())
    }
}

impl From<i64> for Child {
    fn from(value: i64) -> Self {
        Child::Text(value.to_string().into())
    }
}

impl From<f64> for Child {
    fn from(value: f64) -> Self {
        Child::Text(fmt_number(value).into())
    }
}

/// Booleans render nothing (`cond && node` style).
impl From<bool> for Child {
    fn from(_: bool) -> Self {
        Child::Empty
    }
}

impl From<Vec<Child>> for Child {
    fn from(value: Vec<Child>) -> Self {
        Child::List(value)
    }
}

impl<T: Into<Child>> From<Option<T>> for Child {
    fn from(value: Option<T>) -> Self {
        value.map_or(Child::Empty, Into::into)
    }
}
