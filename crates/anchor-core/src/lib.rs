#![doc = r"Core runtime pieces for the Anchor-RS reconciler."]

extern crate self as anchor_core;

pub mod ambient;
pub mod collections;
pub mod dom;
pub mod hooks;
pub mod hyperscript;
pub mod list;
pub mod mount;
pub mod owned;
pub mod patch;
pub mod root;
pub mod runner;

pub use ambient::{ambient_of, Ambient};
pub use dom::{Document, MemoryDocument, NodeId};
pub use hooks::{
    use_callback, use_effect, use_memo, use_node_ref, use_pin, use_reducer, use_ref, use_state,
    Deps, Dispatch, EffectScope, Setter,
};
pub use hyperscript::h;
pub use mount::{Instance, MountPoint};
pub use owned::Owned;
pub use root::Root;
pub use runner::{BatchRunner, FlushScheduler, NoopScheduler, PinHandle, Runner};

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Signature every component render function has. Components are plain `fn`
/// items; the pointer is the component's identity across renders.
pub type ComponentFn = fn(&Props) -> View;

/// What a render function returns and what the `children` prop holds.
///
/// Numbers convert through their string form at construction, so `1` and
/// `"1"` describe the same text node.
#[derive(Clone, PartialEq, Debug)]
pub enum View {
    Empty,
    Text(String),
    Node(VNode),
    Many(Vec<View>),
}

impl View {
    /// Host element description. Children and attributes travel in `props`.
    pub fn element(tag: impl Into<String>, props: Props) -> View {
        View::Node(VNode {
            kind: NodeKind::Element(tag.into()),
            props,
            key: None,
        })
    }

    pub fn element_keyed(tag: impl Into<String>, props: Props, key: impl fmt::Display) -> View {
        View::Node(VNode {
            kind: NodeKind::Element(tag.into()),
            props,
            key: Some(key.to_string()),
        })
    }

    /// Component description. `name` labels the instance's trailing marker;
    /// the `comp!` macro fills it in from the `fn` item's path.
    pub fn component(name: &'static str, render: ComponentFn, props: Props, key: Option<String>) -> View {
        let name = name.rsplit("::").next().unwrap_or(name);
        View::Node(VNode {
            kind: NodeKind::Component { name, render },
            props,
            key,
        })
    }

    pub(crate) fn key(&self) -> Option<&str> {
        match self {
            View::Node(node) => node.key.as_deref(),
            _ => None,
        }
    }
}

impl From<&str> for View {
    fn from(text: &str) -> Self {
        View::Text(text.to_string())
    }
}

impl From<String> for View {
    fn from(text: String) -> Self {
        View::Text(text)
    }
}

impl From<Vec<View>> for View {
    fn from(items: Vec<View>) -> Self {
        View::Many(items)
    }
}

macro_rules! view_from_number {
    ($($ty:ty),+) => {
        $(impl From<$ty> for View {
            fn from(value: $ty) -> Self {
                View::Text(value.to_string())
            }
        })+
    };
}

view_from_number!(i32, i64, u32, u64, usize, f32, f64);

/// One node of the virtual tree. `kind` identity plus `key` equality is the
/// sole "same logical node as last time" criterion.
#[derive(Clone, PartialEq, Debug)]
pub struct VNode {
    pub kind: NodeKind,
    pub props: Props,
    pub key: Option<String>,
}

#[derive(Clone)]
pub enum NodeKind {
    Element(String),
    Component { name: &'static str, render: ComponentFn },
}

impl PartialEq for NodeKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (NodeKind::Element(a), NodeKind::Element(b)) => a == b,
            (NodeKind::Component { render: a, .. }, NodeKind::Component { render: b, .. }) => {
                *a == *b
            }
            _ => false,
        }
    }
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Element(tag) => f.debug_tuple("Element").field(tag).finish(),
            NodeKind::Component { name, .. } => {
                f.debug_struct("Component").field("name", name).finish()
            }
        }
    }
}

/// Cloneable zero-argument callback installed as a host event handler.
/// Equality is pointer identity, matching how the reconciler decides whether
/// a handler prop changed.
#[derive(Clone)]
pub struct Handler {
    f: Rc<dyn Fn()>,
}

impl Handler {
    pub fn new(f: impl Fn() + 'static) -> Self {
        Self { f: Rc::new(f) }
    }

    pub fn call(&self) {
        (self.f)();
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.f, &other.f)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler(..)")
    }
}

impl<F: Fn() + 'static> From<F> for Handler {
    fn from(f: F) -> Self {
        Handler::new(f)
    }
}

/// What a `ref` prop receives.
#[derive(Clone, Debug)]
pub enum RefTarget {
    Element(NodeId),
    Component(PinHandle),
}

/// Tagged ref chosen at the API boundary: either a callback invoked with the
/// target, or an object cell whose `current` is overwritten. Applied on every
/// patch pass, never cleared on teardown.
#[derive(Clone)]
pub enum RefBinding {
    Function(Rc<dyn Fn(RefTarget)>),
    Object(NodeRef),
}

impl RefBinding {
    pub fn function(f: impl Fn(RefTarget) + 'static) -> Self {
        RefBinding::Function(Rc::new(f))
    }

    pub(crate) fn apply(&self, target: RefTarget) {
        match self {
            RefBinding::Function(f) => f(target),
            RefBinding::Object(cell) => cell.set(Some(target)),
        }
    }
}

impl PartialEq for RefBinding {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RefBinding::Function(a), RefBinding::Function(b)) => Rc::ptr_eq(a, b),
            (RefBinding::Object(a), RefBinding::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for RefBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefBinding::Function(_) => f.write_str("RefBinding::Function(..)"),
            RefBinding::Object(_) => f.write_str("RefBinding::Object(..)"),
        }
    }
}

/// Object ref cell for the `ref` prop. The reconciler writes the latest
/// target into it on every pass; it keeps the last target after teardown.
#[derive(Clone, Default)]
pub struct NodeRef {
    current: Rc<RefCell<Option<RefTarget>>>,
}

impl NodeRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<RefTarget> {
        self.current.borrow().clone()
    }

    pub(crate) fn set(&self, target: Option<RefTarget>) {
        *self.current.borrow_mut() = target;
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.current, &other.current)
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NodeRef(..)")
    }
}

/// A prop value. `Nodes` carries the `children` entry.
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Num(f64),
    Str(String),
    Handler(Handler),
    Ref(RefBinding),
    Nodes(View),
}

impl Value {
    /// Attribute presence: falsy values are removed, except zero, which is
    /// kept.
    pub(crate) fn is_set(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(_) => true,
            Value::Num(n) => !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Handler(_) | Value::Ref(_) | Value::Nodes(_) => true,
        }
    }

    pub(crate) fn attr_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Num(n) => n.to_string(),
            Value::Str(s) => s.clone(),
            Value::Handler(_) | Value::Ref(_) | Value::Nodes(_) => "[object]".to_string(),
        }
    }

    /// Normalize a `children` entry to the slot list an element reconciles.
    pub(crate) fn as_child_views(&self) -> Vec<View> {
        match self {
            Value::Null => Vec::new(),
            Value::Nodes(View::Empty) => Vec::new(),
            Value::Nodes(View::Many(items)) => items.clone(),
            Value::Nodes(view) => vec![view.clone()],
            Value::Str(s) => vec![View::Text(s.clone())],
            Value::Int(n) => vec![View::Text(n.to_string())],
            Value::Num(n) => vec![View::Text(n.to_string())],
            Value::Bool(_) | Value::Handler(_) | Value::Ref(_) => vec![View::Empty],
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Num(a), Value::Num(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Handler(a), Value::Handler(b)) => a == b,
            (Value::Ref(a), Value::Ref(b)) => a == b,
            (Value::Nodes(a), Value::Nodes(b)) => a == b,
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Handler> for Value {
    fn from(h: Handler) -> Self {
        Value::Handler(h)
    }
}

impl From<RefBinding> for Value {
    fn from(r: RefBinding) -> Self {
        Value::Ref(r)
    }
}

impl From<NodeRef> for Value {
    fn from(r: NodeRef) -> Self {
        Value::Ref(RefBinding::Object(r))
    }
}

impl From<View> for Value {
    fn from(view: View) -> Self {
        Value::Nodes(view)
    }
}

impl From<Vec<View>> for Value {
    fn from(items: Vec<View>) -> Self {
        Value::Nodes(View::Many(items))
    }
}

impl From<VNode> for Value {
    fn from(node: VNode) -> Self {
        Value::Nodes(View::Node(node))
    }
}

macro_rules! value_from_int {
    ($($ty:ty),+) => {
        $(impl From<$ty> for Value {
            fn from(value: $ty) -> Self {
                Value::Int(value as i64)
            }
        })+
    };
}

value_from_int!(i32, i64, u32, u64, usize);

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Num(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Num(value as f64)
    }
}

/// Insertion-ordered prop map.
#[derive(Clone, Default, Debug)]
pub struct Props {
    entries: indexmap::IndexMap<String, Value>,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The normalized `children` slot list: absent or null means no slots.
    pub fn children(&self) -> Vec<View> {
        self.get("children")
            .map(Value::as_child_views)
            .unwrap_or_default()
    }

    pub fn ref_binding(&self) -> Option<&RefBinding> {
        match self.get("ref") {
            Some(Value::Ref(binding)) => Some(binding),
            _ => None,
        }
    }

    pub(crate) fn without_ref(&self) -> Props {
        let mut out = self.clone();
        out.entries.shift_remove("ref");
        out
    }

    /// Everything except `children`; what the attribute diff works on.
    pub(crate) fn attributes(&self) -> Props {
        let mut out = self.clone();
        out.entries.shift_remove("children");
        out
    }

    /// Shallow prop comparison: entries filtered to non-null values, ordered
    /// by name, compared pairwise. Handlers and refs compare by identity.
    pub fn signature_eq(&self, other: &Props) -> bool {
        let mut a: Vec<(&str, &Value)> = self
            .iter()
            .filter(|(_, v)| !matches!(v, Value::Null))
            .collect();
        let mut b: Vec<(&str, &Value)> = other
            .iter()
            .filter(|(_, v)| !matches!(v, Value::Null))
            .collect();
        a.sort_by_key(|(name, _)| *name);
        b.sort_by_key(|(name, _)| *name);
        a == b
    }
}

impl PartialEq for Props {
    fn eq(&self, other: &Self) -> bool {
        self.signature_eq(other)
    }
}

/// Host element builder: `el("div", props!{"class" => "hoge"})`.
pub fn el(tag: impl Into<String>, props: Props) -> View {
    View::element(tag, props)
}

/// Keyed host element builder.
pub fn el_keyed(tag: impl Into<String>, props: Props, key: impl fmt::Display) -> View {
    View::element_keyed(tag, props, key)
}

/// Text builder; `View::from` covers the conversions.
pub fn text(value: impl Into<View>) -> View {
    value.into()
}

/// Component builder capturing the `fn` item's name for the trailing marker.
///
/// ```ignore
/// fn counter(props: &Props) -> View { .. }
/// comp!(counter);
/// comp!(counter, props!{"step" => 2});
/// comp!(counter, props!{"step" => 2}, key = item_id);
/// ```
#[macro_export]
macro_rules! comp {
    ($f:path) => {
        $crate::View::component(stringify!($f), $f, $crate::Props::new(), None)
    };
    ($f:path, $props:expr) => {
        $crate::View::component(stringify!($f), $f, $props, None)
    };
    ($f:path, $props:expr, key = $key:expr) => {
        $crate::View::component(stringify!($f), $f, $props, Some($key.to_string()))
    };
}

/// Prop map literal: `props!{"class" => "hoge", "onclick" => handler}`.
#[macro_export]
macro_rules! props {
    () => { $crate::Props::new() };
    ($($name:expr => $value:expr),+ $(,)?) => {{
        let mut props = $crate::Props::new();
        $(props.insert($name, $crate::Value::from($value));)+
        props
    }};
}

/// Dependency list for `use_effect`/`use_memo`/`use_callback`. `deps![]`
/// means "run once"; passing `None` instead of a list means "run always".
#[macro_export]
macro_rules! deps {
    ($($dep:expr),* $(,)?) => {
        Some(vec![$($crate::Value::from($dep)),*])
    };
}
