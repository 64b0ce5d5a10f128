//! Contract between the engine and the host page it decorates.
//!
//! The host owns the UI tree and re-renders it at will. The engine only sees
//! opaque [`NodeId`]s; a node that is removed and re-created comes back with a
//! new id, which is how stale bindings are recognised.

use super::overlay::OverlayView;
use std::fmt;

/// Opaque handle to a node of the host tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Viewport-relative bounding box
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Keys the engine reacts to or synthesizes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    ArrowDown,
    ArrowUp,
    Enter,
    Escape,
    /// Neutral key used to poke the host's validation pipeline
    Unidentified,
    Other(String),
}

impl Key {
    pub fn from_name(name: &str) -> Self {
        match name {
            "ArrowDown" => Key::ArrowDown,
            "ArrowUp" => Key::ArrowUp,
            "Enter" => Key::Enter,
            "Escape" | "Esc" => Key::Escape,
            "Unidentified" => Key::Unidentified,
            other => Key::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Input,
    Change,
    KeyDown(Key),
    KeyUp(Key),
    PointerDown,
    PointerUp,
    Click,
}

/// An event the engine dispatches into the host tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntheticEvent {
    pub kind: EventKind,
    pub bubbles: bool,
}

impl SyntheticEvent {
    pub fn bubbling(kind: EventKind) -> Self {
        Self { kind, bubbles: true }
    }
}

/// How a control stores its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    /// Value lives in the native `value` property
    SingleLine,
    /// Value lives in the text content
    FreeForm,
}

/// Read and write access to the host's UI tree
pub trait PageTree {
    fn root(&self) -> NodeId;
    fn children(&self, node: NodeId) -> Vec<NodeId>;
    fn parent(&self, node: NodeId) -> Option<NodeId>;
    /// Lowercase tag name
    fn tag(&self, node: NodeId) -> Option<&str>;
    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;
    /// Rendered text of the node and its descendants
    fn visible_text(&self, node: NodeId) -> String;
    /// Native value property of a single-line control
    fn value(&self, node: NodeId) -> String;
    fn bounding_box(&self, node: NodeId) -> Rect;
    fn is_visible(&self, node: NodeId) -> bool;
    /// Whether the node is still part of the tree
    fn is_attached(&self, node: NodeId) -> bool;
    /// Vertical scroll offset of the page
    fn scroll_offset(&self) -> f64;

    fn focus(&mut self, node: NodeId);
    /// Write through the platform's own value setter, bypassing framework overrides
    fn write_native_value(&mut self, node: NodeId, text: &str);
    fn write_text_content(&mut self, node: NodeId, text: &str);
    fn dispatch(&mut self, node: NodeId, event: SyntheticEvent);
    fn place_caret_at_end(&mut self, node: NodeId);
    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str);
}

/// Renders the single suggestion overlay
pub trait OverlaySurface {
    fn show_overlay(&mut self, view: &OverlayView);
    fn hide_overlay(&mut self);
}

/// Change notification for the host tree
pub trait StructureNotifier {
    fn on_structure_changed(&mut self, callback: Box<dyn FnMut() + Send>);
}

/// Everything the engine needs from its host
pub trait PageHost: PageTree + OverlaySurface {}

impl<T: PageTree + OverlaySurface> PageHost for T {}

/// All descendants of `node` in document order, excluding `node` itself
pub fn descendants<T: PageTree + ?Sized>(tree: &T, node: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = tree.children(node).into_iter().rev().collect();
    while let Some(current) = stack.pop() {
        out.push(current);
        stack.extend(tree.children(current).into_iter().rev());
    }
    out
}

/// Parent chain of `node`, nearest first
pub fn ancestors<T: PageTree + ?Sized>(tree: &T, node: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut current = tree.parent(node);
    while let Some(parent) = current {
        out.push(parent);
        current = tree.parent(parent);
    }
    out
}

pub fn control_kind<T: PageTree + ?Sized>(tree: &T, node: NodeId) -> ControlKind {
    match tree.tag(node) {
        Some("input") | Some("textarea") => ControlKind::SingleLine,
        _ => ControlKind::FreeForm,
    }
}

/// Current user-visible value of a control
pub fn read_value<T: PageTree + ?Sized>(tree: &T, node: NodeId) -> String {
    match control_kind(tree, node) {
        ControlKind::SingleLine => tree.value(node),
        ControlKind::FreeForm => tree.visible_text(node),
    }
}
