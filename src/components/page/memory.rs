//! Arena-backed page tree.
//!
//! Models the parts of a reactive host that matter to the engine: the host
//! only "observes" a control's value when a bubbling input notification is
//! dispatched after the write, and structural edits fire the registered
//! change callbacks.

use super::overlay::OverlayView;
use super::tree::{
    control_kind, ControlKind, EventKind, NodeId, OverlaySurface, PageTree, Rect,
    StructureNotifier, SyntheticEvent,
};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Description of an element to append
#[derive(Debug, Clone, Default)]
pub struct ElementSpec {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    rect: Rect,
    hidden: bool,
}

impl ElementSpec {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_lowercase(),
            ..Default::default()
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn rect(mut self, rect: Rect) -> Self {
        self.rect = rect;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

#[derive(Debug, Clone)]
struct MemoryNode {
    tag: String,
    attributes: BTreeMap<String, String>,
    text: String,
    value: String,
    rect: Rect,
    hidden: bool,
    attached: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// In-memory implementation of every host trait
pub struct MemoryPage {
    nodes: Vec<MemoryNode>,
    focused: Option<NodeId>,
    caret_at_end: Option<NodeId>,
    scroll_offset: f64,
    overlay: Option<OverlayView>,
    dispatched: Vec<(NodeId, SyntheticEvent)>,
    observed: HashMap<NodeId, String>,
    observers: Vec<Box<dyn FnMut() + Send>>,
}

impl fmt::Debug for MemoryPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryPage")
            .field("nodes", &self.nodes.len())
            .field("focused", &self.focused)
            .field("overlay_open", &self.overlay.is_some())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Default for MemoryPage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPage {
    /// Create a page holding only a `body` root
    pub fn new() -> Self {
        let root = MemoryNode {
            tag: "body".to_string(),
            attributes: BTreeMap::new(),
            text: String::new(),
            value: String::new(),
            rect: Rect::default(),
            hidden: false,
            attached: true,
            parent: None,
            children: Vec::new(),
        };
        Self {
            nodes: vec![root],
            focused: None,
            caret_at_end: None,
            scroll_offset: 0.0,
            overlay: None,
            dispatched: Vec::new(),
            observed: HashMap::new(),
            observers: Vec::new(),
        }
    }

    /// Append an element under `parent` and notify observers
    pub fn append(&mut self, parent: NodeId, spec: ElementSpec) -> NodeId {
        let id = NodeId(self.nodes.len() as u64);
        let attached = self.node(parent).map(|p| p.attached).unwrap_or(false);
        self.nodes.push(MemoryNode {
            tag: spec.tag,
            attributes: spec.attributes,
            text: spec.text,
            value: String::new(),
            rect: spec.rect,
            hidden: spec.hidden,
            attached,
            parent: Some(parent),
            children: Vec::new(),
        });
        if let Some(parent_node) = self.node_mut(parent) {
            parent_node.children.push(id);
        }
        self.notify();
        id
    }

    /// Detach a subtree and notify observers
    pub fn remove(&mut self, node: NodeId) {
        if let Some(parent) = self.node(node).and_then(|n| n.parent) {
            if let Some(parent_node) = self.node_mut(parent) {
                parent_node.children.retain(|child| *child != node);
            }
        }
        self.detach(node);
        if self.focused == Some(node) {
            self.focused = None;
        }
        self.notify();
    }

    /// Simulate the user typing: the native value and the host's view both change
    pub fn type_text(&mut self, node: NodeId, text: &str) {
        match control_kind(&*self, node) {
            ControlKind::SingleLine => {
                if let Some(n) = self.node_mut(node) {
                    n.value = text.to_string();
                }
            }
            ControlKind::FreeForm => {
                if let Some(n) = self.node_mut(node) {
                    n.text = text.to_string();
                }
            }
        }
        self.observed.insert(node, text.to_string());
        self.focused = Some(node);
    }

    pub fn set_hidden(&mut self, node: NodeId, hidden: bool) {
        if let Some(n) = self.node_mut(node) {
            n.hidden = hidden;
        }
    }

    pub fn set_text(&mut self, node: NodeId, text: &str) {
        if let Some(n) = self.node_mut(node) {
            n.text = text.to_string();
        }
    }

    pub fn set_scroll_offset(&mut self, offset: f64) {
        self.scroll_offset = offset;
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    pub fn caret_at_end(&self) -> Option<NodeId> {
        self.caret_at_end
    }

    pub fn overlay(&self) -> Option<&OverlayView> {
        self.overlay.as_ref()
    }

    /// Value as last observed by the host framework
    pub fn host_value(&self, node: NodeId) -> Option<&str> {
        self.observed.get(&node).map(String::as_str)
    }

    pub fn dispatched(&self) -> &[(NodeId, SyntheticEvent)] {
        &self.dispatched
    }

    /// Event kinds dispatched on `node`, in order
    pub fn events_on(&self, node: NodeId) -> Vec<EventKind> {
        self.dispatched
            .iter()
            .filter(|(target, _)| *target == node)
            .map(|(_, event)| event.kind.clone())
            .collect()
    }

    pub fn clear_dispatched(&mut self) {
        self.dispatched.clear();
    }

    fn node(&self, id: NodeId) -> Option<&MemoryNode> {
        self.nodes.get(id.0 as usize)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut MemoryNode> {
        self.nodes.get_mut(id.0 as usize)
    }

    fn detach(&mut self, node: NodeId) {
        let children = match self.node_mut(node) {
            Some(n) => {
                n.attached = false;
                n.children.clone()
            }
            None => return,
        };
        for child in children {
            self.detach(child);
        }
    }

    fn notify(&mut self) {
        for observer in self.observers.iter_mut() {
            observer();
        }
    }
}

impl PageTree for MemoryPage {
    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node).map(|n| n.children.clone()).unwrap_or_default()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).and_then(|n| n.parent)
    }

    fn tag(&self, node: NodeId) -> Option<&str> {
        self.node(node).map(|n| n.tag.as_str())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.node(node)
            .and_then(|n| n.attributes.get(name))
            .map(String::as_str)
    }

    fn visible_text(&self, node: NodeId) -> String {
        let Some(n) = self.node(node) else {
            return String::new();
        };
        if n.hidden {
            return String::new();
        }
        let mut text = n.text.clone();
        for child in &n.children {
            text.push_str(&self.visible_text(*child));
        }
        text
    }

    fn value(&self, node: NodeId) -> String {
        self.node(node).map(|n| n.value.clone()).unwrap_or_default()
    }

    fn bounding_box(&self, node: NodeId) -> Rect {
        self.node(node).map(|n| n.rect).unwrap_or_default()
    }

    fn is_visible(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            match self.node(id) {
                Some(n) if n.attached && !n.hidden => current = n.parent,
                _ => return false,
            }
        }
        true
    }

    fn is_attached(&self, node: NodeId) -> bool {
        self.node(node).map(|n| n.attached).unwrap_or(false)
    }

    fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    fn focus(&mut self, node: NodeId) {
        if self.is_attached(node) {
            self.focused = Some(node);
        }
    }

    fn write_native_value(&mut self, node: NodeId, text: &str) {
        if let Some(n) = self.node_mut(node) {
            n.value = text.to_string();
        }
    }

    fn write_text_content(&mut self, node: NodeId, text: &str) {
        let had_children = match self.node_mut(node) {
            Some(n) => {
                n.text = text.to_string();
                !n.children.is_empty()
            }
            None => return,
        };
        if had_children {
            for child in self.children(node) {
                self.detach(child);
            }
            if let Some(n) = self.node_mut(node) {
                n.children.clear();
            }
            self.notify();
        }
    }

    fn dispatch(&mut self, node: NodeId, event: SyntheticEvent) {
        // the host only picks up a new value from a bubbling input notification
        if event.kind == EventKind::Input && event.bubbles {
            let current = match control_kind(&*self, node) {
                ControlKind::SingleLine => self.value(node),
                ControlKind::FreeForm => self.visible_text(node),
            };
            self.observed.insert(node, current);
        }
        self.dispatched.push((node, event));
    }

    fn place_caret_at_end(&mut self, node: NodeId) {
        self.caret_at_end = Some(node);
    }

    fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(n) = self.node_mut(node) {
            n.attributes.insert(name.to_string(), value.to_string());
        }
    }
}

impl OverlaySurface for MemoryPage {
    fn show_overlay(&mut self, view: &OverlayView) {
        self.overlay = Some(view.clone());
    }

    fn hide_overlay(&mut self) {
        self.overlay = None;
    }
}

impl StructureNotifier for MemoryPage {
    fn on_structure_changed(&mut self, callback: Box<dyn FnMut() + Send>) {
        self.observers.push(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_structure_callbacks_fire_on_append_and_remove() {
        let mut page = MemoryPage::new();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        page.on_structure_changed(Box::new(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        let root = page.root();
        let div = page.append(root, ElementSpec::new("div"));
        page.remove(div);

        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(!page.is_attached(div));
    }

    #[test]
    fn test_native_write_is_not_observed_without_input() {
        let mut page = MemoryPage::new();
        let root = page.root();
        let input = page.append(root, ElementSpec::new("input"));

        page.write_native_value(input, "hello");
        assert_eq!(page.value(input), "hello");
        assert_eq!(page.host_value(input), None);

        page.dispatch(input, SyntheticEvent::bubbling(EventKind::Input));
        assert_eq!(page.host_value(input), Some("hello"));
    }

    #[test]
    fn test_hidden_ancestor_hides_descendants() {
        let mut page = MemoryPage::new();
        let root = page.root();
        let menu = page.append(root, ElementSpec::new("div").hidden());
        let option = page.append(menu, ElementSpec::new("div").text("Work"));

        assert!(!page.is_visible(option));
        page.set_hidden(menu, false);
        assert!(page.is_visible(option));
        assert_eq!(page.visible_text(menu), "Work");
    }
}
