use super::selectors::{find_first, selectors_for, SAVE_LABELS};
use super::tree::{descendants, NodeId, PageTree};
use crate::components::history::FieldKind;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A discovered host control wired to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldBinding {
    pub node: NodeId,
    pub kind: FieldKind,
    /// Highlighted suggestion, reset on every new query
    pub cursor: Option<usize>,
}

/// Result of resolving the three target controls
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocatedFields {
    pub title: Option<NodeId>,
    pub location: Option<NodeId>,
    pub description: Option<NodeId>,
}

impl LocatedFields {
    pub fn get(&self, kind: FieldKind) -> Option<NodeId> {
        match kind {
            FieldKind::Title => self.title,
            FieldKind::Location => self.location,
            FieldKind::Description => self.description,
        }
    }
}

/// Resolve the title, location and description controls in the current tree
pub fn locate_fields<T: PageTree + ?Sized>(tree: &T) -> LocatedFields {
    let root = tree.root();
    LocatedFields {
        title: find_first(tree, root, selectors_for(FieldKind::Title)),
        location: find_first(tree, root, selectors_for(FieldKind::Location)),
        description: find_first(tree, root, selectors_for(FieldKind::Description)),
    }
}

/// Actionable elements whose visible label is one of the save labels
pub fn locate_save_controls<T: PageTree + ?Sized>(tree: &T) -> Vec<NodeId> {
    descendants(tree, tree.root())
        .into_iter()
        .filter(|node| is_actionable(tree, *node))
        .filter(|node| {
            let text = tree.visible_text(*node);
            SAVE_LABELS.contains(&text.trim())
        })
        .collect()
}

pub fn is_actionable<T: PageTree + ?Sized>(tree: &T, node: NodeId) -> bool {
    tree.tag(node) == Some("button")
        || matches!(
            tree.attribute(node, "role"),
            Some("button") | Some("combobox") | Some("listbox")
        )
}

/// What a scan newly discovered
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub bound: Vec<FieldBinding>,
    pub save_controls: Vec<NodeId>,
    pub released: usize,
}

impl ScanReport {
    pub fn is_empty(&self) -> bool {
        self.bound.is_empty() && self.save_controls.is_empty() && self.released == 0
    }
}

/// Tracks which host controls are already wired.
///
/// Scanning is idempotent: controls that are still attached keep their
/// binding, detached ones are released, and a control re-created by the host
/// is bound again as a new control.
#[derive(Debug, Default)]
pub struct FieldLocator {
    bindings: HashMap<NodeId, FieldBinding>,
    save_controls: HashSet<NodeId>,
}

impl FieldLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scan<T: PageTree + ?Sized>(&mut self, tree: &T) -> ScanReport {
        let mut report = ScanReport::default();

        let before = self.bindings.len() + self.save_controls.len();
        self.bindings.retain(|node, _| tree.is_attached(*node));
        self.save_controls.retain(|node| tree.is_attached(*node));
        report.released = before - (self.bindings.len() + self.save_controls.len());

        let located = locate_fields(tree);
        for kind in FieldKind::ALL {
            let Some(node) = located.get(kind) else {
                continue;
            };
            if self.bindings.contains_key(&node) {
                continue;
            }
            let binding = FieldBinding {
                node,
                kind,
                cursor: None,
            };
            debug!("Bound {} field {}", kind, node);
            self.bindings.insert(node, binding.clone());
            report.bound.push(binding);
        }

        for node in locate_save_controls(tree) {
            if self.save_controls.insert(node) {
                debug!("Hooked save control {}", node);
                report.save_controls.push(node);
            }
        }

        report
    }

    pub fn binding(&self, node: NodeId) -> Option<&FieldBinding> {
        self.bindings.get(&node)
    }

    pub fn binding_mut(&mut self, node: NodeId) -> Option<&mut FieldBinding> {
        self.bindings.get_mut(&node)
    }

    pub fn is_save_control(&self, node: NodeId) -> bool {
        self.save_controls.contains(&node)
    }

    /// The currently located control for `kind`, if it is bound
    pub fn bound_field<T: PageTree + ?Sized>(&self, tree: &T, kind: FieldKind) -> Option<NodeId> {
        locate_fields(tree)
            .get(kind)
            .filter(|node| self.bindings.contains_key(node))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
