//! Declarative lookup tables for the host's controls.
//!
//! Each field kind maps to an ordered list of selectors covering the host's
//! localized labels. Selectors are tried in order and the first one that
//! matches anything wins.

use super::tree::{descendants, NodeId, PageTree};
use crate::components::history::FieldKind;

/// Exact attribute match, optionally restricted to a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selector {
    pub tag: Option<&'static str>,
    pub attribute: &'static str,
    pub value: &'static str,
}

impl Selector {
    pub const fn aria(tag: &'static str, label: &'static str) -> Self {
        Self {
            tag: Some(tag),
            attribute: "aria-label",
            value: label,
        }
    }

    pub const fn attr(attribute: &'static str, value: &'static str) -> Self {
        Self {
            tag: None,
            attribute,
            value,
        }
    }

    pub fn matches<T: PageTree + ?Sized>(&self, tree: &T, node: NodeId) -> bool {
        if let Some(tag) = self.tag {
            if tree.tag(node) != Some(tag) {
                return false;
            }
        }
        tree.attribute(node, self.attribute) == Some(self.value)
    }
}

pub const TITLE_SELECTORS: &[Selector] = &[
    Selector::aria("input", "제목 추가"),
    Selector::aria("input", "Add title"),
    Selector::aria("input", "제목 및 시간 추가"),
];

pub const LOCATION_SELECTORS: &[Selector] = &[
    Selector::aria("input", "위치 추가"),
    Selector::aria("input", "Add location"),
];

pub const DESCRIPTION_SELECTORS: &[Selector] = &[
    Selector::aria("div", "설명 추가"),
    Selector::aria("div", "Add description"),
];

/// Visible labels of the host's save control
pub const SAVE_LABELS: &[&str] = &["저장", "Save"];

/// Explicit markers of the event editor's calendar picker
pub const CALENDAR_SELECTORS: &[Selector] = &[
    Selector::attr("data-key", "calendar"),
    Selector::attr("aria-label", "Calendar"),
    Selector::attr("aria-label", "캘린더"),
];

/// Words that identify calendar-related labels and tooltips
pub const CALENDAR_KEYWORDS: &[&str] = &["calendar", "캘린더"];

pub fn selectors_for(kind: FieldKind) -> &'static [Selector] {
    match kind {
        FieldKind::Title => TITLE_SELECTORS,
        FieldKind::Location => LOCATION_SELECTORS,
        FieldKind::Description => DESCRIPTION_SELECTORS,
    }
}

/// First node under `scope` matching the earliest selector that matches anything
pub fn find_first<T: PageTree + ?Sized>(
    tree: &T,
    scope: NodeId,
    selectors: &[Selector],
) -> Option<NodeId> {
    let nodes = descendants(tree, scope);
    selectors.iter().find_map(|selector| {
        nodes
            .iter()
            .copied()
            .find(|node| selector.matches(tree, *node))
    })
}

/// Case-insensitive check for a calendar keyword
pub fn mentions_calendar(text: &str) -> bool {
    let lowered = text.to_lowercase();
    CALENDAR_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword))
}
