//! Switching the editor's target calendar through the host's own picker.
//!
//! The picker is a combobox whose menu renders asynchronously, often in a
//! detached overlay, so switching happens in two steps: [`open_calendar_menu`]
//! and, after a settle delay, [`pick_calendar_option`]. The sidebar's
//! calendar visibility list looks much the same and must never be touched.

use super::locator::is_actionable;
use super::selectors::{mentions_calendar, CALENDAR_SELECTORS};
use super::tree::{ancestors, descendants, EventKind, Key, NodeId, PageTree, SyntheticEvent};
use tracing::{debug, info, warn};

const COMBOBOX_ROLES: &[&str] = &["combobox", "listbox"];
const MENU_ROLES: &[&str] = &["menu", "listbox"];
const OPTION_ROLES: &[&str] = &["option", "menuitem", "menuitemradio"];
const SIDEBAR_ROLES: &[&str] = &["navigation", "complementary"];
const SIDEBAR_TAGS: &[&str] = &["nav", "aside"];
const ICON_TAGS: &[&str] = &["svg", "i", "img"];
const TOOLTIP_ATTRIBUTES: &[&str] = &["data-tooltip", "title"];

/// Outcome of the first step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarSwitch {
    /// The picker already shows the calendar; nothing was touched
    AlreadySelected(NodeId),
    /// The picker was activated; options should be searched after the settle delay
    MenuOpened(NodeId),
    TargetNotFound,
}

/// Outcome of the second step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionPick {
    Selected(NodeId),
    /// No option matched; the menu was dismissed
    Dismissed,
}

/// The active editing surface: the last visible dialog, or the whole page
pub fn editing_surface<T: PageTree + ?Sized>(tree: &T) -> NodeId {
    descendants(tree, tree.root())
        .into_iter()
        .filter(|node| tree.attribute(*node, "role") == Some("dialog") && tree.is_visible(*node))
        .last()
        .unwrap_or_else(|| tree.root())
}

/// Locate the calendar picker using progressively weaker signals
pub fn find_calendar_control<T: PageTree + ?Sized>(tree: &T) -> Option<NodeId> {
    let surface = editing_surface(tree);
    let nodes: Vec<NodeId> = descendants(tree, surface)
        .into_iter()
        .filter(|node| tree.is_visible(*node) && !in_sidebar(tree, *node))
        .collect();

    for selector in CALENDAR_SELECTORS {
        if let Some(node) = nodes.iter().copied().find(|n| selector.matches(tree, *n)) {
            debug!("Calendar picker found by explicit marker {}", node);
            return Some(node);
        }
    }

    let comboboxes: Vec<NodeId> = nodes
        .iter()
        .copied()
        .filter(|node| is_combobox_like(tree, *node))
        .collect();

    let labelled = comboboxes.iter().copied().find(|node| {
        tree.attribute(*node, "aria-label").is_some_and(mentions_calendar)
            || mentions_calendar(&tree.visible_text(*node))
    });
    if labelled.is_some() {
        return labelled;
    }

    let iconic = comboboxes
        .iter()
        .copied()
        .find(|node| has_icon(tree, *node) && !tree.visible_text(*node).trim().is_empty());
    if iconic.is_some() {
        return iconic;
    }

    nodes
        .iter()
        .copied()
        .find(|node| {
            TOOLTIP_ATTRIBUTES
                .iter()
                .any(|name| tree.attribute(*node, name).is_some_and(mentions_calendar))
        })
        .and_then(|node| nearest_actionable(tree, node))
}

/// Activate the calendar picker unless it already shows `calendar`
pub fn open_calendar_menu<T: PageTree + ?Sized>(tree: &mut T, calendar: &str) -> CalendarSwitch {
    let Some(target) = find_calendar_control(&*tree) else {
        info!("No calendar picker found; leaving calendar unchanged");
        return CalendarSwitch::TargetNotFound;
    };

    if tree.visible_text(target).contains(calendar) {
        debug!("Calendar '{}' already selected", calendar);
        return CalendarSwitch::AlreadySelected(target);
    }

    tree.dispatch(target, SyntheticEvent::bubbling(EventKind::PointerDown));
    tree.dispatch(target, SyntheticEvent::bubbling(EventKind::PointerUp));
    debug!("Opened calendar picker {}", target);
    CalendarSwitch::MenuOpened(target)
}

/// Choose the option naming `calendar` from the currently visible menus
pub fn pick_calendar_option<T: PageTree + ?Sized>(tree: &mut T, calendar: &str) -> OptionPick {
    let view: &T = tree;
    let menus: Vec<NodeId> = descendants(view, view.root())
        .into_iter()
        .filter(|node| has_role(view, *node, MENU_ROLES))
        .filter(|node| view.is_visible(*node) && !in_sidebar(view, *node))
        .collect();

    let chosen = menus.iter().find_map(|menu| {
        descendants(view, *menu).into_iter().find(|node| {
            has_role(view, *node, OPTION_ROLES)
                && view.is_visible(*node)
                && view.visible_text(*node).contains(calendar)
        })
    });
    let chosen = chosen.map(|option| most_specific(view, option, calendar));

    match chosen {
        Some(inner) => {
            for kind in [EventKind::PointerDown, EventKind::PointerUp, EventKind::Click] {
                tree.dispatch(inner, SyntheticEvent::bubbling(kind));
            }
            info!("Switched calendar to '{}'", calendar);
            OptionPick::Selected(inner)
        }
        None => {
            warn!(
                "Calendar '{}' not found among {} open menu(s); dismissing",
                calendar,
                menus.len()
            );
            let root = tree.root();
            tree.dispatch(root, SyntheticEvent::bubbling(EventKind::KeyDown(Key::Escape)));
            tree.dispatch(root, SyntheticEvent::bubbling(EventKind::KeyUp(Key::Escape)));
            OptionPick::Dismissed
        }
    }
}

fn has_role<T: PageTree + ?Sized>(tree: &T, node: NodeId, roles: &[&str]) -> bool {
    tree.attribute(node, "role")
        .is_some_and(|role| roles.contains(&role))
}

fn is_combobox_like<T: PageTree + ?Sized>(tree: &T, node: NodeId) -> bool {
    has_role(tree, node, COMBOBOX_ROLES)
        || matches!(
            tree.attribute(node, "aria-haspopup"),
            Some("listbox") | Some("menu") | Some("true")
        )
}

fn has_icon<T: PageTree + ?Sized>(tree: &T, node: NodeId) -> bool {
    descendants(tree, node).into_iter().any(|child| {
        tree.tag(child).is_some_and(|tag| ICON_TAGS.contains(&tag))
            || tree.attribute(child, "role") == Some("img")
    })
}

fn in_sidebar<T: PageTree + ?Sized>(tree: &T, node: NodeId) -> bool {
    std::iter::once(node)
        .chain(ancestors(tree, node))
        .any(|n| {
            has_role(tree, n, SIDEBAR_ROLES)
                || tree.tag(n).is_some_and(|tag| SIDEBAR_TAGS.contains(&tag))
        })
}

fn nearest_actionable<T: PageTree + ?Sized>(tree: &T, node: NodeId) -> Option<NodeId> {
    std::iter::once(node)
        .chain(ancestors(tree, node))
        .find(|n| is_actionable(tree, *n) || tree.attribute(*n, "tabindex").is_some())
}

/// Deepest element under `option` whose text still names the calendar
fn most_specific<T: PageTree + ?Sized>(tree: &T, option: NodeId, calendar: &str) -> NodeId {
    let mut current = option;
    while let Some(child) = tree
        .children(current)
        .into_iter()
        .find(|child| tree.visible_text(*child).contains(calendar))
    {
        current = child;
    }
    current
}
