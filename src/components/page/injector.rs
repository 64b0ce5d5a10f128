use super::tree::{control_kind, ControlKind, EventKind, Key, NodeId, PageTree, SyntheticEvent};
use tracing::debug;

/// Write `text` into a host control so that the host's own state observes it.
///
/// Reactive hosts track control values separately from the native property,
/// so the value goes through the native setter (or the text content) and is
/// followed by bubbling input and change notifications. Single-line controls
/// also get a key-down/key-up pair to run the host's validation. Focus is
/// acquired but never released here; the caller owns focus transitions.
pub fn set_value<T: PageTree + ?Sized>(tree: &mut T, node: NodeId, text: &str) {
    tree.focus(node);

    let kind = control_kind(&*tree, node);
    match kind {
        ControlKind::SingleLine => tree.write_native_value(node, text),
        ControlKind::FreeForm => tree.write_text_content(node, text),
    }

    tree.dispatch(node, SyntheticEvent::bubbling(EventKind::Input));
    tree.dispatch(node, SyntheticEvent::bubbling(EventKind::Change));

    if kind == ControlKind::SingleLine {
        tree.dispatch(node, SyntheticEvent::bubbling(EventKind::KeyDown(Key::Unidentified)));
        tree.dispatch(node, SyntheticEvent::bubbling(EventKind::KeyUp(Key::Unidentified)));
    }

    tree.place_caret_at_end(node);
    debug!("Injected {} chars into {}", text.chars().count(), node);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::page::memory::{ElementSpec, MemoryPage};

    #[test]
    fn test_single_line_event_sequence() {
        let mut page = MemoryPage::new();
        let root = page.root();
        let input = page.append(root, ElementSpec::new("input"));

        set_value(&mut page, input, "Standup");

        assert_eq!(page.value(input), "Standup");
        assert_eq!(page.host_value(input), Some("Standup"));
        assert_eq!(
            page.events_on(input),
            vec![
                EventKind::Input,
                EventKind::Change,
                EventKind::KeyDown(Key::Unidentified),
                EventKind::KeyUp(Key::Unidentified),
            ]
        );
        assert!(page.dispatched().iter().all(|(_, event)| event.bubbles));
        assert_eq!(page.focused(), Some(input));
        assert_eq!(page.caret_at_end(), Some(input));
    }

    #[test]
    fn test_free_form_writes_text_content() {
        let mut page = MemoryPage::new();
        let root = page.root();
        let description = page.append(root, ElementSpec::new("div").attr("contenteditable", "true"));

        set_value(&mut page, description, "Daily");

        assert_eq!(page.visible_text(description), "Daily");
        assert_eq!(page.host_value(description), Some("Daily"));
        assert_eq!(page.events_on(description), vec![EventKind::Input, EventKind::Change]);
    }
}
