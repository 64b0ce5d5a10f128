use super::tree::{Key, NodeId, OverlaySurface, Rect};
use crate::components::history::{Candidate, FieldKind};
use crate::utils::text::escape_markup;

const LOCATION_MARKER: &str = "📍";
const DESCRIPTION_MARKER: &str = "📝";

/// Placement of the overlay in page coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OverlayPosition {
    pub left: f64,
    pub top: f64,
    pub width: f64,
}

impl OverlayPosition {
    /// Anchor below the field's bottom edge, at least `min_width` wide
    pub fn below(rect: Rect, scroll_offset: f64, min_width: f64) -> Self {
        Self {
            left: rect.x,
            top: rect.bottom() + scroll_offset,
            width: rect.width.max(min_width),
        }
    }
}

/// One rendered suggestion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayRow {
    /// Text written into the field when the row is chosen
    pub text: String,
    /// Secondary line (the location, for titles)
    pub detail: Option<String>,
    /// Escaped markup for the row body
    pub markup: String,
    /// Tooltip of the delete affordance
    pub delete_label: String,
}

/// What the host renders for the overlay
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayView {
    pub anchor: NodeId,
    pub position: OverlayPosition,
    pub rows: Vec<OverlayRow>,
    pub highlighted: Option<usize>,
}

/// Result of a key press while the overlay is open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Moved(usize),
    Activate(usize),
    Dismiss { prevent_default: bool },
    Ignored,
}

/// Move the cursor over `count` rows, wrapping at both ends
pub fn navigate(cursor: Option<usize>, key: &Key, count: usize) -> Navigation {
    if count == 0 {
        return Navigation::Ignored;
    }
    match key {
        Key::ArrowDown => Navigation::Moved(match cursor {
            Some(index) if index + 1 < count => index + 1,
            _ => 0,
        }),
        Key::ArrowUp => Navigation::Moved(match cursor {
            Some(index) if index > 0 && index <= count => index - 1,
            _ => count - 1,
        }),
        Key::Enter => match cursor {
            Some(index) if index < count => Navigation::Activate(index),
            _ => Navigation::Dismiss {
                prevent_default: false,
            },
        },
        Key::Escape => Navigation::Dismiss {
            prevent_default: true,
        },
        _ => Navigation::Ignored,
    }
}

#[derive(Debug, Clone)]
struct OpenOverlay {
    anchor: NodeId,
    kind: FieldKind,
    candidates: Vec<Candidate>,
    position: OverlayPosition,
    highlighted: Option<usize>,
}

/// The single suggestion overlay, bound to at most one field at a time
#[derive(Debug, Clone)]
pub struct Overlay {
    open: Option<OpenOverlay>,
    delete_label: String,
}

impl Overlay {
    pub fn new(delete_label: impl Into<String>) -> Self {
        Self {
            open: None,
            delete_label: delete_label.into(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn anchor(&self) -> Option<NodeId> {
        self.open.as_ref().map(|open| open.anchor)
    }

    pub fn kind(&self) -> Option<FieldKind> {
        self.open.as_ref().map(|open| open.kind)
    }

    pub fn len(&self) -> usize {
        self.open.as_ref().map(|open| open.candidates.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn candidate(&self, index: usize) -> Option<&Candidate> {
        self.open.as_ref().and_then(|open| open.candidates.get(index))
    }

    /// Open on `anchor`, or re-render if already open
    pub fn show<S: OverlaySurface + ?Sized>(
        &mut self,
        surface: &mut S,
        anchor: NodeId,
        kind: FieldKind,
        candidates: Vec<Candidate>,
        position: OverlayPosition,
    ) {
        if candidates.is_empty() {
            self.close(surface);
            return;
        }
        self.open = Some(OpenOverlay {
            anchor,
            kind,
            candidates,
            position,
            highlighted: None,
        });
        self.render(surface);
    }

    pub fn highlight<S: OverlaySurface + ?Sized>(&mut self, surface: &mut S, index: Option<usize>) {
        if let Some(open) = self.open.as_mut() {
            open.highlighted = index;
            self.render(surface);
        }
    }

    /// Drop one row; closes when none remain
    pub fn remove_row<S: OverlaySurface + ?Sized>(&mut self, surface: &mut S, index: usize) {
        let Some(open) = self.open.as_mut() else {
            return;
        };
        if index < open.candidates.len() {
            open.candidates.remove(index);
        }
        open.highlighted = None;
        if open.candidates.is_empty() {
            self.close(surface);
        } else {
            self.render(surface);
        }
    }

    pub fn close<S: OverlaySurface + ?Sized>(&mut self, surface: &mut S) {
        self.open = None;
        surface.hide_overlay();
    }

    pub fn view(&self) -> Option<OverlayView> {
        self.open.as_ref().map(|open| OverlayView {
            anchor: open.anchor,
            position: open.position,
            rows: open
                .candidates
                .iter()
                .map(|candidate| render_row(candidate, open.kind, &self.delete_label))
                .collect(),
            highlighted: open.highlighted,
        })
    }

    fn render<S: OverlaySurface + ?Sized>(&self, surface: &mut S) {
        if let Some(view) = self.view() {
            surface.show_overlay(&view);
        }
    }
}

fn render_row(candidate: &Candidate, kind: FieldKind, delete_label: &str) -> OverlayRow {
    let (detail, markup) = match (kind, candidate) {
        (FieldKind::Title, Candidate::Entry(entry)) => {
            let mut markup = format!("<strong>{}</strong>", escape_markup(&entry.title));
            let detail = (!entry.location.is_empty()).then(|| entry.location.clone());
            if let Some(location) = &detail {
                markup.push_str(&format!(
                    " <span class=\"detail\">{} {}</span>",
                    LOCATION_MARKER,
                    escape_markup(location)
                ));
            }
            (detail, markup)
        }
        (FieldKind::Description, candidate) => (
            None,
            format!("{} {}", DESCRIPTION_MARKER, escape_markup(candidate.primary_text())),
        ),
        (_, candidate) => (
            None,
            format!("{} {}", LOCATION_MARKER, escape_markup(candidate.primary_text())),
        ),
    };

    OverlayRow {
        text: candidate.primary_text().to_string(),
        detail,
        markup,
        delete_label: delete_label.to_string(),
    }
}
