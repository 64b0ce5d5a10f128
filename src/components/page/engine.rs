//! The page engine.
//!
//! Everything the in-page core does happens here, on one event timeline: the
//! host forwards its events (structure changes, input, keys, blur, overlay
//! clicks, save clicks) and fired timers, and the engine drives the locator,
//! the history store, the overlay, the injector and the calendar switch.
//! Nothing is locked; the owner serializes calls.

use super::calendar_selector::{open_calendar_menu, pick_calendar_option, CalendarSwitch, OptionPick};
use super::injector::set_value;
use super::locator::{locate_fields, FieldLocator, ScanReport};
use super::overlay::{navigate, Navigation, Overlay, OverlayPosition};
use super::tree::{read_value, Key, NodeId, PageHost};
use crate::components::history::{Candidate, Entry, FieldKind, HistoryRecord, HistoryStore, MatchResult};
use crate::config::PageSettings;
use rust_i18n::t;
use std::time::Duration;
use tracing::{debug, info};

/// Deferred work the engine asks its owner to run later
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timer {
    /// Blur grace period elapsed
    CloseOverlay,
    /// The calendar menu had time to render
    CalendarMenuSettled { calendar: String },
    /// The host had time to persist a saved event
    SilentRefresh,
}

/// Fire-and-forget timers; a scheduled timer cannot be cancelled
pub trait Scheduler: Send {
    fn schedule(&mut self, delay: Duration, timer: Timer);
}

/// Asks the background service for snapshots.
///
/// Both requests are fire-and-forget; results arrive later as snapshots.
pub trait RefreshRequester: Send {
    fn request_silent_refresh(&self);

    /// Ask for the current snapshot, served from cache when one exists
    fn request_events(&self);
}

/// What the host should do with the event that was just handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventOutcome {
    pub prevent_default: bool,
    pub stop_propagation: bool,
}

impl EventOutcome {
    pub const PASS: EventOutcome = EventOutcome {
        prevent_default: false,
        stop_propagation: false,
    };

    pub const PREVENT: EventOutcome = EventOutcome {
        prevent_default: true,
        stop_propagation: false,
    };

    pub const CONSUME: EventOutcome = EventOutcome {
        prevent_default: true,
        stop_propagation: true,
    };
}

pub struct PageEngine<P: PageHost> {
    page: P,
    store: HistoryStore,
    locator: FieldLocator,
    overlay: Overlay,
    settings: PageSettings,
    scheduler: Box<dyn Scheduler>,
    refresher: Option<Box<dyn RefreshRequester>>,
    events_loaded: bool,
}

impl<P: PageHost> PageEngine<P> {
    pub fn new(
        page: P,
        store: HistoryStore,
        settings: PageSettings,
        scheduler: Box<dyn Scheduler>,
    ) -> Self {
        Self {
            page,
            store,
            locator: FieldLocator::new(),
            overlay: Overlay::new(t!("overlay_delete_tooltip").to_string()),
            settings,
            scheduler,
            refresher: None,
            events_loaded: false,
        }
    }

    pub fn with_refresher(mut self, refresher: Box<dyn RefreshRequester>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    pub fn page(&self) -> &P {
        &self.page
    }

    pub fn page_mut(&mut self) -> &mut P {
        &mut self.page
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn locator(&self) -> &FieldLocator {
        &self.locator
    }

    /// Whether a non-empty snapshot from the background service was adopted
    pub fn events_loaded(&self) -> bool {
        self.events_loaded
    }

    /// Re-run discovery after the host tree changed
    pub fn structure_changed(&mut self) -> ScanReport {
        let report = self.locator.scan(&self.page);
        for binding in &report.bound {
            self.page.set_attribute(binding.node, "autocomplete", "off");
        }

        if let Some(anchor) = self.overlay.anchor() {
            if !self.page.is_attached(anchor) {
                debug!("Overlay anchor {} left the tree", anchor);
                self.overlay.close(&mut self.page);
            }
        }
        report
    }

    /// Input on a control; only user-originated input queries the history
    pub fn input(&mut self, node: NodeId, trusted: bool) {
        if !trusted {
            return;
        }
        let Some(binding) = self.locator.binding_mut(node) else {
            return;
        };
        binding.cursor = None;
        let kind = binding.kind;

        let text = read_value(&self.page, node);
        match self.store.query(&text, kind, self.settings.max_suggestions) {
            MatchResult::Candidates(candidates) if !candidates.is_empty() => {
                let position = OverlayPosition::below(
                    self.page.bounding_box(node),
                    self.page.scroll_offset(),
                    self.settings.overlay_min_width,
                );
                self.overlay.show(&mut self.page, node, kind, candidates, position);
            }
            _ => self.overlay.close(&mut self.page),
        }
    }

    /// Key press on a control
    pub fn key_down(&mut self, node: NodeId, key: Key) -> EventOutcome {
        let Some(cursor) = self.locator.binding(node).map(|binding| binding.cursor) else {
            return EventOutcome::PASS;
        };
        if self.overlay.anchor() != Some(node) {
            return EventOutcome::PASS;
        }

        match navigate(cursor, &key, self.overlay.len()) {
            Navigation::Moved(index) => {
                self.set_cursor(node, Some(index));
                self.overlay.highlight(&mut self.page, Some(index));
                EventOutcome::PREVENT
            }
            Navigation::Activate(index) => {
                self.activate(index);
                EventOutcome::CONSUME
            }
            Navigation::Dismiss { prevent_default } => {
                self.overlay.close(&mut self.page);
                EventOutcome {
                    prevent_default,
                    stop_propagation: false,
                }
            }
            Navigation::Ignored => EventOutcome::PASS,
        }
    }

    /// A bound control gained focus.
    ///
    /// Until a non-empty snapshot arrives every focus asks the background
    /// service for events again, so a failed first load is retried.
    pub fn focus(&mut self, node: NodeId) {
        if self.events_loaded || self.locator.binding(node).is_none() {
            return;
        }
        if let Some(refresher) = &self.refresher {
            debug!("No events loaded yet, requesting them again");
            refresher.request_events();
        }
    }

    /// A bound control lost focus; the overlay closes after the grace delay
    pub fn blur(&mut self, node: NodeId) {
        if self.locator.binding(node).is_some() {
            self.scheduler
                .schedule(self.settings.blur_grace(), Timer::CloseOverlay);
        }
    }

    pub fn row_clicked(&mut self, index: usize) -> EventOutcome {
        self.activate(index);
        EventOutcome::CONSUME
    }

    /// Pointer-down on a delete affordance must not blur the field
    pub fn delete_pointer_down(&mut self, _index: usize) -> EventOutcome {
        EventOutcome::PREVENT
    }

    /// Remove one candidate from the history, keeping the field focused
    pub fn delete_clicked(&mut self, index: usize) -> EventOutcome {
        let (Some(anchor), Some(kind)) = (self.overlay.anchor(), self.overlay.kind()) else {
            return EventOutcome::CONSUME;
        };
        let Some(candidate) = self.overlay.candidate(index).cloned() else {
            return EventOutcome::CONSUME;
        };

        self.store.delete(&candidate, kind);
        self.overlay.remove_row(&mut self.page, index);
        self.set_cursor(anchor, None);
        self.page.focus(anchor);
        info!("Deleted {} suggestion '{}'", kind, candidate.primary_text());
        EventOutcome::CONSUME
    }

    /// Click on an element; save controls record the current fields
    pub fn save_clicked(&mut self, node: NodeId) {
        if !self.locator.is_save_control(node) {
            return;
        }

        let located = locate_fields(&self.page);
        let read = |kind: FieldKind| {
            located
                .get(kind)
                .map(|field| read_value(&self.page, field))
                .unwrap_or_default()
        };
        let entry = Entry::new(
            read(FieldKind::Title),
            read(FieldKind::Location),
            read(FieldKind::Description),
        );

        if self.store.save(entry) {
            debug!("Saved entry; history holds {}", self.store.len());
        }
        self.scheduler
            .schedule(self.settings.save_refresh_delay(), Timer::SilentRefresh);
    }

    pub fn timer_fired(&mut self, timer: Timer) {
        match timer {
            Timer::CloseOverlay => self.overlay.close(&mut self.page),
            Timer::CalendarMenuSettled { calendar } => {
                if let OptionPick::Selected(node) = pick_calendar_option(&mut self.page, &calendar) {
                    debug!("Calendar option {} activated", node);
                }
            }
            Timer::SilentRefresh => match &self.refresher {
                Some(refresher) => refresher.request_silent_refresh(),
                None => debug!("No refresh requester attached"),
            },
        }
    }

    /// Replace the history with a snapshot pushed by the background service
    pub fn adopt_snapshot(&mut self, entries: Vec<Entry>) {
        info!("Adopting snapshot of {} entries", entries.len());
        self.events_loaded = !entries.is_empty();
        self.store.load(entries);
    }

    /// Replace the history with the persisted record
    pub fn load_history(&mut self, record: HistoryRecord) {
        self.store.load(record.items);
    }

    fn set_cursor(&mut self, node: NodeId, cursor: Option<usize>) {
        if let Some(binding) = self.locator.binding_mut(node) {
            binding.cursor = cursor;
        }
    }

    fn activate(&mut self, index: usize) {
        let (Some(anchor), Some(kind)) = (self.overlay.anchor(), self.overlay.kind()) else {
            return;
        };
        let Some(candidate) = self.overlay.candidate(index).cloned() else {
            return;
        };

        let mut calendar = None;
        match candidate {
            Candidate::Entry(entry) if kind == FieldKind::Title => {
                // title goes last
                self.fill_bound(FieldKind::Location, &entry.location);
                self.fill_bound(FieldKind::Description, &entry.description);
                set_value(&mut self.page, anchor, &entry.title);
                if !entry.calendar_summary.is_empty() {
                    calendar = Some(entry.calendar_summary);
                }
            }
            other => set_value(&mut self.page, anchor, other.primary_text()),
        }

        self.overlay.close(&mut self.page);
        self.set_cursor(anchor, None);
        self.page.focus(anchor);

        if let Some(calendar) = calendar {
            self.switch_calendar(&calendar);
        }
    }

    fn fill_bound(&mut self, kind: FieldKind, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(node) = self.locator.bound_field(&self.page, kind) {
            set_value(&mut self.page, node, text);
        }
    }

    fn switch_calendar(&mut self, calendar: &str) {
        if let CalendarSwitch::MenuOpened(_) = open_calendar_menu(&mut self.page, calendar) {
            self.scheduler.schedule(
                self.settings.calendar_settle(),
                Timer::CalendarMenuSettled {
                    calendar: calendar.to_string(),
                },
            );
        }
    }
}
