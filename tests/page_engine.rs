use gcal_history::components::history::{Entry, HistoryStore};
use gcal_history::components::page::{
    ElementSpec, EventKind, EventOutcome, Key, MemoryPage, NodeId, PageEngine, PageTree, Rect,
    RefreshRequester, Scheduler, Timer,
};
use gcal_history::config::PageSettings;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Scheduler that only records what was scheduled
#[derive(Clone, Default)]
struct RecordingScheduler {
    timers: Arc<Mutex<Vec<(Duration, Timer)>>>,
}

impl RecordingScheduler {
    fn timers(&self) -> Vec<(Duration, Timer)> {
        self.timers.lock().unwrap().clone()
    }
}

impl Scheduler for RecordingScheduler {
    fn schedule(&mut self, delay: Duration, timer: Timer) {
        self.timers.lock().unwrap().push((delay, timer));
    }
}

#[derive(Clone, Default)]
struct CountingRefresher {
    calls: Arc<AtomicUsize>,
    event_requests: Arc<AtomicUsize>,
}

impl RefreshRequester for CountingRefresher {
    fn request_silent_refresh(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn request_events(&self) {
        self.event_requests.fetch_add(1, Ordering::SeqCst);
    }
}

struct Editor {
    dialog: NodeId,
    title: NodeId,
    location: NodeId,
    description: NodeId,
    save: NodeId,
}

/// Event editor dialog with the three fields and a save button
fn editor(page: &mut MemoryPage) -> Editor {
    let root = page.root();
    let dialog = page.append(root, ElementSpec::new("div").attr("role", "dialog"));
    let title = page.append(
        dialog,
        ElementSpec::new("input")
            .attr("aria-label", "Add title")
            .rect(Rect::new(100.0, 50.0, 200.0, 30.0)),
    );
    let location = page.append(dialog, ElementSpec::new("input").attr("aria-label", "Add location"));
    let description = page.append(dialog, ElementSpec::new("div").attr("aria-label", "Add description"));
    let save = page.append(dialog, ElementSpec::new("button").text("Save"));
    Editor {
        dialog,
        title,
        location,
        description,
        save,
    }
}

fn calendar_picker(page: &mut MemoryPage, dialog: NodeId, showing: &str) -> NodeId {
    page.append(
        dialog,
        ElementSpec::new("div")
            .attr("role", "combobox")
            .attr("aria-label", "Calendar")
            .text(showing),
    )
}

fn standup() -> Entry {
    Entry::new("Standup", "Room 1", "Daily").with_calendar("Work", "work@example.com")
}

fn engine(page: MemoryPage, entries: Vec<Entry>) -> (PageEngine<MemoryPage>, RecordingScheduler) {
    let scheduler = RecordingScheduler::default();
    let mut store = HistoryStore::new(30);
    store.load(entries);
    let mut engine = PageEngine::new(page, store, PageSettings::default(), Box::new(scheduler.clone()));
    engine.structure_changed();
    (engine, scheduler)
}

fn type_into(engine: &mut PageEngine<MemoryPage>, node: NodeId, text: &str) {
    engine.page_mut().type_text(node, text);
    engine.input(node, true);
}

fn first_input(page: &MemoryPage, node: NodeId) -> usize {
    page.dispatched()
        .iter()
        .position(|(target, event)| *target == node && event.kind == EventKind::Input)
        .unwrap()
}

#[test]
fn test_choosing_a_title_fills_the_other_fields_first() {
    let mut page = MemoryPage::new();
    let fields = editor(&mut page);
    let picker = calendar_picker(&mut page, fields.dialog, "Personal");
    let (mut engine, scheduler) = engine(page, vec![standup()]);

    type_into(&mut engine, fields.title, "Stan");

    let view = engine.page().overlay().cloned().unwrap();
    assert_eq!(view.rows.len(), 1);
    assert_eq!(view.rows[0].text, "Standup");
    assert_eq!(view.rows[0].detail.as_deref(), Some("Room 1"));
    assert_eq!(view.position.left, 100.0);
    assert_eq!(view.position.top, 80.0);
    assert_eq!(view.position.width, 350.0);

    assert_eq!(engine.row_clicked(0), EventOutcome::CONSUME);

    let page = engine.page();
    assert_eq!(page.host_value(fields.location), Some("Room 1"));
    assert_eq!(page.host_value(fields.description), Some("Daily"));
    assert_eq!(page.host_value(fields.title), Some("Standup"));
    assert!(first_input(page, fields.location) < first_input(page, fields.title));
    assert!(first_input(page, fields.description) < first_input(page, fields.title));
    assert_eq!(page.focused(), Some(fields.title));
    assert!(page.overlay().is_none());

    assert_eq!(
        page.events_on(picker),
        vec![EventKind::PointerDown, EventKind::PointerUp]
    );
    assert_eq!(
        scheduler.timers(),
        vec![(
            Duration::from_millis(300),
            Timer::CalendarMenuSettled {
                calendar: "Work".to_string()
            }
        )]
    );

    // the menu renders detached from the dialog
    let root = engine.page().root();
    let menu = engine
        .page_mut()
        .append(root, ElementSpec::new("div").attr("role", "listbox"));
    engine
        .page_mut()
        .append(menu, ElementSpec::new("div").attr("role", "option").text("Personal"));
    let work = engine
        .page_mut()
        .append(menu, ElementSpec::new("div").attr("role", "option").text("Work"));

    engine.timer_fired(Timer::CalendarMenuSettled {
        calendar: "Work".to_string(),
    });
    assert_eq!(
        engine.page().events_on(work),
        vec![EventKind::PointerDown, EventKind::PointerUp, EventKind::Click]
    );
}

#[test]
fn test_no_calendar_switch_without_a_picker() {
    let mut page = MemoryPage::new();
    let fields = editor(&mut page);
    let (mut engine, scheduler) = engine(page, vec![standup()]);

    type_into(&mut engine, fields.title, "stan");
    engine.row_clicked(0);

    assert_eq!(engine.page().host_value(fields.title), Some("Standup"));
    assert!(scheduler.timers().is_empty());
    assert!(engine
        .page()
        .dispatched()
        .iter()
        .all(|(_, event)| event.kind != EventKind::PointerDown));
}

#[test]
fn test_no_calendar_switch_when_already_showing() {
    let mut page = MemoryPage::new();
    let fields = editor(&mut page);
    let picker = calendar_picker(&mut page, fields.dialog, "Work");
    let (mut engine, scheduler) = engine(page, vec![standup()]);

    type_into(&mut engine, fields.title, "Stan");
    engine.row_clicked(0);

    assert!(engine.page().events_on(picker).is_empty());
    assert!(scheduler.timers().is_empty());
}

#[test]
fn test_empty_location_is_not_written() {
    let mut page = MemoryPage::new();
    let fields = editor(&mut page);
    let (mut engine, _) = engine(page, vec![Entry::new("Lunch", "", "")]);

    type_into(&mut engine, fields.title, "Lun");
    engine.row_clicked(0);

    assert!(engine.page().events_on(fields.location).is_empty());
    assert!(engine.page().events_on(fields.description).is_empty());
}

#[test]
fn test_arrow_up_wraps_to_last_candidate() {
    let mut page = MemoryPage::new();
    let fields = editor(&mut page);
    let entries = vec![
        Entry::new("Standup A", "", ""),
        Entry::new("Standup B", "", ""),
        Entry::new("Standup C", "", ""),
    ];
    let (mut engine, _) = engine(page, entries);

    type_into(&mut engine, fields.title, "Stand");
    assert_eq!(engine.page().overlay().unwrap().rows.len(), 3);

    assert_eq!(engine.key_down(fields.title, Key::ArrowUp), EventOutcome::PREVENT);
    assert_eq!(engine.page().overlay().unwrap().highlighted, Some(2));

    assert_eq!(engine.key_down(fields.title, Key::ArrowUp), EventOutcome::PREVENT);
    assert_eq!(engine.page().overlay().unwrap().highlighted, Some(1));

    assert_eq!(engine.key_down(fields.title, Key::Enter), EventOutcome::CONSUME);
    assert_eq!(engine.page().host_value(fields.title), Some("Standup B"));
    assert!(engine.page().overlay().is_none());
}

#[test]
fn test_new_query_resets_cursor() {
    let mut page = MemoryPage::new();
    let fields = editor(&mut page);
    let entries = vec![Entry::new("Standup A", "", ""), Entry::new("Standup B", "", "")];
    let (mut engine, _) = engine(page, entries);

    type_into(&mut engine, fields.title, "Stand");
    engine.key_down(fields.title, Key::ArrowDown);
    engine.key_down(fields.title, Key::ArrowDown);
    assert_eq!(engine.page().overlay().unwrap().highlighted, Some(1));

    type_into(&mut engine, fields.title, "Standu");
    assert_eq!(engine.page().overlay().unwrap().highlighted, None);
    assert_eq!(engine.key_down(fields.title, Key::ArrowDown), EventOutcome::PREVENT);
    assert_eq!(engine.page().overlay().unwrap().highlighted, Some(0));
}

#[test]
fn test_escape_closes() {
    let mut page = MemoryPage::new();
    let fields = editor(&mut page);
    let (mut engine, _) = engine(page, vec![standup()]);

    type_into(&mut engine, fields.title, "Stan");
    assert_eq!(engine.key_down(fields.title, Key::Escape), EventOutcome::PREVENT);
    assert!(engine.page().overlay().is_none());
}

#[test]
fn test_delete_keeps_focus_and_clears_location() {
    let mut page = MemoryPage::new();
    let fields = editor(&mut page);
    let entries = vec![
        Entry::new("Standup", "Room 1", ""),
        Entry::new("Retro", "Room 2", ""),
        Entry::new("Planning", "Room 1", ""),
    ];
    let (mut engine, _) = engine(page, entries);

    type_into(&mut engine, fields.location, "room");
    let view = engine.page().overlay().cloned().unwrap();
    let texts: Vec<&str> = view.rows.iter().map(|row| row.text.as_str()).collect();
    assert_eq!(texts, vec!["Room 1", "Room 2"]);
    assert!(view.rows[0].markup.starts_with("📍 "));
    assert_eq!(view.rows[0].delete_label, "Delete this entry");

    assert!(engine.delete_pointer_down(0).prevent_default);
    engine.delete_clicked(0);

    let locations: Vec<&str> = engine.store().entries().iter().map(|e| e.location.as_str()).collect();
    assert_eq!(locations, vec!["", "Room 2", ""]);
    assert_eq!(engine.store().len(), 3);

    let view = engine.page().overlay().cloned().unwrap();
    assert_eq!(view.rows.len(), 1);
    assert_eq!(view.rows[0].text, "Room 2");
    assert_eq!(engine.page().focused(), Some(fields.location));

    engine.delete_clicked(0);
    assert!(engine.page().overlay().is_none());
}

#[test]
fn test_delete_title_removes_entry() {
    let mut page = MemoryPage::new();
    let fields = editor(&mut page);
    let (mut engine, _) = engine(page, vec![standup(), Entry::new("Retro", "", "")]);

    type_into(&mut engine, fields.title, "Stan");
    engine.delete_clicked(0);

    assert_eq!(engine.store().len(), 1);
    assert_eq!(engine.store().entries()[0].title, "Retro");
}

#[test]
fn test_blur_closes_after_grace() {
    let mut page = MemoryPage::new();
    let fields = editor(&mut page);
    let (mut engine, scheduler) = engine(page, vec![standup()]);

    type_into(&mut engine, fields.title, "Stan");
    engine.blur(fields.title);
    assert!(engine.page().overlay().is_some());
    assert_eq!(
        scheduler.timers(),
        vec![(Duration::from_millis(200), Timer::CloseOverlay)]
    );

    // a pointer selection lands inside the grace period
    engine.row_clicked(0);
    engine.timer_fired(Timer::CloseOverlay);
    assert_eq!(engine.page().host_value(fields.title), Some("Standup"));
    assert!(engine.page().overlay().is_none());
}

#[test]
fn test_save_records_fields_and_requests_refresh() {
    let mut page = MemoryPage::new();
    let fields = editor(&mut page);
    let refresher = CountingRefresher::default();
    let (engine, scheduler) = engine(page, vec![standup()]);
    let mut engine = engine.with_refresher(Box::new(refresher.clone()));

    engine.page_mut().type_text(fields.title, "Retro");
    engine.page_mut().type_text(fields.location, "Room 9");

    engine.save_clicked(fields.title);
    assert_eq!(engine.store().len(), 1);

    engine.save_clicked(fields.save);
    assert_eq!(engine.store().entries()[0], Entry::new("Retro", "Room 9", ""));
    assert_eq!(engine.store().len(), 2);
    assert_eq!(
        scheduler.timers(),
        vec![(Duration::from_millis(1500), Timer::SilentRefresh)]
    );

    engine.timer_fired(Timer::SilentRefresh);
    assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_focus_after_failed_load_requests_events_again() {
    let mut page = MemoryPage::new();
    let fields = editor(&mut page);
    let refresher = CountingRefresher::default();
    let (engine, _) = engine(page, Vec::new());
    let mut engine = engine.with_refresher(Box::new(refresher.clone()));
    let requests = || refresher.event_requests.load(Ordering::SeqCst);

    // nothing adopted yet, as after a failed first fetch
    engine.focus(fields.title);
    assert_eq!(requests(), 1);
    assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);

    engine.focus(fields.dialog);
    assert_eq!(requests(), 1);

    engine.adopt_snapshot(Vec::new());
    assert!(!engine.events_loaded());
    engine.focus(fields.location);
    assert_eq!(requests(), 2);

    engine.adopt_snapshot(vec![standup()]);
    assert!(engine.events_loaded());
    engine.focus(fields.title);
    engine.focus(fields.description);
    assert_eq!(requests(), 2);
}

#[test]
fn test_focus_without_requester_does_nothing() {
    let mut page = MemoryPage::new();
    let fields = editor(&mut page);
    let (mut engine, scheduler) = engine(page, vec![standup()]);

    engine.focus(fields.title);
    assert!(scheduler.timers().is_empty());
    assert!(engine.page().overlay().is_none());
}

#[test]
fn test_save_with_blank_title_still_notifies() {
    let mut page = MemoryPage::new();
    let fields = editor(&mut page);
    let (mut engine, scheduler) = engine(page, Vec::new());

    engine.save_clicked(fields.save);
    assert!(engine.store().is_empty());
    assert_eq!(scheduler.timers().len(), 1);
}

#[test]
fn test_snapshot_replaces_store_while_open() {
    let mut page = MemoryPage::new();
    let fields = editor(&mut page);
    let (mut engine, _) = engine(page, vec![standup()]);

    type_into(&mut engine, fields.title, "Stan");
    assert!(engine.page().overlay().is_some());

    let snapshot: Vec<Entry> = (0..40)
        .map(|i| Entry::new(format!("Standing {i}"), "", ""))
        .collect();
    engine.adopt_snapshot(snapshot);
    assert_eq!(engine.store().len(), 40);

    type_into(&mut engine, fields.title, "Stan");
    let view = engine.page().overlay().cloned().unwrap();
    assert_eq!(view.rows.len(), 5);
    assert!(view.rows.iter().all(|row| row.text.starts_with("Standing")));
}

#[test]
fn test_recreated_field_is_rebound() {
    let mut page = MemoryPage::new();
    let fields = editor(&mut page);
    let (mut engine, _) = engine(page, vec![standup()]);

    engine.page_mut().remove(fields.title);
    let title = engine.page_mut().append(
        fields.dialog,
        ElementSpec::new("input").attr("aria-label", "제목 추가"),
    );
    let report = engine.structure_changed();
    assert_eq!(report.bound.len(), 1);
    assert_eq!(engine.page().attribute(title, "autocomplete"), Some("off"));

    type_into(&mut engine, title, "Stan");
    assert_eq!(engine.page().overlay().unwrap().anchor, title);
}
