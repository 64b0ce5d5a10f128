use gcal_history::components::google_calendar::merge::merge_events;
use gcal_history::components::google_calendar::models::{CalendarEvent, CalendarInfo};
use gcal_history::components::history::{Entry, HistoryStore};
use gcal_history::components::page::RefreshRequester;
use gcal_history::error::AppResult;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Mock implementation of the Google Calendar handle for testing
#[derive(Debug, Clone)]
pub struct MockGoogleCalendarHandle {
    events: Vec<CalendarEvent>,
    refreshes: Arc<AtomicUsize>,
    snapshots: broadcast::Sender<Vec<Entry>>,
}

impl MockGoogleCalendarHandle {
    /// Create a new mock handle with events from two calendars
    pub fn new() -> Self {
        let work = CalendarInfo {
            id: "work@example.com".to_string(),
            summary: "Work".to_string(),
        };
        let personal = CalendarInfo {
            id: "personal@example.com".to_string(),
            summary: "Personal".to_string(),
        };

        let events = vec![
            CalendarEvent::from_json(
                &json!({
                    "id": "event1",
                    "summary": "Standup",
                    "location": "Room 1",
                    "description": "<p>Daily <b>sync</b></p>",
                    "start": { "dateTime": "2024-01-02T09:00:00Z" },
                    "end": { "dateTime": "2024-01-02T09:15:00Z" }
                }),
                &work,
            ),
            CalendarEvent::from_json(
                &json!({
                    "id": "event2",
                    "summary": "Standup",
                    "location": "Room 2",
                    "start": { "dateTime": "2024-01-01T09:00:00Z" },
                    "end": { "dateTime": "2024-01-01T09:15:00Z" }
                }),
                &work,
            ),
            CalendarEvent::from_json(
                &json!({
                    "id": "event3",
                    "summary": "Holiday",
                    "start": { "date": "2024-01-01" },
                    "end": { "date": "2024-01-02" }
                }),
                &personal,
            ),
        ];

        let (snapshots, _) = broadcast::channel(4);
        Self {
            events,
            refreshes: Arc::new(AtomicUsize::new(0)),
            snapshots,
        }
    }

    /// Merged snapshot of the mock events
    pub async fn get_events(&self, _force_refresh: bool) -> AppResult<Vec<Entry>> {
        Ok(merge_events(self.events.clone()))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Vec<Entry>> {
        self.snapshots.subscribe()
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

impl RefreshRequester for MockGoogleCalendarHandle {
    fn request_silent_refresh(&self) {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        let _ = self.snapshots.send(merge_events(self.events.clone()));
    }

    fn request_events(&self) {
        let _ = self.snapshots.send(merge_events(self.events.clone()));
    }
}

/// Test that demonstrates how to use the mock
#[tokio::test]
async fn test_google_calendar_mock() {
    let mock_handle = MockGoogleCalendarHandle::new();

    let entries = mock_handle.get_events(false).await.unwrap();

    let titles: Vec<&str> = entries.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["Standup", "Holiday"]);
    assert_eq!(entries[0].location, "Room 1");
    assert_eq!(entries[0].description, "Daily sync");
    assert_eq!(entries[0].calendar_summary, "Work");
    assert_eq!(entries[0].calendar_id, "work@example.com");
    assert_eq!(entries[0].start_time, "2024-01-02T09:00:00Z");
    assert!(entries[1].is_all_day);
    assert_eq!(entries[1].end_time, "2024-01-02");
}

#[tokio::test]
async fn test_silent_refresh_publishes_snapshot() {
    let mock_handle = MockGoogleCalendarHandle::new();
    let mut snapshots = mock_handle.subscribe();

    mock_handle.request_silent_refresh();

    let snapshot = snapshots.recv().await.unwrap();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(mock_handle.refresh_count(), 1);
}

#[tokio::test]
async fn test_requested_events_are_published_without_a_refresh() {
    let mock_handle = MockGoogleCalendarHandle::new();
    let mut snapshots = mock_handle.subscribe();

    mock_handle.request_events();

    let snapshot = snapshots.recv().await.unwrap();
    assert_eq!(snapshot[0].title, "Standup");
    assert_eq!(mock_handle.refresh_count(), 0);
}

#[tokio::test]
async fn test_snapshot_can_exceed_save_cap() {
    let mock_handle = MockGoogleCalendarHandle::new();
    let mut store = HistoryStore::new(1);

    store.load(mock_handle.get_events(false).await.unwrap());
    assert_eq!(store.len(), 2);

    // the adaptive cap holds the snapshot size until the next load
    store.save(Entry::new("Retro", "", ""));
    assert_eq!(store.len(), 2);
    assert_eq!(store.entries()[0].title, "Retro");
}
