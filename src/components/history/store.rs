use super::matcher::{self, MatchResult};
use super::models::{Candidate, Entry, FieldKind};
use super::record::HistoryRecord;
use crate::config::PageSettings;
use crate::error::AppResult;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, warn};

/// Destination for history writes
///
/// Implementations must not block; the store calls them synchronously with
/// every mutation and only logs failures.
pub trait HistorySink: Send {
    fn persist(&self, record: &HistoryRecord) -> AppResult<()>;
}

/// Ordered, capacity-bounded history of past entries, most recent first
pub struct HistoryStore {
    items: Vec<Entry>,
    save_cap: usize,
    cap: usize,
    sink: Option<Box<dyn HistorySink>>,
}

impl fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryStore")
            .field("len", &self.items.len())
            .field("cap", &self.cap)
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

impl HistoryStore {
    /// Create an empty store
    pub fn new(save_cap: usize) -> Self {
        Self {
            items: Vec::new(),
            save_cap,
            cap: save_cap,
            sink: None,
        }
    }

    pub fn from_settings(settings: &PageSettings) -> Self {
        Self::new(settings.history_cap)
    }

    /// Attach the persistence target used by save and delete
    pub fn with_sink(mut self, sink: Box<dyn HistorySink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn entries(&self) -> &[Entry] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Current capacity; grows to the size of a loaded snapshot
    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn record(&self) -> HistoryRecord {
        HistoryRecord {
            items: self.items.clone(),
        }
    }

    /// The record handed to the sink: only the `save_cap` most recent entries.
    ///
    /// Snapshots are cached by the background service under their own key,
    /// so the history record never carries more than a user-sized list.
    pub fn persisted_record(&self) -> HistoryRecord {
        HistoryRecord {
            items: self.items.iter().take(self.save_cap).cloned().collect(),
        }
    }

    /// Replace the contents wholesale without deduplication or truncation
    pub fn load(&mut self, entries: Vec<Entry>) {
        self.cap = self.save_cap.max(entries.len());
        self.items = entries;
        debug!("History store loaded {} entries (cap {})", self.items.len(), self.cap);
    }

    /// Record a new entry as the most recent one.
    ///
    /// Returns `false` without touching the store when the title is blank.
    pub fn save(&mut self, entry: Entry) -> bool {
        if entry.title.trim().is_empty() {
            return false;
        }

        if let Some(position) = self.items.iter().position(|item| item.same_triple(&entry)) {
            self.items.remove(position);
        }
        self.items.insert(0, entry);
        self.items.truncate(self.cap);

        self.persist();
        true
    }

    /// Remove a candidate from the history.
    ///
    /// Titles remove the whole entry; locations and descriptions only clear
    /// that field on every entry holding the exact value. Entries that become
    /// identical after the clear collapse into the most recent one.
    pub fn delete(&mut self, candidate: &Candidate, kind: FieldKind) {
        match (kind, candidate) {
            (FieldKind::Title, Candidate::Entry(entry)) => {
                if let Some(position) = self.items.iter().position(|item| item == entry) {
                    self.items.remove(position);
                }
            }
            (FieldKind::Title, Candidate::Text(title)) => {
                if let Some(position) = self.items.iter().position(|item| &item.title == title) {
                    self.items.remove(position);
                }
            }
            (FieldKind::Location, candidate) => {
                let value = candidate.primary_text().to_string();
                for item in self.items.iter_mut().filter(|item| item.location == value) {
                    item.location.clear();
                }
                self.collapse_duplicates();
            }
            (FieldKind::Description, candidate) => {
                let value = candidate.primary_text().to_string();
                for item in self.items.iter_mut().filter(|item| item.description == value) {
                    item.description.clear();
                }
                self.collapse_duplicates();
            }
        }

        self.persist();
    }

    /// Query the store; see [`matcher::query`]
    pub fn query(&self, text: &str, kind: FieldKind, limit: usize) -> MatchResult {
        matcher::query(&self.items, text, kind, limit)
    }

    fn collapse_duplicates(&mut self) {
        let before = self.items.len();
        let mut seen = HashSet::new();
        self.items.retain(|item| {
            seen.insert((item.title.clone(), item.location.clone(), item.description.clone()))
        });
        if self.items.len() < before {
            debug!("Collapsed {} duplicate entries", before - self.items.len());
        }
    }

    fn persist(&self) {
        if let Some(sink) = &self.sink {
            if let Err(e) = sink.persist(&self.persisted_record()) {
                warn!("Failed to persist history: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingSink {
        writes: Arc<Mutex<Vec<HistoryRecord>>>,
    }

    impl HistorySink for RecordingSink {
        fn persist(&self, record: &HistoryRecord) -> AppResult<()> {
            self.writes.lock().unwrap().push(record.clone());
            Ok(())
        }
    }

    #[test]
    fn test_blank_titles_are_ignored() {
        let mut store = HistoryStore::new(30);
        assert!(!store.save(Entry::new("", "Room", "")));
        assert!(!store.save(Entry::new("   ", "Room", "")));
        assert!(store.is_empty());
    }

    #[test]
    fn test_duplicate_triple_moves_to_front() {
        let mut store = HistoryStore::new(30);
        store.save(Entry::new("A", "L", "D"));
        store.save(Entry::new("B", "", ""));
        store.save(Entry::new("A", "L", "D"));

        let titles: Vec<&str> = store.entries().iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B"]);
    }

    #[test]
    fn test_same_title_different_location_is_kept() {
        let mut store = HistoryStore::new(30);
        store.save(Entry::new("A", "L1", ""));
        store.save(Entry::new("A", "L2", ""));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_cap_drops_oldest() {
        let mut store = HistoryStore::new(3);
        for i in 0..5 {
            store.save(Entry::new(format!("E{i}"), "", ""));
        }
        let titles: Vec<&str> = store.entries().iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["E4", "E3", "E2"]);
    }

    #[test]
    fn test_load_replaces_and_raises_cap() {
        let mut store = HistoryStore::new(3);
        store.save(Entry::new("old", "", ""));
        let snapshot: Vec<Entry> = (0..6).map(|i| Entry::new(format!("S{i}"), "", "")).collect();
        store.load(snapshot);

        assert_eq!(store.len(), 6);
        assert_eq!(store.cap(), 6);
        assert!(store.entries().iter().all(|e| e.title != "old"));

        store.save(Entry::new("new", "", ""));
        assert_eq!(store.len(), 6);
        assert_eq!(store.entries()[0].title, "new");
    }

    #[test]
    fn test_load_keeps_every_snapshot_entry() {
        let mut store = HistoryStore::new(30);
        store.load((0..3000).map(|i| Entry::new(format!("S{i}"), "", "")).collect());
        assert_eq!(store.len(), 3000);
        assert_eq!(store.cap(), 3000);
        assert_eq!(store.entries()[2999].title, "S2999");
    }

    #[test]
    fn test_delete_title_removes_exactly_one() {
        let mut store = HistoryStore::new(30);
        store.load(vec![
            Entry::new("A", "L", ""),
            Entry::new("A", "L", ""),
            Entry::new("B", "", ""),
        ]);
        store.delete(&Candidate::Entry(Entry::new("A", "L", "")), FieldKind::Title);
        assert_eq!(store.len(), 2);
        assert_eq!(store.entries()[0].title, "A");
    }

    #[test]
    fn test_delete_location_clears_field_everywhere() {
        let mut store = HistoryStore::new(30);
        store.load(vec![
            Entry::new("A", "Room 1", "x"),
            Entry::new("B", "Room 1", ""),
            Entry::new("C", "Room 2", ""),
        ]);
        store.delete(&Candidate::Text("Room 1".to_string()), FieldKind::Location);

        assert_eq!(store.len(), 3);
        assert_eq!(store.entries()[0], Entry::new("A", "", "x"));
        assert_eq!(store.entries()[1].location, "");
        assert_eq!(store.entries()[2].location, "Room 2");
    }

    #[test]
    fn test_clearing_location_collapses_identical_entries() {
        let mut store = HistoryStore::new(30);
        store.save(Entry::new("A", "", ""));
        store.save(Entry::new("A", "L1", ""));
        store.save(Entry::new("B", "", "D"));

        store.delete(&Candidate::Text("L1".to_string()), FieldKind::Location);

        assert_eq!(
            store.entries(),
            &[Entry::new("B", "", "D"), Entry::new("A", "", "")]
        );
    }

    #[test]
    fn test_clearing_description_keeps_most_recent_duplicate() {
        let mut store = HistoryStore::new(30);
        store.load(vec![
            Entry::new("A", "Room", "x").with_calendar("Work", "work@example.com"),
            Entry::new("A", "Room", ""),
            Entry::new("C", "", "x"),
        ]);

        store.delete(&Candidate::Text("x".to_string()), FieldKind::Description);

        assert_eq!(store.len(), 2);
        assert_eq!(store.entries()[0].calendar_summary, "Work");
        assert_eq!(store.entries()[1], Entry::new("C", "", ""));
    }

    #[test]
    fn test_mutations_are_persisted() {
        let sink = RecordingSink::default();
        let mut store = HistoryStore::new(30).with_sink(Box::new(sink.clone()));

        store.save(Entry::new("A", "", "D"));
        store.delete(&Candidate::Text("D".to_string()), FieldKind::Description);
        store.save(Entry::new(" ", "", ""));

        let writes = sink.writes.lock().unwrap();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[1].items, vec![Entry::new("A", "", "")]);
    }

    #[test]
    fn test_persisted_record_stays_within_save_cap_after_snapshot() {
        let sink = RecordingSink::default();
        let mut store = HistoryStore::new(30).with_sink(Box::new(sink.clone()));
        store.load((0..100).map(|i| Entry::new(format!("S{i}"), "", "")).collect());

        store.save(Entry::new("New", "", ""));

        assert_eq!(store.len(), 100);
        let writes = sink.writes.lock().unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].items.len(), 30);
        assert_eq!(writes[0].items[0].title, "New");
        assert_eq!(writes[0].items[29].title, "S28");
    }
}
