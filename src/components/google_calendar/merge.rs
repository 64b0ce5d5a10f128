use super::models::CalendarEvent;
use crate::components::history::Entry;
use crate::utils::time::start_millis;
use std::collections::HashSet;

/// Merge events from every calendar into one history snapshot.
///
/// Events are ordered by start, then walked newest first keeping only the
/// first occurrence of each non-empty title.
pub fn merge_events(mut events: Vec<CalendarEvent>) -> Vec<Entry> {
    events.sort_by_key(|event| start_millis(event.start()));

    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    for event in events.into_iter().rev() {
        let Some(title) = event.summary.as_deref().filter(|t| !t.is_empty()) else {
            continue;
        };
        if seen.insert(title.to_string()) {
            entries.push(event.into_entry());
        }
    }
    entries
}
