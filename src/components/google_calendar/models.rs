use crate::components::history::Entry;
use crate::utils::text::strip_html_tags;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A calendar from the user's calendar list
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CalendarInfo {
    pub id: String,
    pub summary: String,
}

impl CalendarInfo {
    /// Parse a calendar list item; items without an id are skipped
    pub fn from_json(item: &Value) -> Option<Self> {
        let id = item.get("id").and_then(|id| id.as_str())?.to_string();
        let summary = item
            .get("summary")
            .and_then(|s| s.as_str())
            .unwrap_or("")
            .to_string();
        Some(Self { id, summary })
    }
}

/// Simplified calendar event representation, tagged with its calendar
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_date_time: Option<String>,
    pub start_date: Option<String>,
    pub end_date_time: Option<String>,
    pub end_date: Option<String>,
    pub calendar_summary: String,
    pub calendar_id: String,
}

impl CalendarEvent {
    /// Parse one item of an events listing
    pub fn from_json(event: &Value, calendar: &CalendarInfo) -> Self {
        let text = |key: &str| event.get(key).and_then(|v| v.as_str()).map(|s| s.to_string());
        let moment = |key: &str, field: &str| {
            event
                .get(key)
                .and_then(|v| v.as_object())
                .and_then(|v| v.get(field))
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
        };

        Self {
            id: text("id").unwrap_or_default(),
            summary: text("summary"),
            description: text("description"),
            location: text("location"),
            start_date_time: moment("start", "dateTime"),
            start_date: moment("start", "date"),
            end_date_time: moment("end", "dateTime"),
            end_date: moment("end", "date"),
            calendar_summary: calendar.summary.clone(),
            calendar_id: calendar.id.clone(),
        }
    }

    /// Start as `dateTime`, falling back to the bare `date`
    pub fn start(&self) -> Option<&str> {
        self.start_date_time.as_deref().or(self.start_date.as_deref())
    }

    pub fn end(&self) -> Option<&str> {
        self.end_date_time.as_deref().or(self.end_date.as_deref())
    }

    pub fn is_all_day(&self) -> bool {
        self.start_date.is_some()
    }

    /// Convert into a history entry, stripping markup from the description
    pub fn into_entry(self) -> Entry {
        let start_time = self.start().unwrap_or_default().to_string();
        let end_time = self.end().unwrap_or_default().to_string();
        let is_all_day = self.is_all_day();

        Entry {
            title: self.summary.unwrap_or_default(),
            location: self.location.unwrap_or_default(),
            description: self
                .description
                .map(|d| strip_html_tags(&d))
                .unwrap_or_default(),
            calendar_summary: self.calendar_summary,
            calendar_id: self.calendar_id,
            start_time,
            end_time,
            is_all_day,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_all_day_event_to_entry() {
        let calendar = CalendarInfo {
            id: "work@example.com".to_string(),
            summary: "Work".to_string(),
        };
        let event = CalendarEvent::from_json(
            &json!({
                "id": "e1",
                "summary": "Offsite",
                "description": "<p>Bring <b>laptop</b></p>",
                "start": { "date": "2024-05-01" },
                "end": { "date": "2024-05-02" }
            }),
            &calendar,
        );

        let entry = event.into_entry();
        assert_eq!(entry.title, "Offsite");
        assert_eq!(entry.description, "Bring laptop");
        assert_eq!(entry.location, "");
        assert_eq!(entry.calendar_summary, "Work");
        assert_eq!(entry.calendar_id, "work@example.com");
        assert_eq!(entry.start_time, "2024-05-01");
        assert_eq!(entry.end_time, "2024-05-02");
        assert!(entry.is_all_day);
    }

    #[test]
    fn test_calendar_without_id_is_skipped() {
        assert_eq!(CalendarInfo::from_json(&json!({ "summary": "x" })), None);
    }
}
