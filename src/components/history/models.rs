use serde::{Deserialize, Serialize};
use std::fmt;

/// A previously entered calendar event
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Entry {
    pub title: String,
    pub location: String,
    pub description: String,
    pub calendar_summary: String,
    pub calendar_id: String,
    /// ISO-8601 date-time or a bare date for all-day events
    pub start_time: String,
    pub end_time: String,
    pub is_all_day: bool,
}

impl Entry {
    /// Create an entry holding only the three editable fields
    pub fn new(
        title: impl Into<String>,
        location: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            location: location.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn with_calendar(mut self, summary: impl Into<String>, id: impl Into<String>) -> Self {
        self.calendar_summary = summary.into();
        self.calendar_id = id.into();
        self
    }

    /// Whether two entries share the same (title, location, description) triple
    pub fn same_triple(&self, other: &Entry) -> bool {
        self.title == other.title
            && self.location == other.location
            && self.description == other.description
    }

    /// The value this entry holds for a field kind
    pub fn field(&self, kind: FieldKind) -> &str {
        match kind {
            FieldKind::Title => &self.title,
            FieldKind::Location => &self.location,
            FieldKind::Description => &self.description,
        }
    }
}

/// The three editor fields the engine autocompletes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    #[serde(rename = "titles")]
    Title,
    #[serde(rename = "locations")]
    Location,
    #[serde(rename = "descriptions")]
    Description,
}

impl FieldKind {
    pub const ALL: [FieldKind; 3] = [FieldKind::Title, FieldKind::Location, FieldKind::Description];

    /// Name of the history axis this field queries
    pub fn axis(&self) -> &'static str {
        match self {
            FieldKind::Title => "titles",
            FieldKind::Location => "locations",
            FieldKind::Description => "descriptions",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.axis())
    }
}

/// A suggestion produced by the match engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate {
    /// A full entry, produced for the titles axis
    Entry(Entry),
    /// A plain value, produced for the location and description axes
    Text(String),
}

impl Candidate {
    /// The text written into the originating field on selection
    pub fn primary_text(&self) -> &str {
        match self {
            Candidate::Entry(entry) => &entry.title,
            Candidate::Text(text) => text,
        }
    }
}
