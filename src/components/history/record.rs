use super::models::Entry;
use crate::error::AppResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Number of positions taken from a legacy three-list record
pub const LEGACY_LIMIT: usize = 50;

/// The persisted history record
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HistoryRecord {
    #[serde(default)]
    pub items: Vec<Entry>,
}

/// Older record shape holding three parallel lists
#[derive(Debug, Default, Deserialize)]
struct LegacyRecord {
    #[serde(default)]
    titles: Vec<Option<String>>,
    #[serde(default)]
    locations: Vec<Option<String>>,
    #[serde(default)]
    descriptions: Vec<Option<String>>,
}

impl LegacyRecord {
    fn into_record(self) -> HistoryRecord {
        let limit = self.titles.len().min(LEGACY_LIMIT);
        let pick = |list: &[Option<String>], i: usize| -> String {
            list.get(i).cloned().flatten().unwrap_or_default()
        };

        let items = (0..limit)
            .map(|i| {
                Entry::new(
                    pick(&self.titles, i),
                    pick(&self.locations, i),
                    pick(&self.descriptions, i),
                )
            })
            .collect();

        HistoryRecord { items }
    }
}

/// A decoded record and whether it had to be converted from the legacy shape
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRecord {
    pub record: HistoryRecord,
    pub migrated: bool,
}

/// Decode a stored record, converting the legacy shape when encountered
pub fn decode_record(value: Value) -> AppResult<DecodedRecord> {
    if value.get("items").is_some() {
        let record: HistoryRecord = serde_json::from_value(value)?;
        return Ok(DecodedRecord {
            record,
            migrated: false,
        });
    }

    if value.get("titles").is_some() {
        let legacy: LegacyRecord = serde_json::from_value(value)?;
        return Ok(DecodedRecord {
            record: legacy.into_record(),
            migrated: true,
        });
    }

    Ok(DecodedRecord {
        record: HistoryRecord::default(),
        migrated: false,
    })
}
