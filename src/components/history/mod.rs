pub mod matcher;
pub mod models;
pub mod record;
mod store;

pub use matcher::MatchResult;
pub use models::{Candidate, Entry, FieldKind};
pub use record::{decode_record, DecodedRecord, HistoryRecord};
pub use store::{HistorySink, HistoryStore};
