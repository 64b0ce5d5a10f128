use super::models::{Candidate, Entry, FieldKind};

/// Outcome of a history query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    /// The query was empty; the overlay should close
    Close,
    /// Matching candidates in store order (possibly none)
    Candidates(Vec<Candidate>),
}

impl MatchResult {
    pub fn is_close(&self) -> bool {
        matches!(self, MatchResult::Close)
    }

    pub fn candidates(&self) -> &[Candidate] {
        match self {
            MatchResult::Close => &[],
            MatchResult::Candidates(candidates) => candidates,
        }
    }
}

/// Case-insensitive substring match of `text` against `entries`, capped to `limit`.
///
/// Titles produce whole entries; locations and descriptions produce plain
/// strings with duplicates removed, keeping the first (most recent) occurrence.
pub fn query(entries: &[Entry], text: &str, kind: FieldKind, limit: usize) -> MatchResult {
    if text.trim().is_empty() {
        return MatchResult::Close;
    }
    let needle = text.to_lowercase();

    let candidates = match kind {
        FieldKind::Title => entries
            .iter()
            .filter(|entry| !entry.title.is_empty() && contains_lower(&entry.title, &needle))
            .take(limit)
            .cloned()
            .map(Candidate::Entry)
            .collect(),
        FieldKind::Location | FieldKind::Description => {
            let mut seen: Vec<&str> = Vec::new();
            for value in entries.iter().map(|entry| entry.field(kind)) {
                if seen.len() >= limit {
                    break;
                }
                if value.is_empty() || seen.contains(&value) || !contains_lower(value, &needle) {
                    continue;
                }
                seen.push(value);
            }
            seen.into_iter()
                .map(|value| Candidate::Text(value.to_string()))
                .collect()
        }
    };

    MatchResult::Candidates(candidates)
}

fn contains_lower(haystack: &str, lowered_needle: &str) -> bool {
    haystack.to_lowercase().contains(lowered_needle)
}
