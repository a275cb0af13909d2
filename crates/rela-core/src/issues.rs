//! Issue text records and the helpers that shape converter output.
//!
//! Issue text is opaque: it is split, merged, clipped and ranked, but its
//! markdown is never interpreted.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// Markdown for a single tracker issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueTextRecord {
    /// Tracker identifier.
    pub id: u64,
    /// Converter output for this issue.
    pub text: String,
}

/// Split combined converter output into per-issue sections.
///
/// A section starts at a line beginning with `header` followed by the issue
/// id (e.g. `# Bug 1912345 - Title`) and runs until the next such line.
/// Sections for ids outside `wanted`, or with an unreadable id, are discarded
/// along with their body lines.
pub fn split_sections(output: &str, header: &str, wanted: &BTreeSet<u64>) -> Vec<IssueTextRecord> {
    let mut sections = Vec::new();
    let mut current: Option<(u64, Vec<&str>)> = None;

    for line in output.lines() {
        if let Some(rest) = line.strip_prefix(header) {
            if let Some((id, body)) = current.take() {
                sections.push(IssueTextRecord {
                    id,
                    text: body.join("\n"),
                });
            }
            current = rest
                .split_whitespace()
                .next()
                .and_then(|token| token.parse::<u64>().ok())
                .filter(|id| wanted.contains(id))
                .map(|id| (id, vec![line]));
        } else if let Some((_, ref mut body)) = current {
            body.push(line);
        }
    }

    if let Some((id, body)) = current {
        sections.push(IssueTextRecord {
            id,
            text: body.join("\n"),
        });
    }

    sections
}

/// Merge issue collections by id.
///
/// Records keep the position of the first occurrence of their id; a later
/// record with the same id replaces the earlier text.
pub fn merge_records<I>(collections: I) -> Vec<IssueTextRecord>
where
    I: IntoIterator<Item = Vec<IssueTextRecord>>,
{
    let mut merged: Vec<IssueTextRecord> = Vec::new();
    let mut positions: HashMap<u64, usize> = HashMap::new();

    for record in collections.into_iter().flatten() {
        match positions.get(&record.id) {
            Some(&idx) => merged[idx] = record,
            None => {
                positions.insert(record.id, merged.len());
                merged.push(record);
            }
        }
    }

    merged
}

/// Clip `text` to at most `max_chars` characters, appending `marker` when
/// anything was removed.
pub fn clip(text: &str, max_chars: usize, marker: &str) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}{marker}", &text[..idx]),
        None => text.to_string(),
    }
}
