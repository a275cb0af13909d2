//! Change log parsing: `git log --numstat` text into [`ChangeRecord`]s.
//!
//! The input interleaves one header line per change with the numeric
//! statistics lines that belong to it:
//!
//! ```text
//! 3f2a9c1e|Jane Doe|2024-09-12 10:03:11 +0200|Bug 1912345 - Fix crash r=bob
//!
//! 12\t3\tdom/media/Decoder.cpp
//! -\t-\tbrowser/themes/icon.png
//! ```
//!
//! Log formats drift between tool versions, so parsing is lenient: the
//! scanner is a two-state machine whose failure transitions skip the line.
//! Nothing in this module returns an error.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::issue_ids::{self, IdRange};

/// Value for `git log --format` that produces the header shape parsed here.
pub const LOG_FORMAT: &str = "--format=%H|%an|%ad|%s";

/// Separates hash, author, date and summary in a header line.
pub const HEADER_DELIMITER: char = '|';

/// Separates added, removed and path in a statistics line.
pub const STAT_DELIMITER: char = '\t';

/// Reported in place of line counts for binary files.
pub const BINARY_MARKER: &str = "-";

const HEADER_FIELDS: usize = 4;
const STAT_FIELDS: usize = 3;

/// One change in the history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Content hash, opaque.
    pub hash: String,
    /// Author display name.
    pub author: String,
    /// Author date, verbatim from the log.
    pub date: String,
    /// First line of the change description.
    pub summary: String,
    /// Touched paths in log order.
    pub files: Vec<String>,
    /// Lines added across all numeric statistics lines.
    pub insertions: u64,
    /// Lines removed across all numeric statistics lines.
    pub deletions: u64,
    /// Issue identifiers mentioned in the summary.
    pub issue_ids: BTreeSet<u64>,
}

impl ChangeRecord {
    /// Total lines touched (`insertions + deletions`).
    pub const fn churn(&self) -> u64 {
        self.insertions.saturating_add(self.deletions)
    }

    /// First eight characters of the hash.
    pub fn short_hash(&self) -> &str {
        self.hash
            .char_indices()
            .nth(8)
            .map_or(self.hash.as_str(), |(idx, _)| &self.hash[..idx])
    }
}

enum ParseState {
    AwaitingHeader,
    InRecord(ChangeRecord),
}

/// Parse raw log text into change records, in input order.
///
/// `range` bounds the issue identifiers extracted from each summary.
pub fn parse_log(raw: &str, range: IdRange) -> Vec<ChangeRecord> {
    let mut records = Vec::new();
    let mut state = ParseState::AwaitingHeader;

    for line in raw.lines() {
        state = match state {
            ParseState::AwaitingHeader => {
                parse_header(line, range).map_or(ParseState::AwaitingHeader, ParseState::InRecord)
            }
            ParseState::InRecord(mut record) => {
                if line.contains(STAT_DELIMITER) {
                    apply_stat_line(&mut record, line);
                    ParseState::InRecord(record)
                } else if line.trim().is_empty() {
                    ParseState::InRecord(record)
                } else {
                    records.push(record);
                    parse_header(line, range)
                        .map_or(ParseState::AwaitingHeader, ParseState::InRecord)
                }
            }
        };
    }

    if let ParseState::InRecord(record) = state {
        records.push(record);
    }

    trace!(count = records.len(), "parsed change log");
    records
}

fn parse_header(line: &str, range: IdRange) -> Option<ChangeRecord> {
    if !line.contains(HEADER_DELIMITER) {
        return None;
    }
    let mut fields = line.splitn(HEADER_FIELDS, HEADER_DELIMITER);
    let (Some(hash), Some(author), Some(date), Some(summary)) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        trace!(line, "dropping undersized header");
        return None;
    };

    Some(ChangeRecord {
        hash: hash.to_string(),
        author: author.to_string(),
        date: date.to_string(),
        summary: summary.to_string(),
        issue_ids: issue_ids::extract(summary, range),
        ..ChangeRecord::default()
    })
}

fn apply_stat_line(record: &mut ChangeRecord, line: &str) {
    let fields: Vec<&str> = line.splitn(STAT_FIELDS, STAT_DELIMITER).collect();
    let [added, removed, path] = fields[..] else {
        trace!(line, "skipping statistics line with wrong field count");
        return;
    };
    let (Some(added), Some(removed)) = (line_count(added), line_count(removed)) else {
        trace!(line, "skipping non-numeric statistics line");
        return;
    };

    record.insertions = record.insertions.saturating_add(added);
    record.deletions = record.deletions.saturating_add(removed);
    record.files.push(path.to_string());
}

fn line_count(field: &str) -> Option<u64> {
    if field == BINARY_MARKER {
        Some(0)
    } else {
        field.parse().ok()
    }
}

/// Serialize records back into the header/statistics shape read by
/// [`parse_log`].
///
/// Per-file counts are not retained on a record, so the totals are written
/// against the first path and the remaining paths get zeroes. Parsing the
/// output yields the same records.
pub fn to_log_text(records: &[ChangeRecord]) -> String {
    let mut out = String::new();
    for record in records {
        let _ = writeln!(
            out,
            "{}{HEADER_DELIMITER}{}{HEADER_DELIMITER}{}{HEADER_DELIMITER}{}",
            record.hash, record.author, record.date, record.summary
        );
        for (idx, path) in record.files.iter().enumerate() {
            let (added, removed) = if idx == 0 {
                (record.insertions, record.deletions)
            } else {
                (0, 0)
            };
            let _ = writeln!(
                out,
                "{added}{STAT_DELIMITER}{removed}{STAT_DELIMITER}{path}"
            );
        }
    }
    out
}
