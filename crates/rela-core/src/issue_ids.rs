//! Issue identifier extraction from free-text change summaries.
//!
//! Three pattern families are applied and unioned:
//!
//! 1. explicit mentions: `Bug 1234567`, `issue 1234567`
//! 2. shorthand: `#1234567`
//! 3. bare runs of six or more digits
//!
//! Every candidate is then filtered through an [`IdRange`] so that small
//! numbers (`bug 42`, `#3`) and absurdly large ones are dropped. The bare
//! digit pattern still picks up dates and line counts that happen to fall
//! inside the range; that imprecision is accepted.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:bug|issue)\s+(\d+)").expect("valid regex"));

static SHORTHAND_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#(\d+)").expect("valid regex"));

static BARE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d{6,})").expect("valid regex"));

/// Inclusive bounds for plausible tracker identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRange {
    /// Smallest accepted identifier.
    pub min: u64,
    /// Largest accepted identifier.
    pub max: u64,
}

impl IdRange {
    /// Create a range. Bounds are inclusive.
    pub const fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    /// Whether `id` falls inside the range.
    pub const fn contains(&self, id: u64) -> bool {
        id >= self.min && id <= self.max
    }
}

impl Default for IdRange {
    fn default() -> Self {
        Self::new(100_000, 9_999_999)
    }
}

/// Extract candidate issue identifiers from `text`.
///
/// Returns a deduplicated, ascending set. Never fails: digit runs that
/// overflow `u64` are ignored.
pub fn extract(text: &str, range: IdRange) -> BTreeSet<u64> {
    [&*MENTION_RE, &*SHORTHAND_RE, &*BARE_RE]
        .into_iter()
        .flat_map(|re| re.captures_iter(text))
        .filter_map(|caps| caps.get(1)?.as_str().parse::<u64>().ok())
        .filter(|id| range.contains(*id))
        .collect()
}
