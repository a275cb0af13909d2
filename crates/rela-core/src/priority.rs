//! Issue prioritization.
//!
//! Issues are ordered by an [`IssueScorer`], highest first. The sort is
//! stable, so equal scores keep the order the issues arrived in. The default
//! [`KeywordScorer`] is a heuristic; swap in another scorer without touching
//! the ordering contract.

use crate::issues::IssueTextRecord;

/// Scores issue text. Higher means more important.
pub trait IssueScorer {
    /// Score a single issue's text.
    fn score(&self, text: &str) -> f64;
}

impl<F> IssueScorer for F
where
    F: Fn(&str) -> f64,
{
    fn score(&self, text: &str) -> f64 {
        self(text)
    }
}

/// Keyword groups and the weight each contributes when any member matches.
const KEYWORD_WEIGHTS: &[(&[&str], f64)] = &[
    (&["security", "crash", "critical", "regression"], 10.0),
    (&["performance", "memory", "leak", "startup"], 8.0),
    (&["feature", "implement", "support"], 6.0),
    (&["ui", "interface", "devtools"], 4.0),
];

const SEVERITY_MARKERS: &[&str] = &["severity: critical", "severity: major"];
const SEVERITY_WEIGHT: f64 = 5.0;

const LENGTH_UNIT: f64 = 1000.0;
const LENGTH_BONUS_CAP: f64 = 3.0;

/// Keyword and length heuristic, matched case-insensitively by substring.
///
/// - +10 security, crash, critical, regression
/// - +8 performance, memory, leak, startup
/// - +6 feature, implement, support
/// - +4 ui, interface, devtools
/// - +5 `severity: critical` or `severity: major`
/// - +1 per thousand characters, capped at 3
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordScorer;

impl IssueScorer for KeywordScorer {
    fn score(&self, text: &str) -> f64 {
        let text = text.to_lowercase();

        let keywords: f64 = KEYWORD_WEIGHTS
            .iter()
            .filter(|(words, _)| words.iter().any(|word| text.contains(word)))
            .map(|(_, weight)| weight)
            .sum();

        let severity = if SEVERITY_MARKERS.iter().any(|m| text.contains(m)) {
            SEVERITY_WEIGHT
        } else {
            0.0
        };

        let length = (text.chars().count() as f64 / LENGTH_UNIT).min(LENGTH_BONUS_CAP);

        keywords + severity + length
    }
}

/// Order `issues` by descending score. Ties keep input order.
pub fn prioritize(issues: Vec<IssueTextRecord>, scorer: &dyn IssueScorer) -> Vec<IssueTextRecord> {
    let mut scored: Vec<(f64, IssueTextRecord)> = issues
        .into_iter()
        .map(|issue| (scorer.score(&issue.text), issue))
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().map(|(_, issue)| issue).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(id: u64, text: &str) -> IssueTextRecord {
        IssueTextRecord {
            id,
            text: text.into(),
        }
    }

    fn ids(issues: &[IssueTextRecord]) -> Vec<u64> {
        issues.iter().map(|i| i.id).collect()
    }

    #[test]
    fn security_outranks_otherwise_identical_text() {
        let scorer = KeywordScorer;
        let with = scorer.score("Fix security problem in parser");
        let without = scorer.score("Fix tidying problem in parser");
        assert!(with > without);
    }

    #[test]
    fn keyword_groups_add_once_each() {
        let scorer = KeywordScorer;
        // "crash" and "regression" share a group; "leak" adds the second group.
        let score = scorer.score("crash regression leak");
        assert!((score - 18.021).abs() < 1e-9, "score was {score}");
    }

    #[test]
    fn severity_marker_adds_five() {
        let scorer = KeywordScorer;
        let base = scorer.score("Severity: S3");
        let major = scorer.score("Severity: Major");
        assert!((major - base - 5.0).abs() < 0.01);
    }

    #[test]
    fn length_bonus_is_capped() {
        let scorer = KeywordScorer;
        assert!((scorer.score(&"x".repeat(1500)) - 1.5).abs() < 1e-9);
        assert!((scorer.score(&"x".repeat(50_000)) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let scorer = KeywordScorer;
        assert!(scorer.score("CRASH") >= 10.0);
    }

    #[test]
    fn orders_by_descending_score() {
        let issues = vec![
            issue(1, "plain"),
            issue(2, "security crash"),
            issue(3, "memory use"),
        ];
        assert_eq!(ids(&prioritize(issues, &KeywordScorer)), vec![2, 3, 1]);
    }

    #[test]
    fn equal_scores_keep_input_order() {
        let issues = vec![
            issue(30, "aaaa"),
            issue(10, "bbbb"),
            issue(20, "cccc"),
        ];
        assert_eq!(ids(&prioritize(issues, &KeywordScorer)), vec![30, 10, 20]);
    }

    #[test]
    fn scorer_is_replaceable() {
        let by_length = |text: &str| -> f64 { -(text.len() as f64) };
        let issues = vec![issue(1, "longest text"), issue(2, "short"), issue(3, "mid text")];
        assert_eq!(ids(&prioritize(issues, &by_length)), vec![2, 3, 1]);
    }

    #[test]
    fn empty_input_is_empty_output() {
        assert!(prioritize(Vec::new(), &KeywordScorer).is_empty());
    }
}
