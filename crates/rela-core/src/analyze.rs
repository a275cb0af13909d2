//! Release analysis orchestration.
//!
//! [`gather_evidence`] resolves the release range, parses and aggregates its
//! changes and collects prioritized issue text. [`compose_prompt`] and
//! [`generate_report`] turn that evidence into a report. Collaborators are
//! passed in as trait objects, so every step runs against fakes in tests.

use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument};

use crate::changelog::{self, ChangeRecord};
use crate::config::Config;
use crate::git::{GitError, History};
use crate::issues::{self, IssueTextRecord};
use crate::priority::{self, KeywordScorer};
use crate::prompt::{Prompt, PromptBuilder};
use crate::release::{self, ReleaseBoundary, ResolveError};
use crate::report::{ReportError, ReportGenerator};
use crate::stats::{self, ChangeStats};
use crate::tracker::IssueSource;

/// Errors from a release analysis.
#[derive(Error, Debug)]
pub enum AnalyzeError {
    /// The version could not be resolved to a release range.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Reading tags or history failed.
    #[error(transparent)]
    Git(#[from] GitError),

    /// The report generator failed.
    #[error(transparent)]
    Report(#[from] ReportError),
}

/// Result alias for release analysis.
pub type AnalyzeResult<T> = Result<T, AnalyzeError>;

/// Everything known about a release before a report is written.
#[derive(Debug, Clone, Serialize)]
pub struct ReleaseEvidence {
    /// Requested version string.
    pub version: String,
    /// Resolved tag range.
    pub boundary: ReleaseBoundary,
    /// Parsed changes in log order.
    pub changes: Vec<ChangeRecord>,
    /// Aggregate statistics over `changes`.
    pub stats: ChangeStats,
    /// Issue ids referenced by change summaries.
    pub referenced_issues: BTreeSet<u64>,
    /// Issue ids found through the milestone search.
    pub milestone_issues: BTreeSet<u64>,
    /// Fetched issue text, highest priority first.
    pub issues: Vec<IssueTextRecord>,
}

/// Resolve the release, read its changes and collect issue text.
#[instrument(skip(config, history, tracker))]
pub fn gather_evidence(
    version: &str,
    config: &Config,
    history: &dyn History,
    tracker: &dyn IssueSource,
) -> AnalyzeResult<ReleaseEvidence> {
    let scheme = config.product.tag_scheme();
    let tags = history.release_tags(&scheme)?;
    let boundary = release::resolve(version, &tags, &scheme)?;
    info!(range = %boundary, "resolved release range");

    let raw = history.change_log(&boundary, config.product.fallback_months)?;
    let changes = changelog::parse_log(&raw, config.issues.id_range());
    let stats = stats::aggregate(&changes);
    info!(
        changes = stats.total_changes,
        contributors = stats.contributor_count,
        "parsed change log"
    );

    let referenced_issues: BTreeSet<u64> = changes
        .iter()
        .flat_map(|change| change.issue_ids.iter().copied())
        .collect();
    let milestone_issues = tracker.milestone_issue_ids(version);

    let wanted: BTreeSet<u64> = referenced_issues.union(&milestone_issues).copied().collect();
    let issues = if wanted.is_empty() {
        Vec::new()
    } else {
        let fetched = issues::merge_records([tracker.fetch_issue_texts(&wanted)]);
        priority::prioritize(fetched, &KeywordScorer)
    };
    info!(
        referenced = referenced_issues.len(),
        milestone = milestone_issues.len(),
        fetched = issues.len(),
        "collected issues"
    );

    Ok(ReleaseEvidence {
        version: version.to_string(),
        boundary,
        changes,
        stats,
        referenced_issues,
        milestone_issues,
        issues,
    })
}

/// Compose the report prompt for gathered evidence.
pub fn compose_prompt(evidence: &ReleaseEvidence, config: &Config) -> Prompt {
    let prompt = PromptBuilder::from_config(config).build(
        &evidence.version,
        &evidence.stats,
        &evidence.changes,
        &evidence.issues,
    );
    if prompt.truncated {
        tracing::warn!(
            budget = config.report.char_budget,
            "prompt truncated to fit budget"
        );
    }
    prompt
}

/// Hand a prompt to the report generator.
#[instrument(skip_all)]
pub fn generate_report(prompt: &Prompt, generator: &dyn ReportGenerator) -> AnalyzeResult<String> {
    Ok(generator.generate(&prompt.text)?)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::release::TagScheme;
    use crate::report::ReportResult;
    use crate::tracker::NoIssues;

    struct FakeHistory {
        tags: Vec<String>,
        log: String,
        seen: RefCell<Option<ReleaseBoundary>>,
    }

    impl FakeHistory {
        fn new(tags: &[&str], log: &str) -> Self {
            Self {
                tags: tags.iter().map(ToString::to_string).collect(),
                log: log.to_string(),
                seen: RefCell::new(None),
            }
        }
    }

    impl History for FakeHistory {
        fn release_tags(&self, _scheme: &TagScheme) -> crate::git::GitResult<Vec<String>> {
            Ok(self.tags.clone())
        }

        fn change_log(
            &self,
            boundary: &ReleaseBoundary,
            _fallback_months: u32,
        ) -> crate::git::GitResult<String> {
            *self.seen.borrow_mut() = Some(boundary.clone());
            Ok(self.log.clone())
        }
    }

    struct FakeTracker {
        milestone: BTreeSet<u64>,
        requested: RefCell<BTreeSet<u64>>,
    }

    impl IssueSource for FakeTracker {
        fn milestone_issue_ids(&self, _version: &str) -> BTreeSet<u64> {
            self.milestone.clone()
        }

        fn fetch_issue_texts(&self, ids: &BTreeSet<u64>) -> Vec<IssueTextRecord> {
            *self.requested.borrow_mut() = ids.clone();
            ids.iter()
                .map(|&id| IssueTextRecord {
                    id,
                    text: if id == 1_900_002 {
                        format!("# Bug {id} - security crash")
                    } else {
                        format!("# Bug {id} - tidy")
                    },
                })
                .collect()
        }
    }

    struct Canned;

    impl ReportGenerator for Canned {
        fn generate(&self, prompt: &str) -> ReportResult<String> {
            Ok(format!("report ({} chars)", prompt.chars().count()))
        }
    }

    const TAGS: &[&str] = &["FIREFOX_130_0_RELEASE", "FIREFOX_131_0_RELEASE"];

    const LOG: &str = "\
aaaa1111|Ann|2024-09-01 10:00:00 +0000|Bug 1900001 - Fix layout
10\t2\tlayout/base/a.cpp
aaaa2222|Bob|2024-09-02 10:00:00 +0000|Bug 1900002 - Harden parser
1\t1\tdom/b.js
";

    fn tracker() -> FakeTracker {
        FakeTracker {
            milestone: [1_900_003].into_iter().collect(),
            requested: RefCell::new(BTreeSet::new()),
        }
    }

    #[test]
    fn evidence_covers_range_changes_and_issues() {
        let history = FakeHistory::new(TAGS, LOG);
        let tracker = tracker();
        let evidence = gather_evidence("131.0", &Config::default(), &history, &tracker).unwrap();

        assert_eq!(
            history.seen.borrow().as_ref().map(ReleaseBoundary::revision_range),
            Some("FIREFOX_130_0_RELEASE..FIREFOX_131_0_RELEASE".to_string())
        );
        assert_eq!(evidence.stats.total_changes, 2);
        assert_eq!(evidence.stats.contributor_count, 2);
        assert_eq!(
            evidence.referenced_issues,
            [1_900_001, 1_900_002].into_iter().collect()
        );
        assert_eq!(
            *tracker.requested.borrow(),
            [1_900_001, 1_900_002, 1_900_003].into_iter().collect()
        );
        assert_eq!(evidence.issues[0].id, 1_900_002);
    }

    #[test]
    fn unknown_version_is_resolve_error() {
        let history = FakeHistory::new(TAGS, LOG);
        let err = gather_evidence("999.0", &Config::default(), &history, &NoIssues).unwrap_err();
        assert!(matches!(
            err,
            AnalyzeError::Resolve(ResolveError::UnresolvableVersion { .. })
        ));
    }

    #[test]
    fn no_referenced_issues_skips_fetch() {
        let history = FakeHistory::new(TAGS, "cccc|Cy|2024-09-03|No ids here\n");
        let evidence = gather_evidence("131.0", &Config::default(), &history, &NoIssues).unwrap();
        assert!(evidence.issues.is_empty());
        assert_eq!(evidence.stats.total_changes, 1);
    }

    #[test]
    fn missing_previous_release_still_analyzes() {
        let history = FakeHistory::new(&["FIREFOX_131_0_RELEASE"], LOG);
        let evidence = gather_evidence("131.0", &Config::default(), &history, &NoIssues).unwrap();
        assert!(evidence.boundary.start.is_none());
        assert_eq!(evidence.changes.len(), 2);
    }

    #[test]
    fn prompt_and_report_use_evidence() {
        let history = FakeHistory::new(TAGS, LOG);
        let config = Config::default();
        let evidence = gather_evidence("131.0", &config, &history, &tracker()).unwrap();
        let prompt = compose_prompt(&evidence, &config);
        assert!(prompt.text.contains("Firefox Version: 131.0"));
        assert_eq!(prompt.issues_included, 3);

        let report = generate_report(&prompt, &Canned).unwrap();
        assert_eq!(report, format!("report ({} chars)", prompt.text.chars().count()));
    }

    #[test]
    fn report_errors_propagate() {
        struct Failing;
        impl ReportGenerator for Failing {
            fn generate(&self, _prompt: &str) -> ReportResult<String> {
                Err(ReportError::EmptyResponse)
            }
        }
        let prompt = Prompt {
            text: "x".into(),
            truncated: false,
            issues_included: 0,
        };
        assert!(matches!(
            generate_report(&prompt, &Failing),
            Err(AnalyzeError::Report(ReportError::EmptyResponse))
        ));
    }
}
