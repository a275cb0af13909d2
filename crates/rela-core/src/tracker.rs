//! Issue tracker access through a tracker-to-markdown converter.
//!
//! Issue text comes from an external converter (`bmo-to-md` by default) that
//! accepts a comma-separated list of ids and prints one markdown section per
//! issue. Milestone membership comes from the tracker's REST search.
//!
//! Lookups are best-effort: a failing batch or search is logged and skipped,
//! and callers receive whatever resolved.

use std::collections::BTreeSet;
use std::process::Command;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::IssuesConfig;
use crate::issues::{self, IssueTextRecord};

/// Errors from tracker access. Surfaced only through logs and diagnostics;
/// [`IssueSource`] methods degrade to empty results instead.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Failed to execute the converter.
    #[error("failed to run {program}: {source}")]
    Exec {
        /// Converter program.
        program: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The converter returned a non-zero exit code.
    #[error("{program} failed: {stderr}")]
    Converter {
        /// Converter program.
        program: String,
        /// Captured stderr.
        stderr: String,
    },

    /// The search request failed.
    #[error("tracker search failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Source of issue text.
pub trait IssueSource {
    /// Ids of fixed issues whose milestone is `version`.
    fn milestone_issue_ids(&self, version: &str) -> BTreeSet<u64>;

    /// Markdown for `ids`. May return fewer records than requested, in any
    /// order.
    fn fetch_issue_texts(&self, ids: &BTreeSet<u64>) -> Vec<IssueTextRecord>;
}

/// An [`IssueSource`] that returns nothing, for runs that skip issue lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIssues;

impl IssueSource for NoIssues {
    fn milestone_issue_ids(&self, _version: &str) -> BTreeSet<u64> {
        BTreeSet::new()
    }

    fn fetch_issue_texts(&self, _ids: &BTreeSet<u64>) -> Vec<IssueTextRecord> {
        Vec::new()
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    bugs: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    id: u64,
}

/// Environment variable the converter reads its tracker API key from.
/// Without it the converter falls back to anonymous access.
pub const TRACKER_KEY_ENV: &str = "BMO_API_KEY";

const SEARCH_LIMIT: &str = "1000";
const SEARCH_TIMEOUT: Duration = Duration::from_secs(60);

/// [`IssueSource`] backed by a converter executable and a REST search
/// endpoint.
#[derive(Debug, Clone)]
pub struct ConverterTracker {
    converter: String,
    batch_size: usize,
    section_header: String,
    search_url: Option<String>,
    milestone_formats: Vec<String>,
    http: reqwest::blocking::Client,
}

impl ConverterTracker {
    /// Build a tracker from issue configuration.
    pub fn new(config: &IssuesConfig) -> Result<Self, TrackerError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(SEARCH_TIMEOUT)
            .build()?;
        Ok(Self {
            converter: config.converter.clone(),
            batch_size: config.batch_size.max(1),
            section_header: config.section_header.clone(),
            search_url: config.search_url.clone(),
            milestone_formats: config.milestone_formats.clone(),
            http,
        })
    }

    /// Override the converter executable.
    pub fn with_converter(mut self, converter: impl Into<String>) -> Self {
        self.converter = converter.into();
        self
    }

    /// Whether the converter can be found on `PATH` (or at its given path).
    pub fn converter_available(&self) -> bool {
        which::which(&self.converter).is_ok()
    }

    /// Run the converter for one batch and split its output.
    fn convert_batch(&self, batch: &[u64]) -> Result<Vec<IssueTextRecord>, TrackerError> {
        let joined = batch
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",");

        let output = Command::new(&self.converter)
            .arg(&joined)
            .output()
            .map_err(|source| TrackerError::Exec {
                program: self.converter.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(TrackerError::Converter {
                program: self.converter.clone(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let wanted: BTreeSet<u64> = batch.iter().copied().collect();
        Ok(issues::split_sections(
            stdout.trim(),
            &self.section_header,
            &wanted,
        ))
    }

    /// Query the search endpoint for one milestone value.
    fn search_milestone(&self, url: &str, milestone: &str) -> Result<Vec<u64>, TrackerError> {
        let response: SearchResponse = self
            .http
            .get(url)
            .query(&[
                ("target_milestone", milestone),
                ("resolution", "FIXED"),
                ("limit", SEARCH_LIMIT),
                ("include_fields", "id"),
            ])
            .send()?
            .error_for_status()?
            .json()?;
        Ok(response.bugs.into_iter().map(|hit| hit.id).collect())
    }
}

impl IssueSource for ConverterTracker {
    #[instrument(skip(self))]
    fn milestone_issue_ids(&self, version: &str) -> BTreeSet<u64> {
        let Some(ref url) = self.search_url else {
            debug!("no search endpoint configured");
            return BTreeSet::new();
        };

        let mut ids = BTreeSet::new();
        for milestone in milestone_values(&self.milestone_formats, version) {
            match self.search_milestone(url, &milestone) {
                Ok(found) => {
                    debug!(%milestone, count = found.len(), "milestone search");
                    ids.extend(found);
                }
                Err(e) => debug!(%milestone, error = %e, "milestone search failed"),
            }
        }

        info!(count = ids.len(), "milestone issues found");
        ids
    }

    #[instrument(skip_all, fields(requested = ids.len()))]
    fn fetch_issue_texts(&self, ids: &BTreeSet<u64>) -> Vec<IssueTextRecord> {
        let ids: Vec<u64> = ids.iter().copied().collect();
        let mut records = Vec::new();

        for batch in ids.chunks(self.batch_size) {
            match self.convert_batch(batch) {
                Ok(found) => records.extend(found),
                Err(e) => warn!(error = %e, size = batch.len(), "converter batch failed, skipping"),
            }
        }

        info!(fetched = records.len(), "issue text fetched");
        records
    }
}

/// Expand milestone format strings (`firefox{version}`) for `version`.
pub fn milestone_values(formats: &[String], version: &str) -> Vec<String> {
    formats
        .iter()
        .map(|format| format.replace("{version}", version))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> IssuesConfig {
        IssuesConfig {
            converter: "rela-test-converter-that-does-not-exist".into(),
            search_url: None,
            ..IssuesConfig::default()
        }
    }

    #[test]
    fn milestone_values_substitute_version() {
        let formats = vec!["firefox{version}".to_string(), "{version}".to_string()];
        assert_eq!(
            milestone_values(&formats, "131.0"),
            vec!["firefox131.0", "131.0"]
        );
    }

    #[test]
    fn missing_converter_degrades_to_empty() {
        let tracker = ConverterTracker::new(&config()).unwrap();
        assert!(!tracker.converter_available());
        let ids: BTreeSet<u64> = [1_000_001, 1_000_002].into_iter().collect();
        assert!(tracker.fetch_issue_texts(&ids).is_empty());
    }

    #[test]
    fn no_search_endpoint_means_no_milestone_issues() {
        let tracker = ConverterTracker::new(&config()).unwrap();
        assert!(tracker.milestone_issue_ids("131.0").is_empty());
    }

    #[test]
    fn no_issues_source_is_empty() {
        let ids: BTreeSet<u64> = [1].into_iter().collect();
        assert!(NoIssues.fetch_issue_texts(&ids).is_empty());
        assert!(NoIssues.milestone_issue_ids("1.0").is_empty());
    }

    #[test]
    fn search_response_tolerates_missing_bugs() {
        let parsed: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.bugs.is_empty());
        let parsed: SearchResponse =
            serde_json::from_str(r#"{"bugs":[{"id":1912345},{"id":1912346}]}"#).unwrap();
        assert_eq!(parsed.bugs.len(), 2);
    }
}
