//! Range command: resolve a release and summarize its changes, offline.

use anyhow::Context;
use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use rela_core::analyze::{self, ReleaseEvidence};
use rela_core::config::Config;
use rela_core::git::GitHistory;
use rela_core::release::ReleaseBoundary;
use rela_core::stats;
use rela_core::tracker::NoIssues;

/// Arguments for the `range` subcommand.
#[derive(Args, Debug, Default)]
pub struct RangeArgs {
    /// Release version to resolve (e.g. 131.0, 128.0.3)
    pub version: String,

    /// Number of largest changes to list (default from config)
    #[arg(long, value_name = "N")]
    pub top: Option<usize>,
}

#[derive(Serialize)]
struct RangeSummary<'a> {
    version: &'a str,
    boundary: &'a ReleaseBoundary,
    range: String,
    total_changes: usize,
    contributors: usize,
    files_touched: usize,
    insertions: u64,
    deletions: u64,
    referenced_issues: usize,
    top_components: Vec<(&'a str, usize)>,
    top_extensions: Vec<(&'a str, usize)>,
    significant_changes: Vec<ChangeLine<'a>>,
}

#[derive(Serialize)]
struct ChangeLine<'a> {
    hash: &'a str,
    author: &'a str,
    summary: &'a str,
    churn: u64,
}

impl<'a> RangeSummary<'a> {
    fn new(evidence: &'a ReleaseEvidence, config: &Config, top: usize) -> Self {
        let stats = &evidence.stats;
        Self {
            version: &evidence.version,
            boundary: &evidence.boundary,
            range: evidence.boundary.revision_range(),
            total_changes: stats.total_changes,
            contributors: stats.contributor_count,
            files_touched: stats.total_files_touched,
            insertions: stats.total_insertions,
            deletions: stats.total_deletions,
            referenced_issues: evidence.referenced_issues.len(),
            top_components: stats.top_components(config.report.top_components),
            top_extensions: stats.top_extensions(config.report.top_extensions),
            significant_changes: stats::significant_changes(&evidence.changes, top)
                .into_iter()
                .map(|change| ChangeLine {
                    hash: change.short_hash(),
                    author: &change.author,
                    summary: &change.summary,
                    churn: change.churn(),
                })
                .collect(),
        }
    }
}

/// Execute the range command.
#[instrument(name = "cmd_range", skip_all, fields(version = %args.version))]
pub fn cmd_range(args: RangeArgs, global_json: bool, config: &Config) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing range command");

    let evidence = analyze::gather_evidence(&args.version, config, &GitHistory, &NoIssues)
        .context("failed to resolve release range")?;
    let top = args.top.unwrap_or(config.report.significant_changes);
    let summary = RangeSummary::new(&evidence, config, top);

    if global_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!(
        "{} {}",
        "Release".bold().underline(),
        summary.version.green().bold()
    );
    match summary.boundary.start {
        Some(ref start) => println!("  {}: {}", "From".dimmed(), start.cyan()),
        None => println!(
            "  {}: {}",
            "From".dimmed(),
            format!("(last {} months)", config.product.fallback_months).yellow()
        ),
    }
    println!("  {}: {}", "To".dimmed(), summary.boundary.end.cyan());
    println!();

    println!("{}", "Changes".bold().underline());
    println!("  {}: {}", "Commits".dimmed(), summary.total_changes);
    println!("  {}: {}", "Contributors".dimmed(), summary.contributors);
    println!("  {}: {}", "Files touched".dimmed(), summary.files_touched);
    println!(
        "  {}: {} {}",
        "Lines".dimmed(),
        format!("+{}", summary.insertions).green(),
        format!("-{}", summary.deletions).red()
    );
    println!("  {}: {}", "Referenced issues".dimmed(), summary.referenced_issues);
    println!();

    if !summary.top_components.is_empty() {
        println!("{}", "Top components".bold().underline());
        for (component, count) in &summary.top_components {
            println!("  {component:<24} {count}");
        }
        println!();
    }

    if !summary.top_extensions.is_empty() {
        println!("{}", "File types".bold().underline());
        for (ext, count) in &summary.top_extensions {
            println!("  .{ext:<23} {count}");
        }
        println!();
    }

    if !summary.significant_changes.is_empty() {
        println!("{}", "Largest changes".bold().underline());
        for line in &summary.significant_changes {
            println!(
                "  {} {} {}",
                line.hash.yellow(),
                line.summary,
                format!("({} lines)", line.churn).dimmed()
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use rela_core::changelog::ChangeRecord;
    use rela_core::stats::aggregate;

    fn evidence() -> ReleaseEvidence {
        let changes = vec![
            ChangeRecord {
                hash: "0123456789ab".into(),
                author: "Ann".into(),
                summary: "Bug 1900001 - Fix".into(),
                files: vec!["dom/a.cpp".into()],
                insertions: 4,
                deletions: 1,
                ..ChangeRecord::default()
            },
            ChangeRecord {
                hash: "ba9876543210".into(),
                author: "Bob".into(),
                summary: "Refactor".into(),
                files: vec!["layout/b.rs".into(), "layout/c.rs".into()],
                insertions: 40,
                ..ChangeRecord::default()
            },
        ];
        ReleaseEvidence {
            version: "131.0".into(),
            boundary: ReleaseBoundary {
                start: Some("FIREFOX_130_0_RELEASE".into()),
                end: "FIREFOX_131_0_RELEASE".into(),
            },
            stats: aggregate(&changes),
            changes,
            referenced_issues: [1_900_001].into_iter().collect(),
            milestone_issues: BTreeSet::new(),
            issues: Vec::new(),
        }
    }

    #[test]
    fn summary_ranks_changes_and_components() {
        let evidence = evidence();
        let summary = RangeSummary::new(&evidence, &Config::default(), 1);
        assert_eq!(summary.range, "FIREFOX_130_0_RELEASE..FIREFOX_131_0_RELEASE");
        assert_eq!(summary.total_changes, 2);
        assert_eq!(summary.top_components[0], ("layout", 2));
        assert_eq!(summary.significant_changes.len(), 1);
        assert_eq!(summary.significant_changes[0].hash, "ba987654");
    }

    #[test]
    fn summary_serializes() {
        let evidence = evidence();
        let summary = RangeSummary::new(&evidence, &Config::default(), 5);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["boundary"]["end"], "FIREFOX_131_0_RELEASE");
        assert_eq!(json["referenced_issues"], 1);
    }
}
