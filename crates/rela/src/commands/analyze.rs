//! Analyze command: resolve a release, gather its evidence and write a report.

use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::Args;
use inquire::Confirm;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use rela_core::analyze::{self, ReleaseEvidence};
use rela_core::config::Config;
use rela_core::git::GitHistory;
use rela_core::prompt::Prompt;
use rela_core::report::AnthropicClient;
use rela_core::tracker::{ConverterTracker, IssueSource, NoIssues, TRACKER_KEY_ENV};

/// Arguments for the `analyze` subcommand.
#[derive(Args, Debug, Default)]
pub struct AnalyzeArgs {
    /// Release version to analyze (e.g. 131.0, 128.0.3)
    pub version: String,

    /// API key for report generation
    #[arg(long, env = "CLAUDE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Issue converter executable (overrides config)
    #[arg(long, value_name = "PROGRAM")]
    pub converter: Option<String>,

    /// Write the report to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Overwrite FILE without asking
    #[arg(long)]
    pub force: bool,

    /// Print the composed prompt instead of generating a report
    #[arg(long)]
    pub prompt_only: bool,

    /// Skip issue lookup entirely
    #[arg(long)]
    pub no_issues: bool,
}

#[derive(Serialize)]
struct AnalyzeOutcome<'a> {
    version: &'a str,
    range: String,
    changes: usize,
    contributors: usize,
    issues_fetched: usize,
    issues_included: usize,
    prompt_truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    prompt: Option<&'a str>,
}

/// Execute the analyze command.
#[instrument(name = "cmd_analyze", skip_all, fields(version = %args.version))]
pub fn cmd_analyze(args: AnalyzeArgs, global_json: bool, config: &Config) -> anyhow::Result<()> {
    debug!(
        prompt_only = args.prompt_only,
        no_issues = args.no_issues,
        "executing analyze command"
    );

    let api_key = match (args.prompt_only, args.api_key.as_deref()) {
        (true, _) => None,
        (false, Some(key)) if !key.trim().is_empty() => Some(key.to_string()),
        (false, _) => bail!(
            "no API key for report generation; set CLAUDE_API_KEY, pass --api-key, \
             or use --prompt-only"
        ),
    };

    let tracker = issue_source(&args, config)?;

    let spinner = super::spinner(
        &format!("Gathering evidence for {}...", args.version),
        global_json,
    );
    let evidence = analyze::gather_evidence(&args.version, config, &GitHistory, tracker.as_ref());
    spinner.finish_and_clear();
    let evidence = evidence.context("failed to gather release evidence")?;

    if !global_json {
        print_evidence_summary(&evidence);
    }

    let prompt = analyze::compose_prompt(&evidence, config);

    let report = match api_key {
        Some(key) => {
            let client = AnthropicClient::new(key, &config.report)
                .context("failed to build report client")?;
            let spinner = super::spinner(
                &format!("Generating report with {}...", client.model()),
                global_json,
            );
            let report = analyze::generate_report(&prompt, &client);
            spinner.finish_and_clear();
            Some(report.context("failed to generate report")?)
        }
        None => None,
    };

    let body = report.as_deref().unwrap_or(&prompt.text);
    let written = match args.output {
        Some(ref path) => write_output(path, body, args.force)?,
        None => None,
    };

    if global_json {
        let inline = args.output.is_none();
        let outcome = outcome(&evidence, &prompt, report.as_deref(), written.as_deref(), inline);
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else if let Some(ref path) = written {
        eprintln!("{} Wrote {}", "✓".green(), path.cyan());
    } else if args.output.is_none() {
        println!("{body}");
    }

    Ok(())
}

fn issue_source(args: &AnalyzeArgs, config: &Config) -> anyhow::Result<Box<dyn IssueSource>> {
    if args.no_issues {
        return Ok(Box::new(NoIssues));
    }

    let mut tracker =
        ConverterTracker::new(&config.issues).context("failed to build issue tracker client")?;
    if let Some(ref converter) = args.converter {
        tracker = tracker.with_converter(converter.clone());
    }

    if !tracker.converter_available() {
        warn!(
            converter = args.converter.as_deref().unwrap_or(&config.issues.converter),
            "issue converter not found; continuing without issue details"
        );
        return Ok(Box::new(NoIssues));
    }

    if !tracker_key_present(std::env::var_os(TRACKER_KEY_ENV)) {
        warn!(
            env = TRACKER_KEY_ENV,
            "tracker API key not set; the converter will use anonymous access \
             and restricted issues will be missing"
        );
    }

    Ok(Box::new(tracker))
}

fn tracker_key_present(value: Option<OsString>) -> bool {
    value.is_some_and(|v| !v.to_string_lossy().trim().is_empty())
}

fn outcome<'a>(
    evidence: &'a ReleaseEvidence,
    prompt: &'a Prompt,
    report: Option<&'a str>,
    written: Option<&str>,
    inline: bool,
) -> AnalyzeOutcome<'a> {
    AnalyzeOutcome {
        version: &evidence.version,
        range: evidence.boundary.to_string(),
        changes: evidence.stats.total_changes,
        contributors: evidence.stats.contributor_count,
        issues_fetched: evidence.issues.len(),
        issues_included: prompt.issues_included,
        prompt_truncated: prompt.truncated,
        output: written.map(str::to_string),
        report: report.filter(|_| inline),
        prompt: report.is_none().then_some(prompt.text.as_str()).filter(|_| inline),
    }
}

fn print_evidence_summary(evidence: &ReleaseEvidence) {
    eprintln!(
        "{} {} {}",
        "Release".bold(),
        evidence.version.green().bold(),
        format!("({})", evidence.boundary).dimmed(),
    );
    eprintln!(
        "  {}: {} | {}: {} | {}: +{}/-{}",
        "Changes".dimmed(),
        evidence.stats.total_changes,
        "Contributors".dimmed(),
        evidence.stats.contributor_count,
        "Lines".dimmed(),
        evidence.stats.total_insertions,
        evidence.stats.total_deletions,
    );
    eprintln!(
        "  {}: {} referenced, {} by milestone, {} fetched",
        "Issues".dimmed(),
        evidence.referenced_issues.len(),
        evidence.milestone_issues.len(),
        evidence.issues.len(),
    );
}

/// Write `body` to `path`, asking before replacing an existing file.
///
/// Returns the written path, or `None` when the user declined.
fn write_output(path: &Path, body: &str, force: bool) -> anyhow::Result<Option<String>> {
    if path.exists() && !force {
        if !std::io::stdin().is_terminal() {
            bail!("{} already exists; pass --force to overwrite", path.display());
        }
        let overwrite = Confirm::new(&format!("Overwrite {}?", path.display()))
            .with_default(false)
            .prompt()
            .context("confirmation prompt failed")?;
        if !overwrite {
            eprintln!("{}", "Not written.".yellow());
            return Ok(None);
        }
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, body).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(Some(path.display().to_string()))
}
