//! Report prompt composition.
//!
//! Turns release evidence into the single text prompt handed to the report
//! generator: an overview of the change statistics, the most significant
//! changes, and the highest-priority issues, followed by report
//! instructions. The finished prompt is held to a character budget.

use std::fmt::Write as _;

use serde::Serialize;

use crate::changelog::ChangeRecord;
use crate::config::Config;
use crate::issues::{self, IssueTextRecord};
use crate::stats::{self, ChangeStats};

/// Appended when the whole prompt exceeds its budget.
pub const TRUNCATION_MARKER: &str = "\n\n(Note: Analysis truncated due to length limits)";

/// Appended to an issue whose text was clipped.
pub const ISSUE_CLIP_MARKER: &str = "\n...(truncated)";

const SUMMARY_CHARS: usize = 120;

/// A composed prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    /// Prompt text, within budget.
    pub text: String,
    /// Whether the text was cut to fit the budget.
    pub truncated: bool,
    /// Number of issues written into the prompt.
    pub issues_included: usize,
}

/// Builds report prompts from explicit settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptBuilder {
    product: String,
    commit_url: Option<String>,
    tracker_url: Option<String>,
    include_issues: usize,
    max_issue_chars: usize,
    significant_changes: usize,
    top_components: usize,
    top_extensions: usize,
    char_budget: usize,
}

impl PromptBuilder {
    /// Build from loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            product: config.product.name.clone(),
            commit_url: config.product.commit_url.clone(),
            tracker_url: config.issues.tracker_url.clone(),
            include_issues: config.issues.include_count,
            max_issue_chars: config.issues.max_text_chars,
            significant_changes: config.report.significant_changes,
            top_components: config.report.top_components,
            top_extensions: config.report.top_extensions,
            char_budget: config.report.char_budget,
        }
    }

    /// Override the character budget.
    pub const fn with_char_budget(mut self, char_budget: usize) -> Self {
        self.char_budget = char_budget;
        self
    }

    /// Override how many prioritized issues are included.
    pub const fn with_issue_count(mut self, count: usize) -> Self {
        self.include_issues = count;
        self
    }

    /// Compose the prompt.
    ///
    /// `issues` must already be prioritized; the first `include_issues` are
    /// written out and the rest are only counted.
    pub fn build(
        &self,
        version: &str,
        stats: &ChangeStats,
        changes: &[ChangeRecord],
        issues: &[IssueTextRecord],
    ) -> Prompt {
        let mut out = String::new();
        let product = &self.product;

        let _ = write!(
            out,
            "I need you to analyze {product} {version} release and provide a comprehensive \
             summary of what was included in this release.\n\n\
             ## Release Overview\n\
             {product} Version: {version}\n\
             Total Commits: {}\n\
             Total Bug Fixes: {}\n\
             Contributors: {}\n\
             Files Changed: {}\n\
             Code Changes: +{}/-{} lines\n\n",
            stats.total_changes,
            issues.len(),
            stats.contributor_count,
            stats.total_files_touched,
            stats.total_insertions,
            stats.total_deletions,
        );

        out.push_str("## Top Components (by commit activity):\n");
        for (component, count) in stats.top_components(self.top_components) {
            let _ = writeln!(out, "- {component}: {count} files modified");
        }

        out.push_str("\n## File Type Distribution:\n");
        for (ext, count) in stats.top_extensions(self.top_extensions) {
            let _ = writeln!(out, "- .{ext}: {count} files");
        }

        out.push_str("\n## Significant Commits:\n");
        for change in stats::significant_changes(changes, self.significant_changes) {
            let summary = issues::clip(&change.summary, SUMMARY_CHARS, "...");
            let label = change.short_hash();
            match self.commit_url {
                Some(ref template) => {
                    let url = template.replace("{hash}", &change.hash);
                    let _ = write!(out, "- [{label}]({url}): {summary} ");
                }
                None => {
                    let _ = write!(out, "- {label}: {summary} ");
                }
            }
            let _ = writeln!(out, "({} lines changed)", change.churn());
        }

        out.push_str("\n## Detailed Bug Information (Markdown Format):\n\n");
        let included = issues.len().min(self.include_issues);
        for issue in &issues[..included] {
            let text = issues::clip(&issue.text, self.max_issue_chars, ISSUE_CLIP_MARKER);
            if let Some(ref template) = self.tracker_url {
                let url = template.replace("{id}", &issue.id.to_string());
                if !text.contains(&url) {
                    let _ = write!(out, "**[View on tracker]({url})**\n\n");
                }
            }
            let _ = write!(out, "{text}\n\n---\n\n");
        }

        let omitted = issues.len() - included;
        if omitted > 0 {
            let _ = write!(
                out,
                "(Note: {omitted} additional bugs were fixed but not included above due to \
                 length constraints)\n\n"
            );
        }

        out.push_str(&self.instructions());

        let (text, truncated) = fit_budget(out, self.char_budget);
        Prompt {
            text,
            truncated,
            issues_included: included,
        }
    }

    fn instructions(&self) -> String {
        let product = &self.product;
        let bug_link = self.tracker_url.as_ref().map_or_else(
            || "Bug 1234567".to_string(),
            |t| format!("[Bug 1234567]({})", t.replace("{id}", "1234567")),
        );
        let commit_link = self.commit_url.as_ref().map_or_else(
            || "abcd1234".to_string(),
            |t| format!("[abcd1234]({})", t.replace("{hash}", "abcd1234567890...")),
        );

        format!(
            "\nPlease provide a comprehensive {product} release analysis including:\n\n\
             1. **Executive Summary**: What {product} users can expect from this release - highlight the most impactful changes\n\
             2. **Major Features and Improvements**: Key new functionality or enhancements based on the bug fixes and commits\n\
             3. **Security and Stability**: Critical bug fixes, security improvements, crash fixes - reference specific bugs where relevant with links\n\
             4. **Performance**: Changes that impact performance, memory usage, startup time, etc.\n\
             5. **Web Platform**: New web standards support, API changes, developer features\n\
             6. **User Interface**: UI/UX improvements and changes\n\
             7. **Developer Tools**: Updates to developer tooling\n\
             8. **Platform Support**: Changes for different operating systems (Windows, macOS, Linux, mobile)\n\
             9. **Under the Hood**: Technical improvements, refactoring, code quality improvements\n\
             10. **Notable Bug Fixes**: Highlight particularly important or long-standing issues that were resolved\n\n\
             IMPORTANT FORMATTING REQUIREMENTS:\n\
             - When referencing bugs, use this format: {bug_link}\n\
             - When referencing commits, use this format: {commit_link}\n\
             - Include clickable links for all bug and commit references\n\
             - Use markdown formatting throughout\n\n\
             Focus on translating technical changes into user-facing benefits. Use the detailed bug \
             information provided to give specific examples and context.\n\n\
             Group related changes together and explain the broader themes or initiatives they \
             represent. If you see patterns suggesting major feature work, security initiatives, or \
             technical improvements, call those out specifically.\n"
        )
    }
}

/// Cut `text` to `budget` characters and append [`TRUNCATION_MARKER`] if it
/// was longer.
pub fn fit_budget(text: String, budget: usize) -> (String, bool) {
    match text.char_indices().nth(budget) {
        Some((idx, _)) => {
            let mut cut = text;
            cut.truncate(idx);
            cut.push_str(TRUNCATION_MARKER);
            (cut, true)
        }
        None => (text, false),
    }
}
