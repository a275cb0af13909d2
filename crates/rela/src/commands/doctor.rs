//! Doctor command: diagnose configuration, tools and environment.

use clap::Args;
use indicatif::ProgressBar;
use inquire::Confirm;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use rela_core::config::{self, Config};
use rela_core::git;
use rela_core::tracker::{ConverterTracker, TRACKER_KEY_ENV};

/// Arguments for the `doctor` subcommand.
#[derive(Args, Debug, Default)]
pub struct DoctorArgs {
    // No subcommand-specific arguments; uses global --json flag
}

#[derive(Serialize)]
struct DoctorReport {
    directories: DirectoryPaths,
    config: ConfigStatus,
    tools: ToolStatus,
    environment: EnvironmentInfo,
}

#[derive(Serialize)]
struct DirectoryPaths {
    config: Option<String>,
    cache: Option<String>,
    data: Option<String>,
    data_local: Option<String>,
}

#[derive(Serialize)]
struct ConfigStatus {
    /// Path to the discovered project config file, if any
    file: Option<String>,
    /// Whether a config file was found
    found: bool,
}

#[derive(Serialize)]
struct ToolStatus {
    /// Whether the working directory is inside a git repository
    git_repository: bool,
    /// Configured issue converter
    converter: String,
    /// Whether the converter was found
    converter_found: bool,
    /// Remote URL of `origin`, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    remote: Option<String>,
}

#[derive(Serialize)]
struct EnvironmentInfo {
    /// Current working directory
    cwd: Option<String>,
    /// Relevant environment variables
    env_vars: Vec<EnvVar>,
}

#[derive(Serialize)]
struct EnvVar {
    name: &'static str,
    /// Displayed value; secrets are reported only as set/unset
    value: Option<String>,
    description: &'static str,
}

const SECRET_VARS: &[(&str, &str)] = &[
    ("CLAUDE_API_KEY", "API key for report generation"),
    (TRACKER_KEY_ENV, "Tracker API key used by the converter"),
];

const PLAIN_VARS: &[(&str, &str)] = &[
    ("XDG_CONFIG_HOME", "Override config directory"),
    ("XDG_CACHE_HOME", "Override cache directory"),
    ("XDG_DATA_HOME", "Override data directory"),
    ("RUST_LOG", "Log filter directive"),
    ("RELA_LOG_PATH", "Explicit log file path"),
    ("RELA_LOG_DIR", "Log directory"),
];

impl DoctorReport {
    fn gather(config: &Config, cwd: &camino::Utf8Path) -> Self {
        let config_file = config::find_project_config(cwd);
        let converter_found = ConverterTracker::new(&config.issues)
            .map(|tracker| tracker.converter_available())
            .unwrap_or(false);
        let git_repository = git::is_inside_repo().unwrap_or(false);
        let remote = if git_repository {
            git::remote_url("origin").ok().flatten()
        } else {
            None
        };

        let secrets = SECRET_VARS.iter().map(|&(name, description)| EnvVar {
            name,
            value: std::env::var(name)
                .ok()
                .filter(|v| !v.is_empty())
                .map(|_| "(set)".to_string()),
            description,
        });
        let plain = PLAIN_VARS.iter().map(|&(name, description)| EnvVar {
            name,
            value: std::env::var(name).ok(),
            description,
        });

        Self {
            directories: DirectoryPaths {
                config: config::user_config_dir().map(|p| p.to_string()),
                cache: config::user_cache_dir().map(|p| p.to_string()),
                data: config::user_data_dir().map(|p| p.to_string()),
                data_local: config::user_data_local_dir().map(|p| p.to_string()),
            },
            config: ConfigStatus {
                found: config_file.is_some(),
                file: config_file.map(|p| p.to_string()),
            },
            tools: ToolStatus {
                git_repository,
                converter: config.issues.converter.clone(),
                converter_found,
                remote,
            },
            environment: EnvironmentInfo {
                cwd: Some(cwd.to_string()),
                env_vars: secrets.chain(plain).collect(),
            },
        }
    }

    fn api_key_set(&self) -> bool {
        self.environment
            .env_vars
            .iter()
            .any(|v| v.name == "CLAUDE_API_KEY" && v.value.is_some())
    }
}

/// Run diagnostics and report configuration status.
///
/// # Arguments
/// * `global_json` - Global `--json` flag from CLI
/// * `config` - Loaded configuration
/// * `cwd` - Current working directory
#[instrument(name = "cmd_doctor", skip_all, fields(json_output))]
pub fn cmd_doctor(
    _args: DoctorArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing doctor command");

    let spinner: ProgressBar = super::spinner("Gathering diagnostics...", global_json);
    let report = DoctorReport::gather(config, cwd);
    spinner.finish_and_clear();

    if global_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "Configuration".bold().underline());
    if report.config.found {
        println!(
            "  {} Config file: {}",
            "✓".green(),
            report.config.file.as_deref().unwrap_or("").cyan()
        );
    } else {
        println!("  {} No config file found", "○".yellow());
        offer_config_creation()?;
    }
    println!();

    println!("{}", "Tools".bold().underline());
    print_check(
        report.tools.git_repository,
        "Git repository",
        report.tools.remote.as_deref().unwrap_or("not inside a repository"),
    );
    print_check(
        report.tools.converter_found,
        "Issue converter",
        &report.tools.converter,
    );
    print_check(
        report.api_key_set(),
        "Report API key",
        if report.api_key_set() {
            "CLAUDE_API_KEY set"
        } else {
            "CLAUDE_API_KEY unset (use --prompt-only)"
        },
    );
    println!();

    println!("{}", "Directories".bold().underline());
    print_dir("  Config", report.directories.config.as_deref());
    print_dir("  Cache", report.directories.cache.as_deref());
    print_dir("  Data", report.directories.data.as_deref());
    print_dir("  Data (local)", report.directories.data_local.as_deref());
    println!();

    println!("{}", "Environment".bold().underline());
    println!("  {}: {}", "Working directory".dimmed(), cwd.cyan());

    let set_vars: Vec<_> = report
        .environment
        .env_vars
        .iter()
        .filter(|v| v.value.is_some())
        .collect();

    if set_vars.is_empty() {
        println!("  {} No overrides set", "○".dimmed());
    } else {
        for var in set_vars {
            println!(
                "  {}: {}",
                var.name.dimmed(),
                var.value.as_deref().unwrap_or("").cyan()
            );
        }
    }

    Ok(())
}

fn print_check(ok: bool, label: &str, detail: &str) {
    let icon = if ok {
        "✓".green().to_string()
    } else {
        "✗".red().to_string()
    };
    println!("  {icon} {}: {}", label.bold(), detail.dimmed());
}

fn print_dir(label: &str, path: Option<&str>) {
    print!("{}: ", label.dimmed());
    match path {
        Some(p) => println!("{}", p.cyan()),
        None => println!("{}", "(unavailable)".yellow()),
    }
}

/// Offer to create a default config file when none exists.
fn offer_config_creation() -> anyhow::Result<()> {
    let Some(config_dir) = config::user_config_dir() else {
        return Ok(());
    };

    let config_path = config_dir.join("config.yaml");

    // Don't prompt if running non-interactively
    if !std::io::IsTerminal::is_terminal(&std::io::stdin()) || config_path.exists() {
        return Ok(());
    }

    let create = Confirm::new("Create a default config file?")
        .with_default(false)
        .with_help_message(&format!("Will create {config_path}"))
        .prompt();

    if let Ok(true) = create {
        std::fs::create_dir_all(&config_dir)?;
        let yaml = serde_saphyr::to_string(&Config::default())?;
        std::fs::write(&config_path, yaml)?;
        println!("  {} Created {}", "✓".green(), config_path.cyan());
    }

    Ok(())
}
