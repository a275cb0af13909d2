//! Configuration loading and discovery.
//!
//! This module provides configuration file discovery by:
//! 1. Walking up from the current directory to find project config
//! 2. Loading user config from XDG config directory
//! 3. Merging with sensible defaults
//!
//! # Supported formats
//!
//! The following configuration file formats are supported:
//! - TOML (`.toml`)
//! - YAML (`.yaml`, `.yml`)
//! - JSON (`.json`)
//!
//! # Config file locations (in order of precedence, highest first):
//! - `.rela.<ext>` in current directory or any parent
//! - `rela.<ext>` in current directory or any parent
//! - `~/.config/rela/config.<ext>` (user config)
//!
//! Where `<ext>` is one of: `toml`, `yaml`, `yml`, `json`
//!
//! # Example
//! ```no_run
//! use camino::Utf8PathBuf;
//! use rela_core::config::{Config, ConfigLoader};
//!
//! let cwd = std::env::current_dir().unwrap();
//! let cwd = Utf8PathBuf::try_from(cwd).expect("current directory is not valid UTF-8");
//! let config = ConfigLoader::new()
//!     .with_project_search(&cwd)
//!     .load()
//!     .unwrap();
//! println!("tag prefix: {}", config.product.tag_prefix);
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use figment::Figment;
use figment::providers::{Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::issue_ids::IdRange;
use crate::release::TagScheme;

/// The configuration for rela.
///
/// Deserialized from config files found during discovery (TOML, YAML, or JSON).
/// Every section has defaults for analyzing Firefox releases; override the
/// `product` and `issues` sections to analyze another product.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Log level for the application (e.g., "debug", "info", "warn", "error").
    pub log_level: LogLevel,
    /// Directory for JSONL log files (falls back to platform defaults if unset).
    pub log_dir: Option<Utf8PathBuf>,
    /// Product naming and history settings.
    pub product: ProductConfig,
    /// Issue extraction and tracker settings.
    pub issues: IssuesConfig,
    /// Report prompt and generator settings.
    pub report: ReportConfig,
}

/// Product naming and history settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProductConfig {
    /// Display name used in the report prompt.
    pub name: String,
    /// Release tag prefix (`FIREFOX` for `FIREFOX_131_0_RELEASE`).
    pub tag_prefix: String,
    /// Commit link template; `{hash}` is replaced with the full hash.
    pub commit_url: Option<String>,
    /// History window, in months, used when no previous release tag exists.
    pub fallback_months: u32,
}

impl Default for ProductConfig {
    fn default() -> Self {
        Self {
            name: "Firefox".into(),
            tag_prefix: "FIREFOX".into(),
            commit_url: Some("https://github.com/mozilla-firefox/firefox/commit/{hash}".into()),
            fallback_months: 6,
        }
    }
}

impl ProductConfig {
    /// The tag naming scheme for this product.
    pub fn tag_scheme(&self) -> TagScheme {
        TagScheme::new(self.tag_prefix.clone())
    }
}

/// Issue extraction and tracker settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct IssuesConfig {
    /// Smallest plausible issue id.
    pub min_id: u64,
    /// Largest plausible issue id.
    pub max_id: u64,
    /// Number of prioritized issues included in the report prompt.
    pub include_count: usize,
    /// Maximum characters of each issue's text in the prompt.
    pub max_text_chars: usize,
    /// Tracker-to-markdown converter executable.
    pub converter: String,
    /// Issue ids per converter invocation.
    pub batch_size: usize,
    /// Line prefix that starts each issue section in converter output.
    pub section_header: String,
    /// Issue link template; `{id}` is replaced with the issue id.
    pub tracker_url: Option<String>,
    /// REST search endpoint for milestone lookups (disabled when unset).
    pub search_url: Option<String>,
    /// Milestone values to search; `{version}` is replaced with the version.
    pub milestone_formats: Vec<String>,
}

impl Default for IssuesConfig {
    fn default() -> Self {
        let range = IdRange::default();
        Self {
            min_id: range.min,
            max_id: range.max,
            include_count: 15,
            max_text_chars: 2000,
            converter: "bmo-to-md".into(),
            batch_size: 50,
            section_header: "# Bug ".into(),
            tracker_url: Some("https://bugzilla.mozilla.org/show_bug.cgi?id={id}".into()),
            search_url: Some("https://bugzilla.mozilla.org/rest/bug".into()),
            milestone_formats: vec![
                "firefox{version}".into(),
                "Firefox {version}".into(),
                "{version}".into(),
                "mozilla{version}".into(),
            ],
        }
    }
}

impl IssuesConfig {
    /// The plausible identifier range.
    pub const fn id_range(&self) -> IdRange {
        IdRange::new(self.min_id, self.max_id)
    }
}

/// Report prompt and generator settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReportConfig {
    /// Maximum prompt length in characters before truncation.
    pub char_budget: usize,
    /// Number of largest changes listed in the prompt.
    pub significant_changes: usize,
    /// Number of top-level components listed in the prompt.
    pub top_components: usize,
    /// Number of file extensions listed in the prompt.
    pub top_extensions: usize,
    /// Text-generation model identifier.
    pub model: String,
    /// Maximum tokens in the generated report.
    pub max_tokens: u32,
    /// Messages endpoint of the text-generation service.
    pub api_url: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            char_budget: 150_000,
            significant_changes: 15,
            top_components: 10,
            top_extensions: 8,
            model: "claude-sonnet-4-20250514".into(),
            max_tokens: 4000,
            api_url: "https://api.anthropic.com/v1/messages".into(),
        }
    }
}

impl Config {
    /// Reject settings that would make the analysis meaningless.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.product.tag_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid("product.tag_prefix must not be empty".into()));
        }
        if self.issues.min_id > self.issues.max_id {
            return Err(ConfigError::Invalid(format!(
                "issues.min_id ({}) is greater than issues.max_id ({})",
                self.issues.min_id, self.issues.max_id
            )));
        }
        if self.report.char_budget == 0 {
            return Err(ConfigError::Invalid("report.char_budget must be positive".into()));
        }
        Ok(())
    }
}

/// Log level configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose output for debugging and development.
    Debug,
    /// Standard operational information (default).
    #[default]
    Info,
    /// Warnings about potential issues.
    Warn,
    /// Errors that indicate failures.
    Error,
}

impl LogLevel {
    /// Returns the log level as a lowercase string slice.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Supported configuration file extensions (in order of preference).
const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];

/// Application name for XDG directory lookup and config file names.
const APP_NAME: &str = "rela";

/// Builder for loading configuration from multiple sources.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Starting directory for project config search.
    project_search_root: Option<Utf8PathBuf>,
    /// Whether to include user config from XDG directory.
    include_user_config: bool,
    /// Stop searching when we hit a directory containing this file/dir.
    boundary_marker: Option<String>,
    /// Explicit config files to load (for testing or programmatic use).
    explicit_files: Vec<Utf8PathBuf>,
}

impl ConfigLoader {
    /// Create a new config loader with default settings.
    pub fn new() -> Self {
        Self {
            project_search_root: None,
            include_user_config: true,
            boundary_marker: Some(".git".to_string()),
            explicit_files: Vec::new(),
        }
    }

    /// Set the starting directory for project config search.
    ///
    /// The loader will walk up from this directory looking for config files.
    pub fn with_project_search<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.project_search_root = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set whether to include user config from `~/.config/rela/`.
    pub const fn with_user_config(mut self, include: bool) -> Self {
        self.include_user_config = include;
        self
    }

    /// Set a boundary marker to stop directory traversal.
    ///
    /// When walking up directories, stop if we find a directory containing
    /// this file or directory name. Default is `.git`.
    pub fn with_boundary_marker<S: Into<String>>(mut self, marker: S) -> Self {
        self.boundary_marker = Some(marker.into());
        self
    }

    /// Disable boundary marker (search all the way to filesystem root).
    pub fn without_boundary_marker(mut self) -> Self {
        self.boundary_marker = None;
        self
    }

    /// Add an explicit config file to load.
    ///
    /// Files are loaded in order, with later files taking precedence.
    /// Explicit files are loaded after discovered files.
    pub fn with_file<P: AsRef<Utf8Path>>(mut self, path: P) -> Self {
        self.explicit_files.push(path.as_ref().to_path_buf());
        self
    }

    /// Load configuration, merging all discovered sources.
    ///
    /// Precedence (highest to lowest):
    /// 1. Explicit files (in order added via `with_file`)
    /// 2. Project config (closest to search root)
    /// 3. User config (`~/.config/rela/config.<ext>`)
    /// 4. Default values
    #[tracing::instrument(skip(self), fields(search_root = ?self.project_search_root))]
    pub fn load(self) -> ConfigResult<Config> {
        tracing::debug!("loading configuration");
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Start with user config (lowest precedence of file sources)
        if self.include_user_config
            && let Some(user_config) = self.find_user_config()
        {
            figment = Self::merge_file(figment, &user_config);
        }

        // Add project config
        if let Some(ref root) = self.project_search_root
            && let Some(project_config) = self.find_project_config(root)
        {
            figment = Self::merge_file(figment, &project_config);
        }

        // Add explicit files (highest precedence)
        for file in &self.explicit_files {
            figment = Self::merge_file(figment, file);
        }

        let config: Config = figment
            .extract()
            .map_err(|e| ConfigError::Deserialize(Box::new(e)))?;
        config.validate()?;
        tracing::info!(
            log_level = config.log_level.as_str(),
            tag_prefix = %config.product.tag_prefix,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Find project config by walking up from the given directory.
    fn find_project_config(&self, start: &Utf8Path) -> Option<Utf8PathBuf> {
        let mut current = Some(start.to_path_buf());

        while let Some(dir) = current {
            // Check for config files in this directory (try each extension)
            for ext in CONFIG_EXTENSIONS {
                // Try dotfile first (.rela.toml)
                let dotfile = dir.join(format!(".{APP_NAME}.{ext}"));
                if dotfile.is_file() {
                    return Some(dotfile);
                }

                // Then try regular name (rela.toml)
                let regular = dir.join(format!("{APP_NAME}.{ext}"));
                if regular.is_file() {
                    return Some(regular);
                }
            }

            // The directory holding the marker is the last one searched
            if let Some(ref marker) = self.boundary_marker
                && dir.join(marker).exists()
            {
                break;
            }

            current = dir.parent().map(Utf8Path::to_path_buf);
        }

        None
    }

    /// Find user config in XDG config directory.
    fn find_user_config(&self) -> Option<Utf8PathBuf> {
        let proj_dirs = directories::ProjectDirs::from("", "", APP_NAME)?;
        let config_dir = proj_dirs.config_dir();

        // Try each supported extension
        for ext in CONFIG_EXTENSIONS {
            let config_path = config_dir.join(format!("config.{ext}"));
            if config_path.is_file() {
                return Utf8PathBuf::from_path_buf(config_path).ok();
            }
        }

        None
    }

    /// Merge a config file into the figment, detecting format from extension.
    fn merge_file(figment: Figment, path: &Utf8Path) -> Figment {
        match path.extension() {
            Some("toml") => figment.merge(Toml::file_exact(path.as_str())),
            Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path.as_str())),
            Some("json") => figment.merge(Json::file_exact(path.as_str())),
            _ => figment.merge(Toml::file_exact(path.as_str())),
        }
    }
}

/// Find the project config file path without loading it.
///
/// Useful for commands that need to know where config is located.
pub fn find_project_config<P: AsRef<Utf8Path>>(start: P) -> Option<Utf8PathBuf> {
    ConfigLoader::new()
        .with_project_search(start.as_ref())
        .without_boundary_marker()
        .find_project_config(start.as_ref())
}

/// Get the project directories for XDG-compliant path resolution.
///
/// Returns `None` if the home directory cannot be determined.
fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("", "", APP_NAME)
}

/// Get the user config directory path.
///
/// Returns `~/.config/rela/` on Linux, `~/Library/Application Support/rela/`
/// on macOS, and equivalent on other platforms.
pub fn user_config_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(proj_dirs.config_dir().to_path_buf()).ok()
}

/// Get the user cache directory path.
///
/// Returns `~/.cache/rela/` on Linux, `~/Library/Caches/rela/`
/// on macOS, and equivalent on other platforms.
pub fn user_cache_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(proj_dirs.cache_dir().to_path_buf()).ok()
}

/// Get the user data directory path.
///
/// Returns `~/.local/share/rela/` on Linux, `~/Library/Application Support/rela/`
/// on macOS, and equivalent on other platforms.
pub fn user_data_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(proj_dirs.data_dir().to_path_buf()).ok()
}

/// Get the local data directory path (machine-specific, not synced).
///
/// Returns `~/.local/share/rela/` on Linux, `~/Library/Application Support/rela/`
/// on macOS, and equivalent on other platforms.
pub fn user_data_local_dir() -> Option<Utf8PathBuf> {
    let proj_dirs = project_dirs()?;
    Utf8PathBuf::from_path_buf(proj_dirs.data_local_dir().to_path_buf()).ok()
}
