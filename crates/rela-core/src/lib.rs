//! Core library for rela.
//!
//! This crate provides the types and functionality behind the `rela` CLI:
//! turning a product version into a release range, reading what changed in
//! it, and preparing a release report.
//!
//! # Modules
//!
//! - [`analyze`] - Orchestrates a full release analysis
//! - [`changelog`] - Change log parsing into change records
//! - [`config`] - Configuration loading and management
//! - [`error`] - Configuration error types and result aliases
//! - [`git`] - Git operations (release tags, change logs)
//! - [`issue_ids`] - Issue reference extraction from free text
//! - [`issues`] - Issue text records, splitting and merging
//! - [`priority`] - Issue prioritization
//! - [`prompt`] - Report prompt composition
//! - [`release`] - Version to release-boundary resolution
//! - [`report`] - Report generation
//! - [`stats`] - Change statistics
//! - [`tracker`] - Issue tracker access
//!
//! # Quick Start
//!
//! ```no_run
//! use rela_core::analyze;
//! use rela_core::git::GitHistory;
//! use rela_core::tracker::NoIssues;
//! use rela_core::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .with_user_config(true)
//!     .load()
//!     .expect("Failed to load configuration");
//!
//! let evidence = analyze::gather_evidence("131.0", &config, &GitHistory, &NoIssues)
//!     .expect("release should resolve");
//! println!("{} changes", evidence.stats.total_changes);
//! ```
#![deny(unsafe_code)]

pub mod analyze;

pub mod changelog;

pub mod config;

pub mod error;

pub mod git;

pub mod issue_ids;

pub mod issues;

pub mod priority;

pub mod prompt;

pub mod release;

pub mod report;

pub mod stats;

pub mod tracker;

pub use config::{Config, ConfigLoader, LogLevel};

pub use error::{ConfigError, ConfigResult};
