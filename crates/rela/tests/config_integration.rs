//! Configuration integration tests.
//!
//! These tests verify config discovery, format parsing, and precedence
//! from an end-to-end perspective using the compiled binary. Each fixture
//! sets a distinct product name and `info --json` reports which one won.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Returns a Command configured to run our binary.
#[allow(deprecated)]
fn cmd() -> Command {
    Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap()
}

/// Run `info --json` from `dir` and return the parsed document.
fn info_json(dir: &Path) -> serde_json::Value {
    let output = cmd()
        .arg("-C")
        .arg(dir)
        .args(["info", "--json"])
        .assert()
        .success();
    serde_json::from_slice(&output.get_output().stdout).expect("info --json should be JSON")
}

fn product_in(dir: &Path) -> String {
    info_json(dir)["config"]["product"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}

fn toml_product(name: &str) -> String {
    format!("[product]\nname = \"{name}\"\n")
}

// =============================================================================
// Config File Discovery
// =============================================================================

#[test]
fn runs_without_config_file() {
    let tmp = TempDir::new().unwrap();
    assert_eq!(product_in(tmp.path()), "Firefox");
}

#[test]
fn discovers_dotfile_config_in_current_dir() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".rela.toml"), toml_product("Dotfile")).unwrap();
    assert_eq!(product_in(tmp.path()), "Dotfile");
}

#[test]
fn discovers_regular_config_in_current_dir() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("rela.toml"), toml_product("Regular")).unwrap();
    assert_eq!(product_in(tmp.path()), "Regular");
}

#[test]
fn discovers_config_in_parent_directory() {
    let tmp = TempDir::new().unwrap();
    let sub_dir = tmp.path().join("nested").join("deep");
    fs::create_dir_all(&sub_dir).unwrap();
    fs::write(tmp.path().join(".rela.toml"), toml_product("Parent")).unwrap();

    assert_eq!(product_in(&sub_dir), "Parent");
}

#[test]
fn dotfile_takes_precedence_over_regular_name() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".rela.toml"), toml_product("Dotfile")).unwrap();
    fs::write(tmp.path().join("rela.toml"), toml_product("Regular")).unwrap();

    assert_eq!(product_in(tmp.path()), "Dotfile");
}

#[test]
fn explicit_config_flag_overrides_discovery() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".rela.toml"), toml_product("Discovered")).unwrap();
    let explicit = tmp.path().join("explicit.toml");
    fs::write(&explicit, toml_product("Explicit")).unwrap();

    let output = cmd()
        .arg("-C")
        .arg(tmp.path())
        .arg("--config")
        .arg(&explicit)
        .args(["info", "--json"])
        .assert()
        .success();
    let json: serde_json::Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
    assert_eq!(json["config"]["product"], "Explicit");
}

// =============================================================================
// Config Format Parsing
// =============================================================================

#[test]
fn parses_toml_config() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".rela.toml"),
        "log_level = \"warn\"\n\n[product]\ntag_prefix = \"THUNDERBIRD\"\n",
    )
    .unwrap();

    let json = info_json(tmp.path());
    assert_eq!(json["config"]["log_level"], "warn");
    assert_eq!(json["config"]["tag_example"], "THUNDERBIRD_131_0_RELEASE");
}

#[test]
fn parses_yaml_config() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".rela.yaml"),
        "product:\n  name: Yaml\nreport:\n  model: test-model\n",
    )
    .unwrap();

    let json = info_json(tmp.path());
    assert_eq!(json["config"]["product"], "Yaml");
    assert_eq!(json["config"]["model"], "test-model");
}

#[test]
fn parses_yml_config() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".rela.yml"), "issues:\n  converter: my-converter\n").unwrap();

    assert_eq!(info_json(tmp.path())["config"]["converter"], "my-converter");
}

#[test]
fn parses_json_config() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".rela.json"),
        r#"{"report": {"char_budget": 5000}}"#,
    )
    .unwrap();

    assert_eq!(info_json(tmp.path())["config"]["char_budget"], 5000);
}

// =============================================================================
// Config Precedence
// =============================================================================

#[test]
fn closer_config_takes_precedence() {
    let tmp = TempDir::new().unwrap();
    let sub_dir = tmp.path().join("project");
    fs::create_dir_all(&sub_dir).unwrap();
    fs::write(tmp.path().join(".rela.toml"), toml_product("Parent")).unwrap();
    fs::write(sub_dir.join(".rela.toml"), toml_product("Child")).unwrap();

    assert_eq!(product_in(&sub_dir), "Child");
}

#[test]
fn toml_preferred_over_yaml_in_same_directory() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".rela.toml"), toml_product("Toml")).unwrap();
    fs::write(tmp.path().join(".rela.yaml"), "product:\n  name: Yaml\n").unwrap();

    assert_eq!(product_in(tmp.path()), "Toml");
}

// =============================================================================
// Error Cases
// =============================================================================

#[test]
fn invalid_toml_config_shows_error() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".rela.toml"), "this is not valid toml [[[").unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "info"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration"));
}

#[test]
fn invalid_yaml_config_shows_error() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".rela.yaml"),
        "invalid:\n  yaml\n content:\n[broken",
    )
    .unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "info"])
        .assert()
        .failure();
}

#[test]
fn invalid_json_config_shows_error() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".rela.json"), "{not valid json}").unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "info"])
        .assert()
        .failure();
}

#[test]
fn inverted_issue_range_is_rejected() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".rela.toml"),
        "[issues]\nmin_id = 500\nmax_id = 100\n",
    )
    .unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "info"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("min_id"));
}

#[test]
fn empty_tag_prefix_is_rejected() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".rela.toml"), "[product]\ntag_prefix = \"\"\n").unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "info"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("tag_prefix"));
}

#[test]
fn unknown_config_field_is_ignored() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".rela.toml"),
        r#"
unknown_field = "should be ignored"

[product]
name = "Known"
another_unknown = 42
"#,
    )
    .unwrap();

    assert_eq!(product_in(tmp.path()), "Known");
}

// =============================================================================
// Boundary Marker Tests
// =============================================================================

#[test]
fn git_boundary_stops_config_search() {
    let tmp = TempDir::new().unwrap();

    // parent/.rela.toml + parent/repo/.git/ + parent/repo/src/
    let parent = tmp.path().join("parent");
    let repo = parent.join("repo");
    let src = repo.join("src");
    fs::create_dir_all(&src).unwrap();
    fs::write(parent.join(".rela.toml"), toml_product("Outside")).unwrap();
    fs::create_dir(repo.join(".git")).unwrap();

    assert_eq!(product_in(&src), "Firefox");
}

#[test]
fn config_in_same_dir_as_git_is_found() {
    let tmp = TempDir::new().unwrap();
    let repo = tmp.path().join("repo");
    let src = repo.join("src");
    fs::create_dir_all(&src).unwrap();
    fs::create_dir(repo.join(".git")).unwrap();
    fs::write(repo.join(".rela.toml"), toml_product("Repo")).unwrap();

    assert_eq!(product_in(&src), "Repo");
}
