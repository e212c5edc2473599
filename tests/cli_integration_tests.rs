//! CLI integration tests
//!
//! Runs the `mycarbon-validate` binary with assert_cmd against generated workbooks.

#![allow(deprecated)] // Command::cargo_bin deprecation - no stable replacement yet

mod common;

use assert_cmd::Command;
use common::Fixture;
use predicates::prelude::*;
use std::fs;

fn cli(fx: &Fixture) -> Command {
    let mut cmd = Command::cargo_bin("mycarbon-validate").unwrap();
    cmd.env_remove("MYCARBON_CONFIG")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .arg("--client-data")
        .arg(&fx.client_data);
    cmd
}

// ═══════════════════════════════════════════════════════════════════════════
// HELP AND VERSION TESTS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("mycarbon-validate").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("mycarbon-validate"))
        .stdout(predicate::str::contains("COMMANDS"));
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("mycarbon-validate").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_validate_help_lists_error_kinds() {
    let mut cmd = Command::cargo_bin("mycarbon-validate").unwrap();
    cmd.args(["validate", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("blank_indicator"))
        .stdout(predicate::str::contains("--all"));
}

#[test]
fn test_all_conflicts_with_scope() {
    let fx = Fixture::new();
    cli(&fx)
        .arg("validate")
        .arg(&fx.upload)
        .args(["--all", "--scope", "Scope 1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

// ═══════════════════════════════════════════════════════════════════════════
// SCOPES
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_scopes_marks_default() {
    let fx = Fixture::new();
    cli(&fx)
        .arg("scopes")
        .assert()
        .success()
        .stdout(predicate::str::contains("Scope 1"))
        .stdout(predicate::str::contains("TestScope"))
        .stdout(predicate::str::contains("(default)"));
}

#[test]
fn test_scopes_without_reference_workbook() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("mycarbon-validate").unwrap();
    cmd.env_remove("MYCARBON_CONFIG")
        .env("NO_COLOR", "1")
        .arg("--client-data")
        .arg(dir.path())
        .arg("scopes")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Validations workbook not found"));
}

// ═══════════════════════════════════════════════════════════════════════════
// VALIDATE
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_validate_clean_workbook_succeeds() {
    let fx = Fixture::new();
    cli(&fx)
        .arg("validate")
        .arg(&fx.clean_upload)
        .assert()
        .success()
        .stdout(predicate::str::contains("Loaded 2 rows and 5 columns."))
        .stdout(predicate::str::contains("No validation errors found!"));
}

#[test]
fn test_validate_reports_counts_as_loaded() {
    let fx = Fixture::new();
    // TestScopeCalcs carries an `Extra` column no rule names
    cli(&fx)
        .arg("validate")
        .arg(&fx.upload)
        .assert()
        .failure()
        .stdout(predicate::str::contains("Loaded 3 rows and 6 columns."));
}

#[test]
fn test_validate_with_errors_exits_non_zero() {
    let fx = Fixture::new();
    cli(&fx)
        .arg("validate")
        .arg(&fx.upload)
        .assert()
        .failure()
        .stdout(predicate::str::contains("Scope: TestScope"))
        .stdout(predicate::str::contains("Required value is empty: 1 error(s) found"))
        .stdout(predicate::str::contains("1 invalid float error(s) found"))
        .stderr(predicate::str::contains("ValidationFailed(6)"));
}

#[test]
fn test_validate_plain_sheet_reports_missing_columns() {
    let fx = Fixture::new();
    cli(&fx)
        .arg("validate")
        .arg(&fx.upload)
        .args(["--scope", "Scope 1", "--table", ""])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Missing columns in"))
        .stdout(predicate::str::contains("Unit"));
}

#[test]
fn test_validate_missing_sheet() {
    let fx = Fixture::new();
    cli(&fx)
        .arg("validate")
        .arg(&fx.upload)
        .args(["--scope", "Scope 9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("SheetNotFound"));
}

#[test]
fn test_validate_missing_file() {
    let fx = Fixture::new();
    cli(&fx)
        .arg("validate")
        .arg(fx.output("nope.xlsx"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn test_validate_verbose_shows_rules_and_preview() {
    let fx = Fixture::new();
    cli(&fx)
        .arg("validate")
        .arg(&fx.clean_upload)
        .arg("--verbose")
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 10 rules, 2 messages"))
        .stdout(predicate::str::contains("Year | Amount | Count | Active | Notes"))
        .stdout(predicate::str::contains("2022 | 1.5 | 2 | True | fine"));
}

#[test]
fn test_validate_all_prints_progress() {
    let fx = Fixture::new();
    cli(&fx)
        .arg("validate")
        .arg(&fx.upload)
        .arg("--all")
        .assert()
        .failure()
        .stdout(predicate::str::contains("[1/4]"))
        .stdout(predicate::str::contains("[4/4]"))
        .stdout(predicate::str::contains("SHEET_NOT_FOUND"));
}

// ═══════════════════════════════════════════════════════════════════════════
// REPORTS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_validate_json_report() {
    let fx = Fixture::new();
    let out = fx.output("report.json");
    cli(&fx)
        .arg("validate")
        .arg(&fx.upload)
        .arg("--all")
        .arg("-o")
        .arg(&out)
        .assert()
        .failure();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(json["total_errors"], 11);
    assert_eq!(json["counts"]["sheet_not_found"], 1);
    assert_eq!(json["results"].as_array().unwrap().len(), 4);
    assert_eq!(json["results"][2]["table_name"], "Scope2Calcs");
}

#[test]
fn test_validate_html_report() {
    let fx = Fixture::new();
    let out = fx.output("validation_report.html");
    cli(&fx)
        .arg("validate")
        .arg(&fx.clean_upload)
        .arg("-o")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Report written to"));

    let html = fs::read_to_string(&out).unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<h3>TestScope (TestScopeCalcs)</h3>"));
    assert!(html.contains("No validation errors found!"));
}

#[test]
fn test_validate_xlsx_report() {
    let fx = Fixture::new();
    let out = fx.output("annotated.xlsx");
    cli(&fx)
        .arg("validate")
        .arg(&fx.upload)
        .arg("-o")
        .arg(&out)
        .assert()
        .failure();
    assert!(out.exists());
}

#[test]
fn test_validate_unknown_report_format() {
    let fx = Fixture::new();
    cli(&fx)
        .arg("validate")
        .arg(&fx.clean_upload)
        .arg("-o")
        .arg(fx.output("report.pdf"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported report format"));
}

// ═══════════════════════════════════════════════════════════════════════════
// CONFIG FILE
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_config_file_sets_client_data() {
    let fx = Fixture::new();
    let config = fx.output("mycarbon.yaml");
    fs::write(
        &config,
        format!(
            "client_data_path: {}\ndefault_scope: Scope 1\ndefault_table: \"\"\n",
            fx.client_data.display()
        ),
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("mycarbon-validate").unwrap();
    cmd.env_remove("MYCARBON_CLIENT_DATA")
        .env("NO_COLOR", "1")
        .arg("--config")
        .arg(&config)
        .arg("validate")
        .arg(&fx.upload)
        .assert()
        .failure()
        .stdout(predicate::str::contains("Scope: Scope 1"))
        .stdout(predicate::str::contains("Loaded 2 rows and 2 columns."));
}

#[test]
fn test_invalid_config_file() {
    let fx = Fixture::new();
    let config = fx.output("bad.yaml");
    fs::write(&config, "default_scope: \"  \"\n").unwrap();

    let mut cmd = Command::cargo_bin("mycarbon-validate").unwrap();
    cmd.env_remove("MYCARBON_CLIENT_DATA")
        .env("NO_COLOR", "1")
        .arg("--config")
        .arg(&config)
        .arg("scopes")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config"));
}
