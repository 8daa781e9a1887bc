//! CLI smoke tests for the query-inspect binary
//!
//! These run the built binary end to end: argument parsing, configuration
//! loading and the JSON printed for each subcommand.

use serde_json::Value;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

const CONFIG: &str = r#"
logging:
  default:
    console_level: "off"

query:
  default_limit: 5
  max_limit: 20

policies:
  products:
    searchable: [name]
    sortable: [price, createdAt]
    filterable: [brandId, price]
    columns:
      brandId: brand_id
      createdAt: created_at
    tiebreaker:
      field: id
"#;

/// Helper to run the query-inspect binary with given arguments
fn run_query_inspect(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_query-inspect"))
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("Failed to execute query-inspect")
}

fn write_config(dir: &TempDir, body: &str) -> String {
    let path = dir.path().join("query.yaml");
    std::fs::write(&path, body).expect("Failed to write config");
    path.to_string_lossy().to_string()
}

fn stdout_json(output: &Output) -> Value {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

#[test]
fn test_cli_help_command() {
    let output = run_query_inspect(&["--help"]);
    assert!(output.status.success(), "Help command should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"), "Should contain usage information");
    assert!(stdout.contains("normalize"));
    assert!(stdout.contains("encode"));
    assert!(stdout.contains("compile"));
    assert!(stdout.contains("--config"), "Should mention config option");
}

#[test]
fn test_cli_invalid_command() {
    let output = run_query_inspect(&["invalid-command"]);
    assert!(!output.status.success(), "Invalid command should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error"), "{}", stderr);
}

#[test]
fn test_normalize_query_string() {
    let output = run_query_inspect(&[
        "normalize",
        "page=0&limit=500&sortBy=price&sortOrder=asc&price[gte]=100&brandId=abc",
    ]);
    let json = stdout_json(&output);

    assert_eq!(json["page"], 1);
    assert_eq!(json["limit"], 100);
    assert_eq!(json["sortField"], "price");
    assert_eq!(json["sortDirection"], "ASC");
    assert_eq!(json["filters"]["brandId"], "abc");
    assert_eq!(json["filters"]["price"]["gte"], 100);
}

#[test]
fn test_normalize_json_body() {
    let output = run_query_inspect(&[
        "normalize",
        "--json",
        r#"{"searchTerm":"lamp","filters":{"price":{"operator":"lt","value":9}}}"#,
    ]);
    let json = stdout_json(&output);
    assert_eq!(json["searchTerm"], "lamp");
    assert_eq!(json["filters"]["price"]["lt"], 9);
}

#[test]
fn test_encode_is_canonical() {
    let output = run_query_inspect(&[
        "encode",
        r#"{"limit":20,"page":2,"filters":{"brandId":"abc"}}"#,
    ]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), "page=2&limit=20&sortOrder=DESC&brandId=abc");
}

#[test]
fn test_encode_rejects_non_json() {
    let output = run_query_inspect(&["encode", "page=2"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("JSON"), "{}", stderr);
}

#[test]
fn test_compile_against_configured_policy() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = write_config(&dir, CONFIG);

    let output = run_query_inspect(&[
        "--config",
        &config,
        "compile",
        "--policy",
        "products",
        "brandId=abc&price[gte]=100&secret=1&sortBy=createdAt&limit=50&page=2",
    ]);
    let json = stdout_json(&output);

    let sql = &json["sql"];
    let where_clause = sql["where_clause"].as_str().expect("where clause");
    assert!(where_clause.contains("\"brand_id\" = :"), "{}", where_clause);
    assert!(where_clause.contains("\"price\" >= :"), "{}", where_clause);
    assert!(!where_clause.contains("secret"), "{}", where_clause);
    assert_eq!(sql["order_by"], "\"created_at\" DESC, \"id\" ASC");
    assert_eq!(sql["limit"], 20);
    assert_eq!(sql["offset"], 20);
    assert_eq!(sql["params"].as_object().map(|m| m.len()), Some(2));
}

#[test]
fn test_compile_unknown_policy_fails() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = write_config(&dir, CONFIG);

    let output = run_query_inspect(&["-c", &config, "compile", "-p", "orders", "page=1"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown policy 'orders'"), "{}", stderr);
}

#[test]
fn test_cli_config_validation_missing_file() {
    let output = run_query_inspect(&["--config", "/nonexistent/config.yaml", "normalize", ""]);
    assert!(!output.status.success(), "Should fail with missing config");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("config file not found"), "{}", stderr);
}

#[test]
fn test_cli_config_validation_invalid_yaml() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = write_config(&dir, "invalid: yaml: content: [unclosed");

    let output = run_query_inspect(&["--config", &config, "normalize", ""]);
    assert!(!output.status.success(), "Should fail with invalid YAML");
}

#[test]
fn test_print_config() {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let config = write_config(&dir, CONFIG);

    let output = run_query_inspect(&["--config", &config, "--print-config"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("products:"));
    assert!(stdout.contains("max_limit: 20"));
}
