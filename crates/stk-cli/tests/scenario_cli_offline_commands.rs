//! Scenario: offline CLI commands.
//!
//! # Invariant under test
//! `distribute`, `validate`, `audit merge` and `config-hash` run without a
//! backend, write machine-readable output to stdout, and exit non-zero on
//! rejected input.

use std::fs;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;

fn stk() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("stk").expect("stk binary");
    cmd.env_remove("RUST_LOG");
    cmd
}

const ITEM_JSON: &str = r#"{
  "id": "lemonade",
  "name": "Lemonade",
  "stock_quantity": 15,
  "enable_stock_tracking": true,
  "inventory_tracking_type": "option_level",
  "option_groups": [{
    "id": "size",
    "name": "Size",
    "inventory_tracking_enabled": true,
    "tracking_priority": 1,
    "options": [
      { "id": "small", "name": "Small", "stock_quantity": 10 },
      { "id": "large", "name": "Large", "stock_quantity": 5, "damaged_quantity": 2 }
    ]
  }]
}"#;

#[test]
fn distribute_prints_ordered_allocation() {
    let out = stk()
        .args(["distribute", "--target", "30", "small=10", "large=5"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert_eq!(stdout.trim(), r#"{"small":20,"large":10}"#);
}

#[test]
fn distribute_rejects_negative_target() {
    stk()
        .args(["distribute", "--target", "-3", "small=1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("negative total"));
}

#[test]
fn distribute_rejects_malformed_pair() {
    stk()
        .args(["distribute", "--target", "3", "small"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("option_id=value"));
}

#[test]
fn validate_accepts_a_plain_edit() {
    let dir = tempfile::tempdir().unwrap();
    let item = dir.path().join("item.json");
    fs::write(&item, ITEM_JSON).unwrap();

    let out = stk()
        .args(["validate", "--item", item.to_str().unwrap(), "--set", "small=11"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["is_valid"], true);
}

#[test]
fn validate_fails_below_damaged() {
    let dir = tempfile::tempdir().unwrap();
    let item = dir.path().join("item.json");
    fs::write(&item, ITEM_JSON).unwrap();

    stk()
        .args(["validate", "--item", item.to_str().unwrap(), "--set", "large=1"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"is_valid\": false"))
        .stderr(predicate::str::contains("critical finding"));
}

#[test]
fn validate_rejects_unknown_option() {
    let dir = tempfile::tempdir().unwrap();
    let item = dir.path().join("item.json");
    fs::write(&item, ITEM_JSON).unwrap();

    stk()
        .args(["validate", "--item", item.to_str().unwrap(), "--set", "medium=4"])
        .assert()
        .failure();
}

#[test]
fn validate_honours_configured_max_quantity() {
    let dir = tempfile::tempdir().unwrap();
    let item = dir.path().join("item.json");
    let cfg = dir.path().join("limits.yaml");
    fs::write(&item, ITEM_JSON).unwrap();
    fs::write(&cfg, "validation:\n  max_quantity: 50\n").unwrap();

    stk()
        .args([
            "--config",
            cfg.to_str().unwrap(),
            "validate",
            "--item",
            item.to_str().unwrap(),
            "--set",
            "small=60",
        ])
        .assert()
        .failure();

    stk()
        .args(["validate", "--item", item.to_str().unwrap(), "--set", "small=60"])
        .assert()
        .success();
}

#[test]
fn audit_merge_orders_newest_first() {
    let dir = tempfile::tempdir().unwrap();
    let menu = dir.path().join("menu.jsonl");
    let option = dir.path().join("option.jsonl");
    fs::write(
        &menu,
        r#"{"timestamp":"2026-03-01T10:00:00Z","previous_quantity":10,"new_quantity":15,"reason":"restock"}
"#,
    )
    .unwrap();
    fs::write(
        &option,
        r#"{"timestamp":"2026-03-02T09:00:00Z","previous_quantity":5,"new_quantity":4,"option_id":"large","option_name":"Large"}
"#,
    )
    .unwrap();

    let out = stk()
        .args([
            "audit",
            "merge",
            "--menu-item",
            menu.to_str().unwrap(),
            "--option",
            option.to_str().unwrap(),
        ])
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["option_id"], "large");
    assert_eq!(lines[0]["source"], "option");
    assert_eq!(lines[1]["source"], "menu_item");
}

#[test]
fn config_hash_prints_hash_then_canonical_json() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("base.yaml");
    let over = dir.path().join("override.yaml");
    fs::write(&base, "backend:\n  timeout_secs: 30\n").unwrap();
    fs::write(&over, "backend:\n  timeout_secs: 5\n").unwrap();

    stk()
        .args(["config-hash", base.to_str().unwrap(), over.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("config_hash="))
        .stdout(predicate::str::contains(r#"{"backend":{"timeout_secs":5}}"#));
}

#[test]
fn config_with_secret_literal_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = dir.path().join("bad.yaml");
    fs::write(&cfg, "backend:\n  token_env: ghp_abcdef123456\n").unwrap();

    stk()
        .args(["config-hash", cfg.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_SECRET_DETECTED"));
}
