// Integration tests for the missivectl binary

use assert_cmd::cargo::cargo_bin_cmd;
use httpmock::prelude::*;
use predicates::prelude::*;
use serde_json::{Value, json};
use std::fs;
use tempfile::{TempDir, tempdir};

/// Command isolated from the caller's config and token.
fn missivectl(home: &TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("missivectl");
    cmd.current_dir(home.path())
        .env("MISSIVECTL_CONFIG_DIR", home.path().join("config"))
        .env_remove("MISSIVE_API_TOKEN")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn run_help_lists_batch_flags() {
    let home = tempdir().unwrap();
    missivectl(&home)
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--continue-on-fail"))
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--input"));
}

#[test]
fn schema_prints_fields_for_one_operation() {
    let home = tempdir().unwrap();
    let output = missivectl(&home)
        .args(["-o", "json", "schema", "--resource", "contact", "--operation", "get"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let table: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(table[0]["resource"], "contact");
    assert_eq!(table[0]["fields"][0]["name"], "contactId");
}

#[test]
fn dry_run_needs_no_token_and_masks_authorization() {
    let home = tempdir().unwrap();
    let batch = home.path().join("batch.json");
    fs::write(
        &batch,
        json!({"items": [
            {"parameters": {"html": "<p>Deployed</p>", "additionalFields": {"conversation": "c1"}}}
        ]})
        .to_string(),
    )
    .unwrap();

    let output = missivectl(&home)
        .args(["-o", "json", "run", "--resource", "post", "--dry-run", "--input"])
        .arg(&batch)
        .output()
        .unwrap();
    assert!(output.status.success());

    let previews: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(previews[0]["method"], "POST");
    assert_eq!(previews[0]["url"], "https://public.missiveapp.com/v1/posts");
    assert_eq!(previews[0]["headers"]["Authorization"], "Bearer *****");
    assert_eq!(
        previews[0]["body"],
        json!({"posts": {"html": "<p>Deployed</p>", "conversation": "c1"}})
    );
}

#[test]
fn run_reads_stdin_and_isolates_failures() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/v1/conversations/abc")
            .header("Authorization", "Bearer t0ken");
        then.status(200).json_body(json!({"conversations": [{"id": "abc"}]}));
    });

    let home = tempdir().unwrap();
    let output = missivectl(&home)
        .args(["-o", "json", "--api-token", "t0ken", "--base-url"])
        .arg(server.url("/v1"))
        .args([
            "run",
            "--resource",
            "conversation",
            "--operation",
            "get",
            "--continue-on-fail",
        ])
        .write_stdin(r#"[{"parameters": {"conversationId": "abc"}}, {"parameters": {}}]"#)
        .output()
        .unwrap();
    assert!(output.status.success());

    mock.assert();
    let rows: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 2);
    assert_eq!(rows[0]["conversations"][0]["id"], "abc");
    assert_eq!(
        rows[1]["error"],
        "missing required field `conversationId` (item 1)"
    );
}

#[test]
fn missing_token_is_reported() {
    let home = tempdir().unwrap();
    missivectl(&home)
        .args(["organizations", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("API token is required"));
}

#[test]
fn unsupported_operation_is_rejected_up_front() {
    let home = tempdir().unwrap();
    missivectl(&home)
        .args(["run", "--resource", "organization", "--operation", "delete", "--dry-run"])
        .write_stdin("[]")
        .assert()
        .failure()
        .stderr(predicate::str::contains("supported: getAll"));
}

#[test]
fn configure_then_show_masks_token() {
    let home = tempdir().unwrap();
    missivectl(&home)
        .args(["configure", "--token", "secret-token", "--scope", "local"])
        .assert()
        .success()
        .stdout(predicate::str::contains(".missivectl.yaml"));

    missivectl(&home)
        .arg("config-show")
        .assert()
        .success()
        .stdout(predicate::str::contains("*****"))
        .stdout(predicate::str::contains("secret-token").not());
}
