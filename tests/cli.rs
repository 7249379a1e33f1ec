//! Integration tests for the tether CLI.
//!
//! Each test gets its own database and settings file under a temp dir and
//! pins the scope with flags, so nothing depends on the surrounding git state.

use assert_cmd::Command;
use std::path::Path;
use tempfile::TempDir;

/// Build a command bound to an isolated database, scoped to `main`.
fn tether(dir: &Path) -> Command {
    tether_on(dir, "main")
}

/// Same as [`tether`] but on another branch of the same repository.
fn tether_on(dir: &Path, branch: &str) -> Command {
    let mut cmd = Command::cargo_bin("tether").unwrap();
    cmd.current_dir(dir)
        .env("TETHER_DB", dir.join("tether.db"))
        .env("TETHER_CONFIG", dir.join("config.json"))
        .env_remove("RUST_LOG")
        .args([
            "--no-color",
            "--host",
            "github.com",
            "--org",
            "acme",
            "--project",
            "widget",
            "--branch",
            branch,
        ]);
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.output().unwrap();
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn json_of(cmd: &mut Command) -> serde_json::Value {
    serde_json::from_str(&stdout_of(cmd)).unwrap()
}

// =============================================================================
// Setup
// =============================================================================

#[test]
fn test_init_creates_database() {
    let dir = TempDir::new().unwrap();
    let out = json_of(tether(dir.path()).args(["--json", "init"]));

    assert_eq!(out["schema_version"], 1);
    assert!(dir.path().join("tether.db").exists());
}

#[test]
fn test_init_creates_missing_parent_directories() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join("a").join("b").join("tether.db");

    tether(dir.path())
        .env("TETHER_DB", &nested)
        .arg("init")
        .assert()
        .success();
    assert!(nested.exists());
}

#[test]
fn test_version_reports_schema() {
    let dir = TempDir::new().unwrap();
    let out = json_of(tether(dir.path()).args(["--json", "version"]));

    assert_eq!(out["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(out["schema_version"], 1);
}

#[test]
fn test_completions_mention_binary() {
    let dir = TempDir::new().unwrap();
    let out = stdout_of(tether(dir.path()).args(["completions", "bash"]));
    assert!(out.contains("tether"));
}

// =============================================================================
// History
// =============================================================================

#[test]
fn test_history_add_and_show_in_order() {
    let dir = TempDir::new().unwrap();
    for prompt in ["fix bug", "add test", "refactor"] {
        tether(dir.path())
            .args(["history", "add", prompt])
            .assert()
            .success();
    }

    let out = json_of(tether(dir.path()).args(["--json", "history", "show"]));
    let texts: Vec<&str> = out["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["text"].as_str().unwrap())
        .collect();
    assert_eq!(texts, ["fix bug", "add test", "refactor"]);
}

#[test]
fn test_history_cap_comes_from_settings() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.json"),
        r#"{"history": {"maxEntries": 2}}"#,
    )
    .unwrap();

    for prompt in ["fix bug", "add test", "refactor"] {
        tether(dir.path())
            .args(["history", "add", prompt])
            .assert()
            .success();
    }

    let out = json_of(tether(dir.path()).args(["--json", "history", "show"]));
    assert_eq!(out["count"], 2);
    assert_eq!(out["entries"][0]["text"], "add test");
    assert_eq!(out["entries"][1]["text"], "refactor");
}

#[test]
fn test_history_streams_and_branches_are_separate() {
    let dir = TempDir::new().unwrap();
    tether(dir.path())
        .args(["history", "add", "--command", "cargo test"])
        .assert()
        .success();
    tether_on(dir.path(), "feature")
        .args(["history", "add", "feature prompt"])
        .assert()
        .success();

    let prompts = json_of(tether(dir.path()).args(["--json", "history", "show"]));
    assert_eq!(prompts["count"], 0);

    let commands = json_of(tether(dir.path()).args(["--json", "history", "show", "--commands"]));
    assert_eq!(commands["count"], 1);
    assert_eq!(commands["entries"][0]["text"], "cargo test");

    let feature = json_of(tether_on(dir.path(), "feature").args(["--json", "history", "show"]));
    assert_eq!(feature["count"], 1);
    assert_eq!(feature["entries"][0]["text"], "feature prompt");

    let feature_commands = json_of(
        tether_on(dir.path(), "feature").args(["--json", "history", "show", "--commands"]),
    );
    assert_eq!(feature_commands["count"], 0);
}

#[test]
fn test_history_clear() {
    let dir = TempDir::new().unwrap();
    tether(dir.path())
        .args(["history", "add", "one"])
        .assert()
        .success();

    let out = json_of(tether(dir.path()).args(["--json", "history", "clear"]));
    assert_eq!(out["removed"], 1);
}

// =============================================================================
// Sessions
// =============================================================================

#[test]
fn test_session_list_empty() {
    let dir = TempDir::new().unwrap();
    let out = json_of(tether(dir.path()).args(["--json", "session", "list"]));
    assert_eq!(out["count"], 0);

    let human = stdout_of(tether(dir.path()).args(["session", "list"]));
    assert!(human.contains("No sessions found"));
}

#[test]
fn test_session_delete_missing_is_not_found() {
    let dir = TempDir::new().unwrap();
    let output = tether(dir.path())
        .args(["--json", "session", "delete", "nope"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(3));
    let err: serde_json::Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(err["error"]["code"], "SESSION_NOT_FOUND");
}

#[test]
fn test_session_search_invalid_pattern() {
    let dir = TempDir::new().unwrap();
    let output = tether(dir.path())
        .args(["session", "search", "("])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(4));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));
}

#[test]
fn test_session_cleanup_on_empty_database() {
    let dir = TempDir::new().unwrap();
    let out = json_of(tether(dir.path()).args([
        "--json",
        "session",
        "cleanup",
        "--max-age-days",
        "7",
        "--max-sessions",
        "2",
    ]));
    assert_eq!(out["expired"], 0);
    assert_eq!(out["over_limit"], 0);
}

// =============================================================================
// Repositories and maintenance
// =============================================================================

#[test]
fn test_repo_list_after_history_add() {
    let dir = TempDir::new().unwrap();
    tether(dir.path())
        .args(["history", "add", "hello"])
        .assert()
        .success();

    let out = json_of(tether(dir.path()).args(["--json", "repo", "list"]));
    let repos = out.as_array().unwrap();
    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0]["project"], "widget");

    let id = repos[0]["id"].as_i64().unwrap().to_string();
    let branches = json_of(tether(dir.path()).args(["--json", "repo", "branches", &id]));
    assert_eq!(branches[0]["name"], "main");
}

#[test]
fn test_repo_delete_cascades_history() {
    let dir = TempDir::new().unwrap();
    tether(dir.path())
        .args(["history", "add", "hello"])
        .assert()
        .success();
    let repos = json_of(tether(dir.path()).args(["--json", "repo", "list"]));
    let id = repos[0]["id"].as_i64().unwrap().to_string();

    tether(dir.path())
        .args(["repo", "delete", &id])
        .assert()
        .success();

    let stats = json_of(tether(dir.path()).args(["--json", "db", "stats"]));
    assert_eq!(stats["repositories"], 0);
    assert_eq!(stats["prompt_history"], 0);
}

#[test]
fn test_repo_delete_missing_is_not_found() {
    let dir = TempDir::new().unwrap();
    let output = tether(dir.path())
        .args(["repo", "delete", "42"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn test_db_stats_and_compact() {
    let dir = TempDir::new().unwrap();
    tether(dir.path())
        .args(["history", "add", "--command", "ls"])
        .assert()
        .success();

    let stats = json_of(tether(dir.path()).args(["--json", "db", "stats"]));
    assert_eq!(stats["repositories"], 1);
    assert_eq!(stats["branches"], 1);
    assert_eq!(stats["command_history"], 1);

    tether(dir.path())
        .args(["db", "compact"])
        .assert()
        .success();
}

#[test]
fn test_invalid_config_is_config_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("config.json"), "{not json").unwrap();

    let output = tether(dir.path())
        .args(["history", "show"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7));
}
