use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use journal_harness::config::load_config;
use journal_harness::db;
use journal_harness::sqlite_store::SqliteStore;
use journal_harness_core::models::{DateRange, Granularity};
use journal_harness_core::store::JournalStore;

fn jrnl_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("jrnl");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/journal.sqlite"

[index]
dir = "{}/data/indexes"

[chunking]
window_size = 8
overlap = 2

[classifier]
mode = "keyword"
"#,
        root.display(),
        root.display()
    );

    let config_path = config_dir.join("jrnl.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_jrnl(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = jrnl_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .arg("--user")
        .arg("alice")
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run jrnl binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

/// Write rows straight into the database the binary uses.
async fn seed(config_path: &Path) {
    let config = load_config(config_path).unwrap();
    let store = SqliteStore::new(db::connect(&config).await.unwrap());
    store
        .save_entry("alice", day(4), "Long run by the river.\nFelt great.")
        .await
        .unwrap();
    store
        .save_entry("alice", day(12), "Rainy day, stayed in and read.")
        .await
        .unwrap();
    store
        .save_entry("bob", day(5), "Bob's private entry.")
        .await
        .unwrap();
    store
        .save_summary(
            "alice",
            Granularity::Weekly,
            &DateRange::new(day(4), day(10)).unwrap(),
            "A week of running.",
        )
        .await
        .unwrap();
    store
        .append_chat_record("alice", "When did I run?", "On March 4th.")
        .await
        .unwrap();
    store.pool().close().await;
}

#[test]
fn test_init_creates_database_and_index_dir() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_jrnl(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/journal.sqlite").exists());
    assert!(tmp.path().join("data/indexes").is_dir());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_jrnl(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_jrnl(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_commands_before_init_point_to_init() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_jrnl(&config_path, &["entries"]);
    assert!(!success);
    assert!(stderr.contains("jrnl init"), "stderr={}", stderr);
}

#[test]
fn test_entries_empty() {
    let (_tmp, config_path) = setup_test_env();
    run_jrnl(&config_path, &["init"]);

    let (stdout, stderr, success) = run_jrnl(&config_path, &["entries"]);
    assert!(success, "entries failed: {}", stderr);
    assert!(stdout.contains("No entries."));
}

#[tokio::test]
async fn test_entries_lists_only_owner_and_filters_dates() {
    let (_tmp, config_path) = setup_test_env();
    run_jrnl(&config_path, &["init"]);
    seed(&config_path).await;

    let (stdout, stderr, success) = run_jrnl(&config_path, &["entries"]);
    assert!(success, "entries failed: {}", stderr);
    assert!(stdout.contains("2024-03-04"));
    assert!(stdout.contains("Long run by the river."));
    assert!(!stdout.contains("Felt great."), "only the first line is previewed");
    assert!(!stdout.contains("Bob"));
    assert!(stdout.contains("2 entries"));
    // Newest first.
    let newer = stdout.find("2024-03-12").unwrap();
    let older = stdout.find("2024-03-04").unwrap();
    assert!(newer < older);

    let (stdout, _, success) = run_jrnl(&config_path, &["entries", "--since", "2024-03-10"]);
    assert!(success);
    assert!(stdout.contains("2024-03-12"));
    assert!(!stdout.contains("2024-03-04"));
    assert!(stdout.contains("1 entries"));
}

#[tokio::test]
async fn test_summaries_and_history() {
    let (_tmp, config_path) = setup_test_env();
    run_jrnl(&config_path, &["init"]);
    seed(&config_path).await;

    let (stdout, stderr, success) = run_jrnl(&config_path, &["summaries"]);
    assert!(success, "summaries failed: {}", stderr);
    assert!(stdout.contains("weekly summaries"));
    assert!(stdout.contains("2024-03-04 to 2024-03-10"));
    assert!(stdout.contains("A week of running."));

    let (stdout, _, success) =
        run_jrnl(&config_path, &["summaries", "--granularity", "monthly"]);
    assert!(success);
    assert!(stdout.contains("No summaries."));

    let (stdout, stderr, success) = run_jrnl(&config_path, &["history"]);
    assert!(success, "history failed: {}", stderr);
    assert!(stdout.contains("Q: When did I run?"));
    assert!(stdout.contains("A: On March 4th."));
}

#[tokio::test]
async fn test_history_filters_by_keyword_and_date() {
    let (_tmp, config_path) = setup_test_env();
    run_jrnl(&config_path, &["init"]);
    seed(&config_path).await;

    // Matches the response only, regardless of case.
    let (stdout, stderr, success) = run_jrnl(&config_path, &["history", "--search", "MARCH"]);
    assert!(success, "history failed: {}", stderr);
    assert!(stdout.contains("Q: When did I run?"));
    assert!(stdout.contains("1 of 1 records match"));

    let (stdout, _, success) = run_jrnl(&config_path, &["history", "--search", "swimming"]);
    assert!(success);
    assert!(stdout.contains("No matching chat history."));
    assert!(!stdout.contains("When did I run?"));

    let (stdout, _, success) = run_jrnl(&config_path, &["history", "--since", "2999-01-01"]);
    assert!(success);
    assert!(stdout.contains("No matching chat history."));

    let (stdout, _, success) = run_jrnl(&config_path, &["history", "--until", "2999-01-01"]);
    assert!(success);
    assert!(stdout.contains("Q: When did I run?"));

    let (_, stderr, success) = run_jrnl(
        &config_path,
        &["history", "--since", "2024-03-10", "--until", "2024-03-01"],
    );
    assert!(!success);
    assert!(stderr.contains("2024-03-10"), "stderr={}", stderr);
}

#[test]
fn test_history_empty() {
    let (_tmp, config_path) = setup_test_env();
    run_jrnl(&config_path, &["init"]);

    let (stdout, _, success) = run_jrnl(&config_path, &["history"]);
    assert!(success);
    assert!(stdout.contains("No chat history."));
}

#[test]
fn test_index_status_not_built() {
    let (_tmp, config_path) = setup_test_env();
    run_jrnl(&config_path, &["init"]);

    let (stdout, stderr, success) = run_jrnl(&config_path, &["index", "status"]);
    assert!(success, "index status failed: {}", stderr);
    assert!(stdout.contains("not built"));
    assert!(stdout.contains("alice.jvi"));
}

#[test]
fn test_add_errors_when_embedding_disabled() {
    let (_tmp, config_path) = setup_test_env();
    run_jrnl(&config_path, &["init"]);

    let (_, stderr, success) = run_jrnl(&config_path, &["add", "A quiet morning."]);
    assert!(!success);
    assert!(stderr.contains("Embedding provider is disabled"), "stderr={}", stderr);
}

#[test]
fn test_ask_errors_when_providers_disabled() {
    let (_tmp, config_path) = setup_test_env();
    run_jrnl(&config_path, &["init"]);

    let (_, stderr, success) = run_jrnl(&config_path, &["ask", "How was my week?"]);
    assert!(!success);
    assert!(stderr.contains("disabled"), "stderr={}", stderr);
}

#[test]
fn test_summarize_errors_when_llm_disabled() {
    let (_tmp, config_path) = setup_test_env();
    run_jrnl(&config_path, &["init"]);

    let (_, stderr, success) = run_jrnl(&config_path, &["summarize", "weekly"]);
    assert!(!success);
    assert!(stderr.contains("LLM provider is disabled"), "stderr={}", stderr);
}

#[test]
fn test_add_rejects_bad_date() {
    let (_tmp, config_path) = setup_test_env();
    run_jrnl(&config_path, &["init"]);

    let (_, stderr, success) =
        run_jrnl(&config_path, &["add", "--date", "04/03/2024", "Some text"]);
    assert!(!success);
    assert!(stderr.contains("YYYY-MM-DD"), "stderr={}", stderr);
}

#[test]
fn test_inverted_entries_range_is_rejected() {
    let (_tmp, config_path) = setup_test_env();
    run_jrnl(&config_path, &["init"]);

    let (_, stderr, success) = run_jrnl(
        &config_path,
        &["entries", "--since", "2024-03-10", "--until", "2024-03-01"],
    );
    assert!(!success);
    assert!(stderr.contains("2024-03-10"), "stderr={}", stderr);
}

#[test]
fn test_missing_config_file() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope.toml");

    let (_, stderr, success) = run_jrnl(&missing, &["init"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"), "stderr={}", stderr);
}

#[test]
fn test_invalid_chunking_config_is_fatal() {
    let (tmp, config_path) = setup_test_env();
    let bad = format!(
        "[db]\npath = \"{0}/db.sqlite\"\n[index]\ndir = \"{0}/idx\"\n[chunking]\nwindow_size = 4\noverlap = 4\n",
        tmp.path().display()
    );
    fs::write(&config_path, bad).unwrap();

    let (_, stderr, success) = run_jrnl(&config_path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("overlap"), "stderr={}", stderr);
    assert!(!tmp.path().join("db.sqlite").exists());
}

#[test]
fn test_completions_need_no_config() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope.toml");

    let (stdout, stderr, success) = run_jrnl(&missing, &["completions", "bash"]);
    assert!(success, "completions failed: {}", stderr);
    assert!(stdout.contains("jrnl"));
}
