//! Binary smoke tests for commands that need no network access.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn deepsearch(temp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("deepsearch").unwrap_or_else(|_| unreachable!());
    cmd.env("DEEPSEARCH_DB_PATH", temp.path().join("vectors.db"))
        .env_remove("OPENAI_API_KEY")
        .env_remove("DEEPSEARCH_API_KEY")
        .env_remove("DEEPSEARCH_EMBEDDING_DIM")
        .env_remove("RUST_LOG");
    cmd
}

fn temp() -> TempDir {
    TempDir::new().unwrap_or_else(|_| unreachable!())
}

#[test]
fn help_lists_commands() {
    let temp = temp();
    deepsearch(&temp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("retrieve"))
        .stdout(predicate::str::contains("init-prompts"));
}

#[test]
fn collections_on_fresh_database() {
    let temp = temp();
    deepsearch(&temp)
        .arg("collections")
        .assert()
        .success()
        .stdout("No collections found.\n");
}

#[test]
fn clear_unknown_collection_as_json() {
    let temp = temp();
    deepsearch(&temp)
        .args(["--format", "json", "clear", "nope"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"removed\": false"));
}

#[test]
fn init_prompts_is_idempotent() {
    let temp = temp();
    let dir = temp.path().join("prompts");
    deepsearch(&temp)
        .arg("init-prompts")
        .arg(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 6 prompt template(s)"));
    assert!(dir.join("decompose.md").exists());
    assert!(dir.join("route_searchers.md").exists());

    deepsearch(&temp)
        .arg("init-prompts")
        .arg(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("already exist"));
}

#[test]
fn retrieve_without_api_key_fails() {
    let temp = temp();
    deepsearch(&temp)
        .args(["retrieve", "what is ownership?"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("API key missing"));
}

#[test]
fn load_rejects_malformed_jsonl() {
    let temp = temp();
    let file = temp.path().join("bad.jsonl");
    std::fs::write(&file, "{not json}\n").unwrap_or_else(|_| unreachable!());
    deepsearch(&temp)
        .arg("load")
        .arg(&file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 1"));
}
