//! Integration tests for the client when the service is unreachable.
//!
//! Every command must still succeed, applying its change to the local
//! cache file and reporting `"source":"cache"`.

mod common;

use common::{TestEnv, stdout_json};
use predicates::prelude::*;
use serde_json::Value;

/// Add a task offline and return its id as printed.
fn add(env: &TestEnv, text: &str) -> String {
    let output = env.offline().args(["add", text]).output().unwrap();
    assert!(output.status.success());
    let json = stdout_json(&output);
    json["task"]["id"].as_str().unwrap().to_string()
}

fn cached(env: &TestEnv) -> Value {
    let text = std::fs::read_to_string(env.cache_path()).unwrap();
    serde_json::from_str(&text).unwrap()
}

#[test]
fn test_add_offline_writes_cache() {
    let env = TestEnv::new();

    let output = env.offline().args(["add", "  Buy milk  "]).output().unwrap();
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["outcome"], "applied");
    assert_eq!(json["source"], "cache");
    assert_eq!(json["task"]["text"], "Buy milk");
    assert_eq!(json["view"]["pending"], 1);

    let stored = cached(&env);
    assert_eq!(stored["todo_app_tasks"][0]["text"], "Buy milk");
    assert_eq!(stored["todo_app_tasks"][0]["completed"], false);
}

#[test]
fn test_add_blank_text_fails() {
    let env = TestEnv::new();

    env.offline()
        .args(["add", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid input"));
    assert!(!env.cache_path().exists());
}

#[test]
fn test_list_offline_human() {
    let env = TestEnv::new();
    add(&env, "Walk the dog");

    env.offline()
        .args(["list", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[ ]"))
        .stdout(predicate::str::contains("Walk the dog"))
        .stdout(predicate::str::contains("1 task pending"))
        .stdout(predicate::str::contains("(offline: saved locally)"));
}

#[test]
fn test_empty_list_offline() {
    let env = TestEnv::new();

    env.offline()
        .args(["list", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No tasks."))
        .stdout(predicate::str::contains("0 tasks pending"));
}

#[test]
fn test_done_undo_and_filters() {
    let env = TestEnv::new();
    let id = add(&env, "a");
    add(&env, "b");

    let output = env.offline().args(["done", &id]).output().unwrap();
    let json = stdout_json(&output);
    assert_eq!(json["task"]["completed"], true);
    assert_eq!(json["view"]["pending"], 1);
    assert_eq!(json["view"]["has_completed"], true);

    let output = env
        .offline()
        .args(["list", "--filter", "completed"])
        .output()
        .unwrap();
    let json = stdout_json(&output);
    assert_eq!(json["view"]["tasks"].as_array().unwrap().len(), 1);
    assert_eq!(json["view"]["tasks"][0]["text"], "a");
    assert_eq!(json["view"]["total"], 2);

    env.offline().args(["undo", &id]).assert().success();
    let output = env
        .offline()
        .args(["list", "--filter", "active"])
        .output()
        .unwrap();
    let json = stdout_json(&output);
    assert_eq!(json["view"]["tasks"].as_array().unwrap().len(), 2);
}

#[test]
fn test_edit_offline() {
    let env = TestEnv::new();
    let id = add(&env, "draft");

    env.offline()
        .args(["edit", &id, " final "])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"text\":\"final\""));
    assert_eq!(cached(&env)["todo_app_tasks"][0]["text"], "final");

    env.offline().args(["edit", &id, ""]).assert().failure();
}

#[test]
fn test_rm_requires_confirmation() {
    let env = TestEnv::new();
    let id = add(&env, "keep me");

    // stdin is not a terminal, so the prompt answers no
    env.offline()
        .args(["rm", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"cancelled\":true"));
    assert_eq!(cached(&env)["todo_app_tasks"].as_array().unwrap().len(), 1);

    env.offline().args(["rm", &id, "--yes"]).assert().success();
    assert!(cached(&env)["todo_app_tasks"].as_array().unwrap().is_empty());
}

#[test]
fn test_clear_completed_offline() {
    let env = TestEnv::new();
    let done = add(&env, "done");
    add(&env, "open");
    env.offline().args(["done", &done]).assert().success();

    env.offline()
        .args(["clear", "-H"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cancelled."));

    let output = env.offline().args(["clear", "-y"]).output().unwrap();
    let json = stdout_json(&output);
    assert_eq!(json["view"]["total"], 1);
    assert_eq!(json["view"]["has_completed"], false);
    assert_eq!(json["view"]["tasks"][0]["text"], "open");
}

#[test]
fn test_unknown_id_is_noop() {
    let env = TestEnv::new();
    add(&env, "only");

    let output = env.offline().args(["done", "12345"]).output().unwrap();
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["view"]["pending"], 1);
    assert!(json.get("task").is_none());
}

#[test]
fn test_corrupt_cache_reads_as_empty() {
    let env = TestEnv::new();
    std::fs::write(env.cache_path(), "not json at all").unwrap();

    let output = env.offline().arg("list").output().unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["view"]["total"], 0);
}

#[test]
fn test_cache_flag_overrides_location() {
    let env = TestEnv::new();
    let custom = env.data_path().join("elsewhere").join("cache.json");

    env.offline()
        .args(["--cache", custom.to_str().unwrap(), "add", "x"])
        .assert()
        .success();
    assert!(custom.exists());
    assert!(!env.cache_path().exists());
}

#[test]
fn test_status_offline() {
    let env = TestEnv::new();

    let output = env.offline().arg("status").output().unwrap();
    assert!(output.status.success());
    let json = stdout_json(&output);
    assert_eq!(json["api_url"], "http://127.0.0.1:1");
    assert_eq!(json["connectivity"]["state"], "offline");
    assert_eq!(json["cached_tasks"], 0);
}
