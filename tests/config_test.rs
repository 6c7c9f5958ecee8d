//! Integration tests for layered configuration
//!
//! - Project `fanout.toml` settings
//! - Global `config.toml` under `FANOUT_CONFIG_DIR`
//! - Flags override both

mod common;

use common::{abc_repo, REPODATA};

fn names(plans: &serde_json::Value) -> Vec<String> {
    plans[0]["plan"]["packages"]
        .as_array()
        .expect("packages array")
        .iter()
        .map(|p| p["name"].as_str().expect("name").to_string())
        .collect()
}

#[test]
fn test_project_config_applies() {
    let repo = abc_repo();
    repo.create_file("index/linux-64.json", REPODATA);
    repo.create_file(
        "fanout.toml",
        "[propagation]\nsteps = \"until-stable\"\n\n[index]\nrepodata = [\"index/linux-64.json\"]\n",
    );

    let plans = repo.run_json(&["--json", "plan", ".", "--changed", "a"]);
    assert_eq!(names(&plans), vec!["a", "c"]);
}

#[test]
fn test_global_config_applies() {
    let repo = abc_repo();
    repo.create_file("linux-64.json", REPODATA);
    repo.create_global_config("[propagation]\nsteps = 1\n");

    let plans = repo.run_json(&[
        "--json",
        "plan",
        ".",
        "--changed",
        "a",
        "--repodata",
        "linux-64.json",
    ]);
    assert_eq!(names(&plans), vec!["a", "c"]);
}

#[test]
fn test_flags_override_config() {
    let repo = abc_repo();
    repo.create_file("linux-64.json", REPODATA);
    repo.create_file("fanout.toml", "[propagation]\nsteps = 1\n");

    let plans = repo.run_json(&[
        "--json",
        "plan",
        ".",
        "--changed",
        "a",
        "--repodata",
        "linux-64.json",
        "--steps",
        "0",
    ]);
    assert_eq!(names(&plans), vec!["a"]);
}

#[test]
fn test_invalid_config_fails() {
    let repo = abc_repo();
    repo.create_file("fanout.toml", "[propagation]\nsteps = -1\n");

    let output = repo.run(&["plan", ".", "--changed", "a"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to load configuration"), "stderr: {stderr}");
}

#[test]
fn test_json_error_output() {
    let repo = abc_repo();

    let output = repo.run(&["--json", "plan", ".", "--package", "ghost"]);
    assert!(!output.status.success());
    let error: serde_json::Value =
        serde_json::from_slice(&output.stderr).expect("stderr is JSON");
    assert!(error["error"].as_str().is_some());
}
