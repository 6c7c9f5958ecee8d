//! Common test utilities and helpers
//!
//! This module provides shared utilities for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Test recipe repository
///
/// Creates a temporary recipe root plus an isolated config directory so
/// the user's global configuration never leaks into a test.
pub struct TestRepo {
    /// Temporary directory holding the recipes
    pub dir: TempDir,
    /// Temporary config directory (`FANOUT_CONFIG_DIR`)
    pub config_dir: TempDir,
}

impl TestRepo {
    /// Create a new, empty recipe repository
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp directory"),
            config_dir: TempDir::new().expect("Failed to create config directory"),
        }
    }

    /// Get the path to the recipe root
    pub fn path(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    /// Create a file in the recipe root
    pub fn create_file(&self, name: &str, content: &str) {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        std::fs::write(path, content).expect("Failed to write file");
    }

    /// Write the global `config.toml`
    pub fn create_global_config(&self, content: &str) {
        std::fs::write(self.config_dir.path().join("config.toml"), content)
            .expect("Failed to write global config");
    }

    /// Write `dir/recipe.toml`
    pub fn add_recipe(&self, dir: &str, name: &str, version: &str, build: &[&str], run: &[&str]) {
        let content = format!(
            "[package]\nname = \"{name}\"\nversion = \"{version}\"\n\n\
             [requirements]\nbuild = {build:?}\nrun = {run:?}\n"
        );
        self.create_file(&format!("{dir}/recipe.toml"), &content);
    }

    /// Run fanout with the recipe root as working directory
    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_fanout"))
            .current_dir(self.dir.path())
            .env("FANOUT_CONFIG_DIR", self.config_dir.path())
            .env_remove("RUST_LOG")
            .args(args)
            .output()
            .expect("Failed to execute fanout")
    }

    /// Run fanout and parse its stdout as JSON
    pub fn run_json(&self, args: &[&str]) -> serde_json::Value {
        let output = self.run(args);
        assert!(
            output.status.success(),
            "fanout {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).expect("Output is not valid JSON")
    }

    /// Initialize a git repository; returns false when git is unavailable
    pub fn git_init(&self) -> bool {
        git(self.dir.path(), &["init", "-q"]).is_some_and(|o| o.status.success())
    }

    /// Stage everything and commit
    pub fn git_commit(&self, message: &str) {
        let add = git(self.dir.path(), &["add", "-A"]).expect("git add failed");
        assert!(add.status.success());
        let commit = git(
            self.dir.path(),
            &[
                "-c",
                "user.name=Test",
                "-c",
                "user.email=test@example.com",
                "commit",
                "-q",
                "-m",
                message,
            ],
        )
        .expect("git commit failed");
        assert!(
            commit.status.success(),
            "git commit failed: {}",
            String::from_utf8_lossy(&commit.stderr)
        );
    }
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}

fn git(dir: &Path, args: &[&str]) -> Option<Output> {
    Command::new("git")
        .current_dir(dir)
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .env("HOME", dir)
        .args(args)
        .output()
        .ok()
}

/// Channel index with `b` 2.1 published
pub const REPODATA: &str = r#"{
  "info": {"subdir": "linux-64"},
  "packages": {
    "b-2.1-0.tar.bz2": {"name": "b", "version": "2.1", "build": "0", "build_number": 0},
    "python-3.6.5-0.tar.bz2": {"name": "python", "version": "3.6.5", "build": "0", "build_number": 0}
  }
}"#;

/// Recipes: `a` build-depends on `b >=2.0`, `c` build-depends on `a`
pub fn abc_repo() -> TestRepo {
    let repo = TestRepo::new();
    repo.add_recipe("a", "a", "1.0", &["b >=2.0"], &["python"]);
    repo.add_recipe("b", "b", "2.1", &[], &[]);
    repo.add_recipe("c", "c", "1.0", &["a"], &[]);
    repo
}
