//! Common test utilities for tasklist integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't touch the
//! user's `~/.local/share/tasklist/` directory or config file.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

/// Address where nothing listens; every request fails to connect.
pub const UNREACHABLE_API: &str = "http://127.0.0.1:1";

/// A test environment with isolated data and config directories.
///
/// The `tasklist()` method returns a `Command` that sets
/// `TASKLIST_DATA_DIR` and `TASKLIST_CONFIG_DIR` per invocation, making
/// tests parallel-safe.
pub struct TestEnv {
    pub data_dir: TempDir,
    pub config_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            data_dir: TempDir::new().unwrap(),
            config_dir: TempDir::new().unwrap(),
        }
    }

    /// Get a Command for the tasklist binary with isolated directories.
    pub fn tasklist(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_tasklist"));
        cmd.env("TASKLIST_DATA_DIR", self.data_dir.path());
        cmd.env("TASKLIST_CONFIG_DIR", self.config_dir.path());
        cmd.env_remove("TASKLIST_API_URL");
        cmd.env_remove("TASKLIST_CACHE");
        cmd.env_remove("RUST_LOG");
        cmd
    }

    /// A client command pointed at a service that is never up.
    pub fn offline(&self) -> Command {
        let mut cmd = self.tasklist();
        cmd.args(["--api-url", UNREACHABLE_API]);
        cmd
    }

    pub fn data_path(&self) -> &Path {
        self.data_dir.path()
    }

    /// Default location of the local cache under the data dir.
    pub fn cache_path(&self) -> PathBuf {
        self.data_path().join("local-storage.json")
    }

    /// Write `config.kdl` into the isolated config dir.
    pub fn write_config(&self, contents: &str) {
        std::fs::write(self.config_dir.path().join("config.kdl"), contents).unwrap();
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a command's stdout as JSON.
pub fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout is not JSON ({}): {}",
            e,
            String::from_utf8_lossy(&output.stdout)
        )
    })
}
