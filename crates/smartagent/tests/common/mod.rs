//! Common test utilities for SmartAgent integration tests
#![allow(dead_code)]

use assert_cmd::Command;
use std::path::PathBuf;
use tempfile::{tempdir, TempDir};

/// Base URL nothing listens on
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:9";

const OVERRIDE_VARS: &[&str] = &[
    "SMART_AGENT_MODEL",
    "SMART_AGENT_BASE_URL",
    "SMART_AGENT_HOST",
    "SMART_AGENT_PORT",
];

/// Isolated home and data directory for one test
pub struct TestEnv {
    pub temp_dir: TempDir,
    pub data_dir: PathBuf,
    pub files_dir: PathBuf,
}

impl TestEnv {
    pub fn new() -> anyhow::Result<Self> {
        let temp_dir = tempdir()?;
        let data_dir = temp_dir.path().join(".smartagent");
        let files_dir = temp_dir.path().join("files");
        std::fs::create_dir_all(&files_dir)?;

        Ok(Self {
            temp_dir,
            data_dir,
            files_dir,
        })
    }

    pub fn config_file(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }

    /// Write a data file the tools can read, returning its absolute path
    pub fn write_file(&self, name: &str, content: &str) -> anyhow::Result<String> {
        let path = self.files_dir.join(name);
        std::fs::write(&path, content)?;
        Ok(path.to_string_lossy().into_owned())
    }

    /// Command pointed at this environment, with no inherited overrides
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_smartagent"));
        cmd.env("HOME", self.temp_dir.path());
        cmd.env("SMART_AGENT_HOME", &self.data_dir);
        cmd.env_remove("RUST_LOG");
        for var in OVERRIDE_VARS {
            cmd.env_remove(var);
        }
        cmd
    }

    /// Command talking to the chat endpoint at `base_url`
    pub fn command_with_backend(&self, base_url: &str) -> Command {
        let mut cmd = self.command();
        cmd.env("SMART_AGENT_BASE_URL", base_url);
        cmd
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new().expect("Failed to create test environment")
    }
}
