//! Helpers for running the `dstrk` binary
//!
//! Every command runs with `HOME` and `XDG_CONFIG_HOME` pointed at the test's
//! scratch directory so a developer's own config never leaks in.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

/// CLI command builder
pub struct DstrkCommand {
    binary_path: PathBuf,
    working_dir: PathBuf,
    args: Vec<String>,
    env: HashMap<String, String>,
}

impl DstrkCommand {
    /// Create a new command isolated to `sandbox`
    pub fn new(sandbox: impl AsRef<Path>) -> Self {
        let sandbox = sandbox.as_ref();
        let mut env = HashMap::new();
        env.insert("HOME".to_string(), sandbox.display().to_string());
        env.insert(
            "XDG_CONFIG_HOME".to_string(),
            sandbox.join(".config").display().to_string(),
        );

        Self {
            binary_path: PathBuf::from(env!("CARGO_BIN_EXE_dstrk")),
            working_dir: sandbox.to_path_buf(),
            args: Vec::new(),
            env,
        }
    }

    /// Add command arguments
    pub fn args(&mut self, args: &[&str]) -> &mut Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    /// Set environment variable
    pub fn env(&mut self, key: &str, value: &str) -> &mut Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn execute(&self) -> Result<CommandResult> {
        let output = Command::new(&self.binary_path)
            .args(&self.args)
            .current_dir(&self.working_dir)
            .env_remove("DSTRK_DBPATH")
            .envs(&self.env)
            .output()
            .context("Failed to execute dstrk")?;

        Ok(CommandResult {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    /// Execute and assert success
    pub fn assert_success(&self) -> Result<CommandResult> {
        let result = self.execute()?;

        if !result.success() {
            anyhow::bail!(
                "Command failed (exit code: {}):\nArgs: {:?}\nStdout: {}\nStderr: {}",
                result.exit_code,
                self.args,
                result.stdout,
                result.stderr
            );
        }

        Ok(result)
    }

    /// Execute and expect failure
    pub fn assert_failure(&self) -> Result<CommandResult> {
        let result = self.execute()?;

        if result.success() {
            anyhow::bail!(
                "Command should have failed but succeeded:\nArgs: {:?}\nStdout: {}",
                self.args,
                result.stdout
            );
        }

        Ok(result)
    }
}

/// Command execution result
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn contains_stderr(&self, text: &str) -> bool {
        self.stderr.contains(text)
    }

    /// First full dataset hash printed on stdout
    pub fn parse_hash(&self) -> Option<String> {
        self.stdout.lines().find_map(extract_hash)
    }

    /// Parse stdout as JSON
    pub fn json(&self) -> Result<serde_json::Value> {
        serde_json::from_str(&self.stdout).context("stdout is not valid JSON")
    }
}

/// Extract a 40 character lowercase hex hash from a line of text
pub fn extract_hash(line: &str) -> Option<String> {
    line.as_bytes()
        .windows(40)
        .position(|w| w.iter().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')))
        .map(|i| line[i..i + 40].to_string())
}

/// Macro for convenient command construction
///
/// Usage:
/// ```ignore
/// dstrk!(dir, "--dbpath", db, "init").assert_success()?;
/// ```
#[macro_export]
macro_rules! dstrk {
    ($dir:expr, $($arg:expr),*) => {{
        let mut cmd = $crate::common::cli::DstrkCommand::new($dir);
        cmd.args(&[$($arg),*]);
        cmd
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_extraction() {
        let line = "dataset 2aae6c35c94fcfb415dbe95f408b9ce91ee846ed created";
        assert_eq!(
            extract_hash(line),
            Some("2aae6c35c94fcfb415dbe95f408b9ce91ee846ed".to_string())
        );
        assert_eq!(extract_hash("2aae6c3"), None);
    }
}
