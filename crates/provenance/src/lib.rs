//! Git provenance for dstrk datasets
//!
//! Describes a git checkout as tag strings (commit, branch, remotes) so a
//! dataset records which code produced it. Shells out to the `git` binary.

use dstrk_core::{Error, Result};
use dstrk_lineage::TagSource;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

/// [`TagSource`] backed by `git -C <checkout>`
#[derive(Debug, Clone)]
pub struct GitProvenance {
    program: PathBuf,
}

impl Default for GitProvenance {
    fn default() -> Self {
        Self::new()
    }
}

impl GitProvenance {
    /// Use `git` from `PATH`
    pub fn new() -> Self {
        Self::with_program("git")
    }

    /// Use a specific git executable
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Describe `checkout`
    ///
    /// Emits `git commit: <sha>`, then `git branch: <name>` unless HEAD is
    /// detached, then one `git remote: <name> <url>` per fetch remote.
    pub fn describe(&self, checkout: &Path) -> Result<Vec<String>> {
        if !checkout.is_dir() {
            return Err(unavailable(checkout, "not a directory"));
        }

        let inside = self.git(checkout, ["rev-parse", "--is-inside-work-tree"])?;
        if inside.trim() != "true" {
            return Err(unavailable(checkout, "not inside a git work tree"));
        }

        let mut tags = Vec::new();

        let commit = self.git(checkout, ["rev-parse", "HEAD"])?;
        tags.push(format!("git commit: {}", commit.trim()));

        let branch = self.git(checkout, ["rev-parse", "--abbrev-ref", "HEAD"])?;
        let branch = branch.trim();
        if branch != "HEAD" {
            tags.push(format!("git branch: {}", branch));
        }

        let remotes = self.git(checkout, ["remote", "-v"])?;
        tags.extend(parse_fetch_remotes(&remotes));

        tracing::debug!(checkout = %checkout.display(), tags = tags.len(), "described git checkout");
        Ok(tags)
    }

    fn git<I, S>(&self, checkout: &Path, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = Command::new(&self.program)
            .arg("-C")
            .arg(checkout)
            .args(args)
            .output()
            .map_err(|e| unavailable(checkout, format!("failed to run git: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(unavailable(checkout, stderr.trim()));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl TagSource for GitProvenance {
    fn tags(&self, checkout: &Path) -> Result<Vec<String>> {
        self.describe(checkout)
    }
}

/// `origin\thttps://host/repo.git (fetch)` lines to `git remote: origin https://host/repo.git`
fn parse_fetch_remotes(listing: &str) -> Vec<String> {
    listing
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let name = parts.next()?;
            let url = parts.next()?;
            (parts.next() == Some("(fetch)")).then(|| format!("git remote: {} {}", name, url))
        })
        .collect()
}

fn unavailable(checkout: &Path, reason: impl Into<String>) -> Error {
    Error::ExternalSourceUnavailable {
        path: checkout.to_path_buf(),
        reason: reason.into(),
    }
}
