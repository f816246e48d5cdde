//! Create a dataset from files

use crate::util;
use anyhow::{Context, Result};
use dstrk_lineage::NewDataset;
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

pub fn run(
    root: &Path,
    files: Vec<String>,
    parents: Vec<String>,
    tags: Vec<String>,
    git_repos: Vec<PathBuf>,
) -> Result<()> {
    let manager = util::open_manager(root)?;

    let request = NewDataset {
        patterns: files,
        parents,
        tags,
        provenance: git_repos,
    };
    let hash = manager.create(&request).context("Failed to create dataset")?;

    // Hash alone on stdout so it can be captured by scripts
    println!("{}", hash);
    eprintln!("{} Created dataset {}", "✓".green(), hash.short().yellow());
    Ok(())
}
