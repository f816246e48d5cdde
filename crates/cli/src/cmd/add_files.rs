//! Add files to an existing dataset

use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;

pub fn run(root: &Path, files: &[String], target: &str) -> Result<()> {
    let manager = util::open_manager(root)?;

    let hash = manager
        .add_files(files, target)
        .with_context(|| format!("Failed to add files to '{}'", target))?;

    println!("{} Updated dataset {}", "✓".green(), hash.short().yellow());
    Ok(())
}
