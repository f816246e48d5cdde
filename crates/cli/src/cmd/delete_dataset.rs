//! Delete a dataset

use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;

pub fn run(root: &Path, target: &str) -> Result<()> {
    let manager = util::open_manager(root)?;

    let hash = manager
        .delete(target)
        .with_context(|| format!("Failed to delete dataset '{}'", target))?;

    println!("{} Deleted dataset {}", "✓".green(), hash.short().yellow());
    Ok(())
}
