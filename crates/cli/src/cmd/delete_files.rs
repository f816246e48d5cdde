//! Stop tracking files

use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::path::Path;

pub fn run(root: &Path, files: &[String]) -> Result<()> {
    let manager = util::open_manager(root)?;

    let removal = manager
        .delete_files(files)
        .context("Failed to delete files")?;

    if removal.files_untracked.is_empty() {
        println!("{}", "No tracked files matched".dimmed());
        return Ok(());
    }

    println!(
        "{} Untracked {} file(s)",
        "✓".green(),
        removal.files_untracked.len()
    );
    for hash in &removal.datasets_updated {
        println!("  {} {}", "updated".cyan(), hash.short());
    }
    for hash in &removal.datasets_removed {
        println!("  {} {} (no files left)", "deleted".red(), hash.short());
    }
    Ok(())
}
