//! Initialize a new store

use anyhow::{Context, Result};
use dstrk_core::ContentStore;
use owo_colors::OwoColorize;
use std::path::Path;

pub fn run(root: &Path) -> Result<()> {
    ContentStore::init(root)
        .with_context(|| format!("Failed to initialize store at {}", root.display()))?;

    println!(
        "{} Initialized empty dstrk store at {}",
        "✓".green(),
        root.display()
    );
    Ok(())
}
