//! Show a dataset's lineage

use crate::util;
use anyhow::{Context, Result};
use std::path::Path;

pub fn run(root: &Path, target: &str, json: bool) -> Result<()> {
    let manager = util::open_manager(root)?;
    let tree = manager
        .tree(target)
        .with_context(|| format!("Failed to build lineage for '{}'", target))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tree)?);
    } else {
        print!("{}", util::render_tree(&tree));
    }
    Ok(())
}
