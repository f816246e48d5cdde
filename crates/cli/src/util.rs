//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use dstrk_lineage::{LineageManager, LineageNode};
use dstrk_provenance::GitProvenance;
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::Level;

/// Install the stderr log subscriber
///
/// Each `-v` raises the level one step above the configured one.
pub fn init_logging(verbose: u8, configured: &str) {
    let level = match verbose {
        0 => Level::from_str(configured).unwrap_or(Level::WARN),
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Expand a leading `~` against the home directory
pub fn expand_tilde(path: &str) -> Result<PathBuf> {
    if path == "~" {
        return dirs::home_dir().context("Could not determine home directory");
    }
    match path.strip_prefix("~/") {
        Some(rest) => Ok(dirs::home_dir()
            .context("Could not determine home directory")?
            .join(rest)),
        None => Ok(PathBuf::from(path)),
    }
}

/// Open the store at `root` with git provenance enabled
pub fn open_manager(root: &Path) -> Result<LineageManager> {
    let manager = LineageManager::open(root)?;
    Ok(manager.with_tag_source(GitProvenance::new()))
}

/// Render a lineage tree, one dataset per line
pub fn render_tree(node: &LineageNode) -> String {
    let mut out = String::new();
    out.push_str(&node_label(node));
    out.push('\n');
    render_parents(node, "", &mut out);
    out
}

fn render_parents(node: &LineageNode, prefix: &str, out: &mut String) {
    let count = node.parents.len();
    for (i, parent) in node.parents.iter().enumerate() {
        let last = i + 1 == count;
        let (branch, indent) = if last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        out.push_str(prefix);
        out.push_str(branch);
        out.push_str(&node_label(parent));
        out.push('\n');
        render_parents(parent, &format!("{}{}", prefix, indent), out);
    }
}

fn node_label(node: &LineageNode) -> String {
    if node.tags.is_empty() {
        node.hash.to_hex()
    } else {
        format!("{} {}", node.hash.to_hex(), format!("[{}]", node.tags.join(", ")).dimmed())
    }
}
