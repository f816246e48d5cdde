//! Show a dataset record

use crate::util;
use anyhow::{Context, Result};
use dstrk_core::Sha1Hash;
use dstrk_lineage::record::format_timestamp;
use dstrk_lineage::DatasetRecord;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::Path;

/// JSON shape: the record fields plus its hash
#[derive(Serialize)]
struct DatasetView<'a> {
    hash: &'a Sha1Hash,
    #[serde(flatten)]
    record: &'a DatasetRecord,
}

pub fn run(root: &Path, target: &str, json: bool) -> Result<()> {
    let manager = util::open_manager(root)?;
    let (hash, record) = manager
        .info(target)
        .with_context(|| format!("Failed to look up '{}'", target))?;

    if json {
        let view = DatasetView {
            hash: &hash,
            record: &record,
        };
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    display_record(&hash, &record);
    Ok(())
}

fn display_record(hash: &Sha1Hash, record: &DatasetRecord) {
    println!("{} {}", "Dataset".bold(), hash.yellow());
    println!("{}  {}", "Created".dimmed(), format_timestamp(&record.creation));

    if record.parents.is_empty() {
        println!("{}  {}", "Parents".dimmed(), "none".dimmed());
    } else {
        for parent in &record.parents {
            println!("{}  {}", "Parent ".dimmed(), parent);
        }
    }

    if !record.tags.is_empty() {
        println!("\n{}", "Tags:".bold());
        for tag in &record.tags {
            println!("  - {}", tag.cyan());
        }
    }

    println!("\n{} ({})", "Files:".bold(), record.files.len());
    for file in &record.files {
        println!("  {}  {}", file.path, file.hash.short().dimmed());
    }
}
