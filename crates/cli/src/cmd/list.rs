//! List all datasets

use crate::util;
use anyhow::Result;
use dstrk_core::Sha1Hash;
use dstrk_lineage::record::format_timestamp;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct DatasetSummary {
    hash: Sha1Hash,
    creation: String,
    parents: usize,
    files: usize,
    tags: Vec<String>,
}

pub fn run(root: &Path, json: bool) -> Result<()> {
    let manager = util::open_manager(root)?;
    let summaries: Vec<DatasetSummary> = manager
        .datasets()?
        .into_iter()
        .map(|(hash, record)| DatasetSummary {
            hash,
            creation: format_timestamp(&record.creation),
            parents: record.parents.len(),
            files: record.files.len(),
            tags: record.tags,
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!("{}", "No datasets".dimmed());
        return Ok(());
    }

    for summary in &summaries {
        println!(
            "{}  {}  {} file(s)  {}",
            summary.hash.short().yellow(),
            summary.creation.dimmed(),
            summary.files,
            summary.tags.join(", ").cyan()
        );
    }
    Ok(())
}
