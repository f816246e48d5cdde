//! Check store consistency

use crate::util;
use anyhow::Result;
use owo_colors::OwoColorize;
use std::path::Path;

pub fn run(root: &Path) -> Result<()> {
    let manager = util::open_manager(root)?;
    let report = manager.verify()?;

    println!(
        "Checked {} dataset(s), {} file record(s)",
        report.datasets, report.memberships
    );

    if report.is_clean() {
        println!("{} Store is consistent", "✓".green());
        return Ok(());
    }

    for issue in &report.issues {
        println!("  {} {}", "✗".red(), issue);
    }
    anyhow::bail!("Found {} problem(s) in store", report.issues.len())
}
