//! Glob expansion for file selections
//!
//! A pattern without glob metacharacters names a single file. Otherwise the
//! pattern is walked from its literal directory prefix: `*`, `?` and `[..]`
//! stay within one path component, `**` crosses directories.

use dstrk_core::{Error, Result};
use globset::GlobBuilder;
use std::collections::BTreeSet;
use std::path::PathBuf;
use walkdir::WalkDir;

const META: &[char] = &['*', '?', '[', '{'];

/// Expand every pattern into existing regular files, de-duplicated and
/// sorted lexicographically. Patterns that match nothing contribute nothing.
pub fn expand_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<PathBuf>> {
    let mut found = BTreeSet::new();
    for pattern in patterns {
        expand_one(pattern.as_ref(), &mut found)?;
    }
    Ok(found.into_iter().collect())
}

fn has_meta(component: &str) -> bool {
    component.contains(META)
}

fn expand_one(pattern: &str, found: &mut BTreeSet<PathBuf>) -> Result<()> {
    if !has_meta(pattern) {
        let path = PathBuf::from(pattern);
        if path.is_file() {
            found.insert(path);
        } else {
            tracing::debug!(pattern, "no such file");
        }
        return Ok(());
    }

    let matcher = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| Error::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?
        .compile_matcher();

    let (base, max_depth) = literal_base(pattern);
    let implicit_base = base.as_os_str().is_empty();
    let walk_root = if implicit_base {
        PathBuf::from(".")
    } else {
        base
    };

    let mut walker = WalkDir::new(&walk_root).min_depth(1).follow_links(true);
    if let Some(depth) = max_depth {
        walker = walker.max_depth(depth);
    }

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(pattern, error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let candidate = if implicit_base {
            entry
                .path()
                .strip_prefix(".")
                .unwrap_or(entry.path())
                .to_path_buf()
        } else {
            entry.path().to_path_buf()
        };

        if matcher.is_match(&candidate) {
            found.insert(candidate);
        }
    }

    Ok(())
}

/// Split a pattern into the directory to walk from and how deep to walk
///
/// `data/raw/*.csv` walks `data/raw` one level; `data/**/x` is unbounded.
fn literal_base(pattern: &str) -> (PathBuf, Option<usize>) {
    let components: Vec<&str> = pattern.split('/').collect();
    let literal = components
        .iter()
        .take_while(|c| !has_meta(c))
        .count()
        // The final component always belongs to the walk
        .min(components.len() - 1);

    let base = components[..literal].join("/");
    let base = if base.is_empty() && pattern.starts_with('/') {
        PathBuf::from("/")
    } else {
        PathBuf::from(base)
    };

    let rest = &components[literal..];
    let depth = if rest.iter().any(|c| c.contains("**")) {
        None
    } else {
        Some(rest.len())
    };

    (base, depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, path.to_string_lossy().as_bytes()).unwrap();
    }

    fn s(path: &Path) -> String {
        path.to_str().unwrap().to_string()
    }

    #[test]
    fn test_literal_base() {
        assert_eq!(literal_base("*.txt"), (PathBuf::new(), Some(1)));
        assert_eq!(
            literal_base("data/raw/*.csv"),
            (PathBuf::from("data/raw"), Some(1))
        );
        assert_eq!(literal_base("data/*/a.txt"), (PathBuf::from("data"), Some(2)));
        assert_eq!(literal_base("data/**/a.txt"), (PathBuf::from("data"), None));
        assert_eq!(literal_base("/*.txt"), (PathBuf::from("/"), Some(1)));
    }

    #[test]
    fn test_star_stays_in_directory() -> Result<()> {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        touch(&root.join("b.txt"));
        touch(&root.join("a.txt"));
        touch(&root.join("c.csv"));
        touch(&root.join("sub/d.txt"));

        let files = expand_patterns(&[format!("{}/*.txt", s(root))])?;
        assert_eq!(files, vec![root.join("a.txt"), root.join("b.txt")]);
        Ok(())
    }

    #[test]
    fn test_double_star_recurses() -> Result<()> {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        touch(&root.join("a.txt"));
        touch(&root.join("sub/deeper/d.txt"));

        let files = expand_patterns(&[format!("{}/**/*.txt", s(root))])?;
        assert!(files.contains(&root.join("sub/deeper/d.txt")));
        Ok(())
    }

    #[test]
    fn test_literal_path_and_dedup() -> Result<()> {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        touch(&root.join("a.txt"));

        let literal = s(&root.join("a.txt"));
        let files = expand_patterns(&[literal.clone(), format!("{}/*.txt", s(root)), literal])?;
        assert_eq!(files, vec![root.join("a.txt")]);
        Ok(())
    }

    #[test]
    fn test_no_match_is_empty() -> Result<()> {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();

        let files = expand_patterns(&[
            format!("{}/*.nothing", s(root)),
            s(&root.join("missing.txt")),
        ])?;
        assert!(files.is_empty());
        Ok(())
    }

    #[test]
    fn test_directories_are_not_files() -> Result<()> {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("dir.txt")).unwrap();

        assert!(expand_patterns(&[format!("{}/*.txt", s(root))])?.is_empty());
        assert!(expand_patterns(&[s(&root.join("dir.txt"))])?.is_empty());
        Ok(())
    }

    #[test]
    fn test_invalid_pattern() {
        let result = expand_patterns(&["data/[a-".to_string()]);
        assert!(matches!(result, Err(Error::InvalidPattern { .. })));
    }
}
