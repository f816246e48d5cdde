//! Error types shared by every dstrk crate.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the dstrk crates.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the store, the resolver and the lineage manager.
///
/// None of these are retried internally. Each one names a precondition the
/// caller has to fix (missing store, missing files, bad reference).
#[derive(Debug, Error)]
pub enum Error {
    /// `init` was called on a root that already exists.
    #[error("Store already initialized at {}", root.display())]
    StoreAlreadyInitialized { root: PathBuf },

    /// The store root does not exist.
    #[error("Store not initialized at {} (run `dstrk init`)", root.display())]
    StoreNotInitialized { root: PathBuf },

    /// Glob expansion produced no files.
    #[error("No files match {}", patterns.join(", "))]
    NoMatchingFiles { patterns: Vec<String> },

    /// Neither a tracked file nor a known dataset hash.
    #[error("Not a tracked file or dataset hash: '{reference}'")]
    UnresolvableReference { reference: String },

    /// A short hash matched more than one stored entry.
    #[error("Ambiguous hash prefix '{reference}': matches {matches} entries")]
    AmbiguousReference { reference: String, matches: usize },

    /// A parent does not name an existing dataset.
    #[error("Parent '{reference}' is not an existing dataset")]
    InvalidParentReference { reference: String },

    /// The external provenance source could not produce tags.
    #[error("Provenance source unavailable at {}: {reason}", path.display())]
    ExternalSourceUnavailable { path: PathBuf, reason: String },

    /// Lineage traversal came back to a dataset already on the current path.
    #[error("Cyclic lineage detected at dataset {hash}")]
    CyclicLineage { hash: String },

    /// No entry stored under this hash.
    #[error("Object not found: {hash}")]
    ObjectNotFound { hash: String },

    /// Not a 40 character hexadecimal digest.
    #[error("Invalid hash '{value}': {reason}")]
    InvalidHash { value: String, reason: String },

    /// Stored bytes do not follow the record grammar.
    #[error("Malformed record {hash}: {reason}")]
    MalformedRecord { hash: String, reason: String },

    /// Path cannot be represented in the line-oriented record format.
    #[error("Unsupported path {}: {reason}", path.display())]
    UnsupportedPath { path: PathBuf, reason: String },

    /// Tag cannot be represented in the line-oriented record format.
    #[error("Invalid tag {tag:?}: tags may not contain line breaks")]
    InvalidTag { tag: String },

    /// Glob pattern failed to compile.
    #[error("Invalid file pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Another writer holds the store lock.
    #[error("Store at {} is locked by another process", root.display())]
    StoreLocked { root: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an unresolvable-reference error.
    pub fn unresolvable(reference: impl Into<String>) -> Self {
        Self::UnresolvableReference {
            reference: reference.into(),
        }
    }

    /// Create a malformed-record error.
    pub fn malformed(hash: impl ToString, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            hash: hash.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_keeps_path() {
        let err = Error::io(
            "/data/a.txt",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, Error::Io { .. }));
        assert!(err.to_string().contains("/data/a.txt"));
    }

    #[test]
    fn test_no_matching_files_lists_patterns() {
        let err = Error::NoMatchingFiles {
            patterns: vec!["*.csv".to_string(), "raw/*.bin".to_string()],
        };
        assert_eq!(err.to_string(), "No files match *.csv, raw/*.bin");
    }
}
