//! Dataset records, hash resolution and lineage management
//!
//! This crate provides:
//! - The line-oriented codec for dataset and file-membership records
//! - Glob expansion of file selections
//! - Resolution of file paths and (short) hashes to dataset hashes
//! - Dataset create / add-files / delete / delete-files with reference
//!   counted file membership, and parent tree construction
//! - Read-only store verification

pub mod files;
pub mod lineage;
pub mod record;
pub mod resolve;
pub mod source;
pub mod verify;

// Re-exports
pub use lineage::{FilesRemoval, HashCache, LineageManager, LineageNode, NewDataset};
pub use record::{DatasetRecord, FileEntry, MembershipRecord};
pub use resolve::{HashResolver, OwnerLookup, MIN_PREFIX_LEN};
pub use source::TagSource;
pub use verify::{Issue, VerifyReport};
