//! dstrk core - content-addressed storage primitives for the dataset tracker
//!
//! This crate provides the foundational storage layer:
//! - SHA-1 hashing of file contents and records
//! - Sharded key/value object store with atomic writes
//! - Store-level advisory locking
//! - The error taxonomy shared by every dstrk crate

pub mod error;
pub mod hash;
pub mod lock;
pub mod store;

// Re-export main types for convenience
pub use error::{Error, Result};
pub use hash::{hash_bytes, hash_file, IncrementalHasher, Sha1Hash};
pub use lock::{LockMode, StoreLock};
pub use store::ContentStore;
