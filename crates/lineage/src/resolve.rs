//! Turning user references (file paths, short hashes) into dataset hashes

use crate::record::{DatasetRecord, MembershipRecord};
use dstrk_core::{hash_file, ContentStore, Error, Result, Sha1Hash};
use std::path::{Path, MAIN_SEPARATOR};

/// Shortest hash prefix accepted for expansion
pub const MIN_PREFIX_LEN: usize = 7;

/// Result of looking a file up in the membership index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerLookup {
    content_hash: Sha1Hash,
    dataset: Sha1Hash,
    /// Owning datasets, most recently added first
    owners: Vec<Sha1Hash>,
}

impl OwnerLookup {
    /// `None` when `owners` is empty
    pub fn new(content_hash: Sha1Hash, owners: Vec<Sha1Hash>) -> Option<Self> {
        let dataset = *owners.first()?;
        Some(Self {
            content_hash,
            dataset,
            owners,
        })
    }

    pub fn content_hash(&self) -> Sha1Hash {
        self.content_hash
    }

    /// The dataset a path resolves to: the most recent owner
    pub fn dataset(&self) -> Sha1Hash {
        self.dataset
    }

    pub fn owners(&self) -> &[Sha1Hash] {
        &self.owners
    }

    pub fn is_ambiguous(&self) -> bool {
        self.owners.len() > 1
    }
}

/// Read-only lookups over a store
///
/// Callers hold whatever store lock the surrounding operation needs; the
/// resolver never locks on its own.
#[derive(Debug, Clone, Copy)]
pub struct HashResolver<'a> {
    store: &'a ContentStore,
}

impl<'a> HashResolver<'a> {
    pub fn new(store: &'a ContentStore) -> Self {
        Self { store }
    }

    /// Content hash of a file's bytes
    pub fn file_content_hash(&self, path: &Path) -> Result<Sha1Hash> {
        hash_file(path)
    }

    /// Datasets owning the content currently at `path`
    ///
    /// `None` when the path is not a regular file or its content is not
    /// tracked.
    pub fn owner_of(&self, path: &Path) -> Result<Option<OwnerLookup>> {
        if !path.is_file() {
            return Ok(None);
        }

        let content_hash = self.file_content_hash(path)?;
        let lookup = MembershipRecord::load(self.store, &content_hash)?
            .and_then(|membership| OwnerLookup::new(content_hash, membership.owners));
        Ok(lookup)
    }

    /// Expand a hash prefix to the single stored hash it names
    ///
    /// Prefixes shorter than [`MIN_PREFIX_LEN`] never match. More than one
    /// match is an error, never an arbitrary pick.
    pub fn expand_short_hash(&self, prefix: &str) -> Result<Option<Sha1Hash>> {
        if prefix.len() < MIN_PREFIX_LEN {
            return Ok(None);
        }

        let mut matches = self.store.list_prefix(prefix)?;
        match matches.len() {
            0 => Ok(None),
            1 => Ok(matches.pop()),
            n => Err(Error::AmbiguousReference {
                reference: prefix.to_string(),
                matches: n,
            }),
        }
    }

    /// Resolve a file path or (short) dataset hash to a dataset hash
    pub fn resolve(&self, reference: &str) -> Result<Sha1Hash> {
        // 1. As a path
        if let Some(lookup) = self.owner_of(Path::new(reference))? {
            if lookup.is_ambiguous() {
                tracing::warn!(
                    file = reference,
                    owners = lookup.owners().len(),
                    using = %lookup.dataset().short(),
                    "file is part of several datasets, using the most recent"
                );
            }
            return Ok(lookup.dataset());
        }

        // 2. As a hash, unless it is plainly a path
        if reference.starts_with('/') || reference.starts_with(MAIN_SEPARATOR) {
            return Err(Error::unresolvable(reference));
        }

        let hash = self
            .expand_short_hash(reference)?
            .ok_or_else(|| Error::unresolvable(reference))?;

        // 3. The hash must name a dataset, not a membership record
        match DatasetRecord::load(self.store, &hash) {
            Ok(_) => Ok(hash),
            Err(Error::MalformedRecord { .. }) | Err(Error::ObjectNotFound { .. }) => {
                Err(Error::unresolvable(reference))
            }
            Err(e) => Err(e),
        }
    }
}
