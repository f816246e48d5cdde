//! Store consistency check
//!
//! Cross-checks dataset records against membership records. Read-only:
//! problems are reported, never repaired.

use crate::lineage::LineageManager;
use crate::record::{DatasetRecord, MembershipRecord};
use ahash::AHashMap;
use dstrk_core::{ContentStore, Result, Sha1Hash};
use serde::Serialize;
use std::fmt;

/// A single inconsistency
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Issue {
    /// Dataset lists a file whose content has no membership record
    MissingMembership {
        dataset: Sha1Hash,
        file_hash: Sha1Hash,
        path: String,
    },
    /// Membership record exists but does not name the dataset
    OwnerNotListed {
        dataset: Sha1Hash,
        file_hash: Sha1Hash,
        path: String,
    },
    /// Membership names an owner that is not a dataset
    DanglingOwner { file_hash: Sha1Hash, owner: Sha1Hash },
    /// Membership names a dataset that no longer lists the content
    OwnerWithoutFile { file_hash: Sha1Hash, owner: Sha1Hash },
    /// Membership record with no owners at all
    OrphanMembership { file_hash: Sha1Hash },
    MissingParent { dataset: Sha1Hash, parent: Sha1Hash },
    /// Entry that decodes as neither record kind
    Unreadable { hash: Sha1Hash, reason: String },
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::MissingMembership {
                dataset,
                file_hash,
                path,
            } => write!(
                f,
                "dataset {} lists {} ({}) but no membership record exists",
                dataset.short(),
                path,
                file_hash.short()
            ),
            Issue::OwnerNotListed {
                dataset,
                file_hash,
                path,
            } => write!(
                f,
                "dataset {} lists {} ({}) but is not among its owners",
                dataset.short(),
                path,
                file_hash.short()
            ),
            Issue::DanglingOwner { file_hash, owner } => write!(
                f,
                "file {} is owned by {} which is not a dataset",
                file_hash.short(),
                owner.short()
            ),
            Issue::OwnerWithoutFile { file_hash, owner } => write!(
                f,
                "file {} is owned by {} which does not list it",
                file_hash.short(),
                owner.short()
            ),
            Issue::OrphanMembership { file_hash } => {
                write!(f, "file {} has a membership record with no owners", file_hash.short())
            }
            Issue::MissingParent { dataset, parent } => write!(
                f,
                "dataset {} names missing parent {}",
                dataset.short(),
                parent.short()
            ),
            Issue::Unreadable { hash, reason } => write!(f, "entry {} is unreadable: {}", hash, reason),
        }
    }
}

/// Outcome of [`LineageManager::verify`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct VerifyReport {
    pub datasets: usize,
    pub memberships: usize,
    pub issues: Vec<Issue>,
}

impl VerifyReport {
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

impl LineageManager {
    /// Check every record in the store
    pub fn verify(&self) -> Result<VerifyReport> {
        let _lock = self.store().lock_shared()?;
        verify_store(self.store())
    }
}

fn verify_store(store: &ContentStore) -> Result<VerifyReport> {
    let mut datasets: AHashMap<Sha1Hash, DatasetRecord> = AHashMap::new();
    let mut memberships: AHashMap<Sha1Hash, MembershipRecord> = AHashMap::new();
    let mut issues = Vec::new();

    for hash in store.all_hashes()? {
        let bytes = store.get(&hash)?;
        if let Ok(record) = DatasetRecord::decode(&hash, &bytes) {
            datasets.insert(hash, record);
            continue;
        }
        match MembershipRecord::decode(&hash, &bytes) {
            Ok(record) => {
                memberships.insert(hash, record);
            }
            Err(e) => issues.push(Issue::Unreadable {
                hash,
                reason: e.to_string(),
            }),
        }
    }

    // Walk in hash order so reports are stable
    let mut sorted_datasets: Vec<(&Sha1Hash, &DatasetRecord)> = datasets.iter().collect();
    sorted_datasets.sort_by_key(|(hash, _)| *hash);
    for (dataset, record) in sorted_datasets {
        for file in &record.files {
            match memberships.get(&file.hash) {
                None => issues.push(Issue::MissingMembership {
                    dataset: *dataset,
                    file_hash: file.hash,
                    path: file.path.clone(),
                }),
                Some(m) if !m.owners.contains(dataset) => issues.push(Issue::OwnerNotListed {
                    dataset: *dataset,
                    file_hash: file.hash,
                    path: file.path.clone(),
                }),
                Some(_) => {}
            }
        }
        for parent in &record.parents {
            if !datasets.contains_key(parent) {
                issues.push(Issue::MissingParent {
                    dataset: *dataset,
                    parent: *parent,
                });
            }
        }
    }

    let mut sorted_memberships: Vec<(&Sha1Hash, &MembershipRecord)> = memberships.iter().collect();
    sorted_memberships.sort_by_key(|(hash, _)| *hash);
    for (file_hash, membership) in sorted_memberships {
        if membership.owners.is_empty() {
            issues.push(Issue::OrphanMembership {
                file_hash: *file_hash,
            });
        }
        for owner in &membership.owners {
            match datasets.get(owner) {
                None => issues.push(Issue::DanglingOwner {
                    file_hash: *file_hash,
                    owner: *owner,
                }),
                Some(record) if !record.contains_hash(file_hash) => {
                    issues.push(Issue::OwnerWithoutFile {
                        file_hash: *file_hash,
                        owner: *owner,
                    })
                }
                Some(_) => {}
            }
        }
    }

    if !issues.is_empty() {
        tracing::warn!(issues = issues.len(), "store verification found problems");
    }

    Ok(VerifyReport {
        datasets: datasets.len(),
        memberships: memberships.len(),
        issues,
    })
}
