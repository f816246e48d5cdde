//! Dataset lifecycle and lineage traversal
//!
//! Every mutation holds the store's exclusive lock for its whole duration;
//! reads hold a shared lock. Individual record writes are atomic, but a
//! mutation touching several records is not: a crash midway can leave
//! membership records stale, which `verify` reports.

use crate::files::expand_patterns;
use crate::record::{DatasetRecord, FileEntry, MembershipRecord};
use crate::resolve::HashResolver;
use crate::source::TagSource;
use ahash::{AHashMap, AHashSet};
use dstrk_core::{ContentStore, Error, Result, Sha1Hash};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Content hashes already computed, keyed by path
pub type HashCache = AHashMap<PathBuf, Sha1Hash>;

/// Arguments for [`LineageManager::create`]
#[derive(Debug, Clone, Default)]
pub struct NewDataset {
    /// File paths or glob patterns
    pub patterns: Vec<String>,
    /// Parent references (paths or hashes)
    pub parents: Vec<String>,
    pub tags: Vec<String>,
    /// Checkouts whose description is appended to the tags
    pub provenance: Vec<PathBuf>,
}

/// One dataset in a lineage tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineageNode {
    pub hash: Sha1Hash,
    pub tags: Vec<String>,
    pub parents: Vec<LineageNode>,
}

/// What [`LineageManager::delete_files`] changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilesRemoval {
    pub files_untracked: Vec<PathBuf>,
    pub datasets_updated: Vec<Sha1Hash>,
    pub datasets_removed: Vec<Sha1Hash>,
}

pub struct LineageManager {
    store: ContentStore,
    tag_source: Option<Box<dyn TagSource>>,
}

impl LineageManager {
    pub fn new(store: ContentStore) -> Self {
        Self {
            store,
            tag_source: None,
        }
    }

    /// Open an existing store
    pub fn open(root: &Path) -> Result<Self> {
        Ok(Self::new(ContentStore::open(root)?))
    }

    /// Use `source` to describe provenance checkouts
    pub fn with_tag_source(mut self, source: impl TagSource + 'static) -> Self {
        self.tag_source = Some(Box::new(source));
        self
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    pub fn resolver(&self) -> HashResolver<'_> {
        HashResolver::new(&self.store)
    }

    /// Resolve a path or hash to a dataset hash
    pub fn resolve(&self, reference: &str) -> Result<Sha1Hash> {
        let _lock = self.store.lock_shared()?;
        self.resolver().resolve(reference)
    }

    /// Create a dataset from the files matching `request.patterns`
    pub fn create(&self, request: &NewDataset) -> Result<Sha1Hash> {
        let _lock = self.store.lock()?;

        let files = expand_patterns(&request.patterns)?;
        if files.is_empty() {
            return Err(Error::NoMatchingFiles {
                patterns: request.patterns.clone(),
            });
        }

        let resolver = self.resolver();
        let parents = request
            .parents
            .iter()
            .map(|parent| resolver.resolve(parent).map_err(as_parent_error))
            .collect::<Result<Vec<_>>>()?;

        let mut tags = request.tags.clone();
        for checkout in &request.provenance {
            tags.extend(self.provenance_tags(checkout)?);
        }

        let record = DatasetRecord::new(parents, tags, Vec::new());
        let hash = self.persist(record, &files, &mut HashCache::new(), None)?;

        info!(dataset = %hash, files = files.len(), "created dataset");
        Ok(hash)
    }

    /// Add files to an existing dataset, keeping its hash
    pub fn add_files<S: AsRef<str>>(&self, patterns: &[S], target: &str) -> Result<Sha1Hash> {
        let _lock = self.store.lock()?;

        let dataset = self.resolver().resolve(target)?;
        let record = DatasetRecord::load(&self.store, &dataset)?;

        let added = expand_patterns(patterns)?;
        if added.is_empty() {
            return Err(Error::NoMatchingFiles {
                patterns: patterns.iter().map(|p| p.as_ref().to_string()).collect(),
            });
        }

        // Existing entries keep the hash recorded when they were added
        let mut cache = HashCache::with_capacity(record.files.len() + added.len());
        let mut files: Vec<PathBuf> = Vec::with_capacity(record.files.len() + added.len());
        for entry in &record.files {
            let path = PathBuf::from(&entry.path);
            cache.insert(path.clone(), entry.hash);
            files.push(path);
        }
        files.extend(added);
        files.sort();
        files.dedup();

        let count = files.len();
        self.persist(record, &files, &mut cache, Some(dataset))?;

        info!(dataset = %dataset, files = count, "updated dataset");
        Ok(dataset)
    }

    /// Remove a dataset and drop it from every membership record
    pub fn delete(&self, target: &str) -> Result<Sha1Hash> {
        let _lock = self.store.lock()?;

        let dataset = self.resolver().resolve(target)?;
        let record = DatasetRecord::load(&self.store, &dataset)?;

        let mut seen = AHashSet::with_capacity(record.files.len());
        for entry in &record.files {
            if seen.insert(entry.hash) {
                self.unlink(&dataset, &entry.hash)?;
            }
        }

        self.store.remove(&dataset)?;
        info!(dataset = %dataset, "deleted dataset");
        Ok(dataset)
    }

    /// Stop tracking the files matching `patterns`
    ///
    /// Each file's membership record is removed and the file is dropped from
    /// every dataset listing it. A dataset left without files is deleted.
    pub fn delete_files<S: AsRef<str>>(&self, patterns: &[S]) -> Result<FilesRemoval> {
        let _lock = self.store.lock()?;

        let files = expand_patterns(patterns)?;
        if files.is_empty() {
            return Err(Error::NoMatchingFiles {
                patterns: patterns.iter().map(|p| p.as_ref().to_string()).collect(),
            });
        }

        let resolver = self.resolver();
        let mut removal = FilesRemoval::default();
        let mut removed_hashes = AHashSet::new();
        // Owners in first-seen order
        let mut affected: Vec<Sha1Hash> = Vec::new();

        for path in files {
            let content_hash = resolver.file_content_hash(&path)?;
            let Some(membership) = MembershipRecord::load(&self.store, &content_hash)? else {
                debug!(file = %path.display(), "not tracked, skipping");
                continue;
            };

            self.store.remove(&content_hash)?;
            removed_hashes.insert(content_hash);
            for owner in membership.owners {
                if !affected.contains(&owner) {
                    affected.push(owner);
                }
            }
            removal.files_untracked.push(path);
        }

        for dataset in affected {
            let mut record = match DatasetRecord::load(&self.store, &dataset) {
                Ok(record) => record,
                Err(Error::ObjectNotFound { .. }) => {
                    warn!(dataset = %dataset, "membership names a missing dataset");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let remaining: Vec<FileEntry> = record
                .files
                .iter()
                .filter(|f| !removed_hashes.contains(&f.hash))
                .cloned()
                .collect();

            if remaining.is_empty() {
                self.store.remove(&dataset)?;
                info!(dataset = %dataset, "deleted dataset with no remaining files");
                removal.datasets_removed.push(dataset);
            } else {
                record.set_files(remaining);
                record.save(&self.store, Some(dataset))?;
                removal.datasets_updated.push(dataset);
            }
        }

        Ok(removal)
    }

    /// Lineage tree rooted at the referenced dataset
    ///
    /// Shared ancestors are expanded once per path that reaches them.
    pub fn tree(&self, target: &str) -> Result<LineageNode> {
        let _lock = self.store.lock_shared()?;

        let root = self.resolver().resolve(target)?;
        let mut path = Vec::new();
        self.build_node(root, &mut path)
    }

    /// Hash and record of the referenced dataset
    pub fn info(&self, target: &str) -> Result<(Sha1Hash, DatasetRecord)> {
        let _lock = self.store.lock_shared()?;

        let dataset = self.resolver().resolve(target)?;
        let record = DatasetRecord::load(&self.store, &dataset)?;
        Ok((dataset, record))
    }

    /// Every dataset in the store, oldest first
    pub fn datasets(&self) -> Result<Vec<(Sha1Hash, DatasetRecord)>> {
        let _lock = self.store.lock_shared()?;

        let mut datasets = Vec::new();
        for hash in self.store.all_hashes()? {
            let bytes = self.store.get(&hash)?;
            // Membership records fail to decode as datasets
            if let Ok(record) = DatasetRecord::decode(&hash, &bytes) {
                datasets.push((hash, record));
            }
        }

        datasets.sort_by(|(ha, a), (hb, b)| a.creation.cmp(&b.creation).then(ha.cmp(hb)));
        Ok(datasets)
    }

    fn build_node(&self, hash: Sha1Hash, path: &mut Vec<Sha1Hash>) -> Result<LineageNode> {
        if path.contains(&hash) {
            return Err(Error::CyclicLineage {
                hash: hash.to_hex(),
            });
        }

        let record = match DatasetRecord::load(&self.store, &hash) {
            Ok(record) => record,
            // Only parents can be missing here; the root was just resolved
            Err(Error::ObjectNotFound { .. }) => {
                return Err(Error::InvalidParentReference {
                    reference: hash.to_hex(),
                })
            }
            Err(e) => return Err(e),
        };

        path.push(hash);
        let parents = record
            .parents
            .iter()
            .map(|parent| self.build_node(*parent, path))
            .collect::<Result<Vec<_>>>()?;
        path.pop();

        Ok(LineageNode {
            hash,
            tags: record.tags,
            parents,
        })
    }

    fn provenance_tags(&self, checkout: &Path) -> Result<Vec<String>> {
        match &self.tag_source {
            Some(source) => source.tags(checkout),
            None => Err(Error::ExternalSourceUnavailable {
                path: checkout.to_path_buf(),
                reason: "no provenance source configured".to_string(),
            }),
        }
    }

    /// Hash the files, write the record, then index each file
    fn persist(
        &self,
        mut record: DatasetRecord,
        files: &[PathBuf],
        cache: &mut HashCache,
        identity: Option<Sha1Hash>,
    ) -> Result<Sha1Hash> {
        let resolver = self.resolver();

        let mut entries = Vec::with_capacity(files.len());
        for path in files {
            let hash = match cache.get(path) {
                Some(hash) => *hash,
                None => {
                    let hash = resolver.file_content_hash(path)?;
                    cache.insert(path.clone(), hash);
                    hash
                }
            };
            entries.push(FileEntry::new(path, hash)?);
        }
        record.set_files(entries);

        let dataset = record.save(&self.store, identity)?;
        debug!(dataset = %dataset, "wrote dataset record");

        for entry in &record.files {
            self.link(&dataset, entry)?;
        }
        Ok(dataset)
    }

    fn link(&self, dataset: &Sha1Hash, entry: &FileEntry) -> Result<()> {
        match MembershipRecord::load(&self.store, &entry.hash)? {
            Some(membership) if membership.owners.contains(dataset) => Ok(()),
            Some(mut membership) => {
                warn!(
                    file = %entry.path,
                    owners = membership.owners.len(),
                    "content already tracked by another dataset"
                );
                membership.add_owner(*dataset);
                membership.path = entry.path.clone();
                membership.save(&self.store, &entry.hash)
            }
            None => MembershipRecord::new(*dataset, entry.path.clone()).save(&self.store, &entry.hash),
        }
    }

    fn unlink(&self, dataset: &Sha1Hash, content_hash: &Sha1Hash) -> Result<()> {
        let Some(mut membership) = MembershipRecord::load(&self.store, content_hash)? else {
            warn!(file_hash = %content_hash, "missing membership record");
            return Ok(());
        };

        membership.remove_owner(dataset);
        if membership.owners.is_empty() {
            self.store.remove(content_hash)
        } else {
            membership.save(&self.store, content_hash)
        }
    }
}

fn as_parent_error(error: Error) -> Error {
    match error {
        Error::UnresolvableReference { reference } => Error::InvalidParentReference { reference },
        other => other,
    }
}
