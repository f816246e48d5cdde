//! Dataset and file-membership records
//!
//! Dataset record text layout (field order fixed, blank lines structural):
//! ```text
//! Creation:  2024-01-01T00:00:00.000000Z
//!
//! Parents:  <hash> <hash>
//!
//! Tags:
//!  - <tag>
//!
//! <path>  <file hash>
//! ```
//! Lines are classified by prefix, so file paths may not contain whitespace
//! or start with a header keyword.
//!
//! Membership record layout: owners (space separated, newest first), then
//! the last path seen for the content hash.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, SubsecRound, Utc};
use dstrk_core::{hash_bytes, ContentStore, Error, Result, Sha1Hash};
use serde::Serialize;
use std::path::Path;

const CREATION: &str = "Creation:";
const PARENTS: &str = "Parents:";
const TAGS: &str = "Tags:";
const TAG_ITEM: &str = " - ";

/// One tracked file: the path as given and the hash of its bytes when added
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub path: String,
    pub hash: Sha1Hash,
}

impl FileEntry {
    /// Build an entry, rejecting paths the record format cannot hold
    pub fn new(path: &Path, hash: Sha1Hash) -> Result<Self> {
        let text = path.to_str().ok_or_else(|| Error::UnsupportedPath {
            path: path.to_path_buf(),
            reason: "path is not valid UTF-8".to_string(),
        })?;
        check_path(text)?;

        Ok(Self {
            path: text.to_string(),
            hash,
        })
    }
}

fn check_path(path: &str) -> Result<()> {
    if path.is_empty() || path.chars().any(char::is_whitespace) {
        return Err(Error::UnsupportedPath {
            path: path.into(),
            reason: "paths containing whitespace cannot be tracked".to_string(),
        });
    }
    if let Some(header) = [CREATION, PARENTS, TAGS]
        .into_iter()
        .find(|header| path.starts_with(header))
    {
        return Err(Error::UnsupportedPath {
            path: path.into(),
            reason: format!("paths starting with '{}' cannot be tracked", header),
        });
    }
    Ok(())
}

/// Payload of a dataset
///
/// The dataset's identity is the hash of this record's encoding at creation
/// time. Later edits (add-files, delete-files) rewrite the payload under
/// the same identity, so the key is not a content hash of the current bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetRecord {
    pub creation: DateTime<Utc>,
    pub parents: Vec<Sha1Hash>,
    pub tags: Vec<String>,
    pub files: Vec<FileEntry>,
}

impl DatasetRecord {
    /// New record stamped with the current time
    pub fn new(parents: Vec<Sha1Hash>, tags: Vec<String>, files: Vec<FileEntry>) -> Self {
        let mut record = Self {
            // Encoded with microsecond precision
            creation: Utc::now().trunc_subsecs(6),
            parents,
            tags,
            files: Vec::new(),
        };
        record.set_files(files);
        record
    }

    /// Replace the file list, keeping it sorted by path
    pub fn set_files(&mut self, mut files: Vec<FileEntry>) {
        files.sort_by(|a, b| a.path.cmp(&b.path));
        self.files = files;
    }

    /// Serialize to the text layout
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = String::new();

        out.push_str(&format!("{}  {}\n\n", CREATION, format_timestamp(&self.creation)));

        let parents: Vec<String> = self.parents.iter().map(Sha1Hash::to_hex).collect();
        out.push_str(&format!("{}  {}\n\n", PARENTS, parents.join(" ")));

        out.push_str(TAGS);
        out.push('\n');
        for tag in &self.tags {
            if tag.contains('\n') || tag.contains('\r') {
                return Err(Error::InvalidTag { tag: tag.clone() });
            }
            out.push_str(TAG_ITEM);
            out.push_str(tag);
            out.push('\n');
        }
        out.push('\n');

        for file in &self.files {
            check_path(&file.path)?;
            out.push_str(&format!("{}  {}\n", file.path, file.hash));
        }

        Ok(out.into_bytes())
    }

    /// Parse the text layout; `hash` is only used for error context
    pub fn decode(hash: &Sha1Hash, bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes).map_err(|_| Error::malformed(hash, "not UTF-8"))?;

        let mut creation = None;
        let mut parents = Vec::new();
        let mut tags = Vec::new();
        let mut files = Vec::new();

        for line in text.lines() {
            if let Some(rest) = line.strip_prefix(CREATION) {
                let value = rest.trim();
                let parsed = parse_timestamp(value).ok_or_else(|| {
                    Error::malformed(hash, format!("bad creation timestamp '{}'", value))
                })?;
                creation = Some(parsed);
            } else if let Some(rest) = line.strip_prefix(PARENTS) {
                parents = rest
                    .split_whitespace()
                    .map(Sha1Hash::from_hex)
                    .collect::<Result<Vec<_>>>()
                    .map_err(|e| Error::malformed(hash, format!("bad parent: {}", e)))?;
            } else if line.starts_with(TAGS) {
                continue;
            } else if let Some(tag) = line.strip_prefix(TAG_ITEM) {
                tags.push(tag.to_string());
            } else if line.len() > 4 {
                let tokens: Vec<&str> = line.split_whitespace().collect();
                if tokens.len() != 2 {
                    return Err(Error::malformed(
                        hash,
                        format!("file entry needs a path and a hash: '{}'", line),
                    ));
                }
                let file_hash = Sha1Hash::from_hex(tokens[1])
                    .map_err(|e| Error::malformed(hash, format!("bad file hash: {}", e)))?;
                files.push(FileEntry {
                    path: tokens[0].to_string(),
                    hash: file_hash,
                });
            }
        }

        let creation = creation.ok_or_else(|| Error::malformed(hash, "missing Creation line"))?;

        Ok(Self {
            creation,
            parents,
            tags,
            files,
        })
    }

    /// Hash of the current encoding (the identity a fresh dataset gets)
    pub fn content_hash(&self) -> Result<Sha1Hash> {
        Ok(hash_bytes(&self.encode()?))
    }

    /// Load the record stored under `hash`
    pub fn load(store: &ContentStore, hash: &Sha1Hash) -> Result<Self> {
        let bytes = store.get(hash)?;
        Self::decode(hash, &bytes)
    }

    /// Write the record
    ///
    /// With no `identity` the record is keyed by the hash of its encoding.
    /// With an identity the payload is rewritten in place under that key.
    pub fn save(&self, store: &ContentStore, identity: Option<Sha1Hash>) -> Result<Sha1Hash> {
        let bytes = self.encode()?;
        let hash = identity.unwrap_or_else(|| hash_bytes(&bytes));
        store.put(&hash, &bytes)?;
        Ok(hash)
    }

    /// True if any file entry carries `content_hash`
    pub fn contains_hash(&self, content_hash: &Sha1Hash) -> bool {
        self.files.iter().any(|f| &f.hash == content_hash)
    }
}

/// Reverse index entry: which datasets include a given content hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MembershipRecord {
    /// Owning datasets, most recently added first
    pub owners: Vec<Sha1Hash>,
    /// Last path associated with the content hash
    pub path: String,
}

impl MembershipRecord {
    pub fn new(owner: Sha1Hash, path: impl Into<String>) -> Self {
        Self {
            owners: vec![owner],
            path: path.into(),
        }
    }

    /// Put `owner` at the front of the owner list
    pub fn add_owner(&mut self, owner: Sha1Hash) {
        self.owners.retain(|o| o != &owner);
        self.owners.insert(0, owner);
    }

    /// Drop `owner`; returns whether it was listed
    pub fn remove_owner(&mut self, owner: &Sha1Hash) -> bool {
        let before = self.owners.len();
        self.owners.retain(|o| o != owner);
        self.owners.len() != before
    }

    pub fn encode(&self) -> Vec<u8> {
        let owners: Vec<String> = self.owners.iter().map(Sha1Hash::to_hex).collect();
        format!("{}\n{}\n", owners.join(" "), self.path).into_bytes()
    }

    pub fn decode(hash: &Sha1Hash, bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes).map_err(|_| Error::malformed(hash, "not UTF-8"))?;
        let mut lines = text.lines();

        let owners = lines
            .next()
            .ok_or_else(|| Error::malformed(hash, "empty membership record"))?
            .split_whitespace()
            .map(Sha1Hash::from_hex)
            .collect::<Result<Vec<_>>>()
            .map_err(|e| Error::malformed(hash, format!("bad owner: {}", e)))?;
        let path = lines
            .next()
            .ok_or_else(|| Error::malformed(hash, "membership record has no path line"))?
            .to_string();

        Ok(Self { owners, path })
    }

    /// Load the membership record for `content_hash`, if one exists
    pub fn load(store: &ContentStore, content_hash: &Sha1Hash) -> Result<Option<Self>> {
        match store.get(content_hash) {
            Ok(bytes) => Self::decode(content_hash, &bytes).map(Some),
            Err(Error::ObjectNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn save(&self, store: &ContentStore, content_hash: &Sha1Hash) -> Result<()> {
        store.put(content_hash, &self.encode())
    }
}

/// RFC 3339, UTC, microseconds
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Accepts RFC 3339 and offset-less ISO-8601 (read as UTC)
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}
