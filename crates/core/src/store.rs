//! Sharded on-disk key/value store for dataset and membership records

use crate::error::{Error, Result};
use crate::hash::{is_object_name, Sha1Hash};
use crate::lock::StoreLock;
use std::fs;
use std::path::{Path, PathBuf};

/// Content store rooted at a single directory
///
/// Every entry is keyed by a full 40 character digest and lives two shard
/// levels deep:
/// ```text
/// root/
///   .lock            (advisory lock file)
///   2a/
///     ae/
///       2aae6c35c94fcfb415dbe95f408b9ce91ee846ed
/// ```
/// There is no manifest or index: the shard convention is the schema.
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    /// Create a new, empty store at `root`
    pub fn init(root: &Path) -> Result<Self> {
        if root.exists() {
            return Err(Error::StoreAlreadyInitialized {
                root: root.to_path_buf(),
            });
        }

        fs::create_dir_all(root).map_err(|e| Error::io(root, e))?;
        tracing::info!(root = %root.display(), "initialized store");

        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Open an existing store
    pub fn open(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(Error::StoreNotInitialized {
                root: root.to_path_buf(),
            });
        }

        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Get the store root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Take the exclusive writer lock for this store
    pub fn lock(&self) -> Result<StoreLock> {
        StoreLock::acquire(&self.root)
    }

    /// Take a shared reader lock for this store
    pub fn lock_shared(&self) -> Result<StoreLock> {
        StoreLock::acquire_shared(&self.root)
    }

    /// Physical location of the entry for `hash`: `root/<h[0:2]>/<h[2:4]>/<h>`
    pub fn object_path(&self, hash: &Sha1Hash) -> PathBuf {
        let hex = hash.to_hex();
        self.shard_dir(&hex).join(&hex)
    }

    fn shard_dir(&self, hex: &str) -> PathBuf {
        self.root.join(&hex[0..2]).join(&hex[2..4])
    }

    /// Write an entry, replacing any previous content (last writer wins)
    pub fn put(&self, hash: &Sha1Hash, data: &[u8]) -> Result<()> {
        let target = self.object_path(hash);
        let shard = target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());

        if !shard.exists() {
            fs::create_dir_all(&shard).map_err(|e| Error::io(&shard, e))?;
        }

        atomic_write(&shard, &target, data)?;
        tracing::debug!(%hash, bytes = data.len(), "stored entry");
        Ok(())
    }

    /// Read an entry
    pub fn get(&self, hash: &Sha1Hash) -> Result<Vec<u8>> {
        let path = self.object_path(hash);
        match fs::read(&path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::ObjectNotFound {
                hash: hash.to_hex(),
            }),
            Err(e) => Err(Error::io(path, e)),
        }
    }

    /// Check whether an entry exists
    pub fn exists(&self, hash: &Sha1Hash) -> bool {
        self.object_path(hash).is_file()
    }

    /// Remove an entry; removing a missing entry is an error
    pub fn remove(&self, hash: &Sha1Hash) -> Result<()> {
        let path = self.object_path(hash);
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(%hash, "removed entry");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::ObjectNotFound {
                hash: hash.to_hex(),
            }),
            Err(e) => Err(Error::io(path, e)),
        }
    }

    /// List the entries whose name starts with `prefix`
    ///
    /// Only the shard `prefix[0:2]/prefix[2:4]` is scanned, so the prefix
    /// must be at least 4 hex characters long; shorter prefixes match nothing.
    pub fn list_prefix(&self, prefix: &str) -> Result<Vec<Sha1Hash>> {
        let prefix = prefix.to_ascii_lowercase();
        if prefix.len() < 4 || !prefix.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Ok(Vec::new());
        }

        let shard = self.shard_dir(&prefix);
        let mut matches = read_object_names(&shard)?
            .into_iter()
            .filter(|name| name.starts_with(&prefix))
            .map(|name| Sha1Hash::from_hex(&name))
            .collect::<Result<Vec<_>>>()?;
        matches.sort();
        Ok(matches)
    }

    /// Every entry in the store, in hash order
    pub fn all_hashes(&self) -> Result<Vec<Sha1Hash>> {
        let mut hashes = Vec::new();

        for first in shard_children(&self.root)? {
            for second in shard_children(&first)? {
                for name in read_object_names(&second)? {
                    hashes.push(Sha1Hash::from_hex(&name)?);
                }
            }
        }

        hashes.sort();
        Ok(hashes)
    }
}

/// Two-hex-character subdirectories of `dir`
fn shard_children(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let name = entry.file_name();
        let is_shard = name
            .to_str()
            .map(|n| n.len() == 2 && n.bytes().all(|b| b.is_ascii_hexdigit()))
            .unwrap_or(false);
        if is_shard && entry.path().is_dir() {
            dirs.push(entry.path());
        }
    }
    Ok(dirs)
}

/// Entry names in a shard directory, skipping temp files and anything else
/// that is not a full digest. A missing shard has no entries.
fn read_object_names(shard: &Path) -> Result<Vec<String>> {
    let entries = match fs::read_dir(shard) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::io(shard, e)),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(shard, e))?;
        if let Some(name) = entry.file_name().to_str() {
            if is_object_name(name) {
                names.push(name.to_string());
            }
        }
    }
    Ok(names)
}

/// Atomic write helper
///
/// Writes data to a temporary file in `tmp_dir`, fsyncs it, then renames it
/// to the target path. `tmp_dir` must be on the same filesystem as `target`.
pub fn atomic_write(tmp_dir: &Path, target: &Path, data: &[u8]) -> Result<()> {
    use std::io::Write;

    let stem = target
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("entry");
    let temp_path = tmp_dir.join(format!(".{}.{}.tmp", stem, uuid::Uuid::new_v4()));

    let write_temp = || -> std::io::Result<()> {
        let mut temp_file = fs::File::create(&temp_path)?;
        temp_file.write_all(data)?;
        temp_file.sync_all()
    };
    if let Err(e) = write_temp() {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::io(&temp_path, e));
    }

    // Rename to target (atomic on POSIX systems)
    if let Err(e) = fs::rename(&temp_path, target) {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::io(target, e));
    }

    // Fsync parent directory for durability
    if let Some(parent) = target.parent() {
        if let Ok(dir) = fs::File::open(parent) {
            let _ = dir.sync_all();
        }
    }

    Ok(())
}
