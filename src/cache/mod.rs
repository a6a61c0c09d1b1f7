//! Content-addressed object storage.
//!
//! Cached compiler outputs live in a sha-256 keyed blob store with a
//! two-level fan-out layout: `<root>/<aa>/<bb>/<full_hash>`. Identical
//! contents deduplicate to one blob.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Compute the hex sha-256 digest of one buffer.
pub fn hash_data(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute one hex digest over several buffers, in order. Feeding the
/// same parts always yields the same key.
pub fn hash_parts(parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
        // Length-prefix framing keeps ("ab", "c") distinct from ("a", "bc").
        hasher.update((part.len() as u64).to_le_bytes());
    }
    hex::encode(hasher.finalize())
}

/// What kind of artifact a file in the cache directory is, judged by its
/// suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheFileKind {
    Manifest,
    Result,
    Unknown,
}

/// A file found in the cache directory.
#[derive(Debug, Clone)]
pub struct CacheFile {
    path: PathBuf,
}

impl CacheFile {
    pub const MANIFEST_SUFFIX: &'static str = ".manifest";
    pub const RESULT_SUFFIX: &'static str = ".result";

    pub fn new(path: PathBuf) -> Self {
        CacheFile { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> CacheFileKind {
        let name = self.path.to_string_lossy();
        if name.ends_with(Self::MANIFEST_SUFFIX) {
            CacheFileKind::Manifest
        } else if name.ends_with(Self::RESULT_SUFFIX) {
            CacheFileKind::Result
        } else {
            CacheFileKind::Unknown
        }
    }
}

/// The blob store backing the cache.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    root: PathBuf,
}

impl ObjectStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create cache root at {:?}", root))?;
        Ok(ObjectStore { root })
    }

    /// Store bytes and return their hash.
    pub fn put(&self, data: &[u8]) -> Result<String> {
        let hash = hash_data(data);
        let path = self.hash_to_path(&hash);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }

        // Skip the write if the blob already exists.
        if !path.exists() {
            let mut file = fs::File::create(&path)
                .with_context(|| format!("Failed to create file {:?}", path))?;
            file.write_all(data)
                .with_context(|| format!("Failed to write to {:?}", path))?;
        }

        Ok(hash)
    }

    /// Store bytes under a caller-derived key (e.g. a cache key computed
    /// over more than the blob contents).
    pub fn insert(&self, key: &str, data: &[u8]) -> Result<()> {
        let path = self.hash_to_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }
        fs::write(&path, data).with_context(|| format!("Failed to write to {:?}", path))?;
        Ok(())
    }

    /// Fetch bytes by hash.
    pub fn get(&self, hash: &str) -> Result<Vec<u8>> {
        let path = self.hash_to_path(hash);
        if !path.exists() {
            anyhow::bail!("Hash {} not found in cache", hash);
        }
        fs::read(&path).with_context(|| format!("Failed to read from {:?}", path))
    }

    pub fn exists(&self, hash: &str) -> bool {
        self.hash_to_path(hash).exists()
    }

    /// The blob path for a hash, whether or not it exists yet.
    pub fn blob_path(&self, hash: &str) -> PathBuf {
        self.hash_to_path(hash)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Layout: `<root>/<first2>/<next2>/<full_hash>`.
    fn hash_to_path(&self, hash: &str) -> PathBuf {
        if hash.len() < 4 {
            return self.root.join(hash);
        }
        let first2 = &hash[0..2];
        let next2 = &hash[2..4];
        self.root.join(first2).join(next2).join(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_store_put_get() {
        let temp_dir = TempDir::new().unwrap();
        let store = ObjectStore::new(temp_dir.path()).unwrap();

        let data = b"object file bytes";
        let hash = store.put(data).unwrap();

        assert_eq!(hash.len(), 64); // sha-256 is 64 hex chars
        assert!(store.exists(&hash));

        let retrieved = store.get(&hash).unwrap();
        assert_eq!(retrieved, data);
    }

    #[test]
    fn test_store_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let store = ObjectStore::new(temp_dir.path()).unwrap();

        let fake_hash = "0".repeat(64);
        assert!(!store.exists(&fake_hash));
        assert!(store.get(&fake_hash).is_err());
    }

    #[test]
    fn test_store_deduplication() {
        let temp_dir = TempDir::new().unwrap();
        let store = ObjectStore::new(temp_dir.path()).unwrap();

        let data = b"duplicate content";
        let hash1 = store.put(data).unwrap();
        let hash2 = store.put(data).unwrap();

        assert_eq!(hash1, hash2);
    }

    #[test]
    fn test_store_insert_under_derived_key() {
        let temp_dir = TempDir::new().unwrap();
        let store = ObjectStore::new(temp_dir.path()).unwrap();

        let key = hash_parts(&[b"cc -c foo.c", b"int main;"]);
        store.insert(&key, b"object bytes").unwrap();

        assert!(store.exists(&key));
        assert_eq!(store.get(&key).unwrap(), b"object bytes");
    }

    #[test]
    fn test_hash_parts_framing() {
        assert_eq!(
            hash_parts(&[b"a", b"bc"]),
            hash_parts(&[b"a", b"bc"]),
        );
        assert_ne!(hash_parts(&[b"ab", b"c"]), hash_parts(&[b"a", b"bc"]));
        assert_ne!(hash_data(b"abc"), hash_parts(&[b"abc"]));
    }

    #[test]
    fn test_cache_file_kind() {
        let manifest = CacheFile::new(PathBuf::from("/cache/ab/cd/abcd.manifest"));
        assert_eq!(manifest.kind(), CacheFileKind::Manifest);

        let result = CacheFile::new(PathBuf::from("/cache/ab/cd/abcd.result"));
        assert_eq!(result.kind(), CacheFileKind::Result);

        let stray = CacheFile::new(PathBuf::from("/cache/ab/cd/abcd.tmp"));
        assert_eq!(stray.kind(), CacheFileKind::Unknown);
    }
}
