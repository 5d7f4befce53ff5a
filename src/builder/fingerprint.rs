//! Build cache of per-file content fingerprints.
//!
//! The cache remembers a short content hash for every source of the last
//! successful build, plus a fingerprint of the resolved configuration. The
//! content hash is the only staleness signal; mtime is stored for reference.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::util::fs::write_atomic;
use crate::util::hash::file_fingerprint;

/// Current on-disk format version.
pub const CACHE_VERSION: u32 = 1;

/// Cached state of one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub hash: String,
    /// Seconds since the Unix epoch. Informational only.
    #[serde(default)]
    pub mtime: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CacheData {
    version: u32,
    #[serde(default)]
    files: BTreeMap<String, FileRecord>,
    #[serde(default)]
    config_hash: String,
}

impl Default for CacheData {
    fn default() -> Self {
        CacheData {
            version: CACHE_VERSION,
            files: BTreeMap::new(),
            config_hash: String::new(),
        }
    }
}

/// The build cache for one project.
#[derive(Debug)]
pub struct BuildCache {
    path: PathBuf,
    data: CacheData,
}

impl BuildCache {
    /// Load the cache stored at `path`.
    ///
    /// A missing, unreadable or corrupt file yields an empty cache.
    pub fn load(path: &Path) -> Self {
        let data = match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<CacheData>(&content) {
                Ok(data) if data.version == CACHE_VERSION => data,
                Ok(data) => {
                    tracing::debug!(
                        "ignoring build cache with version {} (expected {})",
                        data.version,
                        CACHE_VERSION
                    );
                    CacheData::default()
                }
                Err(e) => {
                    tracing::warn!("ignoring corrupt build cache {}: {}", path.display(), e);
                    CacheData::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CacheData::default(),
            Err(e) => {
                tracing::warn!("could not read build cache {}: {}", path.display(), e);
                CacheData::default()
            }
        };
        BuildCache {
            path: path.to_path_buf(),
            data,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.data.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.files.is_empty()
    }

    /// Whether `path` changed since it was last recorded.
    ///
    /// Missing files, unrecorded files and files whose content hash differs
    /// are stale.
    pub fn is_stale(&self, path: &Path) -> bool {
        match file_fingerprint(path) {
            Ok(hash) => self.differs(path, &hash),
            Err(_) => true,
        }
    }

    /// Whether `hash`, already computed for `path`, differs from its record.
    pub fn differs(&self, path: &Path, hash: &str) -> bool {
        self.data
            .files
            .get(&cache_key(path))
            .map_or(true, |record| record.hash != hash)
    }

    /// Record the current content of `path`. Missing files are ignored.
    pub fn record(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }
        let hash = file_fingerprint(path)?;
        self.record_hash(path, hash);
        Ok(())
    }

    /// Record an already computed content hash for `path`.
    pub fn record_hash(&mut self, path: &Path, hash: String) {
        let mtime = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        self.data
            .files
            .insert(cache_key(path), FileRecord { hash, mtime });
    }

    /// Whether `fingerprint` differs from the recorded configuration.
    pub fn config_changed(&self, fingerprint: &str) -> bool {
        self.data.config_hash != fingerprint
    }

    pub fn record_config(&mut self, fingerprint: &str) {
        self.data.config_hash = fingerprint.to_string();
    }

    /// Forget everything and delete the cache file.
    pub fn clear(&mut self) -> Result<()> {
        self.data = CacheData::default();
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("failed to remove build cache {}", self.path.display())),
        }
    }

    /// Write the cache to disk atomically.
    pub fn persist(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(&self.data)
            .context("failed to serialize build cache")?;
        write_atomic(&self.path, &content)
    }
}

/// Absolute path used as the cache key.
fn cache_key(path: &Path) -> String {
    path.canonicalize()
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_stale_until_recorded() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("main.cpp");
        std::fs::write(&source, "int main() {}").unwrap();

        let mut cache = BuildCache::load(&tmp.path().join(".vcbuild_cache.json"));
        assert!(cache.is_stale(&source));

        cache.record(&source).unwrap();
        assert!(!cache.is_stale(&source));

        std::fs::write(&source, "int main() { return 1; }").unwrap();
        assert!(cache.is_stale(&source));
    }

    #[test]
    fn test_record_precomputed_hash() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("lib.cpp");
        std::fs::write(&source, "int f() { return 0; }").unwrap();
        let hash = file_fingerprint(&source).unwrap();

        let mut cache = BuildCache::load(&tmp.path().join("cache.json"));
        assert!(cache.differs(&source, &hash));

        cache.record_hash(&source, hash.clone());
        assert!(!cache.differs(&source, &hash));
        assert!(!cache.is_stale(&source));
        assert!(cache.differs(&source, "0000000000000000"));
    }

    #[test]
    fn test_missing_file_is_stale() {
        let tmp = TempDir::new().unwrap();
        let mut cache = BuildCache::load(&tmp.path().join("cache.json"));
        let ghost = tmp.path().join("ghost.cpp");
        cache.record(&ghost).unwrap();
        assert!(cache.is_stale(&ghost));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_persist_and_reload() {
        let tmp = TempDir::new().unwrap();
        let cache_path = tmp.path().join(".vcbuild_cache.json");
        let source = tmp.path().join("a.cpp");
        std::fs::write(&source, "void a() {}").unwrap();

        let mut cache = BuildCache::load(&cache_path);
        cache.record(&source).unwrap();
        cache.record_config("abc123");
        cache.persist().unwrap();

        let reloaded = BuildCache::load(&cache_path);
        assert_eq!(reloaded.len(), 1);
        assert!(!reloaded.is_stale(&source));
        assert!(!reloaded.config_changed("abc123"));
        assert!(reloaded.config_changed("def456"));

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&cache_path).unwrap()).unwrap();
        assert_eq!(json["version"], 1);
        assert_eq!(json["config_hash"], "abc123");
        let record = json["files"].as_object().unwrap().values().next().unwrap();
        assert_eq!(record["hash"].as_str().unwrap().len(), 16);
    }

    #[test]
    fn test_corrupt_cache_is_empty() {
        let tmp = TempDir::new().unwrap();
        let cache_path = tmp.path().join(".vcbuild_cache.json");
        std::fs::write(&cache_path, "{ definitely not json").unwrap();

        let cache = BuildCache::load(&cache_path);
        assert!(cache.is_empty());
        assert!(cache.config_changed("abc123"));
    }

    #[test]
    fn test_clear_removes_file() {
        let tmp = TempDir::new().unwrap();
        let cache_path = tmp.path().join(".vcbuild_cache.json");
        let mut cache = BuildCache::load(&cache_path);
        cache.record_config("x");
        cache.persist().unwrap();
        assert!(cache_path.exists());

        cache.clear().unwrap();
        assert!(!cache_path.exists());
        assert!(cache.config_changed("x"));

        // clearing twice is fine
        cache.clear().unwrap();
    }
}
