//! Content hashing for the build cache.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

/// Length of the hex digests stored in the build cache.
pub const SHORT_HASH_LEN: usize = 16;

/// Chunk size used when streaming files through the digest.
const CHUNK_SIZE: usize = 8192;

/// Compute the SHA256 hash of a file, streamed in fixed-size chunks.
pub fn sha256_file(path: &Path) -> Result<String> {
    let file = File::open(path)
        .with_context(|| format!("failed to open file for hashing: {}", path.display()))?;

    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; CHUNK_SIZE];

    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .with_context(|| format!("failed to read file for hashing: {}", path.display()))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Short content fingerprint of a file.
pub fn file_fingerprint(path: &Path) -> Result<String> {
    let mut hash = sha256_file(path)?;
    hash.truncate(SHORT_HASH_LEN);
    Ok(hash)
}

/// A hasher for building fingerprints from multiple components.
#[derive(Default)]
pub struct Fingerprint {
    hasher: Sha256,
}

impl Fingerprint {
    /// Create a new fingerprint builder.
    pub fn new() -> Self {
        Fingerprint {
            hasher: Sha256::new(),
        }
    }

    /// Add a string component to the fingerprint.
    pub fn update_str(&mut self, s: &str) -> &mut Self {
        self.hasher.update(s.as_bytes());
        self.hasher.update(b"\0"); // Separator
        self
    }

    /// Finalize and return the fingerprint as a hex string.
    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }

    /// Finalize and return a short fingerprint.
    pub fn finish_short(self) -> String {
        let mut hash = self.finish();
        hash.truncate(SHORT_HASH_LEN);
        hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_fingerprint_is_short_prefix() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("test.txt");
        std::fs::write(&path, "hello").unwrap();

        let full = sha256_file(&path).unwrap();
        let short = file_fingerprint(&path).unwrap();
        assert_eq!(short.len(), SHORT_HASH_LEN);
        assert_eq!(short, "2cf24dba5fb0a30e");
        assert!(full.starts_with(&short));
    }

    #[test]
    fn test_file_larger_than_one_chunk() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("big.bin");
        let data = vec![7u8; CHUNK_SIZE * 3 + 11];
        std::fs::write(&path, &data).unwrap();

        let mut hasher = Sha256::new();
        hasher.update(&data);
        assert_eq!(sha256_file(&path).unwrap(), hex::encode(hasher.finalize()));
    }

    #[test]
    fn test_fingerprint() {
        let fp1 = {
            let mut fp = Fingerprint::new();
            fp.update_str("hello").update_str("world");
            fp.finish_short()
        };

        let fp2 = {
            let mut fp = Fingerprint::new();
            fp.update_str("hello").update_str("world");
            fp.finish_short()
        };

        let fp3 = {
            let mut fp = Fingerprint::new();
            fp.update_str("hellow").update_str("orld");
            fp.finish_short()
        };

        assert_eq!(fp1, fp2);
        assert_ne!(fp1, fp3);
    }
}
