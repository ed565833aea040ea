//! Artifact fingerprinting with BLAKE3.
//!
//! The fingerprint of every downloaded artifact is recorded in the audit
//! trail so a verdict can be tied to the exact bytes that were scanned.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::Path;

/// BLAKE3 digest and size of a scanned file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Hex-encoded BLAKE3 hash.
    pub blake3: String,
    /// Size in bytes.
    pub size: u64,
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blake3:{}", self.blake3)
    }
}

/// Streaming BLAKE3 hasher for local artifacts.
///
/// # Examples
///
/// ```rust
/// use scanroute::core::FileHasher;
///
/// let fingerprint = FileHasher::new().hash_bytes(b"hello world");
/// assert_eq!(fingerprint.size, 11);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FileHasher;

impl FileHasher {
    /// Creates a new hasher.
    pub fn new() -> Self {
        Self
    }

    /// Fingerprints bytes already in memory.
    pub fn hash_bytes(&self, data: &[u8]) -> Fingerprint {
        Fingerprint {
            blake3: blake3::hash(data).to_hex().to_string(),
            size: data.len() as u64,
        }
    }

    /// Fingerprints a file, streaming it in 64 KiB chunks.
    pub fn hash_file(&self, path: &Path) -> std::io::Result<Fingerprint> {
        let file = std::fs::File::open(path)?;
        let mut reader = std::io::BufReader::new(file);
        self.hash_reader(&mut reader)
    }

    /// Fingerprints everything a reader yields.
    pub fn hash_reader<R: Read>(&self, reader: &mut R) -> std::io::Result<Fingerprint> {
        let mut hasher = blake3::Hasher::new();
        let mut size = 0u64;
        let mut buffer = [0u8; 64 * 1024];
        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
            size += bytes_read as u64;
        }

        Ok(Fingerprint {
            blake3: hasher.finalize().to_hex().to_string(),
            size,
        })
    }

    /// Fingerprints a file without blocking the async runtime.
    pub async fn hash_file_async(&self, path: &Path) -> std::io::Result<Fingerprint> {
        let hasher = self.clone();
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || hasher.hash_file(&path))
            .await
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?
    }
}
