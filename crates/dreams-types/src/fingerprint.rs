use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Size of the buffer used when streaming file content into the hasher.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Content fingerprint of a single file.
///
/// A fingerprint is the lowercase hex digest of the file's bytes. It is only
/// ever compared for equality. Sidecar files from older releases may carry
/// entries without a digest; those parse to the empty fingerprint.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// The empty fingerprint of a degenerate sidecar entry.
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Returns `true` if this fingerprint carries no digest.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Wrap a digest read from a sidecar file.
    ///
    /// No validation is done: legacy sidecars may hold digests of another
    /// algorithm, and they still compare correctly against each other.
    pub fn from_sidecar(value: &str) -> Self {
        Self(value.trim().to_ascii_lowercase())
    }

    /// Parse a hex digest, rejecting non-hex input.
    pub fn from_hex(value: &str) -> Result<Self, TypeError> {
        let value = value.trim();
        hex::decode(value).map_err(|e| TypeError::InvalidFingerprint(e.to_string()))?;
        Ok(Self(value.to_ascii_lowercase()))
    }

    /// Build a fingerprint from raw digest bytes.
    pub fn from_digest(digest: &[u8]) -> Self {
        Self(hex::encode(digest))
    }

    /// The hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 8 characters) for log output.
    pub fn short(&self) -> &str {
        let end = self.0.len().min(8);
        &self.0[..end]
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.short())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Domain-separated BLAKE3 hasher for file content.
///
/// The domain tag is fed to the hasher before the content, so fingerprints
/// from different hasher domains never collide on identical bytes.
pub struct FileHasher {
    domain: &'static str,
}

impl FileHasher {
    /// Hasher for release file content.
    pub const FILE: Self = Self {
        domain: "dreams-file-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Stream a reader into the hasher in fixed-size chunks.
    pub fn hash_reader<R: Read>(&self, mut reader: R) -> io::Result<Fingerprint> {
        let mut hasher = self.start();
        let mut buf = vec![0u8; CHUNK_SIZE];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&buf[..n]);
        }
        Ok(Fingerprint::from_digest(hasher.finalize().as_bytes()))
    }

    /// Fingerprint a file on disk without loading it into memory.
    pub fn hash_file(&self, path: &Path) -> io::Result<Fingerprint> {
        let file = File::open(path)?;
        self.hash_reader(file)
    }

    /// Fingerprint an in-memory buffer.
    pub fn hash_bytes(&self, data: &[u8]) -> Fingerprint {
        let mut hasher = self.start();
        hasher.update(data);
        Fingerprint::from_digest(hasher.finalize().as_bytes())
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }

    fn start(&self) -> blake3::Hasher {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn hash_is_deterministic() {
        let a = FileHasher::FILE.hash_bytes(b"hello world");
        let b = FileHasher::FILE.hash_bytes(b"hello world");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn different_content_differs() {
        let a = FileHasher::FILE.hash_bytes(b"hello");
        let b = FileHasher::FILE.hash_bytes(b"world");
        assert_ne!(a, b);
    }

    #[test]
    fn custom_domain_differs() {
        let custom = FileHasher::new("other-domain-v1").hash_bytes(b"data");
        assert_ne!(custom, FileHasher::FILE.hash_bytes(b"data"));
    }

    #[test]
    fn streaming_matches_in_memory_across_chunks() {
        let data: Vec<u8> = (0..(CHUNK_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        let streamed = FileHasher::FILE.hash_reader(&data[..]).unwrap();
        assert_eq!(streamed, FileHasher::FILE.hash_bytes(&data));
    }

    #[test]
    fn hash_file_reads_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        let mut file = File::create(&path).unwrap();
        file.write_all(b"on disk").unwrap();
        drop(file);

        let fp = FileHasher::FILE.hash_file(&path).unwrap();
        assert_eq!(fp, FileHasher::FILE.hash_bytes(b"on disk"));
    }

    #[test]
    fn sidecar_value_is_lowercased() {
        let fp = Fingerprint::from_sidecar(" ABCDEF \n");
        assert_eq!(fp.as_str(), "abcdef");
    }

    #[test]
    fn from_hex_rejects_garbage() {
        assert!(Fingerprint::from_hex("zz").is_err());
        assert!(Fingerprint::from_hex("00ff").is_ok());
    }

    #[test]
    fn empty_fingerprint() {
        assert!(Fingerprint::empty().is_empty());
        assert_eq!(Fingerprint::empty().short(), "");
    }
}
