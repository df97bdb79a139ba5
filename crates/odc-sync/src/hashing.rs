//! QuickXorHash, the content hash OneDrive reports for files
//!
//! The state is 160 bits wide. Each input byte is XOR-ed in at the current
//! bit position, which then advances by 11 bits (mod 160). The total length,
//! as a little-endian `u64`, is XOR-ed into the last 8 bytes at the end and
//! the 20-byte result is base64-encoded.

use std::path::Path;

use base64::Engine;
use odc_core::ports::ContentHasher;
use tokio::io::AsyncReadExt;
use tracing::{debug, instrument, warn};

/// Read buffer used while hashing files
const READ_BUFFER: usize = 64 * 1024;

/// Incremental QuickXorHash state
#[derive(Debug, Clone)]
pub struct QuickXorHash {
    data: [u8; 20],
    shift: usize,
    length: u64,
}

impl Default for QuickXorHash {
    fn default() -> Self {
        Self::new()
    }
}

impl QuickXorHash {
    const WIDTH_BITS: usize = 160;
    const SHIFT_STEP: usize = 11;

    pub fn new() -> Self {
        Self {
            data: [0u8; 20],
            shift: 0,
            length: 0,
        }
    }

    pub fn update(&mut self, input: &[u8]) {
        for &byte in input {
            let byte_pos = self.shift / 8;
            let bit_offset = self.shift % 8;

            self.data[byte_pos] ^= byte << bit_offset;
            if bit_offset > 0 {
                // Bits past the last byte wrap around to the first
                self.data[(byte_pos + 1) % 20] ^= byte >> (8 - bit_offset);
            }

            self.shift = (self.shift + Self::SHIFT_STEP) % Self::WIDTH_BITS;
        }
        self.length += input.len() as u64;
    }

    pub fn finalize(mut self) -> [u8; 20] {
        let length_bytes = self.length.to_le_bytes();
        let start = self.data.len() - length_bytes.len();
        for (i, &lb) in length_bytes.iter().enumerate() {
            self.data[start + i] ^= lb;
        }
        self.data
    }

    /// Finalize and encode as standard base64
    pub fn finalize_base64(self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.finalize())
    }

    /// Hash a byte slice in one go
    pub fn digest(data: &[u8]) -> String {
        let mut hasher = Self::new();
        hasher.update(data);
        hasher.finalize_base64()
    }
}

/// Hash a file, streaming it in fixed-size reads
#[instrument(skip(path), fields(path = %path.display()))]
pub async fn hash_file(path: &Path) -> std::io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut buffer = vec![0u8; READ_BUFFER];
    let mut hasher = QuickXorHash::new();
    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    let encoded = hasher.finalize_base64();
    debug!(hash = %encoded, "hash computed");
    Ok(encoded)
}

/// [`ContentHasher`] backed by [`hash_file`]
///
/// Unreadable files hash to `None`, which makes them transfer
/// unconditionally.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuickXorHasher;

#[async_trait::async_trait]
impl ContentHasher for QuickXorHasher {
    async fn hash(&self, path: &Path) -> Option<String> {
        match hash_file(path).await {
            Ok(hash) => Some(hash),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Could not hash file");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_known_digests() {
        assert_eq!(QuickXorHash::digest(b""), "AAAAAAAAAAAAAAAAAAAAAAAAAAA=");
        assert_eq!(QuickXorHash::digest(b"a"), "YQAAAAAAAAAAAAAAAQAAAAAAAAA=");
        assert_eq!(
            QuickXorHash::digest(b"hello world"),
            "aCgDG9jwBhDc4Q1yawMZAAAAAAA="
        );
        assert_eq!(
            QuickXorHash::digest(b"The quick brown fox jumps over the lazy dog"),
            "bMSlbysmxJL6S75XwfMcQZOpcr4="
        );
    }

    #[test]
    fn test_incremental_updates_match_one_shot() {
        let data: Vec<u8> = (0..768).map(|i| (i % 256) as u8).collect();
        let mut hasher = QuickXorHash::new();
        for piece in data.chunks(7) {
            hasher.update(piece);
        }
        assert_eq!(hasher.finalize_base64(), QuickXorHash::digest(&data));
        assert_eq!(QuickXorHash::digest(&data), "rxAOGe1RimTF/e+k/m0O5nnSZT8=");
    }

    #[tokio::test]
    async fn test_hash_file_matches_digest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.bin");
        let data: Vec<u8> = (0..200_000u32).map(|i| (i * 31 % 251) as u8).collect();
        tokio::fs::write(&path, &data).await.unwrap();

        assert_eq!(hash_file(&path).await.unwrap(), QuickXorHash::digest(&data));
    }

    #[tokio::test]
    async fn test_hasher_returns_none_for_missing_file() {
        let dir = TempDir::new().unwrap();
        let hasher = QuickXorHasher;
        assert!(hasher.hash(&dir.path().join("missing")).await.is_none());
    }
}
