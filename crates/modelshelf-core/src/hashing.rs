//! Streaming content fingerprints for model files.
//!
//! Files are read in fixed-size chunks so multi-gigabyte checkpoints hash in
//! constant memory.

use crate::error::{OrganizerError, Result};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Chunk size for reading files (8MB, optimal for SSDs).
const CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Length of a hex-encoded SHA256 digest.
pub const CONTENT_HASH_LEN: usize = 64;

/// Compute the SHA256 of a file as a lowercase hex string.
pub fn compute_sha256(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let mut file = std::fs::File::open(path).map_err(|e| OrganizerError::io_with_path(e, path))?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| OrganizerError::io_with_path(e, path))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compute the SHA256 of a file on the blocking thread pool.
pub async fn compute_sha256_async(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref().to_path_buf();

    tokio::task::spawn_blocking(move || compute_sha256(&path))
        .await
        .map_err(|e| OrganizerError::Other(format!("Hash computation task failed: {}", e)))?
}

/// Whether `value` looks like a digest produced by [`compute_sha256`].
pub fn is_content_hash(value: &str) -> bool {
    value.len() == CONTENT_HASH_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
