//! Content digests for change detection.

use funnel_error::{FunnelError, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

/// SHA-256 of a local file as lowercase hex, read `chunk_size` bytes at a time.
pub fn file_digest(path: &Path, chunk_size: usize) -> Result<String> {
    let mut file = File::open(path).map_err(|e| FunnelError::local(path, e))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; chunk_size.max(1)];

    loop {
        match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => hasher.update(&buf[..n]),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(FunnelError::local(path, e)),
        }
    }

    Ok(hex::encode(hasher.finalize()))
}

/// SHA-256 of an in-memory buffer as lowercase hex.
pub fn bytes_digest(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}
