//! Encrypted-file detection
//!
//! The magic marker is the only signal restore has for deciding whether a
//! download needs decrypting.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::cipher::MAGIC;

/// Check whether the file at `path` starts with the encrypted-file marker
///
/// Reads at most 8 bytes. Missing, unreadable and short files are plain.
/// This is a structural check only; it says nothing about whether decryption
/// would succeed.
pub fn is_encrypted(path: impl AsRef<Path>) -> bool {
    let Ok(file) = File::open(path.as_ref()) else {
        return false;
    };

    let mut header = Vec::with_capacity(MAGIC.len());
    match file.take(MAGIC.len() as u64).read_to_end(&mut header) {
        Ok(_) => header.as_slice() == MAGIC,
        Err(_) => false,
    }
}
