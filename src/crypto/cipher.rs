//! AES-256-GCM file encryption
//!
//! Encrypted snapshots use a salted container format:
//!
//! ```text
//! +----------+-----------+------------+--------------------------+
//! | Salted__ | salt (16) | nonce (12) | ciphertext + GCM tag     |
//! +----------+-----------+------------+--------------------------+
//! ```
//!
//! The leading 8-byte magic is what restore uses to tell encrypted objects
//! from plain database files. Salt and nonce are random per file, so the same
//! snapshot never encrypts to the same bytes twice.

use std::fs;
use std::path::Path;

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use tracing::debug;

use crate::error::{DbsnapError, DbsnapResult};

use super::key_derivation::{derive_key, DerivedKey, KeyDerivationParams};
use super::SecureString;

/// Magic marker at the start of every encrypted file
pub const MAGIC: &[u8; 8] = b"Salted__";

/// Size of the per-file key derivation salt
const SALT_SIZE: usize = 16;

/// Size of the AES-GCM nonce in bytes (96 bits)
const NONCE_SIZE: usize = 12;

/// Length of the fixed header preceding the ciphertext
const HEADER_LEN: usize = MAGIC.len() + SALT_SIZE + NONCE_SIZE;

/// Symmetric file encryption used by the orchestrators
pub trait Cipher {
    /// Encrypt `source` into `dest`
    ///
    /// On failure no partial `dest` is left behind.
    fn encrypt_file(&self, source: &Path, dest: &Path) -> DbsnapResult<()>;

    /// Decrypt `source` into `dest`
    ///
    /// Wrong passphrases and corrupt input both fail with `DecryptionFailed`;
    /// no partial `dest` is left behind.
    fn decrypt_file(&self, source: &Path, dest: &Path) -> DbsnapResult<()>;
}

/// Passphrase-based cipher with deployment-wide key derivation parameters
#[derive(Debug, Clone)]
pub struct FileCipher {
    passphrase: SecureString,
    params: KeyDerivationParams,
}

impl FileCipher {
    /// Create a cipher with the default key derivation cost
    pub fn new(passphrase: SecureString) -> Self {
        Self::with_params(passphrase, KeyDerivationParams::default())
    }

    /// Create a cipher with explicit key derivation cost
    pub fn with_params(passphrase: SecureString, params: KeyDerivationParams) -> Self {
        Self { passphrase, params }
    }

    /// Encrypt a buffer into the salted container format
    pub fn encrypt(&self, plaintext: &[u8]) -> DbsnapResult<Vec<u8>> {
        let mut salt = [0u8; SALT_SIZE];
        OsRng.fill_bytes(&mut salt);
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);

        let key = derive_key(&self.passphrase, &salt, &self.params)?;
        let cipher = new_cipher(&key).map_err(DbsnapError::EncryptionFailed)?;

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|e| DbsnapError::EncryptionFailed(format!("Encryption failed: {}", e)))?;

        let mut out = Vec::with_capacity(HEADER_LEN + ciphertext.len());
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&salt);
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypt a buffer produced by [`FileCipher::encrypt`]
    pub fn decrypt(&self, data: &[u8]) -> DbsnapResult<Vec<u8>> {
        if data.len() < HEADER_LEN {
            return Err(DbsnapError::DecryptionFailed(format!(
                "input is {} bytes, shorter than the {}-byte header",
                data.len(),
                HEADER_LEN
            )));
        }

        let (magic, rest) = data.split_at(MAGIC.len());
        if magic != MAGIC {
            return Err(DbsnapError::DecryptionFailed(
                "input does not start with the encrypted-file marker".into(),
            ));
        }
        let (salt, rest) = rest.split_at(SALT_SIZE);
        let (nonce_bytes, ciphertext) = rest.split_at(NONCE_SIZE);

        let key = derive_key(&self.passphrase, salt, &self.params).map_err(|e| {
            DbsnapError::DecryptionFailed(e.to_string())
        })?;
        let cipher = new_cipher(&key).map_err(DbsnapError::DecryptionFailed)?;

        cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| DbsnapError::DecryptionFailed("invalid key or corrupted data".to_string()))
    }
}

impl Cipher for FileCipher {
    fn encrypt_file(&self, source: &Path, dest: &Path) -> DbsnapResult<()> {
        let plaintext = fs::read(source).map_err(|e| {
            DbsnapError::EncryptionFailed(format!("Failed to read {}: {}", source.display(), e))
        })?;

        let result = self.encrypt(&plaintext).and_then(|encrypted| {
            fs::write(dest, encrypted).map_err(|e| {
                DbsnapError::EncryptionFailed(format!("Failed to write {}: {}", dest.display(), e))
            })
        });

        if result.is_err() {
            let _ = fs::remove_file(dest);
        } else {
            debug!(source = %source.display(), dest = %dest.display(), "encrypted file");
        }
        result
    }

    fn decrypt_file(&self, source: &Path, dest: &Path) -> DbsnapResult<()> {
        let data = fs::read(source).map_err(|e| {
            DbsnapError::DecryptionFailed(format!("Failed to read {}: {}", source.display(), e))
        })?;

        let result = self.decrypt(&data).and_then(|plaintext| {
            fs::write(dest, plaintext).map_err(|e| {
                DbsnapError::DecryptionFailed(format!("Failed to write {}: {}", dest.display(), e))
            })
        });

        if result.is_err() {
            let _ = fs::remove_file(dest);
        } else {
            debug!(source = %source.display(), dest = %dest.display(), "decrypted file");
        }
        result
    }
}

fn new_cipher(key: &DerivedKey) -> Result<Aes256Gcm, String> {
    Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|e| format!("Failed to create cipher: {}", e))
}
