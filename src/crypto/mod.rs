//! Cryptographic functions for dbsnap
//!
//! Provides AES-256-GCM file encryption with Argon2id key derivation for
//! optional encryption of snapshots before upload, and detection of
//! encrypted downloads by their magic marker.

pub mod cipher;
pub mod detect;
pub mod key_derivation;
pub mod secure_memory;

pub use cipher::{Cipher, FileCipher, MAGIC};
pub use detect::is_encrypted;
pub use key_derivation::{derive_key, DerivedKey, KeyDerivationParams};
pub use secure_memory::SecureString;
