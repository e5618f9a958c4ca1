//! Backup orchestration for dbsnap
//!
//! One run is a fixed sequence: snapshot the live database, optionally
//! encrypt, upload, then notify. Each step either succeeds or ends the run.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::config::BackupPaths;
use crate::crypto::Cipher;
use crate::error::{DbsnapError, DbsnapResult};
use crate::models::{KeyPrefix, ObjectKey, SnapshotTimestamp};
use crate::notify::{BackupEvent, Notifier};
use crate::snapshot::SnapshotGateway;
use crate::store::ObjectStoreGateway;

use super::remove_if_exists;

/// Outcome of a successful backup run
#[derive(Debug, Clone, Serialize)]
pub struct BackupReport {
    /// Key the snapshot was uploaded to
    pub key: ObjectKey,
    /// Snapshot timestamp
    pub timestamp: SnapshotTimestamp,
    /// Whether the uploaded object is encrypted
    pub encrypted: bool,
    /// Uploaded size in bytes
    pub size_bytes: u64,
    /// Whether the webhook call succeeded (`None` when not configured)
    pub notified: Option<bool>,
}

/// Drives snapshot, encryption, upload and notification
pub struct BackupManager<'a> {
    paths: &'a BackupPaths,
    prefix: &'a KeyPrefix,
    snapshot: &'a dyn SnapshotGateway,
    store: &'a dyn ObjectStoreGateway,
    cipher: Option<&'a dyn Cipher>,
    notifier: Option<&'a dyn Notifier>,
}

impl<'a> BackupManager<'a> {
    /// Create a manager that uploads plaintext snapshots
    pub fn new(
        paths: &'a BackupPaths,
        prefix: &'a KeyPrefix,
        snapshot: &'a dyn SnapshotGateway,
        store: &'a dyn ObjectStoreGateway,
    ) -> Self {
        Self {
            paths,
            prefix,
            snapshot,
            store,
            cipher: None,
            notifier: None,
        }
    }

    /// Encrypt snapshots before upload
    pub fn with_cipher(mut self, cipher: Option<&'a dyn Cipher>) -> Self {
        self.cipher = cipher;
        self
    }

    /// Notify after each successful upload
    pub fn with_notifier(mut self, notifier: Option<&'a dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Run one backup cycle stamped with the current time
    pub fn run(&self) -> DbsnapResult<BackupReport> {
        self.run_at(SnapshotTimestamp::now())
    }

    /// Run one backup cycle stamped with `timestamp`
    pub fn run_at(&self, timestamp: SnapshotTimestamp) -> DbsnapResult<BackupReport> {
        let key = self.prefix.object_key(&timestamp);
        info!(key = %key, database = %self.paths.database().display(), "starting backup");

        self.take_snapshot()?;
        let upload_path = self.encrypt_if_configured()?;
        let size_bytes = self.upload(&key, &upload_path)?;

        let encrypted = self.cipher.is_some();
        let notified = self.notifier.map(|notifier| {
            let event = BackupEvent::completed(key.clone(), timestamp, encrypted, size_bytes);
            match notifier.notify(&event) {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "backup notification failed");
                    false
                }
            }
        });

        info!(key = %key, size_bytes, encrypted, "backup complete");
        Ok(BackupReport {
            key,
            timestamp,
            encrypted,
            size_bytes,
            notified,
        })
    }

    /// Step 1: hot copy of the live database into the working file
    fn take_snapshot(&self) -> DbsnapResult<()> {
        let backup_file = self.paths.backup_file();
        let encrypted_file = self.paths.encrypted_file();
        for stale in [backup_file, encrypted_file.as_path()] {
            remove_if_exists(stale).map_err(|e| {
                DbsnapError::SnapshotFailed(format!("Failed to clear {}: {}", stale.display(), e))
            })?;
        }

        self.snapshot.snapshot(self.paths.database(), backup_file)
    }

    /// Step 2: replace the plaintext snapshot with ciphertext when a key is set
    ///
    /// Returns the file to upload.
    fn encrypt_if_configured(&self) -> DbsnapResult<PathBuf> {
        let backup_file = self.paths.backup_file();
        let Some(cipher) = self.cipher else {
            return Ok(backup_file.to_path_buf());
        };

        let encrypted_file = self.paths.encrypted_file();
        if let Err(e) = cipher.encrypt_file(backup_file, &encrypted_file) {
            // Nothing from this run may be uploaded or left in plaintext
            let _ = remove_if_exists(&encrypted_file);
            let _ = remove_if_exists(backup_file);
            return Err(match e {
                DbsnapError::EncryptionFailed(_) => e,
                other => DbsnapError::EncryptionFailed(other.to_string()),
            });
        }

        remove_if_exists(backup_file).map_err(|e| {
            let _ = remove_if_exists(&encrypted_file);
            DbsnapError::EncryptionFailed(format!(
                "Failed to remove plaintext snapshot {}: {}",
                backup_file.display(),
                e
            ))
        })?;

        Ok(encrypted_file)
    }

    /// Step 3: upload, then drop the local copy
    ///
    /// On failure the local file stays for inspection.
    fn upload(&self, key: &ObjectKey, path: &Path) -> DbsnapResult<u64> {
        let size_bytes = self.store.upload(key, path)?;
        if let Err(e) = remove_if_exists(path) {
            warn!(path = %path.display(), error = %e, "failed to remove uploaded working file");
        }
        Ok(size_bytes)
    }
}
