//! Backup restoration for dbsnap
//!
//! Restores a named snapshot over the live database. The live database is
//! renamed aside before it is replaced and renamed back if the replacement
//! fails, so a failed restore leaves the previous database in place.
//!
//! A process killed mid-restore can leave `<database>.previous` behind. The
//! next restore refuses to run until an operator has dealt with it.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::BackupPaths;
use crate::crypto::{is_encrypted, Cipher};
use crate::error::{DbsnapError, DbsnapResult};
use crate::models::{KeyPrefix, ObjectKey, SnapshotTimestamp};
use crate::snapshot::SnapshotGateway;
use crate::store::ObjectStoreGateway;

use super::remove_if_exists;

/// Outcome of a successful restore
#[derive(Debug, Clone, Serialize)]
pub struct RestoreReport {
    /// Key that was restored
    pub key: ObjectKey,
    /// Snapshot timestamp
    pub timestamp: SnapshotTimestamp,
    /// Whether the object was encrypted
    pub encrypted: bool,
    /// Whether an existing live database was replaced
    pub replaced_existing: bool,
}

impl RestoreReport {
    /// One-line summary for operators
    pub fn summary(&self) -> String {
        format!(
            "Restored {} ({}){}",
            self.key,
            if self.encrypted { "encrypted" } else { "plain" },
            if self.replaced_existing {
                ", replacing the previous database"
            } else {
                ""
            }
        )
    }
}

/// Drives download, decryption and the swap into the live database path
pub struct RestoreManager<'a> {
    paths: &'a BackupPaths,
    prefix: &'a KeyPrefix,
    snapshot: &'a dyn SnapshotGateway,
    store: &'a dyn ObjectStoreGateway,
    cipher: Option<&'a dyn Cipher>,
}

impl<'a> RestoreManager<'a> {
    /// Create a manager that only accepts plain objects
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
        }
    }

    /// Decrypt encrypted objects with this cipher
    pub fn with_cipher(mut self, cipher: Option<&'a dyn Cipher>) -> Self {
        self.cipher = cipher;
        self
    }

    /// Restore the snapshot taken at `timestamp`
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for an empty or malformed timestamp, before any I/O
    /// - `DownloadFailed`, `MissingKey`, `DecryptionFailed` with the live
    ///   database untouched
    /// - `RestoreFailed` when the swap failed and the previous database was
    ///   put back
    /// - `RollbackFailed` when putting the previous database back failed too
    pub fn restore(&self, timestamp: &str) -> DbsnapResult<RestoreReport> {
        let timestamp = SnapshotTimestamp::parse(timestamp)?;
        let key = self.prefix.object_key(&timestamp);
        info!(key = %key, database = %self.paths.database().display(), "starting restore");

        self.clear_working_files()?;
        self.store.download(&key, self.paths.backup_file())?;

        let result = self.resolve_source(&key).and_then(|(source, encrypted)| {
            self.swap_into_place(&source)
                .map(|replaced_existing| (encrypted, replaced_existing))
        });
        self.clear_working_files_quietly();

        let (encrypted, replaced_existing) = result?;
        let report = RestoreReport {
            key,
            timestamp,
            encrypted,
            replaced_existing,
        };
        info!("{}", report.summary());
        Ok(report)
    }

    /// Pick the file to restore from, decrypting the download if needed
    fn resolve_source(&self, key: &ObjectKey) -> DbsnapResult<(PathBuf, bool)> {
        let download = self.paths.backup_file();
        if !is_encrypted(download) {
            debug!(key = %key, "object is not encrypted");
            return Ok((download.to_path_buf(), false));
        }

        let Some(cipher) = self.cipher else {
            return Err(DbsnapError::MissingKey {
                key: key.to_string(),
            });
        };

        let decrypted = self.paths.decrypted_file();
        cipher
            .decrypt_file(download, &decrypted)
            .map_err(|e| {
                let _ = remove_if_exists(&decrypted);
                match e {
                    DbsnapError::DecryptionFailed(_) => e,
                    other => DbsnapError::DecryptionFailed(other.to_string()),
                }
            })?;

        debug!(key = %key, "object decrypted");
        Ok((decrypted, true))
    }

    /// Replace the live database with `source`, rolling back on failure
    ///
    /// Returns whether an existing live database was replaced.
    fn swap_into_place(&self, source: &Path) -> DbsnapResult<bool> {
        let previous = self.paths.previous_database();
        if let Some((_, stale)) = self
            .paths
            .rollback_set()
            .into_iter()
            .find(|(_, aside)| aside.exists())
        {
            return Err(DbsnapError::RestoreFailed(format!(
                "{} exists, left by an interrupted restore; move it back next to {} or delete it, then retry",
                stale.display(),
                self.paths.database().display()
            )));
        }

        let rollback = RollbackPoint::capture(self.paths)?;

        match self.snapshot.restore(source, self.paths.database()) {
            Ok(()) => {
                rollback.discard();
                Ok(rollback.replaced_existing)
            }
            Err(restore_error) => {
                warn!(error = %restore_error, "restore failed, rolling back");
                let restore_error = match restore_error {
                    DbsnapError::RestoreFailed(reason) => reason,
                    other => other.to_string(),
                };

                match rollback.roll_back(self.paths) {
                    Ok(()) => {
                        info!("previous database put back");
                        Err(DbsnapError::RestoreFailed(restore_error))
                    }
                    Err(rollback_error) => {
                        error!(
                            restore_error = %restore_error,
                            rollback_error = %rollback_error,
                            "rollback failed, database state unknown"
                        );
                        Err(DbsnapError::RollbackFailed {
                            restore_error,
                            rollback_error,
                            previous,
                        })
                    }
                }
            }
        }
    }

    fn clear_working_files(&self) -> DbsnapResult<()> {
        for path in self.paths.restore_working_set() {
            remove_if_exists(&path).map_err(|e| {
                DbsnapError::Io(format!("Failed to remove stale {}: {}", path.display(), e))
            })?;
        }
        Ok(())
    }

    fn clear_working_files_quietly(&self) {
        for path in self.paths.restore_working_set() {
            if let Err(e) = remove_if_exists(&path) {
                warn!(path = %path.display(), error = %e, "failed to remove working file");
            }
        }
    }
}

/// The live database set renamed aside before a restore
struct RollbackPoint {
    /// (live, previous) pairs that were actually moved
    moved: Vec<(PathBuf, PathBuf)>,
    replaced_existing: bool,
}

impl RollbackPoint {
    /// Rename the live database and its sidecars aside
    ///
    /// On failure, files already moved are put back and nothing has changed.
    fn capture(paths: &BackupPaths) -> DbsnapResult<Self> {
        let mut moved = Vec::new();
        let mut replaced_existing = false;

        for (live, previous) in paths.rollback_set() {
            if !live.exists() {
                continue;
            }
            if let Err(e) = fs::rename(&live, &previous) {
                for (live, previous) in moved.iter().rev() {
                    let _ = fs::rename(previous, live);
                }
                return Err(DbsnapError::RestoreFailed(format!(
                    "Failed to move {} aside: {}",
                    live.display(),
                    e
                )));
            }
            debug!(from = %live.display(), to = %previous.display(), "moved aside");
            replaced_existing |= live.as_path() == paths.database();
            moved.push((live, previous));
        }

        Ok(Self {
            moved,
            replaced_existing,
        })
    }

    /// Drop the set-aside files after a successful restore
    fn discard(&self) {
        for (_, previous) in &self.moved {
            if let Err(e) = remove_if_exists(previous) {
                warn!(path = %previous.display(), error = %e, "failed to remove previous database");
            }
        }
    }

    /// Remove what the failed restore wrote and put the set-aside files back
    fn roll_back(&self, paths: &BackupPaths) -> Result<(), String> {
        let mut errors = Vec::new();

        for (live, _) in paths.rollback_set() {
            if let Err(e) = remove_if_exists(&live) {
                errors.push(format!("remove {}: {}", live.display(), e));
            }
        }

        for (live, previous) in &self.moved {
            if let Err(e) = fs::rename(previous, live) {
                errors.push(format!(
                    "move {} back to {}: {}",
                    previous.display(),
                    live.display(),
                    e
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.join("; "))
        }
    }
}
