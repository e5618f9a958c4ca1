//! Path management for dbsnap
//!
//! Every local file a backup or restore run touches is derived from two
//! configured paths: the live database and the working backup file.
//!
//! ## Derived Paths
//!
//! - `<backup>`: plaintext snapshot, or the raw download during restore
//! - `<backup>.enc`: ciphertext produced from the snapshot
//! - `<backup>.dec`: plaintext decrypted from a download
//! - `<database>.previous`: the live database set aside during a restore
//!
//! The previous path always sits next to the live database so renaming it
//! aside stays on one filesystem.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// SQLite files that travel with the main database file
pub const SIDECAR_SUFFIXES: [&str; 3] = ["-wal", "-shm", "-journal"];

/// Manages all local paths used by backup and restore runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupPaths {
    /// The live database
    database: PathBuf,
    /// The working backup file
    backup: PathBuf,
}

impl BackupPaths {
    /// Create paths with an explicit working backup file
    pub fn new(database: impl Into<PathBuf>, backup: impl Into<PathBuf>) -> Self {
        Self {
            database: database.into(),
            backup: backup.into(),
        }
    }

    /// Create paths with the working backup file next to the database
    pub fn for_database(database: impl Into<PathBuf>) -> Self {
        let database = database.into();
        let backup = default_backup_path(&database);
        Self { database, backup }
    }

    /// Get the live database path
    pub fn database(&self) -> &Path {
        &self.database
    }

    /// Get the working backup file
    pub fn backup_file(&self) -> &Path {
        &self.backup
    }

    /// Get the path encrypted snapshots are written to
    pub fn encrypted_file(&self) -> PathBuf {
        with_suffix(&self.backup, ".enc")
    }

    /// Get the path decrypted downloads are written to
    pub fn decrypted_file(&self) -> PathBuf {
        with_suffix(&self.backup, ".dec")
    }

    /// Get the rollback point for the live database
    pub fn previous_database(&self) -> PathBuf {
        with_suffix(&self.database, ".previous")
    }

    /// Pairs of (live, previous) paths for the database and its sidecars
    pub fn rollback_set(&self) -> Vec<(PathBuf, PathBuf)> {
        let previous = self.previous_database();
        let mut set = vec![(self.database.clone(), previous.clone())];
        for suffix in SIDECAR_SUFFIXES {
            set.push((with_suffix(&self.database, suffix), with_suffix(&previous, suffix)));
        }
        set
    }

    /// Restore working files: the download, the decrypted copy and the
    /// sidecars SQLite may create next to either when opening them
    pub fn restore_working_set(&self) -> Vec<PathBuf> {
        let mut set = Vec::new();
        for file in [self.backup.clone(), self.decrypted_file()] {
            for suffix in SIDECAR_SUFFIXES {
                set.push(with_suffix(&file, suffix));
            }
            set.push(file);
        }
        set
    }
}

/// Default working backup file for a database (`<database>.bak`)
pub fn default_backup_path(database: &Path) -> PathBuf {
    with_suffix(database, ".bak")
}

/// Append a suffix to the final path component
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut os: OsString = path.as_os_str().to_owned();
    os.push(suffix);
    PathBuf::from(os)
}
