//! Backup and restore orchestration for dbsnap
//!
//! # Architecture
//!
//! The backup system consists of two orchestrators that drive the gateways
//! in order and clean up after themselves:
//!
//! - `BackupManager`: snapshot, optional encryption, upload, notification
//! - `RestoreManager`: download, optional decryption, swap into place with
//!   rollback
//!
//! Gateways are passed in as trait objects so tests can swap any of them.
//!
//! # Working files
//!
//! All working files live next to the backup path:
//! - `<backup>`: the snapshot, or the downloaded object during restore
//! - `<backup>.enc`: the encrypted snapshot
//! - `<backup>.dec`: the decrypted download
//! - `<database>.previous`: the live database while a restore is running
//!
//! # Example
//!
//! ```rust,ignore
//! use dbsnap::backup::{BackupManager, RestoreManager};
//! use dbsnap::snapshot::SqliteSnapshot;
//! use dbsnap::store::RemoteStore;
//!
//! let paths = settings.paths();
//! let snapshot = SqliteSnapshot::new(settings.busy_timeout);
//! let store = RemoteStore::from_settings(&settings)?;
//!
//! let report = BackupManager::new(&paths, &settings.prefix, &snapshot, &store).run()?;
//!
//! // Later, restore it
//! RestoreManager::new(&paths, &settings.prefix, &snapshot, &store)
//!     .restore(&report.timestamp.to_string())?;
//! ```

mod manager;
mod restore;

use std::fs;
use std::io;
use std::path::Path;

pub use manager::{BackupManager, BackupReport};
pub use restore::{RestoreManager, RestoreReport};

/// Remove a file, treating "already gone" as success
pub(crate) fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
