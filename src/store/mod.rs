//! Object store gateway
//!
//! Moves backup files between the local working paths and the remote
//! bucket. The store is the durable, authoritative backup set; objects are
//! written once and never modified.

mod remote;

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::DbsnapResult;
use crate::models::{KeyPrefix, ObjectKey, SnapshotTimestamp};

pub use remote::RemoteStore;

/// A backup object found in the store
#[derive(Debug, Clone, Serialize)]
pub struct RemoteObject {
    /// Full object key
    pub key: String,
    /// Snapshot timestamp parsed from the key
    pub timestamp: SnapshotTimestamp,
    /// Size in bytes
    pub size_bytes: u64,
    /// When the store last wrote the object
    pub last_modified: DateTime<Utc>,
}

/// Upload, download and listing of backup objects
pub trait ObjectStoreGateway {
    /// Upload the file at `source` to `key`, returning the bytes sent
    ///
    /// Fails with `UploadFailed`.
    fn upload(&self, key: &ObjectKey, source: &Path) -> DbsnapResult<u64>;

    /// Download `key` into `dest`, returning the bytes received
    ///
    /// Fails with `DownloadFailed`; a partially written `dest` is removed.
    fn download(&self, key: &ObjectKey, dest: &Path) -> DbsnapResult<u64>;

    /// Backup objects directly under `prefix`, newest first
    fn list(&self, prefix: &KeyPrefix) -> DbsnapResult<Vec<RemoteObject>>;
}
