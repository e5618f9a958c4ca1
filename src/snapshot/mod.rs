//! Database snapshot gateway
//!
//! Produces and consumes consistent point-in-time copies of the live
//! database while other processes may be using it.

mod sqlite;

use std::path::Path;

use crate::error::DbsnapResult;

pub use sqlite::SqliteSnapshot;

/// Hot backup and hot restore of the live database
pub trait SnapshotGateway {
    /// Copy the database at `live` into a new file at `dest`
    ///
    /// Any existing `dest` is replaced. Fails with `SnapshotFailed`.
    fn snapshot(&self, live: &Path, dest: &Path) -> DbsnapResult<()>;

    /// Materialize the database file at `source` into `live`
    ///
    /// Creates `live` when it does not exist. Fails with `RestoreFailed`.
    fn restore(&self, source: &Path, live: &Path) -> DbsnapResult<()>;
}
