//! SQLite online backup
//!
//! Both directions use the SQLite backup API, which copies pages while other
//! connections keep reading and writing. Lock contention is retried until the
//! busy timeout elapses without progress, then the copy fails.

use std::fs;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use rusqlite::backup::{Backup, StepResult};
use rusqlite::{Connection, OpenFlags};
use tracing::{debug, info};

use crate::error::{DbsnapError, DbsnapResult};

use super::SnapshotGateway;

/// Copy every remaining page in one step
const ALL_PAGES: std::os::raw::c_int = -1;

/// Pause between retries while the database is locked
const RETRY_PAUSE: Duration = Duration::from_millis(50);

/// Snapshot gateway backed by the SQLite backup API
#[derive(Debug, Clone)]
pub struct SqliteSnapshot {
    busy_timeout: Duration,
}

impl SqliteSnapshot {
    /// Create a gateway whose copies give up after `busy_timeout` of lock contention
    pub fn new(busy_timeout: Duration) -> Self {
        Self { busy_timeout }
    }

    /// Get the configured busy timeout
    pub fn busy_timeout(&self) -> Duration {
        self.busy_timeout
    }

    fn open_read_only(&self, path: &Path) -> rusqlite::Result<Connection> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(self.busy_timeout)?;
        Ok(conn)
    }

    fn open_read_write(&self, path: &Path) -> rusqlite::Result<Connection> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(self.busy_timeout)?;
        Ok(conn)
    }

    /// Run a backup from `from` into `to`, bounded by the busy timeout
    fn copy_pages(&self, from: &Connection, to: &mut Connection) -> Result<(), String> {
        let backup = Backup::new(from, to).map_err(|e| format!("init backup: {}", e))?;
        let mut deadline = Instant::now() + self.busy_timeout;

        loop {
            match backup.step(ALL_PAGES).map_err(|e| format!("run backup: {}", e))? {
                StepResult::Done => return Ok(()),
                StepResult::More => deadline = Instant::now() + self.busy_timeout,
                _ => {
                    if Instant::now() >= deadline {
                        return Err(format!(
                            "database stayed locked for more than {} ms",
                            self.busy_timeout.as_millis()
                        ));
                    }
                    thread::sleep(RETRY_PAUSE);
                }
            }
        }
    }
}

impl SnapshotGateway for SqliteSnapshot {
    fn snapshot(&self, live: &Path, dest: &Path) -> DbsnapResult<()> {
        if !live.exists() {
            return Err(DbsnapError::SnapshotFailed(format!(
                "database {} does not exist",
                live.display()
            )));
        }

        // The backup API writes into whatever database is at dest
        if dest.exists() {
            fs::remove_file(dest).map_err(|e| {
                DbsnapError::SnapshotFailed(format!("Failed to remove stale {}: {}", dest.display(), e))
            })?;
        }

        debug!(live = %live.display(), dest = %dest.display(), "starting online backup");
        let result = self
            .open_read_only(live)
            .map_err(|e| format!("open {}: {}", live.display(), e))
            .and_then(|src| {
                let mut dst = self
                    .open_read_write(dest)
                    .map_err(|e| format!("open {}: {}", dest.display(), e))?;
                self.copy_pages(&src, &mut dst)
            });

        match result {
            Ok(()) => {
                info!(dest = %dest.display(), "database snapshot written");
                Ok(())
            }
            Err(reason) => {
                let _ = fs::remove_file(dest);
                Err(DbsnapError::SnapshotFailed(reason))
            }
        }
    }

    fn restore(&self, source: &Path, live: &Path) -> DbsnapResult<()> {
        debug!(source = %source.display(), live = %live.display(), "starting online restore");

        let src = self
            .open_read_only(source)
            .map_err(|e| DbsnapError::RestoreFailed(format!("open {}: {}", source.display(), e)))?;
        let mut dst = self
            .open_read_write(live)
            .map_err(|e| DbsnapError::RestoreFailed(format!("open {}: {}", live.display(), e)))?;

        self.copy_pages(&src, &mut dst)
            .map_err(DbsnapError::RestoreFailed)?;

        info!(live = %live.display(), "database restored");
        Ok(())
    }
}
