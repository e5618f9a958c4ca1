//! Custom error types for dbsnap
//!
//! This module defines the error hierarchy for backup and restore runs using
//! thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for dbsnap operations
#[derive(Error, Debug)]
pub enum DbsnapError {
    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed or missing command argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The online backup of the live database failed
    #[error("Snapshot failed: {0}")]
    SnapshotFailed(String),

    /// Encrypting the working backup failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decrypting a downloaded backup failed
    #[error("Decryption failed: {0} (check that ENCRYPTION_KEY matches the key used for the backup)")]
    DecryptionFailed(String),

    /// An encrypted object was found but no passphrase is configured
    #[error("Backup '{key}' is encrypted but no ENCRYPTION_KEY is configured")]
    MissingKey { key: String },

    /// Uploading to the object store failed
    #[error("Upload of '{key}' failed: {reason}")]
    UploadFailed { key: String, reason: String },

    /// Downloading from the object store failed
    #[error("Download of '{key}' failed: {reason}")]
    DownloadFailed { key: String, reason: String },

    /// Replacing the live database failed; the previous database was put back
    #[error("Restore failed: {0}")]
    RestoreFailed(String),

    /// Replacing the live database failed and so did putting the old one back
    #[error(
        "Restore failed: system in unknown state, manual intervention required \
         (restore error: {restore_error}; rollback error: {rollback_error}; \
         previous database at {})",
        previous.display()
    )]
    RollbackFailed {
        restore_error: String,
        rollback_error: String,
        previous: PathBuf,
    },

    /// Webhook notification failed (never fatal)
    #[error("Notification error: {0}")]
    Notification(String),

    /// Cron expression or scheduler errors
    #[error("Schedule error: {0}")]
    Schedule(String),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

impl DbsnapError {
    /// Create an upload error for an object key
    pub fn upload(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::UploadFailed {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a download error for an object key
    pub fn download(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::DownloadFailed {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Check if this is a configuration error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Check if the live database may be in an unknown state
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::RollbackFailed { .. })
    }

    /// Process exit status for this error
    ///
    /// 2 is left to clap for usage errors.
    pub fn exit_code(&self) -> u8 {
        if self.is_unresolved() {
            3
        } else {
            1
        }
    }
}

// Implement From traits for common error types

impl From<std::io::Error> for DbsnapError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Result type alias for dbsnap operations
pub type DbsnapResult<T> = Result<T, DbsnapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DbsnapError::Config("S3_BUCKET is required".into());
        assert_eq!(err.to_string(), "Configuration error: S3_BUCKET is required");
        assert!(err.is_config());
    }

    #[test]
    fn test_decryption_error_is_actionable() {
        let err = DbsnapError::DecryptionFailed("authentication tag mismatch".into());
        assert!(err.to_string().contains("ENCRYPTION_KEY"));
    }

    #[test]
    fn test_exit_codes() {
        let err = DbsnapError::RestoreFailed("disk I/O error".into());
        assert_eq!(err.exit_code(), 1);

        let err = DbsnapError::RollbackFailed {
            restore_error: "disk I/O error".into(),
            rollback_error: "No such file or directory".into(),
            previous: PathBuf::from("/data/app.db.previous"),
        };
        assert!(err.is_unresolved());
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("manual intervention required"));
        assert!(err.to_string().contains("/data/app.db.previous"));
    }

    #[test]
    fn test_upload_error() {
        let err = DbsnapError::upload("db/20250101000000.bak", "connection reset");
        assert_eq!(
            err.to_string(),
            "Upload of 'db/20250101000000.bak' failed: connection reset"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: DbsnapError = io_err.into();
        assert!(matches!(err, DbsnapError::Io(_)));
    }
}
