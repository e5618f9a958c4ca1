//! Runtime settings for dbsnap
//!
//! All settings come from environment variables, read once at startup. Empty
//! values are treated as unset so container templates can leave them blank.

use std::path::PathBuf;
use std::time::Duration;

use super::paths::{default_backup_path, BackupPaths};
use crate::crypto::SecureString;
use crate::error::DbsnapError;
use crate::models::KeyPrefix;

/// Environment variable names
pub mod env {
    pub const BUCKET: &str = "S3_BUCKET";
    pub const DATABASE_PATH: &str = "DATABASE_PATH";
    pub const KEY_PREFIX: &str = "S3_KEY_PREFIX";
    pub const BACKUP_PATH: &str = "BACKUP_PATH";
    pub const BUSY_TIMEOUT: &str = "SQLITE_TIMEOUT";
    pub const ENCRYPTION_KEY: &str = "ENCRYPTION_KEY";
    pub const CRON_SCHEDULE: &str = "CRON_SCHEDULE";
    pub const WEBHOOK_URL: &str = "WEBHOOK_URL";
    pub const ENDPOINT: &str = "S3_ENDPOINT";
}

/// Busy timeout used when `SQLITE_TIMEOUT` is not set
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 10_000;

/// Settings for one dbsnap process
#[derive(Debug, Clone)]
pub struct Settings {
    /// Destination bucket
    pub bucket: String,

    /// Live database file
    pub database_path: PathBuf,

    /// Normalized object-key prefix
    pub prefix: KeyPrefix,

    /// Working backup file
    pub backup_path: PathBuf,

    /// How long a database copy may wait on locks
    pub busy_timeout: Duration,

    /// Encryption passphrase; `None` disables encryption in both directions
    pub passphrase: Option<SecureString>,

    /// Cron expression for `cron` mode
    pub cron_schedule: Option<String>,

    /// URL notified after each successful backup
    pub webhook_url: Option<String>,

    /// Alternate object-store endpoint
    pub endpoint: Option<String>,
}

impl Settings {
    /// Load settings from the process environment
    pub fn from_env() -> Result<Self, DbsnapError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Returns `Config` when `S3_BUCKET` or `DATABASE_PATH` is missing, or
    /// when `SQLITE_TIMEOUT` is not a whole number of milliseconds.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DbsnapError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let bucket = get(env::BUCKET)
            .ok_or_else(|| DbsnapError::Config(format!("{} is required", env::BUCKET)))?;

        let database_path = get(env::DATABASE_PATH)
            .map(PathBuf::from)
            .ok_or_else(|| DbsnapError::Config(format!("{} is required", env::DATABASE_PATH)))?;

        let backup_path = get(env::BACKUP_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|| default_backup_path(&database_path));

        let busy_timeout = match get(env::BUSY_TIMEOUT) {
            Some(raw) => {
                let millis: u64 = raw.trim().parse().map_err(|e| {
                    DbsnapError::Config(format!(
                        "{} must be a number of milliseconds, got '{}': {}",
                        env::BUSY_TIMEOUT,
                        raw,
                        e
                    ))
                })?;
                Duration::from_millis(millis)
            }
            None => Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
        };

        Ok(Self {
            bucket,
            database_path,
            prefix: KeyPrefix::new(get(env::KEY_PREFIX).unwrap_or_default()),
            backup_path,
            busy_timeout,
            passphrase: lookup(env::ENCRYPTION_KEY)
                .filter(|value| !value.is_empty())
                .map(SecureString::new),
            cron_schedule: get(env::CRON_SCHEDULE),
            webhook_url: get(env::WEBHOOK_URL),
            endpoint: get(env::ENDPOINT),
        })
    }

    /// Check if backups are encrypted
    pub fn is_encryption_enabled(&self) -> bool {
        self.passphrase.is_some()
    }

    /// Local paths derived from these settings
    pub fn paths(&self) -> BackupPaths {
        BackupPaths::new(&self.database_path, &self.backup_path)
    }

    /// The cron expression, required in scheduled mode
    pub fn require_cron_schedule(&self) -> Result<&str, DbsnapError> {
        self.cron_schedule.as_deref().ok_or_else(|| {
            DbsnapError::Config(format!("{} is required in cron mode", env::CRON_SCHEDULE))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Settings, DbsnapError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|name| vars.get(name).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [(env::BUCKET, "backups"), (env::DATABASE_PATH, "/data/app.db")];

    #[test]
    fn test_defaults() {
        let settings = load(&REQUIRED).unwrap();
        assert_eq!(settings.bucket, "backups");
        assert_eq!(settings.database_path, PathBuf::from("/data/app.db"));
        assert_eq!(settings.backup_path, PathBuf::from("/data/app.db.bak"));
        assert_eq!(settings.busy_timeout, Duration::from_millis(10_000));
        assert!(settings.prefix.is_empty());
        assert!(!settings.is_encryption_enabled());
        assert!(settings.cron_schedule.is_none());
        assert!(settings.webhook_url.is_none());
        assert!(settings.endpoint.is_none());
    }

    #[test]
    fn test_missing_required() {
        let err = load(&[(env::DATABASE_PATH, "/data/app.db")]).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("S3_BUCKET"));

        let err = load(&[(env::BUCKET, "backups")]).unwrap_err();
        assert!(err.to_string().contains("DATABASE_PATH"));
    }

    #[test]
    fn test_empty_values_are_unset() {
        let err = load(&[(env::BUCKET, ""), (env::DATABASE_PATH, "/data/app.db")]).unwrap_err();
        assert!(err.is_config());

        let mut vars = REQUIRED.to_vec();
        vars.push((env::ENCRYPTION_KEY, ""));
        vars.push((env::WEBHOOK_URL, " "));
        let settings = load(&vars).unwrap();
        assert!(!settings.is_encryption_enabled());
        assert!(settings.webhook_url.is_none());
    }

    #[test]
    fn test_overrides() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            (env::KEY_PREFIX, "prod/app"),
            (env::BACKUP_PATH, "/tmp/work.bak"),
            (env::BUSY_TIMEOUT, "2500"),
            (env::ENCRYPTION_KEY, "correct horse battery staple"),
            (env::CRON_SCHEDULE, "0 */6 * * *"),
            (env::WEBHOOK_URL, "https://hooks.example.com/backup"),
            (env::ENDPOINT, "http://minio:9000"),
        ]);
        let settings = load(&vars).unwrap();
        assert_eq!(settings.prefix.as_str(), "prod/app/");
        assert_eq!(settings.backup_path, PathBuf::from("/tmp/work.bak"));
        assert_eq!(settings.busy_timeout, Duration::from_millis(2500));
        assert!(settings.is_encryption_enabled());
        assert_eq!(settings.require_cron_schedule().unwrap(), "0 */6 * * *");
        assert_eq!(settings.endpoint.as_deref(), Some("http://minio:9000"));
    }

    #[test]
    fn test_invalid_busy_timeout() {
        let mut vars = REQUIRED.to_vec();
        vars.push((env::BUSY_TIMEOUT, "ten seconds"));
        let err = load(&vars).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("SQLITE_TIMEOUT"));
    }

    #[test]
    fn test_cron_schedule_required_only_on_demand() {
        let settings = load(&REQUIRED).unwrap();
        assert!(settings.require_cron_schedule().unwrap_err().is_config());
    }

    #[test]
    fn test_passphrase_not_in_debug_output() {
        let mut vars = REQUIRED.to_vec();
        vars.push((env::ENCRYPTION_KEY, "hunter2hunter2"));
        let settings = load(&vars).unwrap();
        assert!(!format!("{:?}", settings).contains("hunter2"));
    }
}
