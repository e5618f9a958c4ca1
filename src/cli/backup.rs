//! Backup CLI commands
//!
//! Implements the `backup`, `restore`, `cron` and `list` commands on top of
//! the orchestrators, wiring real gateways from the settings.

use tabled::settings::Style;
use tabled::{Table, Tabled};
use tracing::info;

use crate::backup::{BackupManager, BackupReport, RestoreManager};
use crate::config::{BackupPaths, Settings};
use crate::crypto::{Cipher, FileCipher};
use crate::error::DbsnapResult;
use crate::notify::{Notifier, WebhookNotifier};
use crate::schedule::{CronSchedule, Scheduler};
use crate::snapshot::SqliteSnapshot;
use crate::store::{ObjectStoreGateway, RemoteObject, RemoteStore};

/// Gateways built once per process from the settings
struct Gateways {
    paths: BackupPaths,
    snapshot: SqliteSnapshot,
    store: RemoteStore,
    cipher: Option<FileCipher>,
    notifier: Option<WebhookNotifier>,
}

impl Gateways {
    fn from_settings(settings: &Settings) -> DbsnapResult<Self> {
        let notifier = settings
            .webhook_url
            .as_deref()
            .map(WebhookNotifier::new)
            .transpose()?;

        Ok(Self {
            paths: settings.paths(),
            snapshot: SqliteSnapshot::new(settings.busy_timeout),
            store: RemoteStore::from_settings(settings)?,
            cipher: settings.passphrase.clone().map(FileCipher::new),
            notifier,
        })
    }

    fn cipher(&self) -> Option<&dyn Cipher> {
        self.cipher.as_ref().map(|c| c as &dyn Cipher)
    }

    fn notifier(&self) -> Option<&dyn Notifier> {
        self.notifier.as_ref().map(|n| n as &dyn Notifier)
    }

    fn backup(&self, settings: &Settings) -> DbsnapResult<BackupReport> {
        BackupManager::new(&self.paths, &settings.prefix, &self.snapshot, &self.store)
            .with_cipher(self.cipher())
            .with_notifier(self.notifier())
            .run()
    }
}

/// Row of the `list` table
#[derive(Tabled)]
struct BackupRow {
    #[tabled(rename = "TIMESTAMP")]
    timestamp: String,
    #[tabled(rename = "KEY")]
    key: String,
    #[tabled(rename = "SIZE")]
    size: String,
    #[tabled(rename = "UPLOADED")]
    uploaded: String,
}

impl From<&RemoteObject> for BackupRow {
    fn from(object: &RemoteObject) -> Self {
        Self {
            timestamp: object.timestamp.to_string(),
            key: object.key.clone(),
            size: format_size(object.size_bytes),
            uploaded: object.last_modified.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        }
    }
}

/// Run one backup cycle
pub fn handle_backup_command(settings: &Settings) -> DbsnapResult<()> {
    let gateways = Gateways::from_settings(settings)?;
    let report = gateways.backup(settings)?;

    println!("Backup uploaded: {}", report.key);
    println!("Timestamp: {}", report.timestamp);
    println!(
        "Size: {}{}",
        format_size(report.size_bytes),
        if report.encrypted { " (encrypted)" } else { "" }
    );
    Ok(())
}

/// Restore the snapshot taken at `timestamp`
pub fn handle_restore_command(settings: &Settings, timestamp: &str) -> DbsnapResult<()> {
    let gateways = Gateways::from_settings(settings)?;
    let report = RestoreManager::new(
        &gateways.paths,
        &settings.prefix,
        &gateways.snapshot,
        &gateways.store,
    )
    .with_cipher(gateways.cipher())
    .restore(timestamp)?;

    println!("{}", report.summary());
    println!("Database: {}", gateways.paths.database().display());
    Ok(())
}

/// Run a backup at every fire time of `CRON_SCHEDULE`
pub fn handle_cron_command(settings: &Settings) -> DbsnapResult<()> {
    let schedule = CronSchedule::parse(settings.require_cron_schedule()?)?;
    let gateways = Gateways::from_settings(settings)?;

    Scheduler::new(schedule).run(|| {
        let report = gateways.backup(settings)?;
        info!(key = %report.key, "scheduled backup finished");
        Ok(report)
    })
}

/// List backups under the configured prefix, newest first
pub fn handle_list_command(settings: &Settings) -> DbsnapResult<()> {
    let store = RemoteStore::from_settings(settings)?;
    let objects = store.list(&settings.prefix)?;

    if objects.is_empty() {
        println!("No backups found under '{}'.", settings.prefix);
        println!("Create one with: dbsnap backup");
        return Ok(());
    }

    let rows: Vec<BackupRow> = objects.iter().map(BackupRow::from).collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());

    println!("{}", table);
    println!("Total: {} backup(s)", objects.len());
    Ok(())
}

/// Format a file size in human-readable form
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SnapshotTimestamp;
    use chrono::Utc;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn test_backup_row() {
        let object = RemoteObject {
            key: "db/20250102030405.bak".into(),
            timestamp: SnapshotTimestamp::parse("20250102030405").unwrap(),
            size_bytes: 4096,
            last_modified: Utc::now(),
        };

        let row = BackupRow::from(&object);
        assert_eq!(row.timestamp, "20250102030405");
        assert_eq!(row.size, "4.0 KB");

        let table = Table::new(vec![row]).to_string();
        assert!(table.contains("TIMESTAMP"));
        assert!(table.contains("db/20250102030405.bak"));
    }
}
