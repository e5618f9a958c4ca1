//! dbsnap - SQLite snapshot backup and restore against object storage
//!
//! Takes consistent online snapshots of a live SQLite database, optionally
//! encrypts them, and ships them to an S3-compatible bucket under
//! timestamped keys. Restores download a named snapshot and swap it into
//! place, rolling back to the previous database if anything goes wrong.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Environment settings and derived working paths
//! - `error`: Custom error types
//! - `models`: Snapshot timestamps and object keys
//! - `snapshot`: SQLite online-backup gateway
//! - `crypto`: Passphrase encryption of backup files
//! - `store`: Object store gateway
//! - `notify`: Webhook notifications
//! - `backup`: Backup and restore orchestrators
//! - `schedule`: Cron scheduling
//! - `cli`: Command handlers
//!
//! # Example
//!
//! ```rust,ignore
//! use dbsnap::config::Settings;
//!
//! let settings = Settings::from_env()?;
//! dbsnap::cli::handle_backup_command(&settings)?;
//! ```

pub mod backup;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod error;
pub mod models;
pub mod notify;
pub mod schedule;
pub mod snapshot;
pub mod store;

pub use error::{DbsnapError, DbsnapResult};
