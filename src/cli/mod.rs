//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the backup orchestrators.

pub mod backup;

pub use backup::{
    handle_backup_command, handle_cron_command, handle_list_command, handle_restore_command,
};
