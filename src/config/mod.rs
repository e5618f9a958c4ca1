//! Configuration module for dbsnap
//!
//! This module provides:
//! - Environment-variable settings
//! - Working file path derivation

pub mod paths;
pub mod settings;

pub use paths::BackupPaths;
pub use settings::Settings;
