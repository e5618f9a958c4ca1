//! Core data models for dbsnap
//!
//! Snapshot identity and remote object naming.

pub mod object_key;
pub mod timestamp;

pub use object_key::{KeyPrefix, ObjectKey, OBJECT_SUFFIX};
pub use timestamp::{SnapshotTimestamp, TIMESTAMP_FORMAT};
