//! Remote object naming
//!
//! Every backup lands at `<prefix><timestamp>.bak`. The prefix is normalized
//! once, when configuration is loaded, so key construction is plain
//! concatenation.

use std::fmt;

use serde::Serialize;

use super::timestamp::{SnapshotTimestamp, TIMESTAMP_LEN};

/// Extension of every backup object
pub const OBJECT_SUFFIX: &str = ".bak";

/// Namespace separator inside a bucket
const SEPARATOR: char = '/';

/// Normalized object-key prefix
///
/// Empty, or ending with exactly the separator the caller supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeyPrefix(String);

impl KeyPrefix {
    /// Normalize a configured prefix
    ///
    /// A non-empty prefix gets a trailing `/` when it lacks one. Applying this
    /// to an already normalized prefix returns it unchanged.
    pub fn new(raw: impl Into<String>) -> Self {
        let mut prefix = raw.into();
        if !prefix.is_empty() && !prefix.ends_with(SEPARATOR) {
            prefix.push(SEPARATOR);
        }
        Self(prefix)
    }

    /// The normalized prefix
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if no prefix is configured
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Key of the object holding the snapshot taken at `timestamp`
    pub fn object_key(&self, timestamp: &SnapshotTimestamp) -> ObjectKey {
        ObjectKey(format!("{}{}{}", self.0, timestamp, OBJECT_SUFFIX))
    }

    /// Recover the snapshot timestamp from a key listed under this prefix
    ///
    /// Returns `None` for keys outside the prefix, nested deeper, or not named
    /// like a backup object.
    pub fn timestamp_of(&self, key: &str) -> Option<SnapshotTimestamp> {
        let name = key.strip_prefix(self.as_str())?.strip_suffix(OBJECT_SUFFIX)?;
        if name.len() != TIMESTAMP_LEN {
            return None;
        }
        SnapshotTimestamp::parse(name).ok()
    }
}

impl fmt::Display for KeyPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Full key of a backup object in the bucket
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// The key as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
