//! Snapshot identity
//!
//! A snapshot is identified by the wall-clock time it was taken, rendered as a
//! fixed-width, lexically sortable `YYYYMMDDHHMMSS` string.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DbsnapError;

/// strftime format of a snapshot timestamp
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Number of characters in a formatted timestamp
pub const TIMESTAMP_LEN: usize = 14;

/// Creation time of a snapshot, always UTC with second precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct SnapshotTimestamp(NaiveDateTime);

impl SnapshotTimestamp {
    /// Capture the current time
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Truncate a UTC datetime to a snapshot timestamp
    pub fn from_datetime(datetime: DateTime<Utc>) -> Self {
        let naive = datetime.naive_utc();
        Self(naive.with_nanosecond(0).unwrap_or(naive))
    }

    /// Parse a caller-supplied timestamp
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for empty input, anything that is not exactly
    /// 14 ASCII digits, or digits that do not form a valid date and time.
    pub fn parse(s: &str) -> Result<Self, DbsnapError> {
        if s.is_empty() {
            return Err(DbsnapError::InvalidArgument(
                "a backup timestamp is required (YYYYMMDDHHMMSS)".into(),
            ));
        }

        if s.len() != TIMESTAMP_LEN || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DbsnapError::InvalidArgument(format!(
                "'{}' is not a timestamp of the form YYYYMMDDHHMMSS",
                s
            )));
        }

        NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
            .map(Self)
            .map_err(|e| DbsnapError::InvalidArgument(format!("'{}' is not a valid date: {}", s, e)))
    }

    /// The timestamp as a UTC datetime
    pub fn as_datetime(&self) -> DateTime<Utc> {
        DateTime::from_naive_utc_and_offset(self.0, Utc)
    }
}

impl fmt::Display for SnapshotTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(TIMESTAMP_FORMAT))
    }
}

impl FromStr for SnapshotTimestamp {
    type Err = DbsnapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<SnapshotTimestamp> for String {
    fn from(ts: SnapshotTimestamp) -> Self {
        ts.to_string()
    }
}

impl TryFrom<String> for SnapshotTimestamp {
    type Error = DbsnapError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}
