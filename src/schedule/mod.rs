//! Cron scheduling for repeated backups
//!
//! Expressions use the standard five fields (minute, hour, day of month,
//! month, day of week) and are evaluated in UTC, matching snapshot
//! timestamps.

use std::fmt;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::error::{DbsnapError, DbsnapResult};

/// A validated cron expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CronSchedule {
    expression: String,
}

impl CronSchedule {
    /// Validate `expression` by computing its next fire time
    pub fn parse(expression: &str) -> DbsnapResult<Self> {
        let expression = expression.trim();
        if expression.is_empty() {
            return Err(DbsnapError::Schedule("cron expression is empty".into()));
        }
        if expression.split_whitespace().count() != 5 {
            return Err(DbsnapError::Schedule(format!(
                "'{}' must have five fields: minute hour day-of-month month day-of-week",
                expression
            )));
        }

        let schedule = Self {
            expression: expression.to_string(),
        };
        schedule.next_after(Utc::now())?;
        Ok(schedule)
    }

    /// Get the expression
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First fire time strictly after `after`
    pub fn next_after(&self, after: DateTime<Utc>) -> DbsnapResult<DateTime<Utc>> {
        cron_parser::parse(&self.expression, &after).map_err(|e| {
            DbsnapError::Schedule(format!("invalid cron expression '{}': {:?}", self.expression, e))
        })
    }
}

impl fmt::Display for CronSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expression)
    }
}

/// Runs a job at every fire time of a schedule
pub struct Scheduler {
    schedule: CronSchedule,
}

impl Scheduler {
    pub fn new(schedule: CronSchedule) -> Self {
        Self { schedule }
    }

    /// Run `job` at each fire time, forever
    ///
    /// A failed job is logged and the loop carries on; only a schedule that
    /// can no longer produce a fire time ends the loop.
    pub fn run<T, F>(&self, job: F) -> DbsnapResult<()>
    where
        F: FnMut() -> DbsnapResult<T>,
    {
        self.run_with(job, thread::sleep, None)
    }

    /// Run `job` at each fire time, waiting through `sleep`
    ///
    /// Stops after `max_cycles` runs when given.
    pub fn run_with<T, F, S>(&self, mut job: F, mut sleep: S, max_cycles: Option<usize>) -> DbsnapResult<()>
    where
        F: FnMut() -> DbsnapResult<T>,
        S: FnMut(Duration),
    {
        info!(schedule = %self.schedule, "scheduler started");

        let mut cycles = 0usize;
        while max_cycles.map_or(true, |max| cycles < max) {
            let now = Utc::now();
            let next = self.schedule.next_after(now)?;
            info!(next = %next.to_rfc3339(), "waiting for next run");
            sleep(wait_duration(now, next));

            if let Err(e) = job() {
                error!(error = %e, "scheduled backup failed");
            }
            cycles += 1;
        }

        Ok(())
    }
}

/// Time to sleep from `now` until `next`; zero if `next` has passed
fn wait_duration(now: DateTime<Utc>, next: DateTime<Utc>) -> Duration {
    (next - now).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_parse_valid() {
        let schedule = CronSchedule::parse(" 0 2 * * * ").unwrap();
        assert_eq!(schedule.expression(), "0 2 * * *");
        assert_eq!(schedule.to_string(), "0 2 * * *");
    }

    #[test]
    fn test_parse_rejects_empty() {
        let err = CronSchedule::parse("  ").unwrap_err();
        assert!(matches!(err, DbsnapError::Schedule(_)));
    }

    #[test]
    fn test_parse_rejects_wrong_field_count() {
        assert!(CronSchedule::parse("0 2 * *").is_err());
        assert!(CronSchedule::parse("0 0 2 * * *").is_err());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = CronSchedule::parse("every day at two").unwrap_err();
        assert!(matches!(err, DbsnapError::Schedule(_)));
        assert!(CronSchedule::parse("61 * * * *").is_err());
    }

    #[test]
    fn test_next_after_daily() {
        let schedule = CronSchedule::parse("0 2 * * *").unwrap();

        let before = at(2025, 1, 2, 1, 30, 0);
        assert_eq!(schedule.next_after(before).unwrap(), at(2025, 1, 2, 2, 0, 0));

        let after = at(2025, 1, 2, 2, 30, 0);
        assert_eq!(schedule.next_after(after).unwrap(), at(2025, 1, 3, 2, 0, 0));
    }

    #[test]
    fn test_next_after_every_fifteen_minutes() {
        let schedule = CronSchedule::parse("*/15 * * * *").unwrap();
        let now = at(2025, 6, 1, 10, 7, 12);
        assert_eq!(schedule.next_after(now).unwrap(), at(2025, 6, 1, 10, 15, 0));
    }

    #[test]
    fn test_failed_cycle_does_not_stop_scheduler() {
        let scheduler = Scheduler::new(CronSchedule::parse("* * * * *").unwrap());
        let mut calls = 0;
        let mut waits = Vec::new();

        let result = scheduler.run_with(
            || {
                calls += 1;
                if calls == 1 {
                    Err(DbsnapError::SnapshotFailed("database is locked".into()))
                } else {
                    Ok(())
                }
            },
            |wait| waits.push(wait),
            Some(2),
        );

        assert!(result.is_ok());
        assert_eq!(calls, 2);
        assert_eq!(waits.len(), 2);
        assert!(waits.iter().all(|wait| *wait <= Duration::from_secs(60)));
    }

    #[test]
    fn test_wait_duration() {
        let now = at(2025, 1, 1, 0, 0, 0);
        assert_eq!(wait_duration(now, at(2025, 1, 1, 0, 1, 30)), Duration::from_secs(90));
        assert_eq!(wait_duration(now, at(2024, 12, 31, 23, 59, 0)), Duration::ZERO);
    }
}
