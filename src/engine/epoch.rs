//! Epoch resolution from a wall-clock instant.

use crate::domain::{Epoch, EpochTable, UnixSecs, TABLE_TO_LEDGER_OFFSET};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Timelike, Utc, Weekday};
use thiserror::Error;

/// Epochs begin Thursday 00:00:00 UTC. Protocol constant.
pub const BOUNDARY_WEEKDAY: Weekday = Weekday::Thu;

/// Default hour after which a run on the boundary weekday targets the following week.
pub const DEFAULT_CUTOVER_HOUR: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverMode {
    /// The boundary at 00:00 UTC of the current day.
    Current,
    /// The upcoming boundary, respecting the cutover hour.
    Next,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EpochError {
    #[error("epoch table has no entry for boundary {0}")]
    NotFound(UnixSecs),
    #[error("epoch {0} has no closed ledger epoch before it")]
    BeforeGenesis(Epoch),
}

/// A boundary found in the epoch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedEpoch {
    /// Epoch index as numbered by the reference table.
    pub table_epoch: Epoch,
    pub boundary: UnixSecs,
}

impl ResolvedEpoch {
    /// The ledger epoch that closes at this boundary.
    pub fn ledger_epoch(&self) -> Result<Epoch, EpochError> {
        self.table_epoch
            .shift(TABLE_TO_LEDGER_OFFSET)
            .ok_or(EpochError::BeforeGenesis(self.table_epoch))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochResolver {
    cutover_hour: u32,
}

impl Default for EpochResolver {
    fn default() -> Self {
        Self::new(DEFAULT_CUTOVER_HOUR)
    }
}

impl EpochResolver {
    pub fn new(cutover_hour: u32) -> Self {
        Self { cutover_hour }
    }

    /// The canonical boundary instant for `now` under `mode`.
    pub fn boundary_for(&self, now: DateTime<Utc>, mode: ResolverMode) -> DateTime<Utc> {
        let today = now.date_naive();
        let date = match mode {
            ResolverMode::Current => today,
            ResolverMode::Next => {
                let days_ahead = if today.weekday() == BOUNDARY_WEEKDAY
                    && now.hour() > self.cutover_hour
                {
                    7
                } else {
                    days_until(today, BOUNDARY_WEEKDAY)
                };
                today + Duration::days(days_ahead)
            }
        };
        midnight_utc(date)
    }

    /// Resolve `now` to the table entry of its canonical boundary.
    pub fn resolve(
        &self,
        now: DateTime<Utc>,
        table: &EpochTable,
        mode: ResolverMode,
    ) -> Result<ResolvedEpoch, EpochError> {
        let boundary = UnixSecs::from_datetime(self.boundary_for(now, mode));
        let table_epoch = table
            .epoch_at(boundary)
            .ok_or(EpochError::NotFound(boundary))?;
        Ok(ResolvedEpoch {
            table_epoch,
            boundary,
        })
    }
}

/// Shorthand for `EpochResolver::new(cutover_hour).resolve(..)` returning the table index.
pub fn resolve_epoch(
    now: DateTime<Utc>,
    table: &EpochTable,
    mode: ResolverMode,
    cutover_hour: u32,
) -> Result<Epoch, EpochError> {
    EpochResolver::new(cutover_hour)
        .resolve(now, table, mode)
        .map(|resolved| resolved.table_epoch)
}

fn days_until(from: NaiveDate, weekday: Weekday) -> i64 {
    let from_idx = i64::from(from.weekday().num_days_from_monday());
    let to_idx = i64::from(weekday.num_days_from_monday());
    (to_idx - from_idx).rem_euclid(7)
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EpochRecord;
    use chrono::TimeZone;

    // 2024-01-04 is a Thursday.
    const THU_2024_01_04: i64 = 1_704_326_400;
    const WEEK: i64 = 7 * 24 * 3600;

    fn table() -> EpochTable {
        EpochTable::new((0..4).map(|i| EpochRecord {
            epoch: Epoch::new(10 + i as u32),
            boundary: UnixSecs::new(THU_2024_01_04 + i * WEEK),
        }))
        .unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 30, 0).unwrap()
    }

    #[test]
    fn test_current_floors_to_midnight() {
        let resolver = EpochResolver::default();
        let resolved = resolver
            .resolve(at(2024, 1, 4, 15), &table(), ResolverMode::Current)
            .unwrap();
        assert_eq!(resolved.table_epoch, Epoch::new(10));
        assert_eq!(resolved.boundary, UnixSecs::new(THU_2024_01_04));
        assert_eq!(resolved.ledger_epoch().unwrap(), Epoch::new(9));
    }

    #[test]
    fn test_current_off_boundary_day_is_not_found() {
        let err = EpochResolver::default()
            .resolve(at(2024, 1, 5, 0), &table(), ResolverMode::Current)
            .unwrap_err();
        assert_eq!(err, EpochError::NotFound(UnixSecs::new(THU_2024_01_04 + 86_400)));
    }

    #[test]
    fn test_next_midweek_targets_upcoming_thursday() {
        // Monday 2024-01-08
        let epoch = resolve_epoch(at(2024, 1, 8, 12), &table(), ResolverMode::Next, 1).unwrap();
        assert_eq!(epoch, Epoch::new(11));
    }

    #[test]
    fn test_next_on_thursday_before_cutover_is_today() {
        let now = Utc.with_ymd_and_hms(2024, 1, 11, 1, 59, 0).unwrap();
        let epoch = resolve_epoch(now, &table(), ResolverMode::Next, 1).unwrap();
        assert_eq!(epoch, Epoch::new(11));
    }

    #[test]
    fn test_next_on_thursday_after_cutover_skips_a_week() {
        let now = Utc.with_ymd_and_hms(2024, 1, 11, 2, 0, 0).unwrap();
        let epoch = resolve_epoch(now, &table(), ResolverMode::Next, 1).unwrap();
        assert_eq!(epoch, Epoch::new(12));
    }

    #[test]
    fn test_next_respects_configured_cutover() {
        let now = Utc.with_ymd_and_hms(2024, 1, 11, 5, 0, 0).unwrap();
        let epoch = resolve_epoch(now, &table(), ResolverMode::Next, 6).unwrap();
        assert_eq!(epoch, Epoch::new(11));
    }

    #[test]
    fn test_ledger_epoch_before_genesis() {
        let resolved = ResolvedEpoch {
            table_epoch: Epoch::new(0),
            boundary: UnixSecs::new(0),
        };
        assert_eq!(
            resolved.ledger_epoch().unwrap_err(),
            EpochError::BeforeGenesis(Epoch::new(0))
        );
    }

    #[test]
    fn test_days_until_wraps_week() {
        let friday = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(days_until(friday, Weekday::Thu), 6);
        let thursday = NaiveDate::from_ymd_opt(2024, 1, 4).unwrap();
        assert_eq!(days_until(thursday, Weekday::Thu), 0);
    }
}
