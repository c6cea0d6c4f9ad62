//! Epoch reference table.
//!
//! The table labels each weekly boundary with the epoch that starts there.
//! Ledger datasets (fees, revenue) label the epoch that closes at that
//! boundary, which is one index lower.

use crate::domain::{Epoch, UnixSecs};
use std::collections::BTreeMap;
use thiserror::Error;

/// Offset from a reference-table epoch to the ledger epoch closing at the same boundary.
pub const TABLE_TO_LEDGER_OFFSET: i32 = -1;

/// One row of the epoch reference table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochRecord {
    pub epoch: Epoch,
    pub boundary: UnixSecs,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EpochTableError {
    #[error("epoch {0} appears more than once in the epoch table")]
    DuplicateEpoch(Epoch),
    #[error("boundary {0} appears more than once in the epoch table")]
    DuplicateBoundary(UnixSecs),
}

/// Read-only, validated epoch reference table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpochTable {
    by_boundary: BTreeMap<UnixSecs, Epoch>,
    by_epoch: BTreeMap<Epoch, UnixSecs>,
}

impl EpochTable {
    pub fn new(records: impl IntoIterator<Item = EpochRecord>) -> Result<Self, EpochTableError> {
        let mut table = EpochTable::default();
        for record in records {
            if table.by_epoch.insert(record.epoch, record.boundary).is_some() {
                return Err(EpochTableError::DuplicateEpoch(record.epoch));
            }
            if table.by_boundary.insert(record.boundary, record.epoch).is_some() {
                return Err(EpochTableError::DuplicateBoundary(record.boundary));
            }
        }
        Ok(table)
    }

    /// Epoch whose boundary is exactly `boundary`.
    pub fn epoch_at(&self, boundary: UnixSecs) -> Option<Epoch> {
        self.by_boundary.get(&boundary).copied()
    }

    pub fn boundary_of(&self, epoch: Epoch) -> Option<UnixSecs> {
        self.by_epoch.get(&epoch).copied()
    }

    pub fn len(&self) -> usize {
        self.by_epoch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_epoch.is_empty()
    }

    /// Records in ascending epoch order.
    pub fn records(&self) -> impl Iterator<Item = EpochRecord> + '_ {
        self.by_epoch
            .iter()
            .map(|(&epoch, &boundary)| EpochRecord { epoch, boundary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(epoch: u32, boundary: i64) -> EpochRecord {
        EpochRecord {
            epoch: Epoch::new(epoch),
            boundary: UnixSecs::new(boundary),
        }
    }

    #[test]
    fn test_lookup_both_directions() {
        let table = EpochTable::new(vec![record(0, 1_000), record(1, 605_800)]).unwrap();
        assert_eq!(table.epoch_at(UnixSecs::new(605_800)), Some(Epoch::new(1)));
        assert_eq!(table.boundary_of(Epoch::new(0)), Some(UnixSecs::new(1_000)));
        assert_eq!(table.epoch_at(UnixSecs::new(2_000)), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_duplicate_epoch_rejected() {
        let err = EpochTable::new(vec![record(3, 1_000), record(3, 2_000)]).unwrap_err();
        assert_eq!(err, EpochTableError::DuplicateEpoch(Epoch::new(3)));
    }

    #[test]
    fn test_duplicate_boundary_rejected() {
        let err = EpochTable::new(vec![record(3, 1_000), record(4, 1_000)]).unwrap_err();
        assert_eq!(err, EpochTableError::DuplicateBoundary(UnixSecs::new(1_000)));
    }

    #[test]
    fn test_records_sorted_by_epoch() {
        let table = EpochTable::new(vec![record(2, 3_000), record(1, 2_000)]).unwrap();
        let epochs: Vec<u32> = table.records().map(|r| r.epoch.as_u32()).collect();
        assert_eq!(epochs, vec![1, 2]);
    }
}
