//! Publishing computed tables to the sink.
//!
//! A publish either replaces a destination wholesale or appends epoch rows
//! idempotently: appended rows first remove any existing rows of the same
//! epochs, so re-running a job for an epoch never duplicates it.

use crate::domain::Decimal;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use thiserror::Error;

pub mod frames;
pub mod memory;

pub use frames::{
    apr_frame, emission_frame, emission_records, ledger_frame, partner_frame,
    pool_distribution_frame, vote_frame, vote_records,
};
pub use memory::MemoryPublisher;

/// Named output table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Destination {
    RevenueLedger,
    VoteWeights,
    AprHistory,
    PartnerVotes,
    Emissions,
    PoolDistributions,
}

/// Storage type of a destination column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Int,
    Text,
    Number,
}

impl Destination {
    pub const ALL: [Destination; 6] = [
        Destination::RevenueLedger,
        Destination::VoteWeights,
        Destination::AprHistory,
        Destination::PartnerVotes,
        Destination::Emissions,
        Destination::PoolDistributions,
    ];

    pub fn table(&self) -> &'static str {
        match self {
            Destination::RevenueLedger => "revenue_ledger",
            Destination::VoteWeights => "vote_weights",
            Destination::AprHistory => "apr_history",
            Destination::PartnerVotes => "partner_votes",
            Destination::Emissions => "emissions",
            Destination::PoolDistributions => "pool_distributions",
        }
    }

    /// Column order of every row. The first column is always `epoch`.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Destination::RevenueLedger => &[
                "epoch",
                "pool",
                "fee_amount",
                "total_fees",
                "bribe_amount",
                "bribe_amount_prior",
                "emissions",
                "emission_value",
                "vote_weight",
                "quote_price",
                "vote_value",
                "voter_share",
                "revenue",
                "fee_apr",
                "bribe_apr",
                "voting_apr",
                "rebase_apr",
            ],
            Destination::VoteWeights => &["epoch", "pool", "vote_weight", "price", "vote_value"],
            Destination::AprHistory => {
                &["epoch", "fee_apr", "bribe_apr", "voting_apr", "rebase_apr"]
            }
            Destination::PartnerVotes => &[
                "epoch",
                "partner_name",
                "partner_address",
                "pool",
                "vote_weight",
                "vote_pct",
                "bribe_amount",
                "total_vote_weight",
                "emissions",
                "emission_value",
                "voting_revenue",
                "spend",
                "bribe_roi",
            ],
            Destination::Emissions => &["epoch", "pool", "emissions", "value", "price"],
            Destination::PoolDistributions => &[
                "epoch",
                "pool_name",
                "pool_address",
                "distributions",
                "distribution_data",
            ],
        }
    }

    /// Storage type of `column`. Columns not named here hold decimals.
    pub fn kind_of(column: &str) -> ColumnKind {
        match column {
            "epoch" | "distributions" => ColumnKind::Int,
            "pool" | "partner_name" | "partner_address" | "pool_name" | "pool_address"
            | "distribution_data" => ColumnKind::Text,
            _ => ColumnKind::Number,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishMode {
    /// Delete every existing row, then insert the frame.
    Replace,
    /// Delete existing rows of the frame's epochs, then insert the frame.
    Append,
}

impl PublishMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishMode::Replace => "replace",
            PublishMode::Append => "append",
        }
    }
}

impl fmt::Display for PublishMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One output cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Int(i64),
    Text(String),
    Number(Decimal),
}

impl Cell {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Cell::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }
}

/// Rows bound for one destination, in the destination's column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFrame {
    destination: Destination,
    rows: Vec<Vec<Cell>>,
}

impl TableFrame {
    pub fn new(destination: Destination) -> Self {
        Self {
            destination,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    pub fn destination(&self) -> Destination {
        self.destination
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct epochs in the frame, read from the first column.
    pub fn epochs(&self) -> BTreeSet<i64> {
        self.rows
            .iter()
            .filter_map(|row| row.first().and_then(Cell::as_int))
            .collect()
    }

    /// Check every row against the destination's shape.
    pub fn validate(&self) -> Result<(), PublishError> {
        let expected = self.destination.columns().len();
        for row in &self.rows {
            if row.len() != expected {
                return Err(PublishError::RowWidth {
                    destination: self.destination,
                    expected,
                    found: row.len(),
                });
            }
            if row.first().and_then(Cell::as_int).is_none() {
                return Err(PublishError::MissingEpoch(self.destination));
            }
        }
        Ok(())
    }
}

/// Outcome of one publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishReceipt {
    pub destination: Destination,
    pub mode: PublishMode,
    pub rows_written: usize,
    pub rows_removed: u64,
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("{destination} already written with mode {first} in this run; refusing {second}")]
    ModeConflict {
        destination: Destination,
        first: PublishMode,
        second: PublishMode,
    },
    #[error("{destination} rows have {expected} columns, got {found}")]
    RowWidth {
        destination: Destination,
        expected: usize,
        found: usize,
    },
    #[error("{0} row is missing its integer epoch column")]
    MissingEpoch(Destination),
    #[error("{destination}.{column} holds an unreadable value {value:?}")]
    InvalidStored {
        destination: Destination,
        column: &'static str,
        value: String,
    },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Tabular sink for computed frames.
///
/// Implementations apply a whole frame atomically: either every row is
/// visible after the call or none is.
#[async_trait]
pub trait Publisher: Send + Sync + fmt::Debug {
    async fn publish(
        &self,
        frame: &TableFrame,
        mode: PublishMode,
    ) -> Result<PublishReceipt, PublishError>;

    /// Every stored row of `destination` in insertion order.
    async fn read(&self, destination: Destination) -> Result<Vec<Vec<Cell>>, PublishError>;
}

/// Per-run guard: a destination keeps the first mode it was written with.
#[derive(Debug)]
pub struct PublishSession<'a> {
    publisher: &'a dyn Publisher,
    modes: HashMap<Destination, PublishMode>,
}

impl<'a> PublishSession<'a> {
    pub fn new(publisher: &'a dyn Publisher) -> Self {
        Self {
            publisher,
            modes: HashMap::new(),
        }
    }

    pub async fn publish(
        &mut self,
        frame: &TableFrame,
        mode: PublishMode,
    ) -> Result<PublishReceipt, PublishError> {
        let destination = frame.destination();
        if let Some(first) = self.modes.get(&destination) {
            if *first != mode {
                return Err(PublishError::ModeConflict {
                    destination,
                    first: *first,
                    second: mode,
                });
            }
        }
        frame.validate()?;
        let receipt = self.publisher.publish(frame, mode).await?;
        self.modes.insert(destination, mode);
        Ok(receipt)
    }
}
