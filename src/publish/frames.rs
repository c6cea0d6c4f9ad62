//! Conversion of computed rows into destination frames, and of stored
//! history rows back into records.

use super::{Cell, Destination, PublishError, TableFrame};
use crate::domain::{
    AprResult, Decimal, EmissionRecord, Epoch, EpochApr, PartnerAttributionRow, PoolDistribution,
    PoolLedger, PoolSymbol, VoteRecord,
};

fn epoch_cell(epoch: Epoch) -> Cell {
    Cell::Int(i64::from(epoch.as_u32()))
}

fn apr_cells(apr: &AprResult) -> [Cell; 4] {
    [
        Cell::Number(apr.fee_apr),
        Cell::Number(apr.bribe_apr),
        Cell::Number(apr.voting_apr),
        Cell::Number(apr.rebase_apr),
    ]
}

pub fn ledger_frame(ledger: &PoolLedger) -> TableFrame {
    let mut frame = TableFrame::new(Destination::RevenueLedger);
    for row in ledger.rows() {
        let mut cells = vec![
            epoch_cell(row.epoch),
            Cell::Text(row.pool.as_str().to_string()),
            Cell::Number(row.fee_amount),
            Cell::Number(row.total_fees),
            Cell::Number(row.bribe_amount),
            Cell::Number(row.bribe_amount_prior),
            Cell::Number(row.emissions),
            Cell::Number(row.emission_value),
            Cell::Number(row.vote_weight),
            Cell::Number(row.quote_price),
            Cell::Number(row.vote_value),
            Cell::Number(row.voter_share),
            Cell::Number(row.revenue),
        ];
        cells.extend(apr_cells(&row.apr));
        frame.push(cells);
    }
    frame
}

pub fn vote_frame(votes: &[VoteRecord]) -> TableFrame {
    let mut frame = TableFrame::new(Destination::VoteWeights);
    for vote in votes {
        frame.push(vec![
            epoch_cell(vote.epoch),
            Cell::Text(vote.pool.as_str().to_string()),
            Cell::Number(vote.vote_weight),
            Cell::Number(vote.price),
            Cell::Number(vote.vote_value),
        ]);
    }
    frame
}

pub fn apr_frame(aprs: &[EpochApr]) -> TableFrame {
    let mut frame = TableFrame::new(Destination::AprHistory);
    for entry in aprs {
        let mut cells = vec![epoch_cell(entry.epoch)];
        cells.extend(apr_cells(&entry.apr));
        frame.push(cells);
    }
    frame
}

pub fn partner_frame(rows: &[PartnerAttributionRow]) -> TableFrame {
    let mut frame = TableFrame::new(Destination::PartnerVotes);
    for row in rows {
        frame.push(vec![
            epoch_cell(row.epoch),
            Cell::Text(row.partner_name.clone()),
            Cell::Text(row.partner_address.as_str().to_string()),
            Cell::Text(row.pool.as_str().to_string()),
            Cell::Number(row.vote_weight),
            Cell::Number(row.vote_pct),
            Cell::Number(row.bribe_amount),
            Cell::Number(row.total_vote_weight),
            Cell::Number(row.emissions),
            Cell::Number(row.emission_value),
            Cell::Number(row.voting_revenue),
            Cell::Number(row.spend),
            Cell::Number(row.bribe_roi),
        ]);
    }
    frame
}

pub fn emission_frame(records: &[EmissionRecord]) -> TableFrame {
    let mut frame = TableFrame::new(Destination::Emissions);
    for record in records {
        frame.push(vec![
            epoch_cell(record.epoch),
            Cell::Text(record.pool.as_str().to_string()),
            Cell::Number(record.emissions),
            Cell::Number(record.value),
            Cell::Number(record.price),
        ]);
    }
    frame
}

pub fn pool_distribution_frame(pools: &[PoolDistribution]) -> TableFrame {
    let mut frame = TableFrame::new(Destination::PoolDistributions);
    for entry in pools {
        frame.push(vec![
            epoch_cell(entry.epoch),
            Cell::Text(entry.pool.symbol.as_str().to_string()),
            Cell::Text(entry.pool.underlying_pool.as_str().to_string()),
            Cell::Int(i64::try_from(entry.distributions.count).unwrap_or(i64::MAX)),
            Cell::Text(entry.distributions.raw.clone()),
        ]);
    }
    frame
}

/// Typed access to one stored row of a destination.
struct StoredRow<'a> {
    destination: Destination,
    cells: &'a [Cell],
}

impl<'a> StoredRow<'a> {
    fn cell(&self, idx: usize) -> Result<&'a Cell, PublishError> {
        self.cells.get(idx).ok_or(PublishError::RowWidth {
            destination: self.destination,
            expected: self.destination.columns().len(),
            found: self.cells.len(),
        })
    }

    fn invalid(&self, idx: usize, cell: &Cell) -> PublishError {
        PublishError::InvalidStored {
            destination: self.destination,
            column: self.destination.columns().get(idx).copied().unwrap_or("?"),
            value: format!("{:?}", cell),
        }
    }

    fn epoch(&self, idx: usize) -> Result<Epoch, PublishError> {
        let cell = self.cell(idx)?;
        cell.as_int()
            .and_then(Epoch::from_i64)
            .ok_or_else(|| self.invalid(idx, cell))
    }

    fn symbol(&self, idx: usize) -> Result<PoolSymbol, PublishError> {
        let cell = self.cell(idx)?;
        cell.as_text()
            .map(PoolSymbol::new)
            .ok_or_else(|| self.invalid(idx, cell))
    }

    fn number(&self, idx: usize) -> Result<Decimal, PublishError> {
        let cell = self.cell(idx)?;
        cell.as_number().ok_or_else(|| self.invalid(idx, cell))
    }
}

fn decode<T>(
    destination: Destination,
    rows: &[Vec<Cell>],
    f: impl Fn(&StoredRow<'_>) -> Result<T, PublishError>,
) -> Result<Vec<T>, PublishError> {
    rows.iter()
        .map(|cells| f(&StoredRow { destination, cells }))
        .collect()
}

/// Stored `vote_weights` rows back to vote records.
pub fn vote_records(rows: &[Vec<Cell>]) -> Result<Vec<VoteRecord>, PublishError> {
    decode(Destination::VoteWeights, rows, |row| {
        Ok(VoteRecord {
            epoch: row.epoch(0)?,
            pool: row.symbol(1)?,
            vote_weight: row.number(2)?,
            price: row.number(3)?,
            vote_value: row.number(4)?,
        })
    })
}

/// Stored `emissions` rows back to emission records.
pub fn emission_records(rows: &[Vec<Cell>]) -> Result<Vec<EmissionRecord>, PublishError> {
    decode(Destination::Emissions, rows, |row| {
        Ok(EmissionRecord {
            epoch: row.epoch(0)?,
            pool: row.symbol(1)?,
            emissions: row.number(2)?,
            value: row.number(3)?,
            price: row.number(4)?,
        })
    })
}
