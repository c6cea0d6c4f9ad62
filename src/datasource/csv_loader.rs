//! CSV-backed dataset loader.
//!
//! Columns are located by header name, so extra columns are ignored and
//! column order does not matter. Numeric cells accept plain or scientific
//! notation; an empty numeric cell is zero. Rows tagged with a negative
//! epoch are dropped, not rejected.

use super::{DatasetLoader, LoadError};
use crate::domain::{
    Address, BribeEvent, Decimal, EmissionRecord, Epoch, EpochRecord, EpochTable, FeeEvent,
    GaugeReward, Partner, PoolIdentity, PoolSymbol, RebaseEntry, UnixSecs, VoteRecord,
};
use csv::StringRecord;
use rust_decimal::prelude::ToPrimitive;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Location of every dataset file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetPaths {
    pub epochs: PathBuf,
    pub fees: PathBuf,
    pub bribes: PathBuf,
    pub votes: PathBuf,
    pub emissions: PathBuf,
    pub pool_ids: PathBuf,
    pub partners: PathBuf,
    pub rebase_schedule: PathBuf,
    pub gauge_rewards: PathBuf,
}

impl DatasetPaths {
    /// Default file names under `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            epochs: dir.join("epochs.csv"),
            fees: dir.join("fees.csv"),
            bribes: dir.join("bribes.csv"),
            votes: dir.join("votes.csv"),
            emissions: dir.join("emissions.csv"),
            pool_ids: dir.join("pool_ids.csv"),
            partners: dir.join("partners.csv"),
            rebase_schedule: dir.join("rebase_schedule.csv"),
            gauge_rewards: dir.join("gauge_rewards.csv"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CsvDatasetLoader {
    paths: DatasetPaths,
    price_column: String,
}

impl CsvDatasetLoader {
    pub fn new(paths: DatasetPaths) -> Self {
        Self {
            paths,
            price_column: "RETRO_price".to_string(),
        }
    }

    /// Name of the native-token price column in the vote and emission histories.
    pub fn with_price_column(mut self, column: impl Into<String>) -> Self {
        self.price_column = column.into();
        self
    }

    pub fn paths(&self) -> &DatasetPaths {
        &self.paths
    }
}

impl DatasetLoader for CsvDatasetLoader {
    fn epoch_table(&self) -> Result<EpochTable, LoadError> {
        let table = CsvTable::open(&self.paths.epochs)?;
        let epoch = table.column(&["epoch"])?;
        let timestamp = table.column(&["timestamp"])?;

        let mut records = Vec::with_capacity(table.rows.len());
        for (line, row) in table.rows() {
            let Some(epoch) = table.epoch(line, row, epoch)? else {
                continue;
            };
            records.push(EpochRecord {
                epoch,
                boundary: UnixSecs::new(table.integer(line, row, timestamp)?),
            });
        }
        Ok(EpochTable::new(records)?)
    }

    fn fees(&self) -> Result<Vec<FeeEvent>, LoadError> {
        let table = CsvTable::open(&self.paths.fees)?;
        let epoch = table.column(&["epoch"])?;
        let pool = table.column(&["name_pool"])?;
        let amount = table.column(&["fee_amount"])?;
        let total = table.optional_column("total_fees");

        table
            .rows()
            .map(|(line, row)| {
                let Some(epoch) = table.epoch(line, row, epoch)? else {
                    return Ok(None);
                };
                let amount_value = table.decimal(line, row, amount)?;
                Ok(Some(FeeEvent {
                    epoch,
                    pool: table.symbol(row, pool),
                    amount: amount_value,
                    total_amount: match total {
                        Some(col) => table.decimal(line, row, col)?,
                        None => amount_value,
                    },
                }))
            })
            .filter_map(Result::transpose)
            .collect()
    }

    fn bribes(&self) -> Result<Vec<BribeEvent>, LoadError> {
        let table = CsvTable::open(&self.paths.bribes)?;
        let epoch = table.column(&["epoch"])?;
        let pool = table.column(&["name_pool"])?;
        let amount = table.column(&["bribe_amount"])?;

        table
            .rows()
            .map(|(line, row)| {
                let Some(epoch) = table.epoch(line, row, epoch)? else {
                    return Ok(None);
                };
                Ok(Some(BribeEvent {
                    epoch,
                    pool: table.symbol(row, pool),
                    amount: table.decimal(line, row, amount)?,
                }))
            })
            .filter_map(Result::transpose)
            .collect()
    }

    fn vote_history(&self) -> Result<Vec<VoteRecord>, LoadError> {
        let table = CsvTable::open(&self.paths.votes)?;
        let pool = table.column(&["name_pool"])?;
        let epoch = table.column(&["epoch"])?;
        let weight = table.column(&["voteweight"])?;
        let price = table.column(&[self.price_column.as_str()])?;
        let value = table.optional_column("votevalue");

        table
            .rows()
            .map(|(line, row)| {
                let Some(epoch) = table.epoch(line, row, epoch)? else {
                    return Ok(None);
                };
                let vote_weight = table.decimal(line, row, weight)?;
                let price = table.decimal(line, row, price)?;
                let vote_value = match value {
                    Some(col) => table.decimal(line, row, col)?,
                    None => vote_weight.checked_mul(price).unwrap_or_default(),
                };
                Ok(Some(VoteRecord {
                    pool: table.symbol(row, pool),
                    epoch,
                    vote_weight,
                    price,
                    vote_value,
                }))
            })
            .filter_map(Result::transpose)
            .collect()
    }

    fn emission_history(&self) -> Result<Vec<EmissionRecord>, LoadError> {
        let table = CsvTable::open(&self.paths.emissions)?;
        let epoch = table.column(&["epoch"])?;
        let pool = table.column(&["symbol"])?;
        let emissions = table.column(&["emissions"])?;
        let value = table.column(&["value"])?;
        let price = table.optional_column(&self.price_column);

        table
            .rows()
            .map(|(line, row)| {
                let Some(epoch) = table.epoch(line, row, epoch)? else {
                    return Ok(None);
                };
                Ok(Some(EmissionRecord {
                    epoch,
                    pool: table.symbol(row, pool),
                    emissions: table.decimal(line, row, emissions)?,
                    value: table.decimal(line, row, value)?,
                    price: match price {
                        Some(col) => table.decimal(line, row, col)?,
                        None => Decimal::zero(),
                    },
                }))
            })
            .filter_map(Result::transpose)
            .collect()
    }

    fn pool_identities(&self) -> Result<Vec<PoolIdentity>, LoadError> {
        let table = CsvTable::open(&self.paths.pool_ids)?;
        let symbol = table.column(&["symbol"])?;
        let gauge = table.column(&["gauge.address"])?;
        let bribe = table.column(&["gauge.bribe"])?;

        table
            .rows()
            .map(|(line, row)| {
                Ok(PoolIdentity {
                    symbol: table.symbol(row, symbol),
                    gauge: table.address(line, row, gauge)?,
                    bribe: table.address(line, row, bribe)?,
                })
            })
            .collect()
    }

    fn partners(&self) -> Result<Vec<Partner>, LoadError> {
        let table = CsvTable::open(&self.paths.partners)?;
        let name = table.column(&["partner_name"])?;
        let nft = table.column(&["nft_address"])?;

        table
            .rows()
            .map(|(line, row)| {
                Ok(Partner {
                    name: table.cell(row, name).to_string(),
                    nft_address: table.address(line, row, nft)?,
                })
            })
            .collect()
    }

    fn rebase_schedule(&self) -> Result<Vec<RebaseEntry>, LoadError> {
        let table = CsvTable::open(&self.paths.rebase_schedule)?;
        let epoch = table.column(&["Epoch", "epoch"])?;
        let rebase = table.column(&["Rebase", "rebase"])?;

        table
            .rows()
            .map(|(line, row)| {
                let Some(table_epoch) = table.epoch(line, row, epoch)? else {
                    return Ok(None);
                };
                Ok(Some(RebaseEntry {
                    table_epoch,
                    rebase: table.decimal(line, row, rebase)?,
                }))
            })
            .filter_map(Result::transpose)
            .collect()
    }

    fn gauge_rewards(&self) -> Result<Vec<GaugeReward>, LoadError> {
        let table = CsvTable::open(&self.paths.gauge_rewards)?;
        let gauge = table.column(&["gauge", "contract_address"])?;
        let reward = table.column(&["reward"])?;

        table
            .rows()
            .map(|(line, row)| {
                Ok(GaugeReward {
                    gauge: table.address(line, row, gauge)?,
                    raw_reward: table.decimal(line, row, reward)?,
                })
            })
            .collect()
    }
}

/// A fully read CSV file with its header row.
struct CsvTable {
    path: PathBuf,
    headers: StringRecord,
    rows: Vec<StringRecord>,
}

impl CsvTable {
    fn open(path: &Path) -> Result<Self, LoadError> {
        let file = File::open(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let csv_err = |source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(file);
        let headers = reader.headers().map_err(csv_err)?.clone();
        let rows = reader
            .records()
            .collect::<Result<Vec<_>, _>>()
            .map_err(csv_err)?;

        debug!(path = %path.display(), rows = rows.len(), "Loaded dataset");
        Ok(Self {
            path: path.to_path_buf(),
            headers,
            rows,
        })
    }

    /// Rows paired with their 1-based file line (header is line 1).
    fn rows(&self) -> impl Iterator<Item = (u64, &StringRecord)> {
        self.rows
            .iter()
            .enumerate()
            .map(|(idx, row)| (idx as u64 + 2, row))
    }

    /// Index of the first header matching one of `names`.
    fn column(&self, names: &[&str]) -> Result<usize, LoadError> {
        names
            .iter()
            .find_map(|name| self.optional_column(name))
            .ok_or_else(|| LoadError::MissingColumn {
                path: self.path.clone(),
                column: names.join(" or "),
            })
    }

    fn optional_column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn cell<'a>(&self, row: &'a StringRecord, col: usize) -> &'a str {
        row.get(col).unwrap_or("")
    }

    fn invalid(&self, line: u64, col: usize, value: &str) -> LoadError {
        LoadError::InvalidValue {
            path: self.path.clone(),
            line,
            column: self.headers.get(col).unwrap_or("?").to_string(),
            value: value.to_string(),
        }
    }

    fn decimal(&self, line: u64, row: &StringRecord, col: usize) -> Result<Decimal, LoadError> {
        let raw = self.cell(row, col);
        Decimal::parse_lenient(raw).map_err(|_| self.invalid(line, col, raw))
    }

    /// Integer cell; integral decimals such as `12.0` are accepted.
    fn integer(&self, line: u64, row: &StringRecord, col: usize) -> Result<i64, LoadError> {
        let raw = self.cell(row, col);
        if let Ok(value) = raw.parse::<i64>() {
            return Ok(value);
        }
        Decimal::parse_lenient(raw)
            .ok()
            .filter(|d| !raw.is_empty() && d.inner().fract().is_zero())
            .and_then(|d| d.inner().to_i64())
            .ok_or_else(|| self.invalid(line, col, raw))
    }

    /// Epoch cell. None for a negative epoch; the caller drops that row.
    fn epoch(
        &self,
        line: u64,
        row: &StringRecord,
        col: usize,
    ) -> Result<Option<Epoch>, LoadError> {
        let value = self.integer(line, row, col)?;
        if value < 0 {
            debug!(
                path = %self.path.display(),
                line,
                epoch = value,
                "Dropping row with negative epoch"
            );
            return Ok(None);
        }
        Epoch::from_i64(value)
            .map(Some)
            .ok_or_else(|| self.invalid(line, col, self.cell(row, col)))
    }

    fn symbol(&self, row: &StringRecord, col: usize) -> PoolSymbol {
        PoolSymbol::new(self.cell(row, col))
    }

    fn address(&self, line: u64, row: &StringRecord, col: usize) -> Result<Address, LoadError> {
        Address::parse(self.cell(row, col)).map_err(|source| LoadError::InvalidAddress {
            path: self.path.clone(),
            line,
            source,
        })
    }
}
