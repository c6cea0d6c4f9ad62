//! Domain types for the epoch ledger.
//!
//! This module provides:
//! - Lossless numeric handling via Decimal wrapper
//! - Domain primitives: Epoch, UnixSecs, Address, PoolSymbol
//! - The epoch reference table
//! - Raw epoch-tagged events and reference records from the datasets
//! - Ledger rows, APR results and partner attribution rows
//! - Catalog pools and their active reward distributions

pub mod decimal;
pub mod epoch;
pub mod events;
pub mod ledger;
pub mod primitives;

pub use decimal::{Decimal, TOKEN_DECIMALS};
pub use epoch::{EpochRecord, EpochTable, EpochTableError, TABLE_TO_LEDGER_OFFSET};
pub use events::{
    ActiveDistributions, BribeEvent, CatalogPool, EmissionEvent, EmissionRecord, FeeEvent,
    GaugeReward, Partner, PoolDistribution, PoolIdentity, PriceQuote, RebaseEntry, VoteRecord,
    VoteWeightSnapshot,
};
pub use ledger::{
    AprResult, EpochApr, PartnerAttributionRow, PartnerVote, PoolLedger, PoolLedgerRow,
};
pub use primitives::{Address, AddressParseError, Epoch, PoolSymbol, UnixSecs, ZERO_ADDRESS};
