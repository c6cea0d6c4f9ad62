//! Data source abstraction for the ledger inputs: CSV datasets, on-chain
//! voting-power snapshots, block heights and the spot price feed. The pool
//! catalog and reward distribution reads serve the pools report.

use crate::domain::{
    ActiveDistributions, Address, AddressParseError, BribeEvent, CatalogPool, Decimal,
    EmissionRecord, EpochTable, EpochTableError, FeeEvent, GaugeReward, Partner, PoolIdentity,
    RebaseEntry, UnixSecs, VoteRecord,
};
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub mod blocks;
pub mod catalog;
pub mod csv_loader;
pub mod http;
pub mod mock;
pub mod price;
pub mod rpc;

pub use blocks::LlamaBlockLookup;
pub use catalog::HttpPoolCatalog;
pub use csv_loader::{CsvDatasetLoader, DatasetPaths};
pub use http::JsonHttpClient;
pub use mock::{
    MockBlockHeightLookup, MockDatasetLoader, MockDistributionReader, MockPoolCatalog,
    MockPriceFeed, MockSnapshotGateway,
};
pub use price::HttpPriceFeed;
pub use rpc::JsonRpcSnapshotGateway;

/// Point in chain history a snapshot is read at.
///
/// Voting-escrow contracts accept either a timestamp or a block number as
/// the `uint256` argument, depending on the method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotAt {
    Timestamp(UnixSecs),
    Block(u64),
}

impl SnapshotAt {
    /// The value encoded as the call's `uint256` argument.
    pub fn as_word(&self) -> u128 {
        match self {
            // Epoch boundaries are never before 1970.
            SnapshotAt::Timestamp(ts) => u128::try_from(ts.as_i64()).unwrap_or_default(),
            SnapshotAt::Block(height) => u128::from(*height),
        }
    }
}

impl fmt::Display for SnapshotAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotAt::Timestamp(ts) => write!(f, "timestamp {}", ts),
            SnapshotAt::Block(height) => write!(f, "block {}", height),
        }
    }
}

/// Read-only voting-power snapshots.
///
/// Values are raw integer token units; callers scale them with `TOKEN_DECIMALS`.
/// Implementations must retry transient failures and bound every call by a timeout.
#[async_trait]
pub trait SnapshotGateway: Send + Sync + fmt::Debug {
    /// `totalSupplyAt(at)` on `contract`.
    async fn total_supply_at(
        &self,
        contract: &Address,
        at: SnapshotAt,
    ) -> Result<u128, DataSourceError>;

    /// `balanceOfOwnerAt(owner, at)` on `contract`.
    async fn balance_of_owner_at(
        &self,
        contract: &Address,
        owner: &Address,
        at: SnapshotAt,
    ) -> Result<u128, DataSourceError>;
}

/// Spot price of a token, looked up by symbol.
#[async_trait]
pub trait PriceFeed: Send + Sync + fmt::Debug {
    async fn spot_price(&self, symbol: &str) -> Result<Decimal, DataSourceError>;
}

/// Historical block height at a unix timestamp.
#[async_trait]
pub trait BlockHeightLookup: Send + Sync + fmt::Debug {
    async fn block_at(&self, at: UnixSecs) -> Result<u64, DataSourceError>;
}

/// Listing of the live pools with their underlying pool contracts.
#[async_trait]
pub trait PoolCatalog: Send + Sync + fmt::Debug {
    async fn catalog_pools(&self) -> Result<Vec<CatalogPool>, DataSourceError>;
}

/// Active reward distributions registered for a pool.
#[async_trait]
pub trait DistributionReader: Send + Sync + fmt::Debug {
    /// `getActivePoolDistributions(pool)` on `contract`.
    async fn active_pool_distributions(
        &self,
        contract: &Address,
        pool: &Address,
    ) -> Result<ActiveDistributions, DataSourceError>;
}

/// Read access to the reference tables and epoch-tagged datasets.
///
/// Reads are blocking file IO; async callers go through `spawn_blocking`.
pub trait DatasetLoader: Send + Sync + fmt::Debug {
    fn epoch_table(&self) -> Result<EpochTable, LoadError>;
    fn fees(&self) -> Result<Vec<FeeEvent>, LoadError>;
    fn bribes(&self) -> Result<Vec<BribeEvent>, LoadError>;
    fn vote_history(&self) -> Result<Vec<VoteRecord>, LoadError>;
    fn emission_history(&self) -> Result<Vec<EmissionRecord>, LoadError>;
    fn pool_identities(&self) -> Result<Vec<PoolIdentity>, LoadError>;
    fn partners(&self) -> Result<Vec<Partner>, LoadError>;
    fn rebase_schedule(&self) -> Result<Vec<RebaseEntry>, LoadError>;
    fn gauge_rewards(&self) -> Result<Vec<GaugeReward>, LoadError>;
}

/// Error type for remote data source operations.
#[derive(Debug, Clone)]
pub enum DataSourceError {
    /// Network error (e.g., connection refused, DNS failure)
    NetworkError(String),
    /// HTTP error (e.g., 429 rate limit, 5xx server error)
    HttpError { status: u16, message: String },
    /// Parsing error (invalid JSON or malformed response)
    ParseError(String),
    /// Rate limit exceeded (caller should implement backoff)
    RateLimited,
    /// The call did not complete within the request timeout
    Timeout { secs: u64 },
    /// JSON-RPC error object returned by the node
    Rpc { code: i64, message: String },
    /// Other error
    Other(String),
}

impl fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            DataSourceError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            DataSourceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            DataSourceError::RateLimited => write!(f, "Rate limited"),
            DataSourceError::Timeout { secs } => write!(f, "Timed out after {}s", secs),
            DataSourceError::Rpc { code, message } => {
                write!(f, "RPC error {}: {}", code, message)
            }
            DataSourceError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for DataSourceError {}

/// Error raised while reading a dataset file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("{path} has no column named {column}")]
    MissingColumn { path: PathBuf, column: String },
    #[error("{path} line {line}: invalid {column} value {value:?}")]
    InvalidValue {
        path: PathBuf,
        line: u64,
        column: String,
        value: String,
    },
    #[error("{path} line {line}: {source}")]
    InvalidAddress {
        path: PathBuf,
        line: u64,
        #[source]
        source: AddressParseError,
    },
    #[error("invalid epoch table: {0}")]
    EpochTable(#[from] EpochTableError),
}
