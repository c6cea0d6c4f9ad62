pub mod config;
pub mod datasource;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod publish;

pub use config::Config;
pub use datasource::{
    BlockHeightLookup, DataSourceError, DatasetLoader, DistributionReader, LoadError, PoolCatalog,
    PriceFeed, SnapshotAt, SnapshotGateway,
};
pub use db::{init_db, SqlitePublisher};
pub use domain::{Address, Decimal, Epoch, PoolLedger, PoolLedgerRow, PoolSymbol, UnixSecs};
pub use engine::{compute_apr, resolve_epoch, LedgerBuilder, LedgerSources, ResolverMode};
pub use error::RunError;
pub use orchestration::{Collaborators, Job, JobSettings, Orchestrator};
pub use publish::{Destination, PublishMode, Publisher};
