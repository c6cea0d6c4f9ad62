//! Mock collaborators for testing without files or network calls.

use super::{
    BlockHeightLookup, DataSourceError, DatasetLoader, DistributionReader, LoadError,
    PoolCatalog, PriceFeed, SnapshotAt, SnapshotGateway,
};
use crate::domain::{
    ActiveDistributions, Address, BribeEvent, CatalogPool, Decimal, EmissionRecord, EpochRecord,
    EpochTable, FeeEvent, GaugeReward, Partner, PoolIdentity, PoolSymbol, RebaseEntry, UnixSecs,
    VoteRecord,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory datasets.
#[derive(Debug, Clone, Default)]
pub struct MockDatasetLoader {
    epochs: Vec<EpochRecord>,
    fees: Vec<FeeEvent>,
    bribes: Vec<BribeEvent>,
    votes: Vec<VoteRecord>,
    emissions: Vec<EmissionRecord>,
    pools: Vec<PoolIdentity>,
    partners: Vec<Partner>,
    rebase_schedule: Vec<RebaseEntry>,
    gauge_rewards: Vec<GaugeReward>,
}

impl MockDatasetLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_epochs(mut self, epochs: Vec<EpochRecord>) -> Self {
        self.epochs.extend(epochs);
        self
    }

    pub fn with_fees(mut self, fees: Vec<FeeEvent>) -> Self {
        self.fees.extend(fees);
        self
    }

    pub fn with_bribes(mut self, bribes: Vec<BribeEvent>) -> Self {
        self.bribes.extend(bribes);
        self
    }

    pub fn with_votes(mut self, votes: Vec<VoteRecord>) -> Self {
        self.votes.extend(votes);
        self
    }

    pub fn with_emissions(mut self, emissions: Vec<EmissionRecord>) -> Self {
        self.emissions.extend(emissions);
        self
    }

    pub fn with_pool(mut self, pool: PoolIdentity) -> Self {
        self.pools.push(pool);
        self
    }

    pub fn with_partner(mut self, partner: Partner) -> Self {
        self.partners.push(partner);
        self
    }

    pub fn with_rebase(mut self, entry: RebaseEntry) -> Self {
        self.rebase_schedule.push(entry);
        self
    }

    pub fn with_gauge_reward(mut self, reward: GaugeReward) -> Self {
        self.gauge_rewards.push(reward);
        self
    }
}

impl DatasetLoader for MockDatasetLoader {
    fn epoch_table(&self) -> Result<EpochTable, LoadError> {
        Ok(EpochTable::new(self.epochs.iter().copied())?)
    }

    fn fees(&self) -> Result<Vec<FeeEvent>, LoadError> {
        Ok(self.fees.clone())
    }

    fn bribes(&self) -> Result<Vec<BribeEvent>, LoadError> {
        Ok(self.bribes.clone())
    }

    fn vote_history(&self) -> Result<Vec<VoteRecord>, LoadError> {
        Ok(self.votes.clone())
    }

    fn emission_history(&self) -> Result<Vec<EmissionRecord>, LoadError> {
        Ok(self.emissions.clone())
    }

    fn pool_identities(&self) -> Result<Vec<PoolIdentity>, LoadError> {
        Ok(self.pools.clone())
    }

    fn partners(&self) -> Result<Vec<Partner>, LoadError> {
        Ok(self.partners.clone())
    }

    fn rebase_schedule(&self) -> Result<Vec<RebaseEntry>, LoadError> {
        Ok(self.rebase_schedule.clone())
    }

    fn gauge_rewards(&self) -> Result<Vec<GaugeReward>, LoadError> {
        Ok(self.gauge_rewards.clone())
    }
}

/// Snapshot gateway answering from fixed tables. Unknown keys fail with
/// `DataSourceError::Other`, like a reverted call.
#[derive(Debug, Default)]
pub struct MockSnapshotGateway {
    total_supply: HashMap<Address, u128>,
    balances: HashMap<(Address, Address), u128>,
    failing: Vec<Address>,
    calls: AtomicUsize,
}

impl MockSnapshotGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// `totalSupplyAt` of `contract`, at any point.
    pub fn with_total_supply(mut self, contract: Address, raw: u128) -> Self {
        self.total_supply.insert(contract, raw);
        self
    }

    /// `balanceOfOwnerAt(owner)` on `contract`, at any point.
    pub fn with_balance(mut self, contract: Address, owner: Address, raw: u128) -> Self {
        self.balances.insert((contract, owner), raw);
        self
    }

    /// Every call against `contract` fails with a network error.
    pub fn with_failure(mut self, contract: Address) -> Self {
        self.failing.push(contract);
        self
    }

    /// Number of calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record_call(&self, contract: &Address) -> Result<(), DataSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(contract) {
            return Err(DataSourceError::NetworkError(format!(
                "connection reset calling {}",
                contract
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl SnapshotGateway for MockSnapshotGateway {
    async fn total_supply_at(
        &self,
        contract: &Address,
        _at: SnapshotAt,
    ) -> Result<u128, DataSourceError> {
        self.record_call(contract)?;
        self.total_supply
            .get(contract)
            .copied()
            .ok_or_else(|| DataSourceError::Other(format!("execution reverted: {}", contract)))
    }

    async fn balance_of_owner_at(
        &self,
        contract: &Address,
        owner: &Address,
        _at: SnapshotAt,
    ) -> Result<u128, DataSourceError> {
        self.record_call(contract)?;
        Ok(self
            .balances
            .get(&(contract.clone(), owner.clone()))
            .copied()
            .unwrap_or(0))
    }
}

/// Price feed with fixed prices per symbol.
#[derive(Debug, Clone, Default)]
pub struct MockPriceFeed {
    prices: HashMap<String, Decimal>,
}

impl MockPriceFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, symbol: &str, price: Decimal) -> Self {
        self.prices.insert(symbol.to_string(), price);
        self
    }
}

#[async_trait]
impl PriceFeed for MockPriceFeed {
    async fn spot_price(&self, symbol: &str) -> Result<Decimal, DataSourceError> {
        self.prices
            .get(symbol)
            .copied()
            .ok_or_else(|| DataSourceError::Other(format!("no price for symbol {}", symbol)))
    }
}

/// Block lookup with fixed heights per timestamp.
#[derive(Debug, Clone, Default)]
pub struct MockBlockHeightLookup {
    heights: HashMap<UnixSecs, u64>,
}

impl MockBlockHeightLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_height(mut self, at: UnixSecs, height: u64) -> Self {
        self.heights.insert(at, height);
        self
    }
}

#[async_trait]
impl BlockHeightLookup for MockBlockHeightLookup {
    async fn block_at(&self, at: UnixSecs) -> Result<u64, DataSourceError> {
        self.heights.get(&at).copied().ok_or(DataSourceError::HttpError {
            status: 404,
            message: format!("no block for {}", at),
        })
    }
}

/// Pool catalog with a fixed listing.
#[derive(Debug, Clone, Default)]
pub struct MockPoolCatalog {
    pools: Vec<CatalogPool>,
    unavailable: bool,
}

impl MockPoolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pool(mut self, symbol: &str, underlying_pool: Address) -> Self {
        self.pools.push(CatalogPool {
            symbol: PoolSymbol::new(symbol),
            underlying_pool,
        });
        self
    }

    /// The listing request fails with a 503.
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }
}

#[async_trait]
impl PoolCatalog for MockPoolCatalog {
    async fn catalog_pools(&self) -> Result<Vec<CatalogPool>, DataSourceError> {
        if self.unavailable {
            return Err(DataSourceError::HttpError {
                status: 503,
                message: "catalog unavailable".to_string(),
            });
        }
        Ok(self.pools.clone())
    }
}

/// Distribution reads answering from a fixed table. Unknown pools have none.
#[derive(Debug, Default)]
pub struct MockDistributionReader {
    distributions: HashMap<Address, u64>,
    failing: Vec<Address>,
    calls: AtomicUsize,
}

impl MockDistributionReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// `pool` has `count` active distributions.
    pub fn with_distributions(mut self, pool: Address, count: u64) -> Self {
        self.distributions.insert(pool, count);
        self
    }

    /// Every read for `pool` fails with a network error.
    pub fn with_failure(mut self, pool: Address) -> Self {
        self.failing.push(pool);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DistributionReader for MockDistributionReader {
    async fn active_pool_distributions(
        &self,
        _contract: &Address,
        pool: &Address,
    ) -> Result<ActiveDistributions, DataSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(pool) {
            return Err(DataSourceError::NetworkError(format!(
                "connection reset reading {}",
                pool
            )));
        }
        let count = self.distributions.get(pool).copied().unwrap_or(0);
        Ok(ActiveDistributions {
            count,
            raw: format!("0x{:064x}{:064x}", 32, count),
        })
    }
}
