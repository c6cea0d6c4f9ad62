//! Raw epoch-tagged rows and reference records produced by the dataset loader.

use crate::domain::{Address, Decimal, Epoch, PoolSymbol};
use serde::{Deserialize, Serialize};

/// Fee collected by a pool in an epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeEvent {
    pub epoch: Epoch,
    pub pool: PoolSymbol,
    /// Fees distributed to voters.
    pub amount: Decimal,
    /// Total pool fees; equals `amount` when the source has no separate column.
    pub total_amount: Decimal,
}

/// Bribe deposited for a pool. Tagged one epoch ahead of fee data by source convention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BribeEvent {
    pub epoch: Epoch,
    pub pool: PoolSymbol,
    pub amount: Decimal,
}

/// Gauge emissions for a pool, in tokens and in quote value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmissionEvent {
    pub epoch: Epoch,
    pub pool: PoolSymbol,
    pub emissions: Decimal,
    pub value: Decimal,
}

/// Vote weight committed to a pool's gauge, in tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteWeightSnapshot {
    pub epoch: Epoch,
    pub pool: PoolSymbol,
    pub weight: Decimal,
}

/// Native token price recorded alongside a pool's vote weight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub epoch: Epoch,
    pub pool: PoolSymbol,
    pub price: Decimal,
}

/// One row of the vote history: what the votes job publishes and later reads back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub pool: PoolSymbol,
    pub epoch: Epoch,
    pub vote_weight: Decimal,
    pub price: Decimal,
    pub vote_value: Decimal,
}

impl VoteRecord {
    pub fn weight_snapshot(&self) -> VoteWeightSnapshot {
        VoteWeightSnapshot {
            epoch: self.epoch,
            pool: self.pool.clone(),
            weight: self.vote_weight,
        }
    }

    pub fn price_quote(&self) -> PriceQuote {
        PriceQuote {
            epoch: self.epoch,
            pool: self.pool.clone(),
            price: self.price,
        }
    }
}

/// Pool identity: symbol plus its gauge and bribe contracts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolIdentity {
    pub symbol: PoolSymbol,
    pub gauge: Address,
    pub bribe: Address,
}

impl PoolIdentity {
    /// False when the bribe contract is the zero address.
    pub fn has_bribe_gauge(&self) -> bool {
        !self.bribe.is_zero()
    }
}

/// A partner whose veNFT votes are attributed per pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partner {
    pub name: String,
    pub nft_address: Address,
}

/// Rebase emission scheduled for a reference-table epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebaseEntry {
    pub table_epoch: Epoch,
    pub rebase: Decimal,
}

/// A gauge reward event with its raw 18-decimal amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GaugeReward {
    pub gauge: Address,
    pub raw_reward: Decimal,
}

/// One row of the emission history: what the emissions job publishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmissionRecord {
    pub epoch: Epoch,
    pub pool: PoolSymbol,
    pub emissions: Decimal,
    pub value: Decimal,
    pub price: Decimal,
}

impl EmissionRecord {
    pub fn event(&self) -> EmissionEvent {
        EmissionEvent {
            epoch: self.epoch,
            pool: self.pool.clone(),
            emissions: self.emissions,
            value: self.value,
        }
    }
}

/// A pool listed by the pool catalog, with its underlying pool contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogPool {
    pub symbol: PoolSymbol,
    pub underlying_pool: Address,
}

/// Result of `getActivePoolDistributions`: the array length plus the raw
/// ABI-encoded return data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveDistributions {
    pub count: u64,
    pub raw: String,
}

impl ActiveDistributions {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// A catalog pool with at least one active reward distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolDistribution {
    pub epoch: Epoch,
    pub pool: CatalogPool,
    pub distributions: ActiveDistributions,
}
