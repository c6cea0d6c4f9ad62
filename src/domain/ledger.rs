//! Ledger output types: per-(epoch, pool) rows, APR figures and partner attribution.

use crate::domain::{Address, Decimal, Epoch, PoolSymbol};
use serde::{Deserialize, Serialize};

/// Annualized yield figures, in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AprResult {
    pub fee_apr: Decimal,
    pub bribe_apr: Decimal,
    pub voting_apr: Decimal,
    pub rebase_apr: Decimal,
}

/// Aggregated record for one (epoch, pool). Missing joins are zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolLedgerRow {
    pub epoch: Epoch,
    pub pool: PoolSymbol,
    pub fee_amount: Decimal,
    pub total_fees: Decimal,
    pub bribe_amount: Decimal,
    /// Bribe total recorded one epoch later, attributed to this epoch's vote.
    pub bribe_amount_prior: Decimal,
    pub emissions: Decimal,
    pub emission_value: Decimal,
    pub vote_weight: Decimal,
    pub quote_price: Decimal,
    pub vote_value: Decimal,
    /// `fee_amount + bribe_amount`
    pub voter_share: Decimal,
    /// `total_fees + bribe_amount`
    pub revenue: Decimal,
    pub apr: AprResult,
}

impl PoolLedgerRow {
    /// Canonical single-line encoding, stable across runs.
    pub fn canonical_line(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}|{}",
            self.epoch,
            self.pool,
            self.fee_amount,
            self.total_fees,
            self.bribe_amount,
            self.bribe_amount_prior,
            self.emissions,
            self.emission_value,
            self.vote_weight,
            self.quote_price,
            self.vote_value,
            self.voter_share,
            self.revenue,
            self.apr.fee_apr,
            self.apr.bribe_apr,
            self.apr.voting_apr,
            self.apr.rebase_apr,
        )
    }
}

/// The built ledger, ordered by (epoch, pool).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolLedger {
    rows: Vec<PoolLedgerRow>,
}

impl PoolLedger {
    /// Wrap rows, restoring (epoch, pool) order.
    pub fn new(mut rows: Vec<PoolLedgerRow>) -> Self {
        rows.sort_by(|a, b| (a.epoch, &a.pool).cmp(&(b.epoch, &b.pool)));
        Self { rows }
    }

    pub fn rows(&self) -> &[PoolLedgerRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<PoolLedgerRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, epoch: Epoch, pool: &PoolSymbol) -> Option<&PoolLedgerRow> {
        self.rows
            .iter()
            .find(|row| row.epoch == epoch && &row.pool == pool)
    }

    pub fn rows_for(&self, epoch: Epoch) -> impl Iterator<Item = &PoolLedgerRow> {
        self.rows.iter().filter(move |row| row.epoch == epoch)
    }

    pub fn max_epoch(&self) -> Option<Epoch> {
        self.rows.iter().map(|row| row.epoch).max()
    }

    /// SHA-256 over the canonical encoding of every row.
    ///
    /// Identical inputs produce identical fingerprints, which makes reruns comparable in logs.
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        for row in &self.rows {
            hasher.update(row.canonical_line().as_bytes());
            hasher.update(b"\n");
        }
        hex::encode(&hasher.finalize()[..16])
    }
}

/// Epoch-wide APR as published to the APR history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochApr {
    pub epoch: Epoch,
    pub apr: AprResult,
}

/// A partner's vote weight on one pool, read from chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerVote {
    pub partner_name: String,
    pub partner_address: Address,
    pub epoch: Epoch,
    pub pool: PoolSymbol,
    pub vote_weight: Decimal,
}

/// Partner spend and ROI for one (partner, pool, epoch).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerAttributionRow {
    pub partner_name: String,
    pub partner_address: Address,
    pub epoch: Epoch,
    pub pool: PoolSymbol,
    pub vote_weight: Decimal,
    /// Share of the partner's total weight in this epoch, in percent.
    pub vote_pct: Decimal,
    pub bribe_amount: Decimal,
    pub total_vote_weight: Decimal,
    pub emissions: Decimal,
    pub emission_value: Decimal,
    pub voting_revenue: Decimal,
    pub spend: Decimal,
    pub bribe_roi: Decimal,
}
