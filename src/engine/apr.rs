//! Annualized yield from one epoch's ledger figures.

use super::sanitize::{or_zero, CheckedSum};
use crate::domain::{AprResult, Decimal, Epoch, PoolLedger, PoolLedgerRow};

/// Epochs per year used to annualize a single epoch's return.
pub const EPOCHS_PER_YEAR: u32 = 52;

/// Everything the APR formulas read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AprInput {
    pub fee_amount: Decimal,
    pub bribe_amount: Decimal,
    pub voter_share: Decimal,
    pub vote_weight: Decimal,
    pub quote_price: Decimal,
    pub rebase_emission: Decimal,
    pub total_vote_supply: Decimal,
}

impl AprInput {
    /// Per-pool inputs. A single pool has no rebase share, so rebase APR reports 0.
    pub fn from_row(row: &PoolLedgerRow) -> Self {
        Self {
            fee_amount: row.fee_amount,
            bribe_amount: row.bribe_amount,
            voter_share: row.voter_share,
            vote_weight: row.vote_weight,
            quote_price: row.quote_price,
            rebase_emission: Decimal::zero(),
            total_vote_supply: Decimal::zero(),
        }
    }
}

/// Epoch-wide sums over the ledger rows of one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochTotals {
    pub epoch: Epoch,
    pub fee_amount: Decimal,
    pub bribe_amount: Decimal,
    pub voter_share: Decimal,
    pub vote_weight: Decimal,
    /// Highest quote price seen among the epoch's rows.
    pub quote_price: Decimal,
    pub pools: usize,
}

impl EpochTotals {
    /// Sum the rows of `epoch`. None when the ledger has no rows for it.
    pub fn from_ledger(ledger: &PoolLedger, epoch: Epoch) -> Option<Self> {
        let mut fee_amount = CheckedSum::default();
        let mut bribe_amount = CheckedSum::default();
        let mut voter_share = CheckedSum::default();
        let mut vote_weight = CheckedSum::default();
        let mut quote_price = Decimal::zero();
        let mut pools = 0;
        for row in ledger.rows_for(epoch) {
            fee_amount.add(row.fee_amount);
            bribe_amount.add(row.bribe_amount);
            voter_share.add(row.voter_share);
            vote_weight.add(row.vote_weight);
            quote_price = quote_price.max(row.quote_price);
            pools += 1;
        }
        (pools > 0).then(|| EpochTotals {
            epoch,
            fee_amount: fee_amount.value(),
            bribe_amount: bribe_amount.value(),
            voter_share: voter_share.value(),
            vote_weight: vote_weight.value(),
            quote_price,
            pools,
        })
    }

    pub fn apr_input(&self, rebase_emission: Decimal, total_vote_supply: Decimal) -> AprInput {
        AprInput {
            fee_amount: self.fee_amount,
            bribe_amount: self.bribe_amount,
            voter_share: self.voter_share,
            vote_weight: self.vote_weight,
            quote_price: self.quote_price,
            rebase_emission,
            total_vote_supply,
        }
    }
}

/// Compute the four APR components, in percent.
///
/// Any component whose denominator is zero (or whose arithmetic overflows)
/// reports 0.
pub fn compute_apr(input: &AprInput) -> AprResult {
    let stake_value = input.vote_weight.checked_mul(input.quote_price);

    AprResult {
        fee_apr: annualize(input.fee_amount, stake_value),
        bribe_apr: annualize(input.bribe_amount, stake_value),
        voting_apr: annualize(input.voter_share, stake_value),
        rebase_apr: annualize(input.rebase_emission, Some(input.total_vote_supply)),
    }
}

fn annualize(numerator: Decimal, denominator: Option<Decimal>) -> Decimal {
    or_zero(
        denominator
            .and_then(|d| numerator.checked_div(d))
            .and_then(|r| r.checked_mul(Decimal::hundred()))
            .and_then(|r| r.checked_mul(Decimal::from(EPOCHS_PER_YEAR))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_fee_and_bribe_apr_scenario() {
        let input = AprInput {
            fee_amount: dec("50"),
            bribe_amount: dec("30"),
            voter_share: dec("80"),
            vote_weight: dec("1000"),
            quote_price: dec("2.0"),
            ..Default::default()
        };
        let apr = compute_apr(&input);
        assert_eq!(apr.fee_apr, dec("130"));
        assert_eq!(apr.bribe_apr, dec("78"));
        assert_eq!(apr.voting_apr, dec("208"));
        assert_eq!(apr.rebase_apr, Decimal::zero());
    }

    #[test]
    fn test_zero_stake_reports_zero() {
        let input = AprInput {
            fee_amount: dec("50"),
            bribe_amount: dec("30"),
            voter_share: dec("80"),
            vote_weight: Decimal::zero(),
            quote_price: dec("2"),
            ..Default::default()
        };
        let apr = compute_apr(&input);
        assert_eq!(apr, AprResult::default());
    }

    #[test]
    fn test_zero_price_reports_zero() {
        let input = AprInput {
            fee_amount: dec("50"),
            vote_weight: dec("1000"),
            quote_price: Decimal::zero(),
            ..Default::default()
        };
        assert_eq!(compute_apr(&input).fee_apr, Decimal::zero());
    }

    #[test]
    fn test_rebase_apr() {
        let input = AprInput {
            rebase_emission: dec("1000"),
            total_vote_supply: dec("52000"),
            ..Default::default()
        };
        assert_eq!(compute_apr(&input).rebase_apr, dec("100"));
    }

    #[test]
    fn test_overflowing_stake_reports_zero() {
        let input = AprInput {
            fee_amount: dec("1"),
            vote_weight: Decimal::new(rust_decimal::Decimal::MAX),
            quote_price: dec("10"),
            ..Default::default()
        };
        assert_eq!(compute_apr(&input).fee_apr, Decimal::zero());
    }
}
