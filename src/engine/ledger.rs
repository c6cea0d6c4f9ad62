//! Epoch ledger builder: the outer-join aggregation of every epoch-tagged source.
//!
//! The build is a single pass over owned inputs; ordering comes from
//! `BTreeMap` keys so two builds over the same inputs are identical.

use super::apr::{compute_apr, AprInput};
use super::sanitize::{sanitize_ledger_row, CheckedSum};
use crate::domain::{
    AprResult, BribeEvent, Decimal, EmissionEvent, EmissionRecord, Epoch, FeeEvent, PoolLedger,
    PoolLedgerRow, PoolSymbol, PriceQuote, VoteRecord, VoteWeightSnapshot,
};
use std::collections::BTreeMap;

/// Aggregation key.
pub type LedgerKey = (Epoch, PoolSymbol);

/// Shift applied to bribe totals: bribes recorded at epoch N belong to row N-1.
pub const PRIOR_BRIBE_SHIFT: i32 = -1;

/// Shift applied to emissions when attributing them to the vote that earned them.
pub const EMISSION_ATTRIBUTION_SHIFT: i32 = -1;

/// All raw inputs of one ledger build.
#[derive(Debug, Clone, Default)]
pub struct LedgerSources {
    pub fees: Vec<FeeEvent>,
    pub bribes: Vec<BribeEvent>,
    pub emissions: Vec<EmissionEvent>,
    pub vote_weights: Vec<VoteWeightSnapshot>,
    pub prices: Vec<PriceQuote>,
}

impl LedgerSources {
    /// Assemble sources from the loaded datasets. Vote history rows are split
    /// into weight snapshots and price quotes.
    pub fn from_datasets(
        fees: Vec<FeeEvent>,
        bribes: Vec<BribeEvent>,
        emissions: &[EmissionRecord],
        votes: &[VoteRecord],
    ) -> Self {
        Self {
            fees,
            bribes,
            emissions: emissions.iter().map(EmissionRecord::event).collect(),
            vote_weights: votes.iter().map(VoteRecord::weight_snapshot).collect(),
            prices: votes.iter().map(VoteRecord::price_quote).collect(),
        }
    }
}

/// Emission totals for one key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmissionTotals {
    pub emissions: Decimal,
    pub value: Decimal,
}

/// Move every key of `series` by `delta` epochs. Keys that would go negative are dropped.
pub fn shift_epoch<V: Clone>(series: &BTreeMap<LedgerKey, V>, delta: i32) -> BTreeMap<LedgerKey, V> {
    series
        .iter()
        .filter_map(|((epoch, pool), value)| {
            epoch
                .shift(delta)
                .map(|shifted| ((shifted, pool.clone()), value.clone()))
        })
        .collect()
}

pub fn aggregate_bribes(bribes: &[BribeEvent]) -> BTreeMap<LedgerKey, Decimal> {
    let mut totals: BTreeMap<LedgerKey, CheckedSum> = BTreeMap::new();
    for bribe in bribes {
        totals
            .entry((bribe.epoch, bribe.pool.clone()))
            .or_default()
            .add(bribe.amount);
    }
    totals.into_iter().map(|(key, sum)| (key, sum.value())).collect()
}

pub fn aggregate_emissions(emissions: &[EmissionEvent]) -> BTreeMap<LedgerKey, EmissionTotals> {
    let mut totals: BTreeMap<LedgerKey, (CheckedSum, CheckedSum)> = BTreeMap::new();
    for event in emissions {
        let (emitted, value) = totals.entry((event.epoch, event.pool.clone())).or_default();
        emitted.add(event.emissions);
        value.add(event.value);
    }
    totals
        .into_iter()
        .map(|(key, (emitted, value))| {
            let totals = EmissionTotals {
                emissions: emitted.value(),
                value: value.value(),
            };
            (key, totals)
        })
        .collect()
}

/// Overflowing sums collapse to 0 for that column only.
#[derive(Debug, Default)]
struct Accumulator {
    fee_amount: CheckedSum,
    total_fees: CheckedSum,
    bribe_amount: CheckedSum,
    bribe_amount_prior: CheckedSum,
    emissions: CheckedSum,
    emission_value: CheckedSum,
    vote_weight: CheckedSum,
    quote_price: Decimal,
}

/// Builds the per-(epoch, pool) ledger.
#[derive(Debug, Clone, Copy, Default)]
pub struct LedgerBuilder {
    only_epoch: Option<Epoch>,
}

impl LedgerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only `epoch` in the output. The latest-epoch exclusion still
    /// applies to the whole build first.
    pub fn for_epoch(mut self, epoch: Epoch) -> Self {
        self.only_epoch = Some(epoch);
        self
    }

    pub fn build(&self, sources: &LedgerSources) -> PoolLedger {
        let mut acc: BTreeMap<LedgerKey, Accumulator> = BTreeMap::new();

        for fee in &sources.fees {
            let entry = acc.entry((fee.epoch, fee.pool.clone())).or_default();
            entry.fee_amount.add(fee.amount);
            entry.total_fees.add(fee.total_amount);
        }

        let bribes = aggregate_bribes(&sources.bribes);
        for (key, amount) in &bribes {
            acc.entry(key.clone()).or_default().bribe_amount.add(*amount);
        }
        for (key, amount) in shift_epoch(&bribes, PRIOR_BRIBE_SHIFT) {
            acc.entry(key).or_default().bribe_amount_prior.add(amount);
        }

        for (key, totals) in aggregate_emissions(&sources.emissions) {
            let entry = acc.entry(key).or_default();
            entry.emissions.add(totals.emissions);
            entry.emission_value.add(totals.value);
        }

        for snapshot in &sources.vote_weights {
            acc.entry((snapshot.epoch, snapshot.pool.clone()))
                .or_default()
                .vote_weight
                .add(snapshot.weight);
        }

        for quote in &sources.prices {
            let entry = acc.entry((quote.epoch, quote.pool.clone())).or_default();
            entry.quote_price = entry.quote_price.max(quote.price);
        }

        // The newest epoch is still accruing; it never leaves the builder.
        if let Some(latest) = acc.keys().map(|(epoch, _)| *epoch).max() {
            acc.retain(|(epoch, _), _| *epoch != latest);
        }

        let rows = acc
            .into_iter()
            .filter(|((epoch, _), _)| self.only_epoch.map_or(true, |only| only == *epoch))
            .map(|((epoch, pool), a)| finish_row(epoch, pool, a))
            .collect();

        PoolLedger::new(rows)
    }
}

fn finish_row(epoch: Epoch, pool: PoolSymbol, a: Accumulator) -> PoolLedgerRow {
    let mut row = PoolLedgerRow {
        epoch,
        pool,
        fee_amount: a.fee_amount.value(),
        total_fees: a.total_fees.value(),
        bribe_amount: a.bribe_amount.value(),
        bribe_amount_prior: a.bribe_amount_prior.value(),
        emissions: a.emissions.value(),
        emission_value: a.emission_value.value(),
        vote_weight: a.vote_weight.value(),
        quote_price: a.quote_price,
        vote_value: Decimal::zero(),
        voter_share: Decimal::zero(),
        revenue: Decimal::zero(),
        apr: AprResult::default(),
    };
    sanitize_ledger_row(&mut row);
    row.apr = compute_apr(&AprInput::from_row(&row));
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn pool(s: &str) -> PoolSymbol {
        PoolSymbol::new(s)
    }

    fn fee(epoch: u32, p: &str, amount: &str) -> FeeEvent {
        FeeEvent {
            epoch: Epoch::new(epoch),
            pool: pool(p),
            amount: dec(amount),
            total_amount: dec(amount),
        }
    }

    fn bribe(epoch: u32, p: &str, amount: &str) -> BribeEvent {
        BribeEvent {
            epoch: Epoch::new(epoch),
            pool: pool(p),
            amount: dec(amount),
        }
    }

    #[test]
    fn test_shift_epoch_drops_negative_keys() {
        let mut series = BTreeMap::new();
        series.insert((Epoch::new(0), pool("A")), dec("1"));
        series.insert((Epoch::new(3), pool("A")), dec("2"));

        let shifted = shift_epoch(&series, -1);
        assert_eq!(shifted.len(), 1);
        assert_eq!(shifted.get(&(Epoch::new(2), pool("A"))), Some(&dec("2")));
    }

    #[test]
    fn test_fees_and_bribes_are_summed_per_key() {
        let sources = LedgerSources {
            fees: vec![fee(1, "A", "10"), fee(1, "A", "5"), fee(2, "A", "1")],
            bribes: vec![bribe(1, "A", "3"), bribe(1, "A", "4")],
            ..Default::default()
        };
        let ledger = LedgerBuilder::new().build(&sources);
        let row = ledger.get(Epoch::new(1), &pool("A")).unwrap();
        assert_eq!(row.fee_amount, dec("15"));
        assert_eq!(row.bribe_amount, dec("7"));
        assert_eq!(row.voter_share, dec("22"));
        assert_eq!(row.revenue, dec("22"));
    }

    #[test]
    fn test_prior_bribe_lands_on_previous_epoch() {
        let sources = LedgerSources {
            bribes: vec![bribe(5, "A", "100")],
            fees: vec![fee(6, "A", "1")],
            ..Default::default()
        };
        let ledger = LedgerBuilder::new().build(&sources);
        let row = ledger.get(Epoch::new(4), &pool("A")).unwrap();
        assert_eq!(row.bribe_amount_prior, dec("100"));
        assert_eq!(row.bribe_amount, Decimal::zero());
    }

    #[test]
    fn test_overflowing_fee_total_reports_zero() {
        let max = Decimal::new(rust_decimal::Decimal::MAX);
        let mut first = fee(1, "A", "0");
        first.amount = max;
        let second = first.clone();
        let sources = LedgerSources {
            fees: vec![first, second, fee(2, "A", "1")],
            bribes: vec![bribe(1, "A", "7")],
            ..Default::default()
        };
        let ledger = LedgerBuilder::new().build(&sources);
        let row = ledger.get(Epoch::new(1), &pool("A")).unwrap();
        assert_eq!(row.fee_amount, Decimal::zero());
        assert_eq!(row.total_fees, Decimal::zero());
        assert_eq!(row.bribe_amount, dec("7"));
        assert_eq!(row.voter_share, dec("7"));
    }

    #[test]
    fn test_latest_epoch_is_excluded() {
        let sources = LedgerSources {
            fees: vec![fee(1, "A", "1"), fee(2, "A", "1"), fee(2, "B", "1")],
            ..Default::default()
        };
        let ledger = LedgerBuilder::new().build(&sources);
        assert_eq!(ledger.len(), 1);
        assert!(ledger.rows().iter().all(|r| r.epoch == Epoch::new(1)));
    }

    #[test]
    fn test_empty_sources_build_empty_ledger() {
        let ledger = LedgerBuilder::new().build(&LedgerSources::default());
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_price_takes_max_and_weights_sum() {
        let sources = LedgerSources {
            vote_weights: vec![
                VoteWeightSnapshot {
                    epoch: Epoch::new(1),
                    pool: pool("A"),
                    weight: dec("600"),
                },
                VoteWeightSnapshot {
                    epoch: Epoch::new(1),
                    pool: pool("A"),
                    weight: dec("400"),
                },
            ],
            prices: vec![
                PriceQuote {
                    epoch: Epoch::new(1),
                    pool: pool("A"),
                    price: dec("1.5"),
                },
                PriceQuote {
                    epoch: Epoch::new(1),
                    pool: pool("A"),
                    price: dec("2"),
                },
            ],
            fees: vec![fee(1, "A", "50"), fee(2, "A", "0")],
            ..Default::default()
        };
        let ledger = LedgerBuilder::new().build(&sources);
        let row = ledger.get(Epoch::new(1), &pool("A")).unwrap();
        assert_eq!(row.vote_weight, dec("1000"));
        assert_eq!(row.quote_price, dec("2"));
        assert_eq!(row.vote_value, dec("2000"));
        assert_eq!(row.apr.fee_apr, dec("130"));
    }

    #[test]
    fn test_for_epoch_filters_after_exclusion() {
        let sources = LedgerSources {
            fees: vec![fee(1, "A", "1"), fee(2, "A", "2"), fee(3, "A", "3")],
            ..Default::default()
        };
        let only_two = LedgerBuilder::new().for_epoch(Epoch::new(2)).build(&sources);
        assert_eq!(only_two.len(), 1);

        let only_latest = LedgerBuilder::new().for_epoch(Epoch::new(3)).build(&sources);
        assert!(only_latest.is_empty());
    }

    #[test]
    fn test_emissions_join_without_fees() {
        let sources = LedgerSources {
            emissions: vec![EmissionEvent {
                epoch: Epoch::new(1),
                pool: pool("B"),
                emissions: dec("10"),
                value: dec("4"),
            }],
            fees: vec![fee(2, "A", "1")],
            ..Default::default()
        };
        let ledger = LedgerBuilder::new().build(&sources);
        let row = ledger.get(Epoch::new(1), &pool("B")).unwrap();
        assert_eq!(row.emissions, dec("10"));
        assert_eq!(row.emission_value, dec("4"));
        assert_eq!(row.fee_amount, Decimal::zero());
        assert_eq!(row.apr, AprResult::default());
    }
}
