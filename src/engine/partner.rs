//! Partner spend and ROI from per-partner vote weights.

use super::ledger::{EmissionTotals, LedgerKey};
use super::sanitize::{or_zero, ratio, sanitize_partner_row, CheckedSum};
use crate::domain::{Decimal, Epoch, PartnerAttributionRow, PartnerVote, PoolLedger};
use std::collections::BTreeMap;
use tracing::warn;

/// Added to the pool's total vote weight in the revenue-share denominator.
///
/// A pool with zero recorded weight makes the share blow up by 1/epsilon.
/// The behavior is kept as-is and surfaced with a warning.
pub fn partner_weight_epsilon() -> Decimal {
    Decimal::new(rust_decimal::Decimal::new(1, 3))
}

/// Attribute bribe revenue and emission value to each partner vote.
///
/// `emissions` must already be keyed by the epoch of the vote that earned
/// them (see `shift_epoch`). Output is sorted by (partner, epoch, pool).
pub fn attribute_partners(
    votes: &[PartnerVote],
    ledger: &PoolLedger,
    emissions: &BTreeMap<LedgerKey, EmissionTotals>,
) -> Vec<PartnerAttributionRow> {
    let mut partner_totals: BTreeMap<(&str, Epoch), CheckedSum> = BTreeMap::new();
    for vote in votes {
        partner_totals
            .entry((vote.partner_name.as_str(), vote.epoch))
            .or_default()
            .add(vote.vote_weight);
    }

    let epsilon = partner_weight_epsilon();
    let mut rows: Vec<PartnerAttributionRow> = votes
        .iter()
        .map(|vote| {
            let partner_total = partner_totals
                .get(&(vote.partner_name.as_str(), vote.epoch))
                .map(CheckedSum::value)
                .unwrap_or_default();
            let (bribe_amount, total_vote_weight) = ledger
                .get(vote.epoch, &vote.pool)
                .map(|row| (row.bribe_amount, row.vote_weight))
                .unwrap_or_default();
            if total_vote_weight.is_zero() && !bribe_amount.is_zero() {
                warn!(
                    partner = %vote.partner_name,
                    pool = %vote.pool,
                    epoch = %vote.epoch,
                    "Pool has no recorded vote weight; partner revenue share is unbounded"
                );
            }
            let emission = emissions
                .get(&(vote.epoch, vote.pool.clone()))
                .copied()
                .unwrap_or_default();

            let vote_pct = or_zero(
                ratio(vote.vote_weight, partner_total).checked_mul(Decimal::hundred()),
            );
            let voting_revenue = or_zero(
                bribe_amount
                    .checked_mul(vote.vote_weight)
                    .zip(total_vote_weight.checked_add(epsilon))
                    .and_then(|(num, den)| num.checked_div(den)),
            );

            let mut row = PartnerAttributionRow {
                partner_name: vote.partner_name.clone(),
                partner_address: vote.partner_address.clone(),
                epoch: vote.epoch,
                pool: vote.pool.clone(),
                vote_weight: vote.vote_weight,
                vote_pct,
                bribe_amount,
                total_vote_weight,
                emissions: emission.emissions,
                emission_value: emission.value,
                voting_revenue,
                spend: Decimal::zero(),
                bribe_roi: Decimal::zero(),
            };
            sanitize_partner_row(&mut row);
            row
        })
        .collect();

    rows.sort_by(|a, b| {
        (&a.partner_name, a.epoch, &a.pool).cmp(&(&b.partner_name, b.epoch, &b.pool))
    });
    rows
}
