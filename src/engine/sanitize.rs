//! Degenerate-to-zero policy for derived metrics.
//!
//! A derived value that cannot be computed (zero or missing denominator,
//! overflow) reports 0. It is never an error and never propagated.

use crate::domain::{Decimal, PartnerAttributionRow, PoolLedgerRow};

/// Collapse a checked computation to zero when it failed.
pub fn or_zero(value: Option<Decimal>) -> Decimal {
    value.unwrap_or_else(Decimal::zero)
}

/// `numerator / denominator`, zero when degenerate.
pub fn ratio(numerator: Decimal, denominator: Decimal) -> Decimal {
    or_zero(numerator.checked_div(denominator))
}

/// Running total that reports 0 once any addition overflowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckedSum(Option<Decimal>);

impl Default for CheckedSum {
    fn default() -> Self {
        CheckedSum(Some(Decimal::zero()))
    }
}

impl CheckedSum {
    pub fn add(&mut self, value: Decimal) {
        self.0 = self.0.and_then(|total| total.checked_add(value));
    }

    pub fn overflowed(&self) -> bool {
        self.0.is_none()
    }

    pub fn value(&self) -> Decimal {
        or_zero(self.0)
    }
}

impl FromIterator<Decimal> for CheckedSum {
    fn from_iter<I: IntoIterator<Item = Decimal>>(iter: I) -> Self {
        let mut sum = CheckedSum::default();
        for value in iter {
            sum.add(value);
        }
        sum
    }
}

/// Final pass over a ledger row before it is published.
///
/// Re-derives the additive columns with checked arithmetic so an overflow in
/// any of them reports 0 rather than a value built from a partial sum.
pub fn sanitize_ledger_row(row: &mut PoolLedgerRow) {
    row.voter_share = or_zero(row.fee_amount.checked_add(row.bribe_amount));
    row.revenue = or_zero(row.total_fees.checked_add(row.bribe_amount));
    row.vote_value = or_zero(row.vote_weight.checked_mul(row.quote_price));
}

/// Final pass over a partner row: spend and ROI follow from the sanitized revenue split.
pub fn sanitize_partner_row(row: &mut PartnerAttributionRow) {
    row.spend = or_zero(row.bribe_amount.checked_sub(row.voting_revenue));
    row.bribe_roi = ratio(row.emission_value, row.spend);
}
