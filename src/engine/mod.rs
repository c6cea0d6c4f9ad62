//! Pure computation engine(s) for deterministic ledger logic.

pub mod apr;
pub mod epoch;
pub mod ledger;
pub mod partner;
pub mod sanitize;

pub use apr::{compute_apr, AprInput, EpochTotals, EPOCHS_PER_YEAR};
pub use epoch::{
    resolve_epoch, EpochError, EpochResolver, ResolvedEpoch, ResolverMode, BOUNDARY_WEEKDAY,
    DEFAULT_CUTOVER_HOUR,
};
pub use ledger::{
    aggregate_bribes, aggregate_emissions, shift_epoch, EmissionTotals, LedgerBuilder, LedgerKey,
    LedgerSources, EMISSION_ATTRIBUTION_SHIFT, PRIOR_BRIBE_SHIFT,
};
pub use partner::{attribute_partners, partner_weight_epsilon};
pub use sanitize::{or_zero, ratio, sanitize_ledger_row, sanitize_partner_row, CheckedSum};
