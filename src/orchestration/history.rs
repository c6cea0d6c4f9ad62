//! Epoch histories that live in both a seed dataset and the sink.
//!
//! The seed CSV holds the history up to deployment; every later epoch is
//! only in the sink. A stored epoch wins over the seed's rows for it.

use crate::domain::Epoch;
use std::collections::BTreeSet;

/// Merge `seed` and `stored` per epoch, ordered by epoch.
///
/// Rows within one epoch keep their source order.
pub fn overlay_epochs<T>(seed: Vec<T>, stored: Vec<T>, epoch_of: impl Fn(&T) -> Epoch) -> Vec<T> {
    let stored_epochs: BTreeSet<Epoch> = stored.iter().map(&epoch_of).collect();
    let mut merged: Vec<T> = seed
        .into_iter()
        .filter(|row| !stored_epochs.contains(&epoch_of(row)))
        .chain(stored)
        .collect();
    merged.sort_by_key(|row| epoch_of(row));
    merged
}
