//! Bounded concurrent snapshot fan-out.
//!
//! Every item produces its own `Result`; failures are logged with the item's
//! identity and excluded. Completion order is not observable by callers:
//! successes come back in input order.

use crate::datasource::DataSourceError;
use crate::domain::{Decimal, TOKEN_DECIMALS};
use futures::stream::{self, StreamExt};
use std::future::Future;
use tracing::warn;

/// Outcome of one remote call; raw snapshot values unless stated otherwise.
#[derive(Debug)]
pub struct SnapshotResult<K, V = u128> {
    pub item: K,
    pub result: Result<V, DataSourceError>,
}

/// Run `fetch` for every item with at most `concurrency` calls in flight.
pub async fn fetch_all<K, V, F, Fut>(
    items: Vec<K>,
    concurrency: usize,
    fetch: F,
) -> Vec<SnapshotResult<K, V>>
where
    K: Clone,
    F: Fn(K) -> Fut,
    Fut: Future<Output = Result<V, DataSourceError>>,
{
    let fetch = &fetch;
    let mut results: Vec<(usize, SnapshotResult<K, V>)> = stream::iter(items.into_iter().enumerate())
        .map(|(idx, item)| async move {
            let result = fetch(item.clone()).await;
            (idx, SnapshotResult { item, result })
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;
    results.sort_by_key(|(idx, _)| *idx);
    results.into_iter().map(|(_, r)| r).collect()
}

/// Keep successful snapshots as token amounts; log and count the rest.
///
/// A raw value too large for the decimal type counts as a failure.
pub fn keep_successes<K>(
    results: Vec<SnapshotResult<K>>,
    describe: impl Fn(&K) -> String,
) -> (Vec<(K, Decimal)>, usize) {
    let mut kept = Vec::with_capacity(results.len());
    let mut failed = 0;
    for SnapshotResult { item, result } in results {
        match result.map(|raw| (raw, Decimal::from_raw_units(raw, TOKEN_DECIMALS))) {
            Ok((_, Some(tokens))) => kept.push((item, tokens)),
            Ok((raw, None)) => {
                failed += 1;
                warn!(item = %describe(&item), raw = %raw, "Snapshot value out of range; excluded");
            }
            Err(e) => {
                failed += 1;
                warn!(item = %describe(&item), error = %e, "Snapshot failed; excluded");
            }
        }
    }
    (kept, failed)
}
