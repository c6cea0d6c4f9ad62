//! Catalog pools with active reward distributions.

use super::orchestrator::{JobContext, JobOutput};
use super::snapshots::{fetch_all, SnapshotResult};
use crate::domain::{CatalogPool, PoolDistribution};
use crate::engine::ResolverMode;
use crate::error::RunError;
use crate::publish::{pool_distribution_frame, PublishMode};
use tracing::{debug, info, warn};

/// Catalog symbols never queried for distributions.
pub const EXCLUDED_POOL_SYMBOLS: &[&str] = &["sAMM-USDC/USDT"];

pub async fn run(ctx: &JobContext<'_>) -> Result<JobOutput, RunError> {
    let contract = ctx.settings.merkl_contract.clone().ok_or_else(|| {
        RunError::Configuration("MERKL_CONTRACT is required for the pools job".to_string())
    })?;

    let table = ctx.epoch_table().await?;
    let resolved = ctx.resolve(&table, ResolverMode::Current)?;
    let epoch = resolved.table_epoch;

    let catalog = ctx
        .collaborators
        .catalog
        .catalog_pools()
        .await
        .map_err(|e| RunError::remote("pool catalog", e))?;
    let (excluded, pools): (Vec<CatalogPool>, Vec<CatalogPool>) = catalog
        .into_iter()
        .partition(|pool| EXCLUDED_POOL_SYMBOLS.contains(&pool.symbol.as_str()));
    debug!(pools = pools.len(), excluded = excluded.len(), "Reading pool distributions");

    let reader = &ctx.collaborators.distributions;
    let contract = &contract;
    let results = fetch_all(pools, ctx.settings.snapshot_concurrency, |pool| async move {
        reader
            .active_pool_distributions(contract, &pool.underlying_pool)
            .await
    })
    .await;

    let mut skipped = 0;
    let mut active = Vec::new();
    for SnapshotResult { item, result } in results {
        match result {
            Ok(distributions) if distributions.is_empty() => {}
            Ok(distributions) => active.push(PoolDistribution {
                epoch,
                pool: item,
                distributions,
            }),
            Err(e) => {
                skipped += 1;
                warn!(
                    pool = %item.symbol,
                    address = %item.underlying_pool,
                    error = %e,
                    "Distribution read failed; excluded"
                );
            }
        }
    }

    info!(epoch = %epoch, active = active.len(), skipped, "Pool distributions collected");
    Ok(JobOutput {
        epoch: Some(epoch),
        frames: vec![(pool_distribution_frame(&active), PublishMode::Replace)],
        fingerprint: None,
        skipped,
    })
}
