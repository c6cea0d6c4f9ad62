//! Vote weights for the upcoming boundary.

use super::orchestrator::{JobContext, JobOutput};
use super::snapshots::{fetch_all, keep_successes};
use crate::datasource::SnapshotAt;
use crate::domain::{Decimal, PoolIdentity, VoteRecord};
use crate::engine::{or_zero, ResolverMode};
use crate::error::RunError;
use crate::publish::{vote_frame, PublishMode};
use tracing::{debug, info};

/// Vote weights are published rounded to this many decimals.
pub const VOTE_WEIGHT_DP: u32 = 2;

pub async fn run(ctx: &JobContext<'_>) -> Result<JobOutput, RunError> {
    let table = ctx.epoch_table().await?;
    let pools = ctx.load(|loader| loader.pool_identities()).await?;
    let mut history = ctx.vote_history().await?;

    let resolved = ctx.resolve(&table, ResolverMode::Next)?;
    let epoch = resolved.ledger_epoch()?;

    let symbol = &ctx.settings.native_symbol;
    let price = ctx
        .collaborators
        .prices
        .spot_price(symbol)
        .await
        .map_err(|e| RunError::remote(format!("spot price {}", symbol), e))?;

    let (with_bribe, without_bribe): (Vec<PoolIdentity>, Vec<PoolIdentity>) =
        pools.into_iter().partition(PoolIdentity::has_bribe_gauge);
    debug!(
        snapshots = with_bribe.len(),
        zero_bribe = without_bribe.len(),
        "Fetching vote weights"
    );

    let gateway = &ctx.collaborators.snapshots;
    let at = SnapshotAt::Timestamp(resolved.boundary);
    let results = fetch_all(with_bribe, ctx.settings.snapshot_concurrency, |pool| async move {
        gateway.total_supply_at(&pool.bribe, at).await
    })
    .await;
    let (weights, skipped) = keep_successes(results, |pool| pool.symbol.to_string());

    let snapshot = weights
        .into_iter()
        .map(|(pool, weight)| (pool, weight.round_dp(VOTE_WEIGHT_DP)))
        .chain(without_bribe.into_iter().map(|pool| (pool, Decimal::zero())))
        .map(|(pool, vote_weight)| VoteRecord {
            pool: pool.symbol,
            epoch,
            vote_weight,
            price,
            vote_value: or_zero(vote_weight.checked_mul(price)),
        });

    let replaced = history.iter().filter(|v| v.epoch == epoch).count();
    history.retain(|v| v.epoch != epoch);
    history.extend(snapshot);
    history.sort_by(|a, b| (a.epoch, &a.pool).cmp(&(b.epoch, &b.pool)));

    info!(
        epoch = %epoch,
        replaced,
        history_rows = history.len(),
        skipped,
        "Vote history updated"
    );

    Ok(JobOutput {
        epoch: Some(epoch),
        frames: vec![(vote_frame(&history), PublishMode::Replace)],
        fingerprint: None,
        skipped,
    })
}
