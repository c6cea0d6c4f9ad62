//! Epoch-wide APR for the epoch that closed at today's boundary.

use super::orchestrator::{JobContext, JobOutput};
use crate::datasource::{DataSourceError, SnapshotAt};
use crate::domain::{Decimal, EpochApr, TOKEN_DECIMALS};
use crate::engine::{compute_apr, EpochTotals, LedgerBuilder, ResolverMode};
use crate::error::RunError;
use crate::publish::{apr_frame, PublishMode};
use tracing::{info, warn};

pub async fn run(ctx: &JobContext<'_>) -> Result<JobOutput, RunError> {
    let ve_contract = ctx.settings.ve_contract.clone().ok_or_else(|| {
        RunError::Configuration("VE_CONTRACT is required for the apr job".to_string())
    })?;

    let table = ctx.epoch_table().await?;
    let schedule = ctx.load(|loader| loader.rebase_schedule()).await?;
    let sources = ctx.ledger_sources().await?;

    let resolved = ctx.resolve(&table, ResolverMode::Current)?;
    let epoch = resolved.ledger_epoch()?;

    // Schedule rows are numbered like the epoch table.
    let rebase = schedule
        .iter()
        .find(|entry| entry.table_epoch == resolved.table_epoch)
        .map(|entry| entry.rebase)
        .ok_or_else(|| {
            RunError::MissingReference(format!(
                "rebase schedule has no entry for epoch {}",
                resolved.table_epoch
            ))
        })?;

    let ledger = LedgerBuilder::new().for_epoch(epoch).build(&sources);
    let Some(totals) = EpochTotals::from_ledger(&ledger, epoch) else {
        warn!(epoch = %epoch, "Ledger has no rows for the closed epoch; nothing to publish");
        return Ok(JobOutput {
            epoch: Some(epoch),
            frames: Vec::new(),
            fingerprint: Some(ledger.fingerprint()),
            skipped: 0,
        });
    };

    let block = ctx
        .collaborators
        .blocks
        .block_at(resolved.boundary)
        .await
        .map_err(|e| RunError::remote(format!("block height at {}", resolved.boundary), e))?;

    let context = format!("totalSupplyAt block {} on {}", block, ve_contract);
    let raw_supply = ctx
        .collaborators
        .snapshots
        .total_supply_at(&ve_contract, SnapshotAt::Block(block))
        .await
        .map_err(|e| RunError::remote(context.clone(), e))?;
    let total_supply = Decimal::from_raw_units(raw_supply, TOKEN_DECIMALS).ok_or_else(|| {
        RunError::remote(
            context,
            DataSourceError::ParseError(format!("supply {} out of range", raw_supply)),
        )
    })?;

    let apr = compute_apr(&totals.apr_input(rebase, total_supply));
    info!(
        epoch = %epoch,
        pools = totals.pools,
        total_supply = %total_supply,
        fee_apr = %apr.fee_apr,
        bribe_apr = %apr.bribe_apr,
        voting_apr = %apr.voting_apr,
        rebase_apr = %apr.rebase_apr,
        "APR computed"
    );

    Ok(JobOutput {
        epoch: Some(epoch),
        frames: vec![(apr_frame(&[EpochApr { epoch, apr }]), PublishMode::Append)],
        fingerprint: Some(ledger.fingerprint()),
        skipped: 0,
    })
}
