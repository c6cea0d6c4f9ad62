//! Partner vote attribution for the epoch that closed at today's boundary.

use super::orchestrator::{JobContext, JobOutput};
use super::snapshots::{fetch_all, keep_successes};
use crate::datasource::SnapshotAt;
use crate::domain::{Partner, PartnerVote, PoolIdentity};
use crate::engine::{
    aggregate_emissions, attribute_partners, shift_epoch, LedgerBuilder, ResolverMode,
    EMISSION_ATTRIBUTION_SHIFT,
};
use crate::error::RunError;
use crate::publish::{partner_frame, PublishMode};
use tracing::info;

pub async fn run(ctx: &JobContext<'_>) -> Result<JobOutput, RunError> {
    let table = ctx.epoch_table().await?;
    let partners = ctx.load(|loader| loader.partners()).await?;
    let pools: Vec<PoolIdentity> = ctx
        .load(|loader| loader.pool_identities())
        .await?
        .into_iter()
        .filter(PoolIdentity::has_bribe_gauge)
        .collect();
    let sources = ctx.ledger_sources().await?;

    let resolved = ctx.resolve(&table, ResolverMode::Current)?;
    let epoch = resolved.ledger_epoch()?;

    let targets: Vec<(Partner, PoolIdentity)> = partners
        .iter()
        .flat_map(|partner| pools.iter().map(move |pool| (partner.clone(), pool.clone())))
        .collect();
    info!(
        partners = partners.len(),
        pools = pools.len(),
        snapshots = targets.len(),
        "Fetching partner vote weights"
    );

    let gateway = &ctx.collaborators.snapshots;
    let at = SnapshotAt::Timestamp(resolved.boundary);
    let results = fetch_all(
        targets,
        ctx.settings.snapshot_concurrency,
        |(partner, pool)| async move {
            gateway
                .balance_of_owner_at(&pool.bribe, &partner.nft_address, at)
                .await
        },
    )
    .await;
    let (weights, skipped) = keep_successes(results, |(partner, pool)| {
        format!("{}/{}", partner.name, pool.symbol)
    });

    let votes: Vec<PartnerVote> = weights
        .into_iter()
        .filter(|(_, weight)| !weight.is_zero())
        .map(|((partner, pool), vote_weight)| PartnerVote {
            partner_name: partner.name,
            partner_address: partner.nft_address,
            epoch,
            pool: pool.symbol,
            vote_weight,
        })
        .collect();

    let ledger = LedgerBuilder::new().for_epoch(epoch).build(&sources);
    let emissions = shift_epoch(
        &aggregate_emissions(&sources.emissions),
        EMISSION_ATTRIBUTION_SHIFT,
    );
    let rows = attribute_partners(&votes, &ledger, &emissions);

    info!(epoch = %epoch, votes = votes.len(), skipped, "Partner attribution computed");
    Ok(JobOutput {
        epoch: Some(epoch),
        frames: vec![(partner_frame(&rows), PublishMode::Append)],
        fingerprint: Some(ledger.fingerprint()),
        skipped,
    })
}
