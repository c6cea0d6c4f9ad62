//! Gauge emissions for the epoch starting at today's boundary.

use super::orchestrator::{JobContext, JobOutput};
use crate::domain::{Address, Decimal, EmissionRecord, GaugeReward, PoolIdentity};
use crate::engine::{or_zero, CheckedSum, ResolverMode};
use crate::error::RunError;
use crate::publish::{emission_frame, PublishMode};
use std::collections::{BTreeMap, HashMap};
use tracing::{info, warn};

/// Sum raw gauge rewards per gauge and scale them to tokens.
pub fn emissions_by_gauge(rewards: &[GaugeReward]) -> BTreeMap<Address, Decimal> {
    let mut raw: BTreeMap<Address, CheckedSum> = BTreeMap::new();
    for reward in rewards {
        raw.entry(reward.gauge.clone()).or_default().add(reward.raw_reward);
    }
    raw.into_iter()
        .map(|(gauge, total)| (gauge, or_zero(total.value().raw_to_tokens())))
        .collect()
}

pub async fn run(ctx: &JobContext<'_>) -> Result<JobOutput, RunError> {
    let table = ctx.epoch_table().await?;
    let (pools, rewards) = ctx
        .load(|loader| Ok((loader.pool_identities()?, loader.gauge_rewards()?)))
        .await?;

    let resolved = ctx.resolve(&table, ResolverMode::Current)?;
    let epoch = resolved.table_epoch;

    let symbol = &ctx.settings.native_symbol;
    let price = ctx
        .collaborators
        .prices
        .spot_price(symbol)
        .await
        .map_err(|e| RunError::remote(format!("spot price {}", symbol), e))?;

    let by_gauge: HashMap<&Address, &PoolIdentity> =
        pools.iter().map(|pool| (&pool.gauge, pool)).collect();

    let mut records = Vec::new();
    for (gauge, emissions) in emissions_by_gauge(&rewards) {
        if emissions.is_zero() {
            continue;
        }
        let Some(pool) = by_gauge.get(&gauge) else {
            warn!(gauge = %gauge, emissions = %emissions, "Reward for unknown gauge; excluded");
            continue;
        };
        records.push(EmissionRecord {
            epoch,
            pool: pool.symbol.clone(),
            emissions,
            value: or_zero(emissions.checked_mul(price)),
            price,
        });
    }
    records.sort_by(|a, b| a.pool.cmp(&b.pool));

    info!(epoch = %epoch, pools = records.len(), price = %price, "Emissions computed");
    Ok(JobOutput {
        epoch: Some(epoch),
        frames: vec![(emission_frame(&records), PublishMode::Append)],
        fingerprint: None,
        skipped: 0,
    })
}
