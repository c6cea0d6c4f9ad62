//! Full historical ledger rebuild.

use super::orchestrator::{JobContext, JobOutput};
use crate::engine::LedgerBuilder;
use crate::error::RunError;
use crate::publish::{ledger_frame, PublishMode};
use tracing::info;

pub async fn run(ctx: &JobContext<'_>) -> Result<JobOutput, RunError> {
    let sources = ctx.ledger_sources().await?;

    let ledger = LedgerBuilder::new().build(&sources);
    let fingerprint = ledger.fingerprint();
    info!(
        rows = ledger.len(),
        latest_epoch = ?ledger.max_epoch().map(|e| e.as_u32()),
        fingerprint = %fingerprint,
        "Ledger built"
    );

    Ok(JobOutput {
        epoch: ledger.max_epoch(),
        frames: vec![(ledger_frame(&ledger), PublishMode::Replace)],
        fingerprint: Some(fingerprint),
        skipped: 0,
    })
}
