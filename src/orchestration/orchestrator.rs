use crate::config::Config;
use crate::datasource::{
    BlockHeightLookup, DatasetLoader, DistributionReader, LoadError, PoolCatalog, PriceFeed,
    SnapshotGateway,
};
use crate::domain::{Address, EmissionRecord, Epoch, EpochTable, VoteRecord};
use crate::engine::{
    EpochResolver, LedgerSources, ResolvedEpoch, ResolverMode, DEFAULT_CUTOVER_HOUR,
};
use crate::error::RunError;
use crate::publish::{
    emission_records, vote_records, Destination, PublishMode, PublishReceipt, PublishSession,
    Publisher, TableFrame,
};
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

use super::history::overlay_epochs;
use super::{apr, emissions, partners, pools, revenue, votes};

/// The batch jobs a run can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Job {
    /// Full historical ledger, replacing the revenue table.
    Revenue,
    /// Vote weights at the upcoming boundary, replacing the vote history.
    Votes,
    /// Epoch-wide APR for the closed epoch, appended.
    Apr,
    /// Partner vote attribution for the closed epoch, appended.
    Partners,
    /// Gauge emissions for the current epoch, appended.
    Emissions,
    /// Pools with active reward distributions, replacing the previous listing.
    Pools,
}

impl Job {
    pub const ALL: [Job; 6] = [
        Job::Revenue,
        Job::Votes,
        Job::Apr,
        Job::Partners,
        Job::Emissions,
        Job::Pools,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Job::Revenue => "revenue",
            Job::Votes => "votes",
            Job::Apr => "apr",
            Job::Partners => "partners",
            Job::Emissions => "emissions",
            Job::Pools => "pools",
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Job {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Job::ALL
            .into_iter()
            .find(|job| job.as_str() == wanted)
            .ok_or_else(|| {
                format!(
                    "unknown job {:?}; expected revenue, votes, apr, partners, emissions or pools",
                    s
                )
            })
    }
}

/// Run-wide settings taken from `Config`.
#[derive(Debug, Clone)]
pub struct JobSettings {
    pub native_symbol: String,
    pub ve_contract: Option<Address>,
    pub merkl_contract: Option<Address>,
    pub snapshot_concurrency: usize,
    pub cutover_hour: u32,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            native_symbol: "RETRO".to_string(),
            ve_contract: None,
            merkl_contract: None,
            snapshot_concurrency: 8,
            cutover_hour: DEFAULT_CUTOVER_HOUR,
        }
    }
}

impl JobSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            native_symbol: config.native_symbol.clone(),
            ve_contract: config.ve_contract.clone(),
            merkl_contract: config.merkl_contract.clone(),
            snapshot_concurrency: config.snapshot_concurrency,
            cutover_hour: config.cutover_hour,
        }
    }
}

/// External collaborators of a run.
#[derive(Clone)]
pub struct Collaborators {
    pub loader: Arc<dyn DatasetLoader>,
    pub snapshots: Arc<dyn SnapshotGateway>,
    pub prices: Arc<dyn PriceFeed>,
    pub blocks: Arc<dyn BlockHeightLookup>,
    pub catalog: Arc<dyn PoolCatalog>,
    pub distributions: Arc<dyn DistributionReader>,
    pub publisher: Arc<dyn Publisher>,
}

/// Everything a job reads while computing its output.
pub struct JobContext<'a> {
    pub settings: &'a JobSettings,
    pub collaborators: &'a Collaborators,
    pub now: DateTime<Utc>,
}

impl JobContext<'_> {
    /// Run a dataset read on the blocking thread pool.
    pub async fn load<T, F>(&self, read: F) -> Result<T, RunError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn DatasetLoader) -> Result<T, LoadError> + Send + 'static,
    {
        let loader = Arc::clone(&self.collaborators.loader);
        let value = tokio::task::spawn_blocking(move || read(loader.as_ref())).await??;
        Ok(value)
    }

    pub async fn epoch_table(&self) -> Result<EpochTable, RunError> {
        self.load(|loader| loader.epoch_table()).await
    }

    /// Vote history: the seed dataset overlaid with the epochs already in the sink.
    pub async fn vote_history(&self) -> Result<Vec<VoteRecord>, RunError> {
        let seed = self.load(|loader| loader.vote_history()).await?;
        let stored = vote_records(
            &self
                .collaborators
                .publisher
                .read(Destination::VoteWeights)
                .await?,
        )?;
        debug!(seed = seed.len(), stored = stored.len(), "Vote history loaded");
        Ok(overlay_epochs(seed, stored, |vote| vote.epoch))
    }

    /// Emission history: the seed dataset overlaid with the epochs already in the sink.
    pub async fn emission_history(&self) -> Result<Vec<EmissionRecord>, RunError> {
        let seed = self.load(|loader| loader.emission_history()).await?;
        let stored = emission_records(
            &self
                .collaborators
                .publisher
                .read(Destination::Emissions)
                .await?,
        )?;
        debug!(seed = seed.len(), stored = stored.len(), "Emission history loaded");
        Ok(overlay_epochs(seed, stored, |record| record.epoch))
    }

    /// Every input of a ledger build.
    pub async fn ledger_sources(&self) -> Result<LedgerSources, RunError> {
        let (fees, bribes) = self
            .load(|loader| Ok((loader.fees()?, loader.bribes()?)))
            .await?;
        let emissions = self.emission_history().await?;
        let votes = self.vote_history().await?;
        Ok(LedgerSources::from_datasets(fees, bribes, &emissions, &votes))
    }

    pub fn resolve(&self, table: &EpochTable, mode: ResolverMode) -> Result<ResolvedEpoch, RunError> {
        let resolved = EpochResolver::new(self.settings.cutover_hour).resolve(self.now, table, mode)?;
        info!(
            mode = ?mode,
            table_epoch = %resolved.table_epoch,
            boundary = %resolved.boundary,
            "Resolved epoch"
        );
        Ok(resolved)
    }
}

/// Computed output of a job, published only after the whole job succeeded.
#[derive(Debug)]
pub struct JobOutput {
    pub epoch: Option<Epoch>,
    pub frames: Vec<(TableFrame, PublishMode)>,
    pub fingerprint: Option<String>,
    /// Items dropped after a failed per-item remote call.
    pub skipped: usize,
}

#[derive(Debug)]
pub struct RunReport {
    pub job: Job,
    pub epoch: Option<Epoch>,
    pub receipts: Vec<PublishReceipt>,
    pub fingerprint: Option<String>,
    pub skipped: usize,
}

#[derive(Clone)]
pub struct Orchestrator {
    settings: JobSettings,
    collaborators: Collaborators,
}

impl Orchestrator {
    pub fn new(settings: JobSettings, collaborators: Collaborators) -> Self {
        Self {
            settings,
            collaborators,
        }
    }

    /// Compute `job` as of `now`, then publish its frames.
    pub async fn run(&self, job: Job, now: DateTime<Utc>) -> Result<RunReport, RunError> {
        info!(job = %job, now = %now, "Job started");
        let ctx = JobContext {
            settings: &self.settings,
            collaborators: &self.collaborators,
            now,
        };

        let output = match job {
            Job::Revenue => revenue::run(&ctx).await?,
            Job::Votes => votes::run(&ctx).await?,
            Job::Apr => apr::run(&ctx).await?,
            Job::Partners => partners::run(&ctx).await?,
            Job::Emissions => emissions::run(&ctx).await?,
            Job::Pools => pools::run(&ctx).await?,
        };

        let mut session = PublishSession::new(self.collaborators.publisher.as_ref());
        let mut receipts = Vec::with_capacity(output.frames.len());
        for (frame, mode) in &output.frames {
            receipts.push(session.publish(frame, *mode).await?);
        }

        info!(
            job = %job,
            epoch = ?output.epoch.map(|e| e.as_u32()),
            rows = receipts.iter().map(|r| r.rows_written).sum::<usize>(),
            skipped = output.skipped,
            fingerprint = output.fingerprint.as_deref().unwrap_or("-"),
            "Job completed"
        );
        Ok(RunReport {
            job,
            epoch: output.epoch,
            receipts,
            fingerprint: output.fingerprint,
            skipped: output.skipped,
        })
    }
}
