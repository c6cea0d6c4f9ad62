use anyhow::Context;
use gaugeledger::datasource::{
    CsvDatasetLoader, HttpPoolCatalog, HttpPriceFeed, JsonHttpClient, JsonRpcSnapshotGateway,
    LlamaBlockLookup,
};
use gaugeledger::orchestration::RunReport;
use gaugeledger::{init_db, Collaborators, Config, Job, JobSettings, Orchestrator, SqlitePublisher};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    match run().await {
        Ok(report) => {
            tracing::info!(
                job = %report.job,
                publishes = report.receipts.len(),
                skipped = report.skipped,
                "Run finished"
            );
        }
        Err(e) => {
            tracing::error!(error = ?e, "Run failed; nothing published");
            std::process::exit(1);
        }
    }
}

async fn run() -> anyhow::Result<RunReport> {
    let config = Config::from_env().context("loading configuration")?;

    let job = match std::env::args().nth(1) {
        Some(arg) => arg
            .parse::<Job>()
            .map_err(anyhow::Error::msg)
            .context("parsing job argument")?,
        None => config
            .job
            .context("no job given; pass one as the first argument or set PIPELINE_JOB")?,
    };

    if job == Job::Pools && config.pool_catalog_url.is_none() {
        anyhow::bail!("FUSION_API_URL is required for the pools job");
    }

    let http = JsonHttpClient::new(config.request_timeout).context("building HTTP client")?;
    let pool = init_db(&config.database_path)
        .await
        .with_context(|| format!("opening sink database {}", config.database_path))?;

    let gateway = Arc::new(JsonRpcSnapshotGateway::new(
        http.clone(),
        config.rpc_url.clone(),
    ));
    let collaborators = Collaborators {
        loader: Arc::new(
            CsvDatasetLoader::new(config.datasets.clone()).with_price_column(config.price_column()),
        ),
        snapshots: gateway.clone(),
        prices: Arc::new(HttpPriceFeed::new(http.clone(), config.price_api_url.clone())),
        blocks: Arc::new(LlamaBlockLookup::new(http.clone(), config.block_api_url.clone())),
        catalog: Arc::new(HttpPoolCatalog::new(
            http,
            config.pool_catalog_url.clone().unwrap_or_default(),
        )),
        distributions: gateway,
        publisher: Arc::new(SqlitePublisher::new(pool)),
    };

    let orchestrator = Orchestrator::new(JobSettings::from_config(&config), collaborators);
    let report = orchestrator
        .run(job, chrono::Utc::now())
        .await
        .with_context(|| format!("running {} job", job))?;
    Ok(report)
}
