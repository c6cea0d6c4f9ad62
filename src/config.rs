use crate::datasource::DatasetPaths;
use crate::domain::Address;
use crate::engine::DEFAULT_CUTOVER_HOUR;
use crate::orchestration::Job;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BLOCK_API_URL: &str = "https://coins.llama.fi/block/polygon";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub rpc_url: String,
    pub price_api_url: String,
    pub block_api_url: String,
    /// Voting-escrow contract; only the APR job needs it.
    pub ve_contract: Option<Address>,
    /// Pool listing and reward distributor; only the pools job needs them.
    pub pool_catalog_url: Option<String>,
    pub merkl_contract: Option<Address>,
    pub native_symbol: String,
    pub datasets: DatasetPaths,
    pub request_timeout: Duration,
    pub snapshot_concurrency: usize,
    pub cutover_hour: u32,
    pub job: Option<Job>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let required = |key: &str| {
            env_map
                .get(key)
                .cloned()
                .ok_or_else(|| ConfigError::MissingEnv(key.to_string()))
        };

        let database_path = required("DATABASE_PATH")?;
        let rpc_url = required("RPC_URL")?;
        let price_api_url = required("PRICE_API_URL")?;

        let block_api_url = env_map
            .get("BLOCK_API_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BLOCK_API_URL.to_string());

        let optional_address = |key: &str| {
            env_map
                .get(key)
                .map(|raw| {
                    Address::parse(raw)
                        .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
                })
                .transpose()
        };
        let ve_contract = optional_address("VE_CONTRACT")?;
        let merkl_contract = optional_address("MERKL_CONTRACT")?;
        let pool_catalog_url = env_map.get("FUSION_API_URL").cloned();

        let native_symbol = env_map
            .get("NATIVE_SYMBOL")
            .cloned()
            .unwrap_or_else(|| "RETRO".to_string());

        let data_dir = PathBuf::from(env_map.get("DATA_DIR").map(|s| s.as_str()).unwrap_or("data"));
        let defaults = DatasetPaths::in_dir(&data_dir);
        let path_or = |key: &str, default: PathBuf| {
            env_map.get(key).map(PathBuf::from).unwrap_or(default)
        };
        let datasets = DatasetPaths {
            epochs: path_or("EPOCH_CSV", defaults.epochs),
            fees: path_or("FEE_CSV", defaults.fees),
            bribes: path_or("BRIBE_CSV", defaults.bribes),
            votes: path_or("VOTE_CSV", defaults.votes),
            emissions: path_or("EMISSION_CSV", defaults.emissions),
            pool_ids: path_or("POOL_IDS_CSV", defaults.pool_ids),
            partners: path_or("PARTNER_CSV", defaults.partners),
            rebase_schedule: path_or("REBASE_SCHEDULE_CSV", defaults.rebase_schedule),
            gauge_rewards: path_or("GAUGE_REWARDS_CSV", defaults.gauge_rewards),
        };

        let timeout_secs = env_map
            .get("REQUEST_TIMEOUT_SECS")
            .map(|s| s.as_str())
            .unwrap_or("60")
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "REQUEST_TIMEOUT_SECS".to_string(),
                    "must be a positive integer".to_string(),
                )
            })?;

        let snapshot_concurrency = env_map
            .get("SNAPSHOT_CONCURRENCY")
            .map(|s| s.as_str())
            .unwrap_or("8")
            .parse::<usize>()
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "SNAPSHOT_CONCURRENCY".to_string(),
                    "must be an integer >= 1".to_string(),
                )
            })?;

        let cutover_hour = match env_map.get("CUTOVER_HOUR") {
            Some(raw) => raw.parse::<u32>().ok().filter(|h| *h < 24).ok_or_else(|| {
                ConfigError::InvalidValue(
                    "CUTOVER_HOUR".to_string(),
                    format!("must be an hour between 0 and 23, got {}", raw),
                )
            })?,
            None => DEFAULT_CUTOVER_HOUR,
        };

        let job = env_map
            .get("PIPELINE_JOB")
            .map(|raw| {
                raw.parse::<Job>()
                    .map_err(|e| ConfigError::InvalidValue("PIPELINE_JOB".to_string(), e))
            })
            .transpose()?;

        Ok(Config {
            database_path,
            rpc_url,
            price_api_url,
            block_api_url,
            ve_contract,
            pool_catalog_url,
            merkl_contract,
            native_symbol,
            datasets,
            request_timeout: Duration::from_secs(timeout_secs),
            snapshot_concurrency,
            cutover_hour,
            job,
        })
    }

    /// Column holding the native token price in the vote and emission histories.
    pub fn price_column(&self) -> String {
        format!("{}_price", self.native_symbol)
    }
}
