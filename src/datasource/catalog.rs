//! Pool catalog over HTTP (`GET {url}` → `{"data": [{"symbol", "underlyingPool"}, ...]}`).

use super::http::JsonHttpClient;
use super::{DataSourceError, PoolCatalog};
use crate::domain::{Address, CatalogPool, PoolSymbol};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    data: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    symbol: String,
    #[serde(rename = "underlyingPool")]
    underlying_pool: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HttpPoolCatalog {
    http: JsonHttpClient,
    url: String,
}

impl HttpPoolCatalog {
    pub fn new(http: JsonHttpClient, url: String) -> Self {
        Self { http, url }
    }
}

#[async_trait]
impl PoolCatalog for HttpPoolCatalog {
    async fn catalog_pools(&self) -> Result<Vec<CatalogPool>, DataSourceError> {
        let body = self.http.get_json(&self.url).await?;
        pools_from_body(body)
    }
}

/// Entries without an underlying pool are skipped.
pub fn pools_from_body(body: Value) -> Result<Vec<CatalogPool>, DataSourceError> {
    let response: CatalogResponse =
        serde_json::from_value(body).map_err(|e| DataSourceError::ParseError(e.to_string()))?;

    let mut pools = Vec::with_capacity(response.data.len());
    for entry in response.data {
        let Some(raw) = entry.underlying_pool else {
            debug!(symbol = %entry.symbol, "Catalog entry has no underlying pool");
            continue;
        };
        let underlying_pool = Address::parse(&raw).map_err(|e| {
            DataSourceError::ParseError(format!("pool {}: {}", entry.symbol, e))
        })?;
        pools.push(CatalogPool {
            symbol: PoolSymbol::new(entry.symbol),
            underlying_pool,
        });
    }
    Ok(pools)
}
