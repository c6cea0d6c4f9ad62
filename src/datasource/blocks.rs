//! Historical block height lookup (`GET {base}/{unix_secs}` → `{"height": n}`).

use super::http::JsonHttpClient;
use super::{BlockHeightLookup, DataSourceError};
use crate::domain::UnixSecs;
use async_trait::async_trait;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct BlockResponse {
    height: u64,
}

#[derive(Debug, Clone)]
pub struct LlamaBlockLookup {
    http: JsonHttpClient,
    base_url: String,
}

impl LlamaBlockLookup {
    pub fn new(http: JsonHttpClient, base_url: String) -> Self {
        Self { http, base_url }
    }

    fn url_for(&self, at: UnixSecs) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), at)
    }
}

#[async_trait]
impl BlockHeightLookup for LlamaBlockLookup {
    async fn block_at(&self, at: UnixSecs) -> Result<u64, DataSourceError> {
        let body = self.http.get_json(&self.url_for(at)).await?;
        serde_json::from_value::<BlockResponse>(body)
            .map(|r| r.height)
            .map_err(|e| DataSourceError::ParseError(e.to_string()))
    }
}
