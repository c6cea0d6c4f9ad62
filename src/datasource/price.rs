//! Spot price feed over HTTP.

use super::http::JsonHttpClient;
use super::{DataSourceError, PriceFeed};
use crate::domain::Decimal;
use async_trait::async_trait;
use serde_json::Value;

/// Price feed returning `{"data": [{"name": "...", "price": ...}, ...]}`.
#[derive(Debug, Clone)]
pub struct HttpPriceFeed {
    http: JsonHttpClient,
    url: String,
}

impl HttpPriceFeed {
    pub fn new(http: JsonHttpClient, url: String) -> Self {
        Self { http, url }
    }
}

#[async_trait]
impl PriceFeed for HttpPriceFeed {
    async fn spot_price(&self, symbol: &str) -> Result<Decimal, DataSourceError> {
        let body = self.http.get_json(&self.url).await?;
        price_from_body(&body, symbol)
    }
}

/// Pick the first entry named `symbol`. Prices may be JSON numbers or strings.
pub fn price_from_body(body: &Value, symbol: &str) -> Result<Decimal, DataSourceError> {
    let entries = body
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| DataSourceError::ParseError("Expected data array".to_string()))?;

    let entry = entries
        .iter()
        .find(|e| e.get("name").and_then(Value::as_str) == Some(symbol))
        .ok_or_else(|| DataSourceError::Other(format!("no price for symbol {}", symbol)))?;

    let raw = match entry.get("price") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => {
            return Err(DataSourceError::ParseError(format!(
                "price for {} is missing or not numeric",
                symbol
            )))
        }
    };
    Decimal::parse_lenient(&raw).map_err(|e| DataSourceError::ParseError(e.to_string()))
}
