//! Voting-escrow snapshots and reward distribution reads over JSON-RPC `eth_call`.

use super::http::JsonHttpClient;
use super::{DataSourceError, DistributionReader, SnapshotAt, SnapshotGateway};
use crate::domain::{ActiveDistributions, Address};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// `totalSupplyAt(uint256)`
pub const TOTAL_SUPPLY_AT_SELECTOR: &str = "981b24d0";
/// `balanceOfOwnerAt(address,uint256)`
pub const BALANCE_OF_OWNER_AT_SELECTOR: &str = "ae205536";
/// `getActivePoolDistributions(address)`
pub const GET_ACTIVE_POOL_DISTRIBUTIONS_SELECTOR: &str = "8a4bd4b2";

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<String>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Calldata for `totalSupplyAt(at)`.
pub fn encode_total_supply_at(at: SnapshotAt) -> String {
    format!("0x{}{:064x}", TOTAL_SUPPLY_AT_SELECTOR, at.as_word())
}

/// Calldata for `balanceOfOwnerAt(owner, at)`.
pub fn encode_balance_of_owner_at(owner: &Address, at: SnapshotAt) -> String {
    format!(
        "0x{}{:0>64}{:064x}",
        BALANCE_OF_OWNER_AT_SELECTOR,
        owner.hex_body(),
        at.as_word()
    )
}

/// Calldata for `getActivePoolDistributions(pool)`.
pub fn encode_active_pool_distributions(pool: &Address) -> String {
    format!(
        "0x{}{:0>64}",
        GET_ACTIVE_POOL_DISTRIBUTIONS_SELECTOR,
        pool.hex_body()
    )
}

/// Split ABI return data into 32-byte words.
fn words(result: &str) -> Result<Vec<[u8; 32]>, DataSourceError> {
    let body = result.trim().trim_start_matches("0x");
    let bytes = hex::decode(body).map_err(|e| DataSourceError::ParseError(e.to_string()))?;
    if bytes.len() % 32 != 0 {
        return Err(DataSourceError::ParseError(format!(
            "return data of {} bytes is not word aligned",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(32)
        .map(|chunk| {
            let mut word = [0u8; 32];
            word.copy_from_slice(chunk);
            word
        })
        .collect())
}

fn word_as_u64(word: &[u8; 32]) -> Option<u64> {
    let (high, low) = word.split_at(24);
    if high.iter().any(|b| *b != 0) {
        return None;
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(low);
    Some(u64::from_be_bytes(buf))
}

/// Length of a single dynamic array returned by a call.
///
/// The first word is the offset of the array; the word at that offset is
/// its length.
pub fn decode_array_length(result: &str) -> Result<u64, DataSourceError> {
    let words = words(result)?;
    let malformed = || DataSourceError::ParseError("malformed dynamic array return".to_string());
    let offset = words.first().and_then(word_as_u64).ok_or_else(malformed)?;
    if offset % 32 != 0 {
        return Err(malformed());
    }
    let index = usize::try_from(offset / 32).map_err(|_| malformed())?;
    words.get(index).and_then(word_as_u64).ok_or_else(malformed)
}

/// Decode a single `uint256` return word.
///
/// Values above `u128::MAX` are rejected rather than truncated.
pub fn decode_uint256(result: &str) -> Result<u128, DataSourceError> {
    let body = result.trim().trim_start_matches("0x");
    if body.is_empty() {
        return Err(DataSourceError::ParseError(
            "empty eth_call result (no contract at address?)".to_string(),
        ));
    }
    let bytes = hex::decode(body).map_err(|e| DataSourceError::ParseError(e.to_string()))?;
    if bytes.len() != 32 {
        return Err(DataSourceError::ParseError(format!(
            "expected a 32-byte word, got {} bytes",
            bytes.len()
        )));
    }
    let (high, low) = bytes.split_at(16);
    if high.iter().any(|b| *b != 0) {
        return Err(DataSourceError::ParseError(
            "uint256 result exceeds u128".to_string(),
        ));
    }
    let mut word = [0u8; 16];
    word.copy_from_slice(low);
    Ok(u128::from_be_bytes(word))
}

/// Snapshot gateway backed by a JSON-RPC node.
#[derive(Debug)]
pub struct JsonRpcSnapshotGateway {
    http: JsonHttpClient,
    rpc_url: String,
    next_id: AtomicU64,
}

impl JsonRpcSnapshotGateway {
    pub fn new(http: JsonHttpClient, rpc_url: String) -> Self {
        Self {
            http,
            rpc_url,
            next_id: AtomicU64::new(1),
        }
    }

    /// Raw hex return data of an `eth_call` against the latest block.
    async fn eth_call(&self, to: &Address, data: String) -> Result<String, DataSourceError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(to = %to, id, "eth_call");
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "eth_call",
            "params": [
                { "to": to.as_str(), "data": data },
                "latest"
            ]
        });

        let value = self.http.post_json(&self.rpc_url, &payload).await?;
        let response: RpcResponse = serde_json::from_value(value)
            .map_err(|e| DataSourceError::ParseError(e.to_string()))?;

        if let Some(err) = response.error {
            return Err(DataSourceError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        response
            .result
            .ok_or_else(|| DataSourceError::ParseError("missing result field".to_string()))
    }
}

#[async_trait]
impl SnapshotGateway for JsonRpcSnapshotGateway {
    async fn total_supply_at(
        &self,
        contract: &Address,
        at: SnapshotAt,
    ) -> Result<u128, DataSourceError> {
        let result = self.eth_call(contract, encode_total_supply_at(at)).await?;
        decode_uint256(&result)
    }

    async fn balance_of_owner_at(
        &self,
        contract: &Address,
        owner: &Address,
        at: SnapshotAt,
    ) -> Result<u128, DataSourceError> {
        let result = self
            .eth_call(contract, encode_balance_of_owner_at(owner, at))
            .await?;
        decode_uint256(&result)
    }
}

#[async_trait]
impl DistributionReader for JsonRpcSnapshotGateway {
    async fn active_pool_distributions(
        &self,
        contract: &Address,
        pool: &Address,
    ) -> Result<ActiveDistributions, DataSourceError> {
        let raw = self
            .eth_call(contract, encode_active_pool_distributions(pool))
            .await?;
        let count = decode_array_length(&raw)?;
        Ok(ActiveDistributions { count, raw })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UnixSecs;

    #[test]
    fn test_encode_total_supply_at_timestamp() {
        let data = encode_total_supply_at(SnapshotAt::Timestamp(UnixSecs::new(0x6596_0200)));
        assert_eq!(data.len(), 2 + 8 + 64);
        assert!(data.starts_with("0x981b24d0"));
        assert!(data.ends_with("0000000065960200"));
    }

    #[test]
    fn test_encode_balance_of_owner_at() {
        let owner = Address::new("0x00000000000000000000000000000000000000AB".to_string());
        let data = encode_balance_of_owner_at(&owner, SnapshotAt::Block(16));
        assert_eq!(data.len(), 2 + 8 + 128);
        assert_eq!(&data[..10], "0xae205536");
        assert_eq!(&data[10..74], &format!("{:0>64}", "ab"));
        assert_eq!(&data[74..], &format!("{:064x}", 16));
    }

    #[test]
    fn test_encode_active_pool_distributions() {
        let pool = Address::new(format!("0x{}", "c".repeat(40)));
        let data = encode_active_pool_distributions(&pool);
        assert_eq!(data.len(), 2 + 8 + 64);
        assert_eq!(&data[..10], "0x8a4bd4b2");
        assert!(data.ends_with(&"c".repeat(40)));
    }

    #[test]
    fn test_decode_array_length() {
        let empty = format!("0x{:064x}{:064x}", 32, 0);
        assert_eq!(decode_array_length(&empty).unwrap(), 0);

        // Offset word, length 2, then two opaque element words.
        let two = format!("0x{:064x}{:064x}{}{}", 32, 2, "1".repeat(64), "2".repeat(64));
        assert_eq!(decode_array_length(&two).unwrap(), 2);

        assert!(decode_array_length("0x").is_err());
        assert!(decode_array_length(&format!("0x{:064x}", 64)).is_err());
        assert!(decode_array_length("0x1234").is_err());
    }

    #[test]
    fn test_decode_uint256() {
        let one_token = format!("0x{:064x}", 1_000_000_000_000_000_000u128);
        assert_eq!(decode_uint256(&one_token).unwrap(), 1_000_000_000_000_000_000);
        assert_eq!(decode_uint256(&format!("0x{}", "0".repeat(64))).unwrap(), 0);
    }

    #[test]
    fn test_decode_rejects_empty_and_overflow() {
        assert!(matches!(
            decode_uint256("0x"),
            Err(DataSourceError::ParseError(_))
        ));
        let too_big = format!("0x{}{}", "1", "0".repeat(63));
        assert!(decode_uint256(&too_big).is_err());
        assert!(decode_uint256("0x1234").is_err());
    }
}
