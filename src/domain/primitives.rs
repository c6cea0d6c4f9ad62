//! Domain primitives: Epoch, UnixSecs, Address, PoolSymbol.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Epoch index. Never negative; shifting below zero yields `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Epoch(pub u32);

impl Epoch {
    pub fn new(index: u32) -> Self {
        Epoch(index)
    }

    /// Convert a raw dataset value, dropping negative or out-of-range indices.
    pub fn from_i64(raw: i64) -> Option<Self> {
        u32::try_from(raw).ok().map(Epoch)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// Move the index by `delta` epochs.
    pub fn shift(&self, delta: i32) -> Option<Epoch> {
        Self::from_i64(i64::from(self.0) + i64::from(delta))
    }

    pub fn previous(&self) -> Option<Epoch> {
        self.shift(-1)
    }
}

impl std::fmt::Display for Epoch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Time in seconds since Unix epoch (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnixSecs(pub i64);

impl UnixSecs {
    pub fn new(secs: i64) -> Self {
        UnixSecs(secs)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        UnixSecs(dt.timestamp())
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.0, 0).single()
    }
}

impl std::fmt::Display for UnixSecs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The address bribe gauges carry when a pool has no bribe contract.
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressParseError {
    #[error("address must start with 0x: {0}")]
    MissingPrefix(String),
    #[error("address must be 40 hex characters: {0}")]
    InvalidHex(String),
}

/// EVM address, stored lower-cased so joins on address are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub String);

impl Address {
    /// Create an Address from a string without validation.
    pub fn new(addr: String) -> Self {
        Address(addr.trim().to_ascii_lowercase())
    }

    /// Parse and validate a `0x`-prefixed 20-byte hex address.
    pub fn parse(raw: &str) -> Result<Self, AddressParseError> {
        let trimmed = raw.trim();
        let Some(hex_part) = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        else {
            return Err(AddressParseError::MissingPrefix(trimmed.to_string()));
        };
        if hex_part.len() != 40 || !hex_part.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AddressParseError::InvalidHex(trimmed.to_string()));
        }
        Ok(Address::new(trimmed.to_string()))
    }

    pub fn zero() -> Self {
        Address(ZERO_ADDRESS.to_string())
    }

    pub fn is_zero(&self) -> bool {
        self.0 == ZERO_ADDRESS
    }

    /// Get the address as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 40 hex characters without the `0x` prefix.
    pub fn hex_body(&self) -> &str {
        self.0.trim_start_matches("0x")
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pool symbol as it appears in the datasets (e.g. "vAMM-WMATIC/USDC").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PoolSymbol(pub String);

impl PoolSymbol {
    pub fn new(symbol: impl Into<String>) -> Self {
        PoolSymbol(symbol.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PoolSymbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
