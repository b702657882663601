use std::{fmt, str::FromStr};

pub use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type TxHash = B256;

/// Decimals used by the token contract for its base units.
pub const TOKEN_DECIMALS: u8 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxOperation {
    Transfer,
    Mint,
    Burn,
}

impl TxOperation {
    pub fn label(self) -> &'static str {
        match self {
            TxOperation::Transfer => "transfer",
            TxOperation::Mint => "mint",
            TxOperation::Burn => "burn",
        }
    }
}

impl fmt::Display for TxOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid account address '{value}'")]
pub struct AddressParseError {
    pub value: String,
}

/// Parses a hex account address, accepting any letter case.
pub fn parse_address(raw: &str) -> Result<Address, AddressParseError> {
    let trimmed = raw.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if hex.len() != 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(AddressParseError {
            value: raw.to_string(),
        });
    }
    Address::from_str(hex).map_err(|_| AddressParseError {
        value: raw.to_string(),
    })
}

/// Lowercase `0x`-prefixed rendering, stable regardless of checksum casing.
pub fn address_hex(address: &Address) -> String {
    format!("{address:#x}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub success: bool,
}
