use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::{sol, SolEvent};
use serde::{Deserialize, Serialize};

use crate::error::{ProviderError, ProviderErrorCode};

sol! {
    /// Interface of the deployed token contract.
    interface IToken {
        function name() external view returns (string memory);
        function symbol() external view returns (string memory);
        function totalSupply() external view returns (uint256);
        function owner() external view returns (address);
        function balanceOf(address account) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
        function mint(address to, uint256 amount) external;
        function burn(uint256 amount) external;

        event Transfer(address indexed from, address indexed to, uint256 value);
        event tokensBurned(address indexed owner, uint256 amount, string message);
        event additionalTokensMinted(address indexed owner, uint256 amount, string message);
    }
}

/// Notifications emitted by the token contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractEvent {
    TokensBurned {
        owner: Address,
        amount: U256,
        message: String,
    },
    TokensMinted {
        owner: Address,
        amount: U256,
        message: String,
    },
    Transfer {
        from: Address,
        to: Address,
        amount: U256,
    },
}

impl ContractEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ContractEvent::TokensBurned { .. } => "tokensBurned",
            ContractEvent::TokensMinted { .. } => "additionalTokensMinted",
            ContractEvent::Transfer { .. } => "Transfer",
        }
    }

    /// Whether the event can change total supply and therefore token metadata.
    pub fn changes_supply(&self) -> bool {
        !matches!(self, ContractEvent::Transfer { .. })
    }

    /// Topic-0 hashes of every event the dashboard listens for.
    pub fn signature_hashes() -> [B256; 3] {
        [
            IToken::Transfer::SIGNATURE_HASH,
            IToken::tokensBurned::SIGNATURE_HASH,
            IToken::additionalTokensMinted::SIGNATURE_HASH,
        ]
    }

    /// Decodes a raw log. Logs with an unrelated topic-0 yield `Ok(None)`.
    pub fn decode_log(topics: &[B256], data: &[u8]) -> Result<Option<Self>, ProviderError> {
        let Some(signature) = topics.first() else {
            return Ok(None);
        };
        let decode_err = |err: alloy_sol_types::Error| {
            ProviderError::new(
                ProviderErrorCode::Decode,
                format!("failed to decode contract log: {err}"),
            )
        };

        let event = if *signature == IToken::Transfer::SIGNATURE_HASH {
            let log = IToken::Transfer::decode_raw_log(topics.iter().copied(), data, true)
                .map_err(decode_err)?;
            ContractEvent::Transfer {
                from: log.from,
                to: log.to,
                amount: log.value,
            }
        } else if *signature == IToken::tokensBurned::SIGNATURE_HASH {
            let log = IToken::tokensBurned::decode_raw_log(topics.iter().copied(), data, true)
                .map_err(decode_err)?;
            ContractEvent::TokensBurned {
                owner: log.owner,
                amount: log.amount,
                message: log.message,
            }
        } else if *signature == IToken::additionalTokensMinted::SIGNATURE_HASH {
            let log =
                IToken::additionalTokensMinted::decode_raw_log(topics.iter().copied(), data, true)
                    .map_err(decode_err)?;
            ContractEvent::TokensMinted {
                owner: log.owner,
                amount: log.amount,
                message: log.message,
            }
        } else {
            return Ok(None);
        };
        Ok(Some(event))
    }
}

pub const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    pub params: serde_json::Value,
}

impl RpcRequest {
    pub fn new(id: u64, method: impl Into<String>, params: serde_json::Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl From<RpcErrorObject> for ProviderError {
    fn from(value: RpcErrorObject) -> Self {
        ProviderError::from_rpc_code(value.code, value.message)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: serde_json::Value,
    #[serde(default)]
    pub result: serde_json::Value,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcLog {
    pub topics: Vec<B256>,
    pub data: alloy_primitives::Bytes,
    #[serde(default)]
    pub block_number: Option<String>,
    #[serde(default)]
    pub removed: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcReceipt {
    pub transaction_hash: B256,
    #[serde(default)]
    pub block_number: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Parses a JSON-RPC hex quantity such as `"0x1b4"`.
pub fn parse_quantity(raw: &str) -> Result<u64, ProviderError> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    u64::from_str_radix(digits, 16).map_err(|err| {
        ProviderError::new(
            ProviderErrorCode::Decode,
            format!("invalid hex quantity '{raw}': {err}"),
        )
    })
}

pub fn format_quantity(value: u64) -> String {
    format!("{value:#x}")
}
