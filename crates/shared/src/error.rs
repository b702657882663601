use serde::{Deserialize, Serialize};
use thiserror::Error;

/// EIP-1193 provider error codes that get a dedicated meaning.
pub const RPC_CODE_USER_REJECTED: i64 = 4001;
pub const RPC_CODE_UNAUTHORIZED: i64 = 4100;
pub const RPC_CODE_UNSUPPORTED_METHOD: i64 = 4200;
pub const RPC_CODE_DISCONNECTED: i64 = 4900;
pub const RPC_CODE_CHAIN_DISCONNECTED: i64 = 4901;
pub const RPC_CODE_METHOD_NOT_FOUND: i64 = -32601;
pub const RPC_CODE_EXECUTION_REVERTED: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorCode {
    Unavailable,
    UserRejected,
    Unauthorized,
    UnsupportedMethod,
    Disconnected,
    NoAccounts,
    Reverted,
    Timeout,
    Transport,
    Decode,
    Rpc,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code:?}: {message}")]
pub struct ProviderError {
    pub code: ProviderErrorCode,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn from_rpc_code(code: i64, message: impl Into<String>) -> Self {
        let message = message.into();
        let kind = match code {
            RPC_CODE_USER_REJECTED => ProviderErrorCode::UserRejected,
            RPC_CODE_UNAUTHORIZED => ProviderErrorCode::Unauthorized,
            RPC_CODE_UNSUPPORTED_METHOD | RPC_CODE_METHOD_NOT_FOUND => {
                ProviderErrorCode::UnsupportedMethod
            }
            RPC_CODE_DISCONNECTED | RPC_CODE_CHAIN_DISCONNECTED => ProviderErrorCode::Disconnected,
            RPC_CODE_EXECUTION_REVERTED => ProviderErrorCode::Reverted,
            _ if message.to_ascii_lowercase().contains("execution reverted") => {
                ProviderErrorCode::Reverted
            }
            _ => ProviderErrorCode::Rpc,
        };
        Self {
            code: kind,
            message,
        }
    }

    /// True when the wallet holder declined, as opposed to the call failing.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self.code,
            ProviderErrorCode::UserRejected | ProviderErrorCode::Unauthorized
        )
    }
}
