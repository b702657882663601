use shared::{
    domain::TxHash,
    error::{ProviderError, ProviderErrorCode},
    units::UnitsError,
};
use thiserror::Error;

/// Coarse failure classes a front-end reacts to differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingProvider,
    Rejected,
    CallFailed,
    InvalidInput,
    NotConnected,
}

#[derive(Debug, Clone, Error)]
pub enum DashboardError {
    #[error("no wallet provider available")]
    ProviderUnavailable,
    #[error("wallet is not connected")]
    NotConnected,
    #[error("recipient address is required")]
    MissingRecipient,
    #[error("invalid recipient address '{value}'")]
    InvalidRecipient { value: String },
    #[error("invalid amount '{value}': {source}")]
    InvalidAmount { value: String, source: UnitsError },
    #[error("amount must be greater than zero")]
    ZeroAmount,
    #[error("transaction {tx_hash} reverted")]
    Reverted { tx_hash: TxHash },
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl DashboardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DashboardError::ProviderUnavailable => ErrorKind::MissingProvider,
            DashboardError::NotConnected => ErrorKind::NotConnected,
            DashboardError::MissingRecipient
            | DashboardError::InvalidRecipient { .. }
            | DashboardError::InvalidAmount { .. }
            | DashboardError::ZeroAmount => ErrorKind::InvalidInput,
            DashboardError::Reverted { .. } => ErrorKind::CallFailed,
            DashboardError::Provider(err) if err.is_rejection() => ErrorKind::Rejected,
            DashboardError::Provider(err) if err.code == ProviderErrorCode::Unavailable => {
                ErrorKind::MissingProvider
            }
            DashboardError::Provider(_) => ErrorKind::CallFailed,
        }
    }
}
