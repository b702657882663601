//! UI/backend events and error modeling for the dashboard controller.

use client_core::{DashboardError, DashboardEvent, DashboardState, ErrorKind};
use shared::{
    domain::{TxHash, TxOperation},
    protocol::ContractEvent,
};

pub enum UiEvent {
    Info(String),
    State(DashboardState),
    /// Blocking notice shown in a modal until dismissed.
    Alert(String),
    Contract(ContractEvent),
    TransactionSubmitted {
        operation: TxOperation,
        tx_hash: TxHash,
    },
    TransactionSettled {
        operation: TxOperation,
        success: bool,
    },
    Error(UiError),
}

impl UiEvent {
    /// Dashboard errors are not forwarded here; the command that caused them
    /// reports them with its own context.
    pub fn from_dashboard(event: DashboardEvent) -> Option<Self> {
        match event {
            DashboardEvent::StateChanged(state) => Some(UiEvent::State(state)),
            DashboardEvent::Alert(message) => Some(UiEvent::Alert(message)),
            DashboardEvent::Contract(event) => Some(UiEvent::Contract(event)),
            DashboardEvent::TransactionSubmitted { operation, tx_hash } => {
                Some(UiEvent::TransactionSubmitted { operation, tx_hash })
            }
            DashboardEvent::TransactionSettled {
                operation, success, ..
            } => Some(UiEvent::TransactionSettled { operation, success }),
            DashboardEvent::Error { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Wallet,
    Rejected,
    Validation,
    Transaction,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    Load,
    Connect,
    Refresh,
    Transfer,
    Mint,
    Burn,
}

impl UiErrorContext {
    pub fn label(self) -> &'static str {
        match self {
            UiErrorContext::BackendStartup => "Startup",
            UiErrorContext::Load => "Load",
            UiErrorContext::Connect => "Connect",
            UiErrorContext::Refresh => "Refresh",
            UiErrorContext::Transfer => "Transfer",
            UiErrorContext::Mint => "Mint",
            UiErrorContext::Burn => "Burn",
        }
    }
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_dashboard(context: UiErrorContext, err: &DashboardError) -> Self {
        let category = match err.kind() {
            ErrorKind::MissingProvider | ErrorKind::NotConnected => UiErrorCategory::Wallet,
            ErrorKind::Rejected => UiErrorCategory::Rejected,
            ErrorKind::InvalidInput => UiErrorCategory::Validation,
            ErrorKind::CallFailed => UiErrorCategory::Transaction,
        };
        Self {
            category,
            context,
            message: err.to_string(),
        }
    }

    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        Self {
            category: UiErrorCategory::Unknown,
            context,
            message: message.into(),
        }
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// One-line text for the status bar.
    pub fn status_line(&self) -> String {
        match self.category {
            UiErrorCategory::Rejected => {
                format!("{}: request was rejected in the wallet", self.context.label())
            }
            UiErrorCategory::Validation => {
                format!("{}: {}", self.context.label(), self.message)
            }
            UiErrorCategory::Wallet => {
                format!("{}: wallet unavailable ({})", self.context.label(), self.message)
            }
            UiErrorCategory::Transaction | UiErrorCategory::Unknown => {
                format!("{} failed: {}", self.context.label(), self.message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::error::ProviderError;

    #[test]
    fn classifies_dashboard_errors_by_kind() {
        let rejected = UiError::from_dashboard(
            UiErrorContext::Transfer,
            &DashboardError::from(ProviderError::from_rpc_code(4001, "User denied")),
        );
        assert_eq!(rejected.category(), UiErrorCategory::Rejected);
        assert_eq!(
            rejected.status_line(),
            "Transfer: request was rejected in the wallet"
        );

        let invalid = UiError::from_dashboard(UiErrorContext::Mint, &DashboardError::ZeroAmount);
        assert_eq!(invalid.category(), UiErrorCategory::Validation);
        assert_eq!(invalid.status_line(), "Mint: amount must be greater than zero");

        let not_connected =
            UiError::from_dashboard(UiErrorContext::Burn, &DashboardError::NotConnected);
        assert_eq!(not_connected.category(), UiErrorCategory::Wallet);
    }

    #[test]
    fn dashboard_errors_are_not_forwarded_as_ui_events() {
        let event = DashboardEvent::Error {
            kind: ErrorKind::CallFailed,
            message: "boom".to_string(),
        };
        assert!(UiEvent::from_dashboard(event).is_none());

        let alert = UiEvent::from_dashboard(DashboardEvent::Alert("install".to_string()));
        assert!(matches!(alert, Some(UiEvent::Alert(message)) if message == "install"));
    }
}
