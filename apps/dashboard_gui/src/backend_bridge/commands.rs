//! Backend commands queued from UI to backend worker.

pub enum BackendCommand {
    /// Initial connect-and-read performed once at startup.
    Load,
    ConnectWallet,
    Refresh,
    Transfer {
        to: String,
        amount: String,
    },
    Mint {
        to: String,
        amount: String,
    },
    Burn {
        amount: String,
    },
    Shutdown,
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BackendCommand::Load => "load",
            BackendCommand::ConnectWallet => "connect_wallet",
            BackendCommand::Refresh => "refresh",
            BackendCommand::Transfer { .. } => "transfer",
            BackendCommand::Mint { .. } => "mint",
            BackendCommand::Burn { .. } => "burn",
            BackendCommand::Shutdown => "shutdown",
        }
    }
}
