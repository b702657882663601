use std::sync::Arc;

use async_trait::async_trait;
use shared::{
    domain::{address_hex, parse_address, Address, TxHash, TxOperation, TxReceipt, TOKEN_DECIMALS, U256},
    error::{ProviderError, ProviderErrorCode},
    protocol::ContractEvent,
    units::{format_units, parse_units},
};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

pub mod config;
pub mod error;
pub mod rpc;

pub use config::{load_settings, Settings, SettingsError};
pub use error::{DashboardError, ErrorKind};
pub use rpc::{JsonRpcClient, RpcTokenContract, RpcWalletProvider};

pub const MISSING_PROVIDER_ALERT: &str = "Please install or unlock a wallet provider";
const DASHBOARD_EVENT_CAPACITY: usize = 256;

/// Typed handle to the deployed token contract, bound to an optional signer.
#[async_trait]
pub trait TokenContract: Send + Sync {
    fn address(&self) -> Address;
    async fn name(&self) -> Result<String, ProviderError>;
    async fn symbol(&self) -> Result<String, ProviderError>;
    async fn total_supply(&self) -> Result<U256, ProviderError>;
    async fn owner(&self) -> Result<Address, ProviderError>;
    async fn balance_of(&self, account: Address) -> Result<U256, ProviderError>;
    async fn transfer(&self, to: Address, amount: U256) -> Result<TxHash, ProviderError>;
    async fn mint(&self, to: Address, amount: U256) -> Result<TxHash, ProviderError>;
    async fn burn(&self, amount: U256) -> Result<TxHash, ProviderError>;
    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt, ProviderError>;
    fn subscribe_events(&self) -> broadcast::Receiver<ContractEvent>;
}

/// Wallet agent that authorizes account access and signs transactions.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    fn is_available(&self) -> bool {
        true
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError>;

    /// Builds a contract handle without touching the network.
    fn contract(
        &self,
        address: Address,
        signer: Option<Address>,
    ) -> Result<Arc<dyn TokenContract>, ProviderError>;
}

pub struct MissingWalletProvider;

#[async_trait]
impl WalletProvider for MissingWalletProvider {
    fn is_available(&self) -> bool {
        false
    }

    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        Err(ProviderError::new(
            ProviderErrorCode::Unavailable,
            "no wallet provider available",
        ))
    }

    fn contract(
        &self,
        address: Address,
        _signer: Option<Address>,
    ) -> Result<Arc<dyn TokenContract>, ProviderError> {
        Err(ProviderError::new(
            ProviderErrorCode::Unavailable,
            format!(
                "no wallet provider available for contract {}",
                address_hex(&address)
            ),
        ))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenMetadata {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub total_supply: U256,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BusyState {
    #[default]
    Idle,
    AwaitingConfirmation {
        operation: TxOperation,
        tx_hash: Option<TxHash>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputField {
    TransferTo,
    TransferAmount,
    MintTo,
    MintAmount,
    BurnAmount,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormInputs {
    pub transfer_to: String,
    pub transfer_amount: String,
    pub mint_to: String,
    pub mint_amount: String,
    pub burn_amount: String,
}

impl FormInputs {
    pub fn get(&self, field: InputField) -> &str {
        match field {
            InputField::TransferTo => &self.transfer_to,
            InputField::TransferAmount => &self.transfer_amount,
            InputField::MintTo => &self.mint_to,
            InputField::MintAmount => &self.mint_amount,
            InputField::BurnAmount => &self.burn_amount,
        }
    }

    pub fn set(&mut self, field: InputField, value: String) {
        match field {
            InputField::TransferTo => self.transfer_to = value,
            InputField::TransferAmount => self.transfer_amount = value,
            InputField::MintTo => self.mint_to = value,
            InputField::MintAmount => self.mint_amount = value,
            InputField::BurnAmount => self.burn_amount = value,
        }
    }

    pub fn transfer_call(&self, decimals: u8) -> Result<TokenCall, DashboardError> {
        Ok(TokenCall::Transfer {
            to: parse_recipient(&self.transfer_to)?,
            amount: parse_amount(&self.transfer_amount, decimals)?,
        })
    }

    pub fn mint_call(&self, decimals: u8) -> Result<TokenCall, DashboardError> {
        Ok(TokenCall::Mint {
            to: parse_recipient(&self.mint_to)?,
            amount: parse_amount(&self.mint_amount, decimals)?,
        })
    }

    pub fn call_for(&self, operation: TxOperation, decimals: u8) -> Result<TokenCall, DashboardError> {
        match operation {
            TxOperation::Transfer => self.transfer_call(decimals),
            TxOperation::Mint => self.mint_call(decimals),
            TxOperation::Burn => self.burn_call(decimals),
        }
    }

    pub fn burn_call(&self, decimals: u8) -> Result<TokenCall, DashboardError> {
        Ok(TokenCall::Burn {
            amount: parse_amount(&self.burn_amount, decimals)?,
        })
    }
}

pub fn parse_recipient(raw: &str) -> Result<Address, DashboardError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(DashboardError::MissingRecipient);
    }
    parse_address(raw).map_err(|err| DashboardError::InvalidRecipient { value: err.value })
}

/// Parses a user-entered positive decimal amount into base units.
pub fn parse_amount(raw: &str, decimals: u8) -> Result<U256, DashboardError> {
    let amount = parse_units(raw, decimals).map_err(|source| DashboardError::InvalidAmount {
        value: raw.to_string(),
        source,
    })?;
    if amount.is_zero() {
        return Err(DashboardError::ZeroAmount);
    }
    Ok(amount)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardState {
    pub decimals: u8,
    pub wallet_connected: bool,
    pub account: Option<Address>,
    pub token: TokenMetadata,
    pub owner: Option<Address>,
    pub is_owner: bool,
    pub balance: U256,
    pub inputs: FormInputs,
    pub busy: BusyState,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new(TOKEN_DECIMALS)
    }
}

impl DashboardState {
    pub fn new(decimals: u8) -> Self {
        Self {
            decimals,
            wallet_connected: false,
            account: None,
            token: TokenMetadata::default(),
            owner: None,
            is_owner: false,
            balance: U256::ZERO,
            inputs: FormInputs::default(),
            busy: BusyState::Idle,
        }
    }

    pub fn is_busy(&self) -> bool {
        !matches!(self.busy, BusyState::Idle)
    }

    /// Mint and burn controls are presentation-gated on ownership only.
    pub fn shows_owner_controls(&self) -> bool {
        self.is_owner
    }

    pub fn total_supply_display(&self) -> String {
        format_units(self.token.total_supply, self.decimals)
    }

    pub fn balance_display(&self) -> String {
        format_units(self.balance, self.decimals)
    }

    pub fn symbol_display(&self) -> &str {
        self.token.symbol.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadField {
    Name,
    Symbol,
    TotalSupply,
    Owner,
    Balance,
}

/// Outcome of a refresh cycle. Individual reads fail independently.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub updated: Vec<ReadField>,
    pub failed: Vec<(ReadField, String)>,
}

impl RefreshReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    fn record<T>(&mut self, field: ReadField, result: Result<T, ProviderError>) -> Option<T> {
        match result {
            Ok(value) => {
                self.updated.push(field);
                Some(value)
            }
            Err(err) => {
                warn!(field = ?field, "dashboard: read failed: {err}");
                self.failed.push((field, err.to_string()));
                None
            }
        }
    }

    fn record_outcome<T>(&mut self, field: ReadField, result: Result<T, DashboardError>) {
        match result {
            Ok(_) => self.updated.push(field),
            Err(err) => self.failed.push((field, err.to_string())),
        }
    }

    fn merge(&mut self, other: RefreshReport) {
        self.updated.extend(other.updated);
        self.failed.extend(other.failed);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenCall {
    Transfer { to: Address, amount: U256 },
    Mint { to: Address, amount: U256 },
    Burn { amount: U256 },
}

impl TokenCall {
    pub fn operation(&self) -> TxOperation {
        match self {
            TokenCall::Transfer { .. } => TxOperation::Transfer,
            TokenCall::Mint { .. } => TxOperation::Mint,
            TokenCall::Burn { .. } => TxOperation::Burn,
        }
    }

    pub fn amount(&self) -> U256 {
        match *self {
            TokenCall::Transfer { amount, .. }
            | TokenCall::Mint { amount, .. }
            | TokenCall::Burn { amount } => amount,
        }
    }

    async fn send(&self, contract: &dyn TokenContract) -> Result<TxHash, ProviderError> {
        match *self {
            TokenCall::Transfer { to, amount } => contract.transfer(to, amount).await,
            TokenCall::Mint { to, amount } => contract.mint(to, amount).await,
            TokenCall::Burn { amount } => contract.burn(amount).await,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOutcome {
    pub operation: TxOperation,
    pub tx_hash: TxHash,
    pub receipt: TxReceipt,
    pub refresh: RefreshReport,
}

#[derive(Debug, Clone)]
pub enum DashboardEvent {
    StateChanged(DashboardState),
    /// Blocking, user-facing notice (missing provider).
    Alert(String),
    Contract(ContractEvent),
    TransactionSubmitted {
        operation: TxOperation,
        tx_hash: TxHash,
    },
    TransactionSettled {
        operation: TxOperation,
        tx_hash: Option<TxHash>,
        success: bool,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
}

struct EventSubscription {
    account: Address,
    task: JoinHandle<()>,
}

impl EventSubscription {
    async fn stop(self) {
        self.task.abort();
        let _ = self.task.await;
    }
}

/// View-model binding a wallet provider and the token contract to UI state.
pub struct TokenDashboard {
    provider: Arc<dyn WalletProvider>,
    contract_address: Address,
    inner: Mutex<DashboardState>,
    subscription: Mutex<Option<EventSubscription>>,
    events: broadcast::Sender<DashboardEvent>,
}

impl TokenDashboard {
    pub fn new(contract_address: Address, decimals: u8) -> Arc<Self> {
        Self::new_with_provider(Arc::new(MissingWalletProvider), contract_address, decimals)
    }

    pub fn from_settings(provider: Arc<dyn WalletProvider>, settings: &Settings) -> Arc<Self> {
        Self::new_with_provider(
            provider,
            settings.contract_address,
            settings.token_decimals,
        )
    }

    pub fn new_with_provider(
        provider: Arc<dyn WalletProvider>,
        contract_address: Address,
        decimals: u8,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(DASHBOARD_EVENT_CAPACITY);
        Arc::new(Self {
            provider,
            contract_address,
            inner: Mutex::new(DashboardState::new(decimals)),
            subscription: Mutex::new(None),
            events,
        })
    }

    pub fn contract_address(&self) -> Address {
        self.contract_address
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<DashboardEvent> {
        self.events.subscribe()
    }

    pub async fn state(&self) -> DashboardState {
        self.inner.lock().await.clone()
    }

    pub async fn is_subscribed(&self) -> bool {
        self.subscription
            .lock()
            .await
            .as_ref()
            .is_some_and(|active| !active.task.is_finished())
    }

    async fn update_state(&self, apply: impl FnOnce(&mut DashboardState)) -> DashboardState {
        let snapshot = {
            let mut guard = self.inner.lock().await;
            apply(&mut guard);
            guard.clone()
        };
        let _ = self.events.send(DashboardEvent::StateChanged(snapshot.clone()));
        snapshot
    }

    /// Logs a failure, publishes it, and hands it back for propagation.
    fn failure(&self, context: &'static str, err: impl Into<DashboardError>) -> DashboardError {
        let err = err.into();
        warn!(context, kind = ?err.kind(), "dashboard: {err}");
        let _ = self.events.send(DashboardEvent::Error {
            kind: err.kind(),
            message: err.to_string(),
        });
        err
    }

    fn ensure_provider(&self) -> Result<(), DashboardError> {
        if self.provider.is_available() {
            return Ok(());
        }
        warn!("dashboard: no wallet provider available");
        let _ = self
            .events
            .send(DashboardEvent::Alert(MISSING_PROVIDER_ALERT.to_string()));
        Err(DashboardError::ProviderUnavailable)
    }

    /// Signer-bound contract handle; the signer is the connected account, if any.
    pub async fn contract(&self) -> Result<Arc<dyn TokenContract>, DashboardError> {
        self.ensure_provider()?;
        let signer = self.inner.lock().await.account;
        self.provider
            .contract(self.contract_address, signer)
            .map_err(|err| self.failure("contract handle", err))
    }

    pub async fn connect_wallet(self: &Arc<Self>) -> Result<Address, DashboardError> {
        self.ensure_provider()?;
        let accounts = self
            .provider
            .request_accounts()
            .await
            .map_err(|err| self.failure("account access", err))?;
        let Some(account) = accounts.first().copied() else {
            return Err(self.failure(
                "account access",
                ProviderError::new(ProviderErrorCode::NoAccounts, "wallet returned no accounts"),
            ));
        };

        info!(account = %address_hex(&account), "dashboard: wallet connected");
        self.update_state(|state| {
            state.wallet_connected = true;
            state.account = Some(account);
            if let Some(owner) = state.owner {
                state.is_owner = owner == account;
            }
        })
        .await;
        self.sync_subscription().await;
        Ok(account)
    }

    pub async fn set_input(&self, field: InputField, value: impl Into<String>) {
        let value = value.into();
        self.update_state(|state| state.inputs.set(field, value))
            .await;
    }

    pub async fn refresh_metadata(&self) -> Result<RefreshReport, DashboardError> {
        let contract = self.contract().await?;
        let (name, symbol, total_supply) = futures::join!(
            contract.name(),
            contract.symbol(),
            contract.total_supply()
        );

        let mut report = RefreshReport::default();
        let name = report.record(ReadField::Name, name);
        let symbol = report.record(ReadField::Symbol, symbol);
        let total_supply = report.record(ReadField::TotalSupply, total_supply);

        self.update_state(|state| {
            if let Some(name) = name {
                state.token.name = Some(name);
            }
            if let Some(symbol) = symbol {
                state.token.symbol = Some(symbol);
            }
            if let Some(total_supply) = total_supply {
                state.token.total_supply = total_supply;
            }
        })
        .await;
        Ok(report)
    }

    pub async fn refresh_owner(&self) -> Result<Address, DashboardError> {
        let contract = self.contract().await?;
        let owner = contract
            .owner()
            .await
            .map_err(|err| self.failure("owner read", err))?;

        let state = self
            .update_state(|state| {
                state.owner = Some(owner);
                state.is_owner = state.account == Some(owner);
            })
            .await;
        debug!(
            owner = %address_hex(&owner),
            is_owner = state.is_owner,
            "dashboard: owner refreshed"
        );
        Ok(owner)
    }

    pub async fn refresh_balance(&self) -> Result<U256, DashboardError> {
        let contract = self.contract().await?;
        let Some(account) = self.inner.lock().await.account else {
            return Err(self.failure("balance read", DashboardError::NotConnected));
        };
        let balance = contract
            .balance_of(account)
            .await
            .map_err(|err| self.failure("balance read", err))?;

        self.update_state(|state| {
            if state.account == Some(account) {
                state.balance = balance;
            }
        })
        .await;
        Ok(balance)
    }

    pub async fn refresh_all(&self) -> Result<RefreshReport, DashboardError> {
        let mut report = self.refresh_metadata().await?;
        report.record_outcome(ReadField::Owner, self.refresh_owner().await);
        let connected = self.inner.lock().await.account.is_some();
        if connected {
            report.record_outcome(ReadField::Balance, self.refresh_balance().await);
        }
        Ok(report)
    }

    /// Initial load: connect, then read everything the view shows.
    pub async fn load(self: &Arc<Self>) -> Result<RefreshReport, DashboardError> {
        if let Err(err) = self.connect_wallet().await {
            if err.kind() == ErrorKind::MissingProvider {
                return Err(err);
            }
            debug!("dashboard: loading without a connected wallet: {err}");
        }
        self.refresh_all().await
    }

    pub async fn transfer(&self) -> Result<TransactionOutcome, DashboardError> {
        let inputs = self.inner.lock().await.inputs.clone();
        self.submit_inputs(TxOperation::Transfer, inputs).await
    }

    pub async fn mint(&self) -> Result<TransactionOutcome, DashboardError> {
        let inputs = self.inner.lock().await.inputs.clone();
        self.submit_inputs(TxOperation::Mint, inputs).await
    }

    pub async fn burn(&self) -> Result<TransactionOutcome, DashboardError> {
        let inputs = self.inner.lock().await.inputs.clone();
        self.submit_inputs(TxOperation::Burn, inputs).await
    }

    /// Validates and submits a caller-owned form snapshot. Concurrent callers
    /// never see each other's values, unlike `set_input` followed by `transfer`.
    pub async fn submit_inputs(
        &self,
        operation: TxOperation,
        inputs: FormInputs,
    ) -> Result<TransactionOutcome, DashboardError> {
        self.ensure_provider()?;
        let decimals = self.inner.lock().await.decimals;
        let call = inputs
            .call_for(operation, decimals)
            .map_err(|err| self.failure("form input", err))?;
        self.submit(call).await
    }

    /// Submits a state-changing call and waits for it to settle.
    ///
    /// The busy flag is set before the wallet is asked to sign and returns to
    /// idle once the transaction is mined, reverted, rejected or times out.
    /// Ownership is not checked here; the contract rejects unauthorized mints.
    pub async fn submit(&self, call: TokenCall) -> Result<TransactionOutcome, DashboardError> {
        let contract = self.contract().await?;
        if self.inner.lock().await.account.is_none() {
            return Err(self.failure("transaction submission", DashboardError::NotConnected));
        }

        let operation = call.operation();
        info!(%operation, amount = %call.amount(), "dashboard: submitting transaction");
        self.update_state(|state| {
            state.busy = BusyState::AwaitingConfirmation {
                operation,
                tx_hash: None,
            }
        })
        .await;

        let tx_hash = match call.send(contract.as_ref()).await {
            Ok(tx_hash) => tx_hash,
            Err(err) => {
                self.settle(operation, None, false).await;
                return Err(self.failure("transaction submission", err));
            }
        };

        info!(%operation, %tx_hash, "dashboard: transaction submitted");
        self.update_state(|state| {
            if state.is_busy() {
                state.busy = BusyState::AwaitingConfirmation {
                    operation,
                    tx_hash: Some(tx_hash),
                };
            }
        })
        .await;
        let _ = self.events.send(DashboardEvent::TransactionSubmitted {
            operation,
            tx_hash,
        });

        let receipt = match contract.wait_for_receipt(tx_hash).await {
            Ok(receipt) => receipt,
            Err(err) => {
                self.settle(operation, Some(tx_hash), false).await;
                return Err(self.failure("transaction confirmation", err));
            }
        };
        if !receipt.success {
            self.settle(operation, Some(tx_hash), false).await;
            return Err(self.failure("transaction confirmation", DashboardError::Reverted { tx_hash }));
        }

        self.settle(operation, Some(tx_hash), true).await;
        info!(%operation, %tx_hash, block = ?receipt.block_number, "dashboard: transaction confirmed");
        let refresh = self.refresh_after(operation).await;
        Ok(TransactionOutcome {
            operation,
            tx_hash,
            receipt,
            refresh,
        })
    }

    async fn settle(&self, operation: TxOperation, tx_hash: Option<TxHash>, success: bool) {
        self.update_state(|state| state.busy = BusyState::Idle).await;
        let _ = self.events.send(DashboardEvent::TransactionSettled {
            operation,
            tx_hash,
            success,
        });
    }

    async fn refresh_after(&self, operation: TxOperation) -> RefreshReport {
        let mut report = RefreshReport::default();
        if matches!(operation, TxOperation::Mint | TxOperation::Burn) {
            match self.refresh_metadata().await {
                Ok(metadata) => report.merge(metadata),
                Err(err) => report.failed.push((ReadField::TotalSupply, err.to_string())),
            }
        }
        report.record_outcome(ReadField::Balance, self.refresh_balance().await);
        report
    }

    /// Brings the contract event listener in line with the connection flag.
    ///
    /// Connected without a live listener subscribes, disconnected with one
    /// unsubscribes, anything else is a no-op, so repeated calls never stack
    /// listeners.
    pub async fn sync_subscription(self: &Arc<Self>) {
        let target = {
            let state = self.inner.lock().await;
            state.account.filter(|_| state.wallet_connected)
        };

        let mut guard = self.subscription.lock().await;
        let current = guard
            .as_ref()
            .map(|active| (active.account, active.task.is_finished()));

        match (target, current) {
            (Some(account), Some((active, false))) if active == account => {}
            (Some(account), _) => {
                let contract = match self.contract().await {
                    Ok(contract) => contract,
                    Err(err) => {
                        warn!("dashboard: cannot subscribe to contract events: {err}");
                        return;
                    }
                };
                if let Some(previous) = guard.take() {
                    previous.stop().await;
                }
                let events = contract.subscribe_events();
                let task = self.spawn_event_listener(contract, events);
                *guard = Some(EventSubscription { account, task });
                info!(account = %address_hex(&account), "dashboard: subscribed to contract events");
            }
            (None, Some(_)) => {
                if let Some(previous) = guard.take() {
                    previous.stop().await;
                }
                info!("dashboard: unsubscribed from contract events");
            }
            (None, None) => {}
        }
    }

    /// Tears down the event listener.
    pub async fn shutdown(&self) {
        let active = self.subscription.lock().await.take();
        if let Some(active) = active {
            active.stop().await;
            info!("dashboard: event listener stopped");
        }
    }

    fn spawn_event_listener(
        self: &Arc<Self>,
        contract: Arc<dyn TokenContract>,
        mut events: broadcast::Receiver<ContractEvent>,
    ) -> JoinHandle<()> {
        let dashboard = Arc::downgrade(self);
        tokio::spawn(async move {
            // Holding the handle keeps its event source alive.
            let _contract = contract;
            loop {
                match events.recv().await {
                    Ok(event) => {
                        let Some(dashboard) = dashboard.upgrade() else {
                            break;
                        };
                        dashboard.apply_contract_event(event).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "dashboard: contract event listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    async fn apply_contract_event(&self, event: ContractEvent) {
        let state = self.update_state(|state| state.busy = BusyState::Idle).await;
        match &event {
            ContractEvent::TokensBurned { message, .. }
            | ContractEvent::TokensMinted { message, .. } => {
                info!(event = event.name(), "{message}");
            }
            ContractEvent::Transfer { amount, .. } => {
                info!(
                    event = event.name(),
                    "{} transferred",
                    format_units(*amount, state.decimals)
                );
            }
        }

        if event.changes_supply() {
            if let Err(err) = self.refresh_metadata().await {
                debug!("dashboard: metadata refresh after {} failed: {err}", event.name());
            }
        }
        if let Err(err) = self.refresh_balance().await {
            debug!("dashboard: balance refresh after {} failed: {err}", event.name());
        }
        let _ = self.events.send(DashboardEvent::Contract(event));
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
