//! Backend worker thread: owns the tokio runtime and the dashboard.

use std::{sync::Arc, thread};

use client_core::{
    DashboardError, DashboardEvent, ErrorKind, FormInputs, MissingWalletProvider, RefreshReport,
    RpcWalletProvider, Settings, TokenDashboard, TransactionOutcome, WalletProvider,
};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use shared::domain::{address_hex, TxOperation};
use tokio::{sync::broadcast, task::JoinHandle};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};

pub fn launch(settings: Settings, cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>) {
    thread::spawn(move || {
        let _ = ui_tx.try_send(UiEvent::Info("Dashboard worker starting...".to_string()));
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let provider: Arc<dyn WalletProvider> = match RpcWalletProvider::new(&settings) {
                Ok(provider) => Arc::new(provider),
                Err(err) => {
                    tracing::error!("wallet provider unavailable: {err}");
                    Arc::new(MissingWalletProvider)
                }
            };
            let dashboard = TokenDashboard::from_settings(provider, &settings);
            let forward_task = spawn_event_forwarder(dashboard.subscribe_events(), ui_tx.clone());
            let _ = ui_tx.try_send(UiEvent::Info(format!(
                "Using wallet at {} for contract {}",
                settings.rpc_url,
                address_hex(&settings.contract_address)
            )));

            while let Ok(cmd) = cmd_rx.recv() {
                if matches!(cmd, BackendCommand::Shutdown) {
                    break;
                }
                tokio::spawn(run_command(Arc::clone(&dashboard), cmd, ui_tx.clone()));
            }

            dashboard.shutdown().await;
            forward_task.abort();
            tracing::info!("dashboard worker stopped");
        });
    });
}

fn spawn_event_forwarder(
    mut events: broadcast::Receiver<DashboardEvent>,
    ui_tx: Sender<UiEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let Some(ui_event) = UiEvent::from_dashboard(event) else {
                        continue;
                    };
                    if let Err(TrySendError::Disconnected(_)) = ui_tx.try_send(ui_event) {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "ui event forwarder lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

fn refresh_status(label: &str, report: &RefreshReport) -> String {
    if report.is_complete() {
        format!("{label}: token data up to date")
    } else {
        let failed: Vec<String> = report
            .failed
            .iter()
            .map(|(field, _)| format!("{field:?}").to_lowercase())
            .collect();
        format!("{label}: could not read {}", failed.join(", "))
    }
}

fn outcome_status(outcome: &TransactionOutcome) -> String {
    format!("{} confirmed in {}", outcome.operation, outcome.tx_hash)
}

// Each command carries its own values; the shared input bag is never touched,
// so overlapping commands cannot mix recipients and amounts.
async fn submit(
    dashboard: &TokenDashboard,
    operation: TxOperation,
    inputs: FormInputs,
) -> Result<String, DashboardError> {
    dashboard
        .submit_inputs(operation, inputs)
        .await
        .map(|outcome| outcome_status(&outcome))
}

async fn run_command(dashboard: Arc<TokenDashboard>, cmd: BackendCommand, ui_tx: Sender<UiEvent>) {
    let (context, result): (UiErrorContext, Result<String, DashboardError>) = match cmd {
        BackendCommand::Load => (
            UiErrorContext::Load,
            dashboard
                .load()
                .await
                .map(|report| refresh_status("Loaded", &report)),
        ),
        BackendCommand::ConnectWallet => {
            let result = match dashboard.connect_wallet().await {
                Ok(account) => dashboard
                    .refresh_all()
                    .await
                    .map(|_| format!("Connected {}", address_hex(&account))),
                Err(err) => Err(err),
            };
            (UiErrorContext::Connect, result)
        }
        BackendCommand::Refresh => (
            UiErrorContext::Refresh,
            dashboard
                .refresh_all()
                .await
                .map(|report| refresh_status("Refreshed", &report)),
        ),
        BackendCommand::Transfer { to, amount } => {
            let inputs = FormInputs {
                transfer_to: to,
                transfer_amount: amount,
                ..Default::default()
            };
            (
                UiErrorContext::Transfer,
                submit(&dashboard, TxOperation::Transfer, inputs).await,
            )
        }
        BackendCommand::Mint { to, amount } => {
            let inputs = FormInputs {
                mint_to: to,
                mint_amount: amount,
                ..Default::default()
            };
            (
                UiErrorContext::Mint,
                submit(&dashboard, TxOperation::Mint, inputs).await,
            )
        }
        BackendCommand::Burn { amount } => {
            let inputs = FormInputs {
                burn_amount: amount,
                ..Default::default()
            };
            (
                UiErrorContext::Burn,
                submit(&dashboard, TxOperation::Burn, inputs).await,
            )
        }
        BackendCommand::Shutdown => return,
    };

    let event = match result {
        Ok(status) => UiEvent::Info(status),
        // The missing-provider alert already reached the UI as a modal.
        Err(err) if err.kind() == ErrorKind::MissingProvider => return,
        Err(err) => UiEvent::Error(UiError::from_dashboard(context, &err)),
    };
    let _ = ui_tx.try_send(event);
}
