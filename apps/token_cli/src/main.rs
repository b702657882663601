use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::{parse_contract_address, validate},
    load_settings, parse_recipient, DashboardEvent, DashboardState, FormInputs, RpcWalletProvider,
    Settings, TokenDashboard, TransactionOutcome,
};
use shared::{
    domain::{address_hex, TxOperation},
    units::format_units,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Read and operate the token contract through a JSON-RPC wallet")]
struct Args {
    /// Settings file; defaults to ./dashboard.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[arg(long, global = true)]
    rpc_url: Option<String>,
    #[arg(long, global = true)]
    contract: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Token name, ticker, total supply and owner.
    Info,
    Balance {
        /// Account to query instead of the connected wallet account.
        #[arg(long)]
        account: Option<String>,
    },
    Transfer {
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: String,
    },
    Mint {
        #[arg(long)]
        to: String,
        #[arg(long)]
        amount: String,
    },
    Burn {
        #[arg(long)]
        amount: String,
    },
    /// Follow contract events until interrupted.
    Watch,
}

fn resolve_settings(args: &Args) -> Result<Settings> {
    let mut settings = load_settings(args.config.as_deref())?;
    if let Some(rpc_url) = &args.rpc_url {
        settings.rpc_url = rpc_url.clone();
    }
    if let Some(contract) = &args.contract {
        settings.contract_address = parse_contract_address(contract)?;
    }
    validate(&settings)?;
    Ok(settings)
}

fn print_summary(state: &DashboardState) {
    println!(
        "token:        {} ({})",
        state.token.name.as_deref().unwrap_or("<unknown>"),
        state.symbol_display()
    );
    println!(
        "total supply: {} {}",
        state.total_supply_display(),
        state.symbol_display()
    );
    match state.owner {
        Some(owner) => println!("owner:        {}", address_hex(&owner)),
        None => println!("owner:        <unknown>"),
    }
    if let Some(account) = state.account {
        println!(
            "account:      {}{}",
            address_hex(&account),
            if state.is_owner { " (owner)" } else { "" }
        );
        println!(
            "balance:      {} {}",
            state.balance_display(),
            state.symbol_display()
        );
    }
}

fn print_outcome(outcome: &TransactionOutcome, state: &DashboardState) {
    println!("{} confirmed: {}", outcome.operation, outcome.tx_hash);
    if let Some(block) = outcome.receipt.block_number {
        println!("block:        {block}");
    }
    for (field, reason) in &outcome.refresh.failed {
        warn!(?field, "refresh after {} failed: {reason}", outcome.operation);
    }
    print_summary(state);
}

async fn connect(dashboard: &Arc<TokenDashboard>) -> Result<()> {
    let account = dashboard
        .connect_wallet()
        .await
        .context("wallet did not grant account access")?;
    info!(account = %address_hex(&account), "connected");
    Ok(())
}

async fn watch(dashboard: &Arc<TokenDashboard>) -> Result<()> {
    let mut events = dashboard.subscribe_events();
    let report = dashboard.load().await?;
    if !report.is_complete() {
        warn!(failed = ?report.failed, "initial read incomplete");
    }
    print_summary(&dashboard.state().await);
    if !dashboard.is_subscribed().await {
        anyhow::bail!("no connected account; contract events are only followed for a connected wallet");
    }
    println!("watching contract events, press ctrl-c to stop");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(DashboardEvent::Contract(event)) => {
                    println!("event {}: {event:?}", event.name());
                    print_summary(&dashboard.state().await);
                }
                Ok(DashboardEvent::Error { kind, message }) => {
                    warn!(?kind, "{message}");
                }
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "dropped dashboard events");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
        }
    }
    Ok(())
}

async fn run(args: Args, dashboard: &Arc<TokenDashboard>, decimals: u8) -> Result<()> {
    match args.command {
        Command::Info => {
            let report = dashboard.refresh_all().await?;
            for (field, reason) in &report.failed {
                warn!(?field, "read failed: {reason}");
            }
            print_summary(&dashboard.state().await);
        }
        Command::Balance { account: Some(account) } => {
            let account = parse_recipient(&account)?;
            let balance = dashboard.contract().await?.balance_of(account).await?;
            println!("{} {}", address_hex(&account), format_units(balance, decimals));
        }
        Command::Balance { account: None } => {
            connect(dashboard).await?;
            dashboard.refresh_metadata().await?;
            dashboard.refresh_balance().await?;
            let state = dashboard.state().await;
            println!("{} {}", state.balance_display(), state.symbol_display());
        }
        Command::Transfer { to, amount } => {
            connect(dashboard).await?;
            let inputs = FormInputs {
                transfer_to: to,
                transfer_amount: amount,
                ..Default::default()
            };
            let outcome = dashboard.submit_inputs(TxOperation::Transfer, inputs).await?;
            print_outcome(&outcome, &dashboard.state().await);
        }
        Command::Mint { to, amount } => {
            connect(dashboard).await?;
            dashboard.refresh_owner().await?;
            if !dashboard.state().await.is_owner {
                warn!("connected account is not the contract owner; the contract may reject the mint");
            }
            let inputs = FormInputs {
                mint_to: to,
                mint_amount: amount,
                ..Default::default()
            };
            let outcome = dashboard.submit_inputs(TxOperation::Mint, inputs).await?;
            print_outcome(&outcome, &dashboard.state().await);
        }
        Command::Burn { amount } => {
            connect(dashboard).await?;
            dashboard.refresh_owner().await?;
            if !dashboard.state().await.is_owner {
                warn!("connected account is not the contract owner; the contract may reject the burn");
            }
            let inputs = FormInputs {
                burn_amount: amount,
                ..Default::default()
            };
            let outcome = dashboard.submit_inputs(TxOperation::Burn, inputs).await?;
            print_outcome(&outcome, &dashboard.state().await);
        }
        Command::Watch => watch(dashboard).await?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let settings = resolve_settings(&args)?;
    info!(
        rpc_url = %settings.rpc_url,
        contract = %address_hex(&settings.contract_address),
        "using wallet provider"
    );
    let provider = Arc::new(RpcWalletProvider::new(&settings)?);
    let dashboard = TokenDashboard::from_settings(provider, &settings);

    let result = run(args, &dashboard, settings.token_decimals).await;
    dashboard.shutdown().await;
    result
}
