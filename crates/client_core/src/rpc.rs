//! EIP-1193 style wallet provider reached over JSON-RPC/HTTP.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex as StdMutex,
    },
    time::Duration,
};

use alloy_primitives::Bytes;
use alloy_sol_types::SolCall;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use shared::{
    domain::{address_hex, parse_address, Address, TxHash, TxReceipt, U256},
    error::{ProviderError, ProviderErrorCode},
    protocol::{
        format_quantity, parse_quantity, ContractEvent, IToken, RpcLog, RpcReceipt, RpcRequest,
        RpcResponse,
    },
};
use tokio::{sync::broadcast, task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::{config::Settings, TokenContract, WalletProvider};

const CONTRACT_EVENT_CAPACITY: usize = 256;

pub struct JsonRpcClient {
    http: Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let http = Client::builder().timeout(timeout).build().map_err(|err| {
            ProviderError::new(
                ProviderErrorCode::Transport,
                format!("failed to build http client: {err}"),
            )
        })?;
        Ok(Self {
            http,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn request<R: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<R, ProviderError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(id, method, "rpc: request");

        let transport = |err: reqwest::Error| {
            ProviderError::new(
                ProviderErrorCode::Transport,
                format!("{method} request to wallet provider failed: {err}"),
            )
        };
        let reply = self
            .http
            .post(&self.url)
            .json(&RpcRequest::new(id, method, params))
            .send()
            .await
            .map_err(transport)?;
        let status = reply.status();
        let body = reply.bytes().await.map_err(transport)?;

        // Hosted endpoints pair JSON-RPC errors with non-2xx statuses; the
        // envelope's code wins over the HTTP status.
        let response = match (status.is_success(), serde_json::from_slice::<RpcResponse>(&body)) {
            (_, Ok(response)) if response.error.is_some() => response,
            (true, Ok(response)) => response,
            (false, _) => {
                return Err(ProviderError::new(
                    ProviderErrorCode::Transport,
                    format!("{method} request to wallet provider failed: HTTP {status}"),
                ))
            }
            (true, Err(err)) => {
                return Err(ProviderError::new(
                    ProviderErrorCode::Decode,
                    format!("invalid {method} response envelope: {err}"),
                ))
            }
        };

        if let Some(error) = response.error {
            debug!(id, method, code = error.code, "rpc: error response");
            return Err(error.into());
        }
        serde_json::from_value(response.result).map_err(|err| {
            ProviderError::new(
                ProviderErrorCode::Decode,
                format!("invalid {method} result: {err}"),
            )
        })
    }

    pub async fn block_number(&self) -> Result<u64, ProviderError> {
        let raw: String = self.request("eth_blockNumber", json!([])).await?;
        parse_quantity(&raw)
    }

    pub async fn get_logs(
        &self,
        address: Address,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<RpcLog>, ProviderError> {
        let filter = json!({
            "address": address_hex(&address),
            "fromBlock": format_quantity(from_block),
            "toBlock": format_quantity(to_block),
            "topics": [ContractEvent::signature_hashes()],
        });
        self.request("eth_getLogs", json!([filter])).await
    }

    pub async fn transaction_receipt(
        &self,
        tx_hash: TxHash,
    ) -> Result<Option<TxReceipt>, ProviderError> {
        let receipt: Option<RpcReceipt> = self
            .request("eth_getTransactionReceipt", json!([tx_hash]))
            .await?;
        receipt.map(receipt_from_rpc).transpose()
    }
}

fn receipt_from_rpc(receipt: RpcReceipt) -> Result<TxReceipt, ProviderError> {
    let block_number = receipt
        .block_number
        .as_deref()
        .map(parse_quantity)
        .transpose()?;
    // Receipts from before status codes existed carry no status; treat as mined.
    let success = match receipt.status.as_deref() {
        Some(status) => parse_quantity(status)? == 1,
        None => true,
    };
    Ok(TxReceipt {
        tx_hash: receipt.transaction_hash,
        block_number,
        success,
    })
}

fn decode_error(err: alloy_sol_types::Error) -> ProviderError {
    ProviderError::new(
        ProviderErrorCode::Decode,
        format!("failed to decode contract return data: {err}"),
    )
}

pub struct RpcWalletProvider {
    rpc: Arc<JsonRpcClient>,
    poll_interval: Duration,
    receipt_timeout: Duration,
}

impl RpcWalletProvider {
    pub fn new(settings: &Settings) -> Result<Self, ProviderError> {
        let rpc = JsonRpcClient::new(settings.rpc_url.clone(), settings.request_timeout)?;
        Ok(Self {
            rpc: Arc::new(rpc),
            poll_interval: settings.poll_interval,
            receipt_timeout: settings.receipt_timeout,
        })
    }

    pub fn rpc(&self) -> &Arc<JsonRpcClient> {
        &self.rpc
    }
}

#[async_trait]
impl WalletProvider for RpcWalletProvider {
    async fn request_accounts(&self) -> Result<Vec<Address>, ProviderError> {
        let raw: Vec<String> = match self.rpc.request("eth_requestAccounts", json!([])).await {
            Ok(accounts) => accounts,
            Err(err) if err.code == ProviderErrorCode::UnsupportedMethod => {
                debug!("rpc: eth_requestAccounts unsupported, falling back to eth_accounts");
                self.rpc.request("eth_accounts", json!([])).await?
            }
            Err(err) => return Err(err),
        };
        raw.iter()
            .map(|account| {
                parse_address(account).map_err(|err| {
                    ProviderError::new(ProviderErrorCode::Decode, err.to_string())
                })
            })
            .collect()
    }

    fn contract(
        &self,
        address: Address,
        signer: Option<Address>,
    ) -> Result<Arc<dyn TokenContract>, ProviderError> {
        Ok(Arc::new(RpcTokenContract::new(
            Arc::clone(&self.rpc),
            address,
            signer,
            self.poll_interval,
            self.receipt_timeout,
        )))
    }
}

pub struct RpcTokenContract {
    rpc: Arc<JsonRpcClient>,
    address: Address,
    signer: Option<Address>,
    poll_interval: Duration,
    receipt_timeout: Duration,
    events: broadcast::Sender<ContractEvent>,
    log_watcher: StdMutex<Option<JoinHandle<()>>>,
}

impl RpcTokenContract {
    pub fn new(
        rpc: Arc<JsonRpcClient>,
        address: Address,
        signer: Option<Address>,
        poll_interval: Duration,
        receipt_timeout: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(CONTRACT_EVENT_CAPACITY);
        Self {
            rpc,
            address,
            signer,
            poll_interval,
            receipt_timeout,
            events,
            log_watcher: StdMutex::new(None),
        }
    }

    async fn eth_call(&self, data: Vec<u8>) -> Result<Bytes, ProviderError> {
        let mut call = json!({
            "to": address_hex(&self.address),
            "data": Bytes::from(data),
        });
        if let Some(signer) = self.signer {
            call["from"] = json!(address_hex(&signer));
        }
        self.rpc.request("eth_call", json!([call, "latest"])).await
    }

    async fn send_transaction(&self, data: Vec<u8>) -> Result<TxHash, ProviderError> {
        let Some(signer) = self.signer else {
            return Err(ProviderError::new(
                ProviderErrorCode::Unauthorized,
                "no signer bound to contract handle",
            ));
        };
        let tx = json!({
            "from": address_hex(&signer),
            "to": address_hex(&self.address),
            "data": Bytes::from(data),
        });
        self.rpc.request("eth_sendTransaction", json!([tx])).await
    }

    fn ensure_log_watcher(&self) {
        let mut watcher = self
            .log_watcher
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if watcher.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }
        *watcher = Some(tokio::spawn(watch_logs(
            Arc::clone(&self.rpc),
            self.address,
            self.events.clone(),
            self.poll_interval,
        )));
    }
}

impl Drop for RpcTokenContract {
    fn drop(&mut self) {
        let watcher = self
            .log_watcher
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(task) = watcher.take() {
            task.abort();
        }
    }
}

#[async_trait]
impl TokenContract for RpcTokenContract {
    fn address(&self) -> Address {
        self.address
    }

    async fn name(&self) -> Result<String, ProviderError> {
        let raw = self.eth_call(IToken::nameCall {}.abi_encode()).await?;
        let decoded = IToken::nameCall::abi_decode_returns(&raw, true).map_err(decode_error)?;
        Ok(decoded._0)
    }

    async fn symbol(&self) -> Result<String, ProviderError> {
        let raw = self.eth_call(IToken::symbolCall {}.abi_encode()).await?;
        let decoded = IToken::symbolCall::abi_decode_returns(&raw, true).map_err(decode_error)?;
        Ok(decoded._0)
    }

    async fn total_supply(&self) -> Result<U256, ProviderError> {
        let raw = self.eth_call(IToken::totalSupplyCall {}.abi_encode()).await?;
        let decoded =
            IToken::totalSupplyCall::abi_decode_returns(&raw, true).map_err(decode_error)?;
        Ok(decoded._0)
    }

    async fn owner(&self) -> Result<Address, ProviderError> {
        let raw = self.eth_call(IToken::ownerCall {}.abi_encode()).await?;
        let decoded = IToken::ownerCall::abi_decode_returns(&raw, true).map_err(decode_error)?;
        Ok(decoded._0)
    }

    async fn balance_of(&self, account: Address) -> Result<U256, ProviderError> {
        let raw = self
            .eth_call(IToken::balanceOfCall { account }.abi_encode())
            .await?;
        let decoded =
            IToken::balanceOfCall::abi_decode_returns(&raw, true).map_err(decode_error)?;
        Ok(decoded._0)
    }

    async fn transfer(&self, to: Address, amount: U256) -> Result<TxHash, ProviderError> {
        self.send_transaction(IToken::transferCall { to, amount }.abi_encode())
            .await
    }

    async fn mint(&self, to: Address, amount: U256) -> Result<TxHash, ProviderError> {
        self.send_transaction(IToken::mintCall { to, amount }.abi_encode())
            .await
    }

    async fn burn(&self, amount: U256) -> Result<TxHash, ProviderError> {
        self.send_transaction(IToken::burnCall { amount }.abi_encode())
            .await
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<TxReceipt, ProviderError> {
        let poll = async {
            loop {
                if let Some(receipt) = self.rpc.transaction_receipt(tx_hash).await? {
                    return Ok::<_, ProviderError>(receipt);
                }
                tokio::time::sleep(self.poll_interval).await;
            }
        };
        tokio::time::timeout(self.receipt_timeout, poll)
            .await
            .map_err(|_| {
                ProviderError::new(
                    ProviderErrorCode::Timeout,
                    format!(
                        "no receipt for {tx_hash} after {}s",
                        self.receipt_timeout.as_secs()
                    ),
                )
            })?
    }

    fn subscribe_events(&self) -> broadcast::Receiver<ContractEvent> {
        let receiver = self.events.subscribe();
        self.ensure_log_watcher();
        receiver
    }
}

/// Polls `eth_getLogs` for the contract and fans decoded events out to
/// subscribers. Exits once nobody is listening.
async fn watch_logs(
    rpc: Arc<JsonRpcClient>,
    address: Address,
    events: broadcast::Sender<ContractEvent>,
    poll_interval: Duration,
) {
    info!(contract = %address_hex(&address), "rpc: log watcher started");
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut next_block: Option<u64> = None;

    loop {
        ticker.tick().await;
        if events.receiver_count() == 0 {
            break;
        }

        let latest = match rpc.block_number().await {
            Ok(latest) => latest,
            Err(err) => {
                warn!("rpc: log watcher failed to read block number: {err}");
                continue;
            }
        };
        let from_block = match next_block {
            Some(from_block) => from_block,
            None => {
                next_block = Some(latest + 1);
                continue;
            }
        };
        if from_block > latest {
            continue;
        }

        match rpc.get_logs(address, from_block, latest).await {
            Ok(logs) => {
                for log in logs.into_iter().filter(|log| !log.removed) {
                    match ContractEvent::decode_log(&log.topics, &log.data) {
                        Ok(Some(event)) => {
                            debug!(event = event.name(), block = ?log.block_number, "rpc: contract event");
                            let _ = events.send(event);
                        }
                        Ok(None) => {}
                        Err(err) => warn!("rpc: skipping undecodable log: {err}"),
                    }
                }
                next_block = Some(latest + 1);
            }
            Err(err) => warn!(from_block, latest, "rpc: eth_getLogs failed: {err}"),
        }
    }
    info!(contract = %address_hex(&address), "rpc: log watcher stopped");
}

#[cfg(test)]
#[path = "tests/rpc_tests.rs"]
mod tests;
