//! JSON-RPC access to the chain
//!
//! [`EvmRpc`] is the seam between the coordination layer and the node: the
//! handful of `eth_*` primitives the launcher needs, nothing more. The
//! production implementation is [`HttpRpc`]; tests swap in `MockRpc`.

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use fourmeme_core::{Error, Result, TransactionIntent, TxReceipt, TxStatus};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Filter for `eth_getLogs`
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub address: Option<Address>,
    /// Event signature topic
    pub topic0: Option<B256>,
    pub from_block: Option<u64>,
    /// `None` means latest
    pub to_block: Option<u64>,
}

/// A single log entry returned by `eth_getLogs`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: u64,
    pub transaction_hash: B256,
}

/// Chain collaborator primitives used by the coordination layer.
///
/// Everything here except `send_raw_transaction` is safe to retry;
/// submitting the same payload twice creates two transactions.
#[async_trait]
pub trait EvmRpc: Send + Sync {
    async fn balance(&self, address: Address) -> Result<U256>;
    /// Pending nonce for `address`
    async fn transaction_count(&self, address: Address) -> Result<u64>;
    async fn estimate_gas(&self, intent: &TransactionIntent, from: Address) -> Result<u64>;
    async fn gas_price(&self) -> Result<u128>;
    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<B256>;
    /// `None` until the transaction is mined
    async fn transaction_receipt(&self, hash: B256) -> Result<Option<TxReceipt>>;
    async fn block_number(&self) -> Result<u64>;
    async fn logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>>;
    async fn code_at(&self, address: Address) -> Result<Bytes>;
}

// ─── HTTP implementation ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

/// JSON-RPC client over HTTP
pub struct HttpRpc {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl HttpRpc {
    pub fn new(url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .build()
            .expect("Failed to create HTTP client");
        Self {
            http,
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    async fn call_raw(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!(method, id, "rpc call");

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::Rpc(format!("{method}: {e}")))?;

        let rpc: RpcResponse = response
            .json()
            .await
            .map_err(|e| Error::Rpc(format!("{method}: invalid response: {e}")))?;

        if let Some(err) = rpc.error {
            return Err(Error::Rpc(format!(
                "{method}: {} (code {})",
                err.message, err.code
            )));
        }

        Ok(rpc.result)
    }

    async fn call<T: serde::de::DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        let result = self.call_raw(method, params).await?;
        serde_json::from_value(result).map_err(|e| Error::Rpc(format!("{method}: {e}")))
    }
}

/// Parse a `0x`-prefixed quantity into u64
fn parse_quantity_u64(raw: &str) -> Result<u64> {
    u64::from_str_radix(raw.trim_start_matches("0x"), 16)
        .map_err(|e| Error::Rpc(format!("invalid quantity {raw}: {e}")))
}

/// Parse a `0x`-prefixed quantity into u128
fn parse_quantity_u128(raw: &str) -> Result<u128> {
    u128::from_str_radix(raw.trim_start_matches("0x"), 16)
        .map_err(|e| Error::Rpc(format!("invalid quantity {raw}: {e}")))
}

/// Parse a `0x`-prefixed quantity into U256
fn parse_quantity_u256(raw: &str) -> Result<U256> {
    U256::from_str_radix(raw.trim_start_matches("0x"), 16)
        .map_err(|e| Error::Rpc(format!("invalid quantity {raw}: {e}")))
}

/// Build the call object used by `eth_estimateGas`
fn call_object(intent: &TransactionIntent, from: Address) -> Value {
    let mut object = json!({
        "from": from,
        "value": format!("{:#x}", intent.value),
    });

    if let Some(to) = intent.to {
        object["to"] = json!(to);
    }
    if !intent.data.is_empty() {
        object["data"] = json!(intent.data);
    }
    if let Some(gas) = intent.gas {
        object["gas"] = json!(format!("{gas:#x}"));
    }
    if let Some(gas_price) = intent.gas_price {
        object["gasPrice"] = json!(format!("{gas_price:#x}"));
    }

    object
}

/// Raw receipt as returned by the node
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: B256,
    block_number: String,
    block_hash: B256,
    status: String,
    from: Address,
    #[serde(default)]
    to: Option<Address>,
    #[serde(default)]
    contract_address: Option<Address>,
    gas_used: String,
}

impl RawReceipt {
    fn into_receipt(self) -> Result<TxReceipt> {
        let status = if self.status == "0x1" {
            TxStatus::Success
        } else {
            TxStatus::Reverted
        };
        Ok(TxReceipt {
            transaction_hash: self.transaction_hash,
            block_number: parse_quantity_u64(&self.block_number)?,
            block_hash: self.block_hash,
            status,
            from: self.from,
            to: self.to,
            contract_address: self.contract_address,
            gas_used: parse_quantity_u64(&self.gas_used)?,
        })
    }
}

/// Raw log entry as returned by the node
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLog {
    address: Address,
    topics: Vec<B256>,
    data: Bytes,
    block_number: String,
    transaction_hash: B256,
}

#[async_trait]
impl EvmRpc for HttpRpc {
    async fn balance(&self, address: Address) -> Result<U256> {
        let raw: String = self
            .call("eth_getBalance", json!([address, "latest"]))
            .await?;
        parse_quantity_u256(&raw)
    }

    async fn transaction_count(&self, address: Address) -> Result<u64> {
        let raw: String = self
            .call("eth_getTransactionCount", json!([address, "pending"]))
            .await?;
        parse_quantity_u64(&raw)
    }

    async fn estimate_gas(&self, intent: &TransactionIntent, from: Address) -> Result<u64> {
        let raw: String = self
            .call("eth_estimateGas", json!([call_object(intent, from)]))
            .await?;
        parse_quantity_u64(&raw)
    }

    async fn gas_price(&self) -> Result<u128> {
        let raw: String = self.call("eth_gasPrice", json!([])).await?;
        parse_quantity_u128(&raw)
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<B256> {
        let payload = format!("0x{}", alloy::hex::encode(raw));
        self.call("eth_sendRawTransaction", json!([payload])).await
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<TxReceipt>> {
        let result = self
            .call_raw("eth_getTransactionReceipt", json!([hash]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }
        let raw: RawReceipt = serde_json::from_value(result)
            .map_err(|e| Error::Rpc(format!("eth_getTransactionReceipt: {e}")))?;
        raw.into_receipt().map(Some)
    }

    async fn block_number(&self) -> Result<u64> {
        let raw: String = self.call("eth_blockNumber", json!([])).await?;
        parse_quantity_u64(&raw)
    }

    async fn logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>> {
        let mut object = json!({});
        if let Some(address) = filter.address {
            object["address"] = json!(address);
        }
        if let Some(topic0) = filter.topic0 {
            object["topics"] = json!([topic0]);
        }
        if let Some(from_block) = filter.from_block {
            object["fromBlock"] = json!(format!("{from_block:#x}"));
        }
        object["toBlock"] = match filter.to_block {
            Some(to_block) => json!(format!("{to_block:#x}")),
            None => json!("latest"),
        };

        let raw: Vec<RawLog> = self.call("eth_getLogs", json!([object])).await?;
        raw.into_iter()
            .map(|log| {
                Ok(LogEntry {
                    address: log.address,
                    topics: log.topics,
                    data: log.data,
                    block_number: parse_quantity_u64(&log.block_number)?,
                    transaction_hash: log.transaction_hash,
                })
            })
            .collect()
    }

    async fn code_at(&self, address: Address) -> Result<Bytes> {
        self.call("eth_getCode", json!([address, "latest"])).await
    }
}
